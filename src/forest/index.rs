use crate::distance::{Distance, DistanceFn};
use crate::forest::builder::ThresholdingMethod;
use crate::forest::node::Node;
use crate::forest::searcher::Searcher;
use crate::r#type::VectorElement;

/// A single randomized KD-tree over the shared point set.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct KDTree {
    /// Node arena; the root is index 0. A tree over `n` points uses at most
    /// `2 * n - 1` nodes.
    pub(crate) nodes: Vec<Node>,
    /// Permutation of point indices; leaves own half-open ranges into it.
    pub(crate) order: Vec<u32>,
    /// Maximum leaf depth reached during construction.
    pub(crate) depth: usize,
}

/// A forest of independently randomized KD-trees indexing one point set.
///
/// Built once via [`KDForestBuilder`][crate::KDForestBuilder]; immutable
/// afterwards. The point data is borrowed, not copied, and must stay
/// unchanged for the lifetime of the forest.
///
/// Queries go through a [`Searcher`] created with [`KDForest::searcher`].
/// Everything reachable from a shared forest reference is read-only, so any
/// number of searchers may query concurrently, one per thread.
#[derive(Debug, Clone)]
pub struct KDForest<'a, T: VectorElement> {
    pub(crate) data: &'a [T],
    pub(crate) num_points: usize,
    pub(crate) dimension: usize,
    pub(crate) distance: Distance,
    pub(crate) distance_fn: DistanceFn<T>,
    pub(crate) thresholding_method: ThresholdingMethod,
    pub(crate) trees: Vec<KDTree>,
    pub(crate) total_nodes: usize,
    pub(crate) max_comparisons: usize,
}

impl<'a, T: VectorElement> KDForest<'a, T> {
    /// Create a query scratch object bound to this forest.
    ///
    /// For multi-threaded querying create one searcher per thread; each
    /// query runs entirely on its searcher's state.
    pub fn searcher(&self) -> Searcher<'_, T> {
        Searcher::new(self)
    }

    /// The number of trees in the forest.
    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// The dimension of the indexed vectors.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// The number of indexed points.
    pub fn num_points(&self) -> usize {
        self.num_points
    }

    /// Measured maximum leaf depth of one tree.
    pub fn depth_of_tree(&self, index: usize) -> usize {
        assert!(index < self.trees.len(), "tree index {index} out of range");
        self.trees[index].depth
    }

    /// Number of arena nodes used by one tree.
    pub fn num_nodes_of_tree(&self, index: usize) -> usize {
        assert!(index < self.trees.len(), "tree index {index} out of range");
        self.trees[index].nodes.len()
    }

    /// Total number of nodes across all trees. Searcher frontiers are sized
    /// to this figure.
    pub fn total_nodes(&self) -> usize {
        self.total_nodes
    }

    /// The distance norm neighbors are ranked under.
    pub fn distance(&self) -> Distance {
        self.distance
    }

    /// The split-threshold selection method the forest was built with.
    pub fn thresholding_method(&self) -> ThresholdingMethod {
        self.thresholding_method
    }

    /// Per-query comparison budget; `0` means unbounded (exact search).
    pub fn max_comparisons(&self) -> usize {
        self.max_comparisons
    }

    /// Set the per-query comparison budget; `0` means unbounded.
    ///
    /// Taking `&mut self`, this cannot race with live searchers.
    pub fn set_max_comparisons(&mut self, n: usize) {
        self.max_comparisons = n;
    }

    /// Row of the borrowed point set.
    #[inline]
    pub(crate) fn point(&self, index: usize) -> &'a [T] {
        &self.data[index * self.dimension..(index + 1) * self.dimension]
    }
}

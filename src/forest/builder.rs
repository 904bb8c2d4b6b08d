use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
#[cfg(feature = "rayon")]
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::distance::Distance;
use crate::error::{KDForestError, Result};
use crate::forest::index::{KDForest, KDTree};
use crate::forest::node::Node;
use crate::r#type::VectorElement;

/// Number of top-variance split candidates kept per split, before capping by
/// the number of trees.
pub(crate) const SPLIT_CANDIDATES: usize = 5;

/// How the split threshold is chosen along the selected dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdingMethod {
    /// Split at the median coordinate.
    Median,
    /// Split at the mean coordinate, falling back to the median when the
    /// mean would leave one side empty.
    Mean,
}

/// A builder to create a [`KDForest`].
#[derive(Debug, Clone)]
pub struct KDForestBuilder {
    dimension: usize,
    num_trees: usize,
    distance: Distance,
    thresholding_method: ThresholdingMethod,
    seed: Option<u64>,
}

impl KDForestBuilder {
    /// Create a builder for a forest of `num_trees` trees over
    /// `dimension`-dimensional points.
    ///
    /// Defaults: squared-L2 distance, median thresholding, and a seed drawn
    /// from OS entropy.
    pub fn new(dimension: usize, num_trees: usize) -> Self {
        Self {
            dimension,
            num_trees,
            distance: Distance::SquaredL2,
            thresholding_method: ThresholdingMethod::Median,
            seed: None,
        }
    }

    /// Set the distance norm used to rank neighbors.
    pub fn distance(mut self, distance: Distance) -> Self {
        self.distance = distance;
        self
    }

    /// Set the split-threshold selection method.
    pub fn thresholding_method(mut self, method: ThresholdingMethod) -> Self {
        self.thresholding_method = method;
        self
    }

    /// Seed the forest's random source. Builds with the same seed over the
    /// same data produce identical forests.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Build the forest over `data`, a row-major `N x dimension` slice.
    ///
    /// The data is borrowed, not copied, and must stay unchanged for the
    /// lifetime of the forest. Building consumes the builder, so every
    /// forest is built exactly once.
    ///
    /// ## Errors
    ///
    /// - zero dimension or zero trees
    /// - empty data, or a data length that is not a multiple of the dimension
    pub fn build<T: VectorElement>(self, data: &[T]) -> Result<KDForest<'_, T>> {
        if self.dimension == 0 {
            return Err(KDForestError::InvalidParameter(
                "dimension must be at least 1".to_string(),
            ));
        }
        if self.num_trees == 0 {
            return Err(KDForestError::InvalidParameter(
                "number of trees must be at least 1".to_string(),
            ));
        }
        if data.is_empty() {
            return Err(KDForestError::InvalidParameter(
                "cannot index an empty point set".to_string(),
            ));
        }
        if data.len() % self.dimension != 0 {
            return Err(KDForestError::InvalidParameter(format!(
                "data length {} is not a multiple of dimension {}",
                data.len(),
                self.dimension
            )));
        }
        let num_points = data.len() / self.dimension;
        let dimension = self.dimension;
        let thresholding_method = self.thresholding_method;
        let max_candidates = self.num_trees.min(SPLIT_CANDIDATES);

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        // One child seed per tree, so sequential and parallel builds produce
        // identical forests.
        let tree_seeds: Vec<u64> = (0..self.num_trees).map(|_| rng.gen()).collect();

        let build_tree = |seed: u64| -> KDTree {
            TreeBuilder {
                data,
                dimension,
                thresholding_method,
                max_candidates,
                candidates: BinaryHeap::with_capacity(max_candidates),
                rng: StdRng::seed_from_u64(seed),
                nodes: Vec::with_capacity(2 * num_points - 1),
                order: (0..num_points as u32).collect(),
                depth: 0,
            }
            .build()
        };

        #[cfg(feature = "rayon")]
        let mut trees: Vec<KDTree> = tree_seeds.into_par_iter().map(build_tree).collect();
        #[cfg(not(feature = "rayon"))]
        let mut trees: Vec<KDTree> = tree_seeds.into_iter().map(build_tree).collect();

        // Second pass: record per-node region bounds along each split
        // dimension, starting from an unbounded root region.
        let mut bounds = vec![0.0; 2 * dimension];
        for tree in &mut trees {
            for pair in bounds.chunks_exact_mut(2) {
                pair[0] = f64::NEG_INFINITY;
                pair[1] = f64::INFINITY;
            }
            compute_bounds(&mut tree.nodes, 0, &mut bounds);
        }

        let total_nodes = trees.iter().map(|tree| tree.nodes.len()).sum();

        Ok(KDForest {
            data,
            num_points,
            dimension,
            distance: self.distance,
            distance_fn: self.distance.bind::<T>(),
            thresholding_method,
            trees,
            total_nodes,
            max_comparisons: 0,
        })
    }
}

/// One of the highest-variance dimensions eligible to split a slice.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SplitCandidate {
    dimension: u32,
    mean: f64,
    variance: f64,
}

impl Eq for SplitCandidate {}

impl Ord for SplitCandidate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Variances are finite unless the data holds NaN, which is not
        // supported. This should only panic on NaN.
        self.variance.partial_cmp(&other.variance).unwrap()
    }
}

impl PartialOrd for SplitCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Scratch state for building one tree.
struct TreeBuilder<'a, T: VectorElement> {
    data: &'a [T],
    dimension: usize,
    thresholding_method: ThresholdingMethod,
    max_candidates: usize,
    /// Split-candidate scratch, reset by every `split` call before use.
    candidates: BinaryHeap<Reverse<SplitCandidate>>,
    rng: StdRng,
    nodes: Vec<Node>,
    order: Vec<u32>,
    depth: usize,
}

impl<'a, T: VectorElement> TreeBuilder<'a, T> {
    fn build(mut self) -> KDTree {
        let root = self.new_node();
        let num_points = self.order.len();
        self.split(root, 0, num_points, 0);
        debug_assert!(self.nodes.len() <= 2 * num_points - 1);
        KDTree {
            nodes: self.nodes,
            order: self.order,
            depth: self.depth,
        }
    }

    /// Allocate a node from the arena; `split` fills it in.
    fn new_node(&mut self) -> usize {
        let index = self.nodes.len();
        self.nodes.push(Node::Leaf { begin: 0, end: 0 });
        index
    }

    #[inline]
    fn coordinate(&self, point: u32, dim: usize) -> T {
        self.data[point as usize * self.dimension + dim]
    }

    /// Recursively partition the permutation slice `[begin, end)`.
    fn split(&mut self, node_index: usize, begin: usize, end: usize, depth: usize) {
        // base case: at most one point left
        if end - begin <= 1 {
            if self.depth < depth {
                self.depth = depth;
            }
            self.nodes[node_index] = Node::Leaf {
                begin: begin as u32,
                end: end as u32,
            };
            return;
        }

        // keep the highest-variance dimensions as split candidates; the
        // min-heap root is the weakest kept candidate
        let count = (end - begin) as f64;
        self.candidates.clear();
        for dim in 0..self.dimension {
            let mut mean = 0.0;
            let mut second_moment = 0.0;
            for &point in &self.order[begin..end] {
                let value = self.coordinate(point, dim).as_f64();
                mean += value;
                second_moment += value * value;
            }
            mean /= count;
            second_moment /= count;
            let variance = second_moment - mean * mean;
            if variance == 0.0 {
                continue;
            }

            let candidate = SplitCandidate {
                dimension: dim as u32,
                mean,
                variance,
            };
            if self.candidates.len() < self.max_candidates {
                self.candidates.push(Reverse(candidate));
            } else if let Some(mut weakest) = self.candidates.peek_mut() {
                if weakest.0.variance < variance {
                    *weakest = Reverse(candidate);
                }
            }
        }

        // every dimension is constant over the slice: the points coincide
        if self.candidates.is_empty() {
            self.nodes[node_index] = Node::Leaf {
                begin: begin as u32,
                end: end as u32,
            };
            return;
        }

        // the random choice among the top candidates is what decorrelates
        // the trees of a forest
        let pick = self.rng.gen_range(0..self.candidates.len());
        let chosen = self.candidates.iter().nth(pick).unwrap().0;
        let dim = chosen.dimension as usize;

        // sort the slice by the chosen coordinate
        let data = self.data;
        let dimension = self.dimension;
        self.order[begin..end].sort_unstable_by(|&a, &b| {
            let va = data[a as usize * dimension + dim];
            let vb = data[b as usize * dimension + dim];
            va.partial_cmp(&vb).unwrap()
        });

        let (threshold, split_index) = match self.thresholding_method {
            ThresholdingMethod::Median => self.median_split(begin, end, dim),
            ThresholdingMethod::Mean => {
                let threshold = chosen.mean;
                // first entry strictly above the mean
                let mut upper_start = begin;
                while upper_start < end
                    && self.coordinate(self.order[upper_start], dim).as_f64() <= threshold
                {
                    upper_start += 1;
                }
                if upper_start > begin && upper_start < end {
                    (threshold, upper_start - 1)
                } else {
                    // the mean landed outside the empirical range and one
                    // side would be empty; fall back to the median
                    self.median_split(begin, end, dim)
                }
            }
        };

        let lower = self.new_node();
        self.split(lower, begin, split_index + 1, depth + 1);
        let upper = self.new_node();
        self.split(upper, split_index + 1, end, depth + 1);

        self.nodes[node_index] = Node::Interior {
            lower: lower as u32,
            upper: upper as u32,
            split_dim: dim as u32,
            threshold,
            lower_bound: f64::NEG_INFINITY,
            upper_bound: f64::INFINITY,
        };
    }

    fn median_split(&self, begin: usize, end: usize, dim: usize) -> (f64, usize) {
        let median = (begin + end - 1) / 2;
        (self.coordinate(self.order[median], dim).as_f64(), median)
    }
}

/// Record, on every interior node, the sub-region bounds along its own split
/// dimension. `bounds` holds one (lower, upper) pair per dimension and is
/// narrowed on the way down and restored on the way back up.
fn compute_bounds(nodes: &mut [Node], node_index: usize, bounds: &mut [f64]) {
    let (lower, upper, dim, threshold) = match nodes[node_index] {
        Node::Leaf { .. } => return,
        Node::Interior {
            lower,
            upper,
            split_dim,
            threshold,
            ..
        } => (lower as usize, upper as usize, split_dim as usize, threshold),
    };

    let low = bounds[2 * dim];
    let high = bounds[2 * dim + 1];
    if let Node::Interior {
        lower_bound,
        upper_bound,
        ..
    } = &mut nodes[node_index]
    {
        *lower_bound = low;
        *upper_bound = high;
    }

    bounds[2 * dim + 1] = threshold;
    compute_bounds(nodes, lower, bounds);
    bounds[2 * dim + 1] = high;

    bounds[2 * dim] = threshold;
    compute_bounds(nodes, upper, bounds);
    bounds[2 * dim] = low;
}

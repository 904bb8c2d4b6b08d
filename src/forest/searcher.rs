use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::forest::index::KDForest;
use crate::forest::node::Node;
use crate::r#type::VectorElement;

/// A neighbor returned by [`Searcher::query`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Position of the neighbor in the indexed point set, or `None` for an
    /// unfilled result slot.
    pub index: Option<usize>,
    /// Distance to the query point under the forest's norm; NaN for an
    /// unfilled result slot.
    pub distance: f64,
}

impl Neighbor {
    /// Sentinel for result slots with no neighbor.
    pub const NONE: Neighbor = Neighbor {
        index: None,
        distance: f64::NAN,
    };
}

/// Counters describing the most recent query of a searcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Leaf-point distance evaluations.
    pub comparisons: usize,
    /// Tree nodes traversed.
    pub recursions: usize,
    /// Frontier regions discarded because they could not beat the kept
    /// neighbors.
    pub simplifications: usize,
}

/// A frontier entry: a not-yet-explored sub-region of one tree, keyed by a
/// lower bound on the distance from the query to any point it contains.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SearchState {
    tree: u32,
    node: u32,
    distance_lower_bound: f64,
}

impl Eq for SearchState {}

impl Ord for SearchState {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Lower bounds are never NaN. This should only panic on NaN.
        self.distance_lower_bound
            .partial_cmp(&other.distance_lower_bound)
            .unwrap()
    }
}

impl PartialOrd for SearchState {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// A result-heap entry; the heap root is the worst neighbor kept so far.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    index: usize,
    distance: f64,
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Distances are never NaN. This should only panic on NaN.
        self.distance.partial_cmp(&other.distance).unwrap()
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Query-time scratch bound to one forest.
///
/// A searcher owns everything a query mutates: the best-bin-first frontier,
/// the visited bookkeeping that deduplicates points across trees, and the
/// statistics counters. Searchers cannot outlive their forest, and any
/// number of them may query one forest concurrently, one per thread.
#[derive(Debug)]
pub struct Searcher<'f, T: VectorElement> {
    forest: &'f KDForest<'f, T>,
    frontier: BinaryHeap<Reverse<SearchState>>,
    results: BinaryHeap<Candidate>,
    /// Most recent query id that touched each point. Points shared between
    /// trees are compared at most once per query without clearing the array
    /// between queries.
    id_book: Vec<u64>,
    search_id: u64,
    stats: SearchStats,
}

impl<'f, T: VectorElement> Searcher<'f, T> {
    pub(crate) fn new(forest: &'f KDForest<'f, T>) -> Self {
        Self {
            forest,
            frontier: BinaryHeap::with_capacity(forest.total_nodes()),
            results: BinaryHeap::new(),
            id_book: vec![0; forest.num_points()],
            search_id: 0,
            stats: SearchStats::default(),
        }
    }

    /// The forest this searcher queries.
    pub fn forest(&self) -> &'f KDForest<'f, T> {
        self.forest
    }

    /// Counters of the most recent query.
    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    /// Find the `neighbors.len()` nearest neighbors of `point`.
    ///
    /// Fills `neighbors` sorted by ascending distance, padding with
    /// [`Neighbor::NONE`] when fewer neighbors exist, and returns the number
    /// of leaf-point distance comparisons performed. With an unbounded
    /// comparison budget the result is exact; with a budget set on the
    /// forest the search stops after that many comparisons.
    ///
    /// Panics if `point` does not match the forest dimension or if
    /// `neighbors` is empty.
    pub fn query(&mut self, point: &[T], neighbors: &mut [Neighbor]) -> usize {
        let forest = self.forest;
        assert_eq!(
            point.len(),
            forest.dimension(),
            "query vector has the wrong dimension"
        );
        assert!(
            !neighbors.is_empty(),
            "at least one neighbor must be requested"
        );
        let k = neighbors.len();

        self.search_id += 1;
        self.stats = SearchStats::default();
        self.results.clear();
        self.results.reserve(k);

        // seed the frontier with every tree root
        self.frontier.clear();
        for tree in 0..forest.num_trees() {
            self.frontier.push(Reverse(SearchState {
                tree: tree as u32,
                node: 0,
                distance_lower_bound: 0.0,
            }));
        }

        let budget = forest.max_comparisons();
        while budget == 0 || self.stats.comparisons < budget {
            let Some(Reverse(state)) = self.frontier.pop() else {
                break;
            };

            // no unexplored region can beat the worst kept neighbor
            if self.results.len() == k
                && self
                    .results
                    .peek()
                    .is_some_and(|worst| worst.distance < state.distance_lower_bound)
            {
                self.stats.simplifications += 1;
                break;
            }

            self.descend(
                state.tree as usize,
                state.node as usize,
                state.distance_lower_bound,
                point,
                k,
            );
        }

        for slot in &mut neighbors[self.results.len()..] {
            *slot = Neighbor::NONE;
        }
        let mut next = self.results.len();
        while let Some(candidate) = self.results.pop() {
            next -= 1;
            neighbors[next] = Neighbor {
                index: Some(candidate.index),
                distance: candidate.distance,
            };
        }

        self.stats.comparisons
    }

    /// Allocating convenience over [`Searcher::query`].
    pub fn nearest(&mut self, point: &[T], k: usize) -> Vec<Neighbor> {
        let mut neighbors = vec![Neighbor::NONE; k];
        self.query(point, &mut neighbors);
        neighbors
    }

    /// Follow one root-to-leaf path, pushing each unchosen sibling that
    /// could still contain a closer point onto the frontier.
    fn descend(
        &mut self,
        tree_index: usize,
        mut node_index: usize,
        dist: f64,
        point: &[T],
        k: usize,
    ) {
        let forest = self.forest;
        let tree = &forest.trees[tree_index];
        let budget = forest.max_comparisons();

        loop {
            self.stats.recursions += 1;
            match tree.nodes[node_index] {
                Node::Leaf { begin, end } => {
                    for &point_index in &tree.order[begin as usize..end as usize] {
                        if budget != 0 && self.stats.comparisons >= budget {
                            break;
                        }
                        let point_index = point_index as usize;
                        if self.id_book[point_index] == self.search_id {
                            continue;
                        }
                        self.id_book[point_index] = self.search_id;

                        let distance = (forest.distance_fn)(point, forest.point(point_index));
                        self.stats.comparisons += 1;

                        if self.results.len() < k {
                            self.results.push(Candidate {
                                index: point_index,
                                distance,
                            });
                        } else if let Some(mut worst) = self.results.peek_mut() {
                            if distance < worst.distance {
                                *worst = Candidate {
                                    index: point_index,
                                    distance,
                                };
                            }
                        }
                    }
                    return;
                }
                Node::Interior {
                    lower,
                    upper,
                    split_dim,
                    threshold,
                    lower_bound,
                    upper_bound,
                } => {
                    let q = point[split_dim as usize].as_f64();
                    let norm = forest.distance();
                    let mut save_dist = dist + norm.axis_gap(q - threshold);

                    let (next_child, sibling);
                    if q <= threshold {
                        next_child = lower;
                        sibling = upper;
                        // the query already sits below the region along this
                        // axis, so the sibling's axis contribution replaces
                        // the current one instead of adding to it
                        if q <= lower_bound {
                            save_dist -= norm.axis_gap(q - lower_bound);
                        }
                    } else {
                        next_child = upper;
                        sibling = lower;
                        if q > upper_bound {
                            save_dist -= norm.axis_gap(q - upper_bound);
                        }
                    }

                    if self.results.len() < k
                        || self
                            .results
                            .peek()
                            .is_some_and(|worst| worst.distance > save_dist)
                    {
                        self.frontier.push(Reverse(SearchState {
                            tree: tree_index as u32,
                            node: sibling,
                            distance_lower_bound: save_dist,
                        }));
                    }
                    node_index = next_child as usize;
                }
            }
        }
    }
}

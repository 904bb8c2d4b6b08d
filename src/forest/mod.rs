//! A forest of randomized KD-trees searched best-bin-first.
//!
//! ## Creation
//!
//! Use [`KDForestBuilder`] to configure and build a [`KDForest`] over a
//! borrowed, row-major slice of points. Each tree partitions the point set
//! independently, splitting along a dimension drawn at random from the
//! highest-variance candidates, which decorrelates the trees and improves
//! approximate search.
//!
//! ## Search
//!
//! Create one [`Searcher`] per querying thread with [`KDForest::searcher`]
//! and run k-nearest-neighbor queries with [`Searcher::query`] or
//! [`Searcher::nearest`]. Searches are exact by default; cap the number of
//! leaf-point comparisons with [`KDForest::set_max_comparisons`] to trade
//! accuracy for speed.
//!
//! ## Example
//!
//! ```
//! use kd_forest::{Distance, KDForestBuilder};
//!
//! // Four points in the plane, row-major.
//! let data: Vec<f64> = vec![
//!     0.0, 0.0, //
//!     1.0, 0.0, //
//!     0.0, 1.0, //
//!     2.0, 2.0, //
//! ];
//!
//! let forest = KDForestBuilder::new(2, 4)
//!     .distance(Distance::SquaredL2)
//!     .seed(42)
//!     .build(&data)
//!     .unwrap();
//!
//! let mut searcher = forest.searcher();
//! let neighbors = searcher.nearest(&[0.9, 0.1], 2);
//! assert_eq!(neighbors[0].index, Some(1));
//! assert_eq!(neighbors[1].index, Some(0));
//! ```

mod builder;
mod index;
mod node;
mod searcher;

pub use builder::{KDForestBuilder, ThresholdingMethod};
pub use index::KDForest;
pub use searcher::{Neighbor, SearchStats, Searcher};

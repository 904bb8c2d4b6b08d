pub mod distance;
pub mod error;
pub mod forest;
pub mod r#type;

pub use distance::Distance;
pub use error::{KDForestError, Result};
pub use forest::{KDForest, KDForestBuilder, Neighbor, SearchStats, Searcher, ThresholdingMethod};
pub use r#type::VectorElement;

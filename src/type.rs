use std::fmt::Debug;

use num_traits::Float;

/// Element type of indexed vectors.
///
/// Single- and double-precision floating point data are supported. Split
/// thresholds and region bounds are kept in `f64` regardless of the element
/// type, so implementations must provide an exact widening conversion.
pub trait VectorElement: Float + Debug + Send + Sync + 'static {
    /// Widen to `f64` without rounding.
    fn as_f64(self) -> f64;
}

impl VectorElement for f32 {
    #[inline]
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl VectorElement for f64 {
    #[inline]
    fn as_f64(self) -> f64 {
        self
    }
}

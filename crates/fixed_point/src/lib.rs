//! qlogit Fixed-Point Encoding
//!
//! Q8.8 fixed-point representation for the quantized logistic kernels.
//! Values are stored as `i16` with an implicit scale of 2^8 = 256, and
//! numeric vectors live in owning buffers aligned for 256-bit SIMD loads.

mod error;
mod fixed;
mod vector;

pub use error::{FixedPointError, Result};
pub use fixed::{
    clamp_to_q8_8_range, float_to_q8_8, float_to_q8_8_saturating, q8_8_to_float, Q8_8,
    FRAC_BITS, MAX_Q, MIN_Q, ROUND_FACTOR, SCALE_FACTOR,
};
pub use vector::{AlignedVec, Element, DEFAULT_ALIGNMENT};

//! Fixed-point error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FixedPointError {
    #[error("Invalid alignment: {align} (must be a power of two no smaller than the element alignment)")]
    InvalidAlignment { align: usize },

    #[error("Capacity overflow: {len} elements exceed the addressable size")]
    CapacityOverflow { len: usize },

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

pub type Result<T> = std::result::Result<T, FixedPointError>;

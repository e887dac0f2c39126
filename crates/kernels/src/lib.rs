//! qlogit Vector Kernels
//!
//! Dot products, bulk Q8.8 quantization, the sigmoid lookup table and the
//! SGD weight update for a single logistic unit.
//!
//! # Backends
//!
//! Every kernel has a portable scalar implementation and wide-vector
//! implementations behind the [`VectorKernels`] contract:
//!
//! | Backend | Target | f32 block | i16 block |
//! |---------|--------|-----------|-----------|
//! | `Avx2` | x86_64 with AVX2 + FMA | 16 | 32 |
//! | `Neon` | aarch64 | 8 | 16 |
//! | `Scalar` | any | 1 | 1 |
//!
//! Vector backends consume whole blocks and finish the remainder with the
//! scalar code, so results never depend on the length being a multiple of
//! the block size.
//!
//! # Fixed-point accumulation
//!
//! `dot_q8_8` multiplies Q8.8 lanes into 32-bit products and accumulates
//! with wrapping 32-bit adds. The result carries Q16.16 scale and must be
//! shifted right by 8 before it is read as Q8.8
//! (see [`SigmoidTable::lookup_q16_16`]).

mod backend;
mod scalar;
mod sigmoid;
mod update;

#[cfg(target_arch = "x86_64")]
mod avx2;
#[cfg(target_arch = "aarch64")]
mod neon;

pub use backend::{dot_f32, dot_q8_8, quantize_vector, scaled_add, SimdBackend, VectorKernels};
pub use scalar::Scalar;
pub use sigmoid::{sigmoid, SigmoidTable, DOMAIN_LIMIT, SIGMOID_TABLE_LEN, TABLE_OFFSET};
pub use update::{sgd_step, sgd_step_q8_8, Sgd, UpdateRule};

#[cfg(target_arch = "x86_64")]
pub use avx2::Avx2;
#[cfg(target_arch = "aarch64")]
pub use neon::Neon;

/// Paired slices must have equal length; vector loads rely on it.
#[inline]
#[track_caller]
pub(crate) fn check_len(a: usize, b: usize) {
    assert_eq!(a, b, "paired vectors must have equal length");
}

//! SIMD capability detection and kernel dispatch

use once_cell::sync::Lazy;

#[cfg(target_arch = "x86_64")]
use crate::avx2::Avx2;
#[cfg(target_arch = "aarch64")]
use crate::neon::Neon;
use crate::scalar::Scalar;

/// The common contract every backend implements.
///
/// All paired slices must have equal length; implementations panic
/// otherwise. Results of the float kernels may differ between backends by
/// reassociation rounding only. `dot_q8_8` and `quantize` are bit-exact
/// across backends.
pub trait VectorKernels {
    /// Sum of `w[i] * x[i]` in f32
    fn dot_f32(&self, w: &[f32], x: &[f32]) -> f32;

    /// Sum of Q8.8 products with Q16.16 scale, wrapping in 32 bits
    fn dot_q8_8(&self, w: &[i16], x: &[i16]) -> i32;

    /// Saturating bulk conversion of `src` into Q8.8 `dst`
    fn quantize(&self, src: &[f32], dst: &mut [i16]);

    /// `w[i] += coefficient * x[i]`
    fn scaled_add(&self, coefficient: f32, x: &[f32], w: &mut [f32]);
}

/// SIMD backend selected for the kernels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SimdBackend {
    /// AVX2 + FMA (256-bit)
    Avx2,
    /// ARM NEON (128-bit)
    Neon,
    /// Portable scalar code
    #[default]
    Scalar,
}

static DETECTED: Lazy<SimdBackend> = Lazy::new(|| {
    let backend = probe();
    tracing::debug!(%backend, "SIMD backend selected");
    backend
});

fn probe() -> SimdBackend {
    #[cfg(target_arch = "x86_64")]
    {
        if Avx2::new().is_some() {
            return SimdBackend::Avx2;
        }
    }

    #[cfg(target_arch = "aarch64")]
    {
        if Neon::new().is_some() {
            return SimdBackend::Neon;
        }
    }

    SimdBackend::Scalar
}

impl SimdBackend {
    /// Best backend supported by the running CPU (probed once per process)
    pub fn detect() -> Self {
        *DETECTED
    }

    /// Whether this backend can run on the current CPU
    pub fn is_available(self) -> bool {
        match self {
            #[cfg(target_arch = "x86_64")]
            SimdBackend::Avx2 => Avx2::new().is_some(),
            #[cfg(target_arch = "aarch64")]
            SimdBackend::Neon => Neon::new().is_some(),
            SimdBackend::Scalar => true,
            #[allow(unreachable_patterns)]
            _ => false,
        }
    }

    /// Every backend usable on this CPU, best first
    pub fn available() -> Vec<Self> {
        [SimdBackend::Avx2, SimdBackend::Neon, SimdBackend::Scalar]
            .into_iter()
            .filter(|b| b.is_available())
            .collect()
    }

    /// f32 elements consumed per vector-loop iteration
    pub fn lane_width_f32(self) -> usize {
        match self {
            SimdBackend::Avx2 => 16,
            SimdBackend::Neon => 8,
            SimdBackend::Scalar => 1,
        }
    }

    /// i16 elements consumed per vector-loop iteration
    pub fn lane_width_i16(self) -> usize {
        match self {
            SimdBackend::Avx2 => 32,
            SimdBackend::Neon => 16,
            SimdBackend::Scalar => 1,
        }
    }
}

impl std::fmt::Display for SimdBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimdBackend::Avx2 => write!(f, "AVX2"),
            SimdBackend::Neon => write!(f, "NEON"),
            SimdBackend::Scalar => write!(f, "Scalar"),
        }
    }
}

/// Run `$call` with `$k` bound to the concrete kernels for `$backend`,
/// falling back to scalar when the backend is not usable here.
macro_rules! dispatch {
    ($backend:expr, $k:ident => $call:expr) => {
        match $backend {
            #[cfg(target_arch = "x86_64")]
            SimdBackend::Avx2 => match Avx2::new() {
                Some($k) => $call,
                None => {
                    let $k = Scalar;
                    $call
                }
            },
            #[cfg(target_arch = "aarch64")]
            SimdBackend::Neon => match Neon::new() {
                Some($k) => $call,
                None => {
                    let $k = Scalar;
                    $call
                }
            },
            #[allow(unreachable_patterns)]
            _ => {
                let $k = Scalar;
                $call
            }
        }
    };
}

impl VectorKernels for SimdBackend {
    fn dot_f32(&self, w: &[f32], x: &[f32]) -> f32 {
        dispatch!(*self, k => k.dot_f32(w, x))
    }

    fn dot_q8_8(&self, w: &[i16], x: &[i16]) -> i32 {
        dispatch!(*self, k => k.dot_q8_8(w, x))
    }

    fn quantize(&self, src: &[f32], dst: &mut [i16]) {
        dispatch!(*self, k => k.quantize(src, dst))
    }

    fn scaled_add(&self, coefficient: f32, x: &[f32], w: &mut [f32]) {
        dispatch!(*self, k => k.scaled_add(coefficient, x, w))
    }
}

/// Float dot product on the detected backend
pub fn dot_f32(w: &[f32], x: &[f32]) -> f32 {
    SimdBackend::detect().dot_f32(w, x)
}

/// Q8.8 dot product (Q16.16 result) on the detected backend
pub fn dot_q8_8(w: &[i16], x: &[i16]) -> i32 {
    SimdBackend::detect().dot_q8_8(w, x)
}

/// Saturating bulk Q8.8 quantization on the detected backend.
///
/// Throughput is best when `src.len()` is a multiple of the backend's
/// `lane_width_f32`; other lengths are handled by the scalar tail.
pub fn quantize_vector(src: &[f32], dst: &mut [i16]) {
    SimdBackend::detect().quantize(src, dst)
}

/// `w[i] += coefficient * x[i]` on the detected backend
pub fn scaled_add(coefficient: f32, x: &[f32], w: &mut [f32]) {
    SimdBackend::detect().scaled_add(coefficient, x, w)
}

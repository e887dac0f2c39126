//! AVX2 + FMA kernels (x86_64)
//!
//! Each loop iteration works on two 256-bit registers: 16 floats or 32
//! Q8.8 values. Loads are unaligned so any slice is accepted; buffers from
//! `AlignedVec` simply never straddle a cache line per register.

use std::arch::x86_64::*;

use qlogit_fixed_point::{MAX_Q, MIN_Q, ROUND_FACTOR, SCALE_FACTOR};

use crate::backend::VectorKernels;
use crate::check_len;
use crate::scalar::{accumulate_f32, accumulate_q8_8, quantize_into, scaled_add_into};

const F32_BLOCK: usize = 16;
const I16_BLOCK: usize = 32;

/// AVX2 backend. Only obtainable through [`Avx2::new`], which checks the CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Avx2 {
    _detected: (),
}

impl Avx2 {
    /// Returns the backend if the running CPU supports AVX2 and FMA
    pub fn new() -> Option<Self> {
        if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
            Some(Self { _detected: () })
        } else {
            None
        }
    }
}

impl VectorKernels for Avx2 {
    fn dot_f32(&self, w: &[f32], x: &[f32]) -> f32 {
        check_len(w.len(), x.len());
        // SAFETY: Avx2 exists only after feature detection; lengths checked.
        unsafe { dot_f32_avx2(w, x) }
    }

    fn dot_q8_8(&self, w: &[i16], x: &[i16]) -> i32 {
        check_len(w.len(), x.len());
        // SAFETY: as above
        unsafe { dot_q8_8_avx2(w, x) }
    }

    fn quantize(&self, src: &[f32], dst: &mut [i16]) {
        check_len(src.len(), dst.len());
        // SAFETY: as above
        unsafe { quantize_avx2(src, dst) }
    }

    fn scaled_add(&self, coefficient: f32, x: &[f32], w: &mut [f32]) {
        check_len(x.len(), w.len());
        // SAFETY: as above
        unsafe { scaled_add_avx2(coefficient, x, w) }
    }
}

/// Horizontal sum of 8 f32 lanes
#[target_feature(enable = "avx2")]
#[inline]
unsafe fn hsum_ps_256(v: __m256) -> f32 {
    let lo = _mm256_castps256_ps128(v);
    let hi = _mm256_extractf128_ps(v, 1);
    let sum128 = _mm_add_ps(lo, hi);
    let sum64 = _mm_hadd_ps(sum128, sum128);
    let sum32 = _mm_hadd_ps(sum64, sum64);
    _mm_cvtss_f32(sum32)
}

/// Horizontal sum of 8 i32 lanes (wrapping)
#[target_feature(enable = "avx2")]
#[inline]
unsafe fn hsum_epi32_256(v: __m256i) -> i32 {
    let lo = _mm256_castsi256_si128(v);
    let hi = _mm256_extracti128_si256(v, 1);
    let sum128 = _mm_add_epi32(lo, hi);
    let sum64 = _mm_hadd_epi32(sum128, sum128);
    let sum32 = _mm_hadd_epi32(sum64, sum64);
    _mm_cvtsi128_si32(sum32)
}

#[target_feature(enable = "avx2,fma")]
unsafe fn dot_f32_avx2(w: &[f32], x: &[f32]) -> f32 {
    let n = w.len();
    let wp = w.as_ptr();
    let xp = x.as_ptr();

    let mut acc = _mm256_setzero_ps();
    let mut i = 0;
    while i + F32_BLOCK <= n {
        let w0 = _mm256_loadu_ps(wp.add(i));
        let x0 = _mm256_loadu_ps(xp.add(i));
        let w1 = _mm256_loadu_ps(wp.add(i + 8));
        let x1 = _mm256_loadu_ps(xp.add(i + 8));

        let prod = _mm256_fmadd_ps(w1, x1, _mm256_mul_ps(w0, x0));
        acc = _mm256_add_ps(acc, prod);
        i += F32_BLOCK;
    }

    accumulate_f32(hsum_ps_256(acc), &w[i..], &x[i..])
}

#[target_feature(enable = "avx2")]
unsafe fn dot_q8_8_avx2(w: &[i16], x: &[i16]) -> i32 {
    let n = w.len();
    let wp = w.as_ptr();
    let xp = x.as_ptr();

    let mut acc = _mm256_setzero_si256();
    let mut i = 0;
    while i + I16_BLOCK <= n {
        let w0 = _mm256_loadu_si256(wp.add(i).cast::<__m256i>());
        let x0 = _mm256_loadu_si256(xp.add(i).cast::<__m256i>());
        let w1 = _mm256_loadu_si256(wp.add(i + 16).cast::<__m256i>());
        let x1 = _mm256_loadu_si256(xp.add(i + 16).cast::<__m256i>());

        // i16 x i16 -> i32, adjacent pairs summed
        let p0 = _mm256_madd_epi16(w0, x0);
        let p1 = _mm256_madd_epi16(w1, x1);
        acc = _mm256_add_epi32(acc, _mm256_add_epi32(p0, p1));
        i += I16_BLOCK;
    }

    accumulate_q8_8(hsum_epi32_256(acc), &w[i..], &x[i..])
}

/// Clamp, scale and round 8 floats to Q8.8 integers held in i32 lanes.
///
/// Matches `float_to_q8_8_saturating`: min before max so NaN becomes MAX_Q,
/// a sign-carrying 0.5 bias, then truncation.
#[target_feature(enable = "avx2")]
#[inline]
unsafe fn q8_8_lanes(v: __m256) -> __m256i {
    let clamped = _mm256_max_ps(_mm256_min_ps(v, _mm256_set1_ps(MAX_Q)), _mm256_set1_ps(MIN_Q));
    let scaled = _mm256_mul_ps(clamped, _mm256_set1_ps(SCALE_FACTOR));
    let sign = _mm256_and_ps(scaled, _mm256_set1_ps(-0.0));
    let bias = _mm256_or_ps(_mm256_set1_ps(ROUND_FACTOR), sign);
    _mm256_cvttps_epi32(_mm256_add_ps(scaled, bias))
}

#[target_feature(enable = "avx2")]
unsafe fn quantize_avx2(src: &[f32], dst: &mut [i16]) {
    let n = src.len();
    let sp = src.as_ptr();
    let dp = dst.as_mut_ptr();

    let mut i = 0;
    while i + F32_BLOCK <= n {
        let a = q8_8_lanes(_mm256_loadu_ps(sp.add(i)));
        let b = q8_8_lanes(_mm256_loadu_ps(sp.add(i + 8)));

        // packs works per 128-bit half: [a0-3 b0-3 a4-7 b4-7]
        let packed = _mm256_packs_epi32(a, b);
        let ordered = _mm256_permute4x64_epi64(packed, 0b11_01_10_00);
        _mm256_storeu_si256(dp.add(i).cast::<__m256i>(), ordered);
        i += F32_BLOCK;
    }

    quantize_into(&src[i..], &mut dst[i..]);
}

#[target_feature(enable = "avx2,fma")]
unsafe fn scaled_add_avx2(coefficient: f32, x: &[f32], w: &mut [f32]) {
    let n = x.len();
    let xp = x.as_ptr();
    let wp = w.as_mut_ptr();
    let c = _mm256_set1_ps(coefficient);

    let mut i = 0;
    while i + F32_BLOCK <= n {
        let x0 = _mm256_loadu_ps(xp.add(i));
        let w0 = _mm256_loadu_ps(wp.add(i));
        let x1 = _mm256_loadu_ps(xp.add(i + 8));
        let w1 = _mm256_loadu_ps(wp.add(i + 8));

        _mm256_storeu_ps(wp.add(i), _mm256_fmadd_ps(c, x0, w0));
        _mm256_storeu_ps(wp.add(i + 8), _mm256_fmadd_ps(c, x1, w1));
        i += F32_BLOCK;
    }

    scaled_add_into(coefficient, &x[i..], &mut w[i..]);
}

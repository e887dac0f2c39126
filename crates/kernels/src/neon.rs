//! NEON kernels (aarch64)
//!
//! Two 128-bit registers per iteration: 8 floats or 16 Q8.8 values.

use std::arch::aarch64::*;

use qlogit_fixed_point::{MAX_Q, MIN_Q, ROUND_FACTOR, SCALE_FACTOR};

use crate::backend::VectorKernels;
use crate::check_len;
use crate::scalar::{accumulate_f32, accumulate_q8_8, quantize_into, scaled_add_into};

const F32_BLOCK: usize = 8;
const I16_BLOCK: usize = 16;

/// NEON backend. Only obtainable through [`Neon::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neon {
    _detected: (),
}

impl Neon {
    /// Returns the backend if the running CPU supports NEON
    pub fn new() -> Option<Self> {
        if std::arch::is_aarch64_feature_detected!("neon") {
            Some(Self { _detected: () })
        } else {
            None
        }
    }
}

impl VectorKernels for Neon {
    fn dot_f32(&self, w: &[f32], x: &[f32]) -> f32 {
        check_len(w.len(), x.len());
        // SAFETY: Neon exists only after feature detection; lengths checked.
        unsafe { dot_f32_neon(w, x) }
    }

    fn dot_q8_8(&self, w: &[i16], x: &[i16]) -> i32 {
        check_len(w.len(), x.len());
        // SAFETY: as above
        unsafe { dot_q8_8_neon(w, x) }
    }

    fn quantize(&self, src: &[f32], dst: &mut [i16]) {
        check_len(src.len(), dst.len());
        // SAFETY: as above
        unsafe { quantize_neon(src, dst) }
    }

    fn scaled_add(&self, coefficient: f32, x: &[f32], w: &mut [f32]) {
        check_len(x.len(), w.len());
        // SAFETY: as above
        unsafe { scaled_add_neon(coefficient, x, w) }
    }
}

#[target_feature(enable = "neon")]
unsafe fn dot_f32_neon(w: &[f32], x: &[f32]) -> f32 {
    let n = w.len();
    let wp = w.as_ptr();
    let xp = x.as_ptr();

    let mut acc0 = vdupq_n_f32(0.0);
    let mut acc1 = vdupq_n_f32(0.0);
    let mut i = 0;
    while i + F32_BLOCK <= n {
        acc0 = vfmaq_f32(acc0, vld1q_f32(wp.add(i)), vld1q_f32(xp.add(i)));
        acc1 = vfmaq_f32(acc1, vld1q_f32(wp.add(i + 4)), vld1q_f32(xp.add(i + 4)));
        i += F32_BLOCK;
    }

    let sum = vaddvq_f32(vaddq_f32(acc0, acc1));
    accumulate_f32(sum, &w[i..], &x[i..])
}

#[target_feature(enable = "neon")]
unsafe fn dot_q8_8_neon(w: &[i16], x: &[i16]) -> i32 {
    let n = w.len();
    let wp = w.as_ptr();
    let xp = x.as_ptr();

    let mut acc = vdupq_n_s32(0);
    let mut i = 0;
    while i + I16_BLOCK <= n {
        let w0 = vld1q_s16(wp.add(i));
        let x0 = vld1q_s16(xp.add(i));
        let w1 = vld1q_s16(wp.add(i + 8));
        let x1 = vld1q_s16(xp.add(i + 8));

        // Widening multiply-accumulate, i16 x i16 -> i32
        acc = vmlal_s16(acc, vget_low_s16(w0), vget_low_s16(x0));
        acc = vmlal_high_s16(acc, w0, x0);
        acc = vmlal_s16(acc, vget_low_s16(w1), vget_low_s16(x1));
        acc = vmlal_high_s16(acc, w1, x1);
        i += I16_BLOCK;
    }

    accumulate_q8_8(vaddvq_s32(acc), &w[i..], &x[i..])
}

/// Same rounding as `float_to_q8_8_saturating`; minNum/maxNum map NaN to MAX_Q.
#[target_feature(enable = "neon")]
#[inline]
unsafe fn q8_8_lanes(v: float32x4_t) -> int32x4_t {
    let clamped = vmaxnmq_f32(vminnmq_f32(v, vdupq_n_f32(MAX_Q)), vdupq_n_f32(MIN_Q));
    let scaled = vmulq_f32(clamped, vdupq_n_f32(SCALE_FACTOR));
    let sign = vandq_u32(vreinterpretq_u32_f32(scaled), vdupq_n_u32(0x8000_0000));
    let bias = vreinterpretq_f32_u32(vorrq_u32(
        vreinterpretq_u32_f32(vdupq_n_f32(ROUND_FACTOR)),
        sign,
    ));
    vcvtq_s32_f32(vaddq_f32(scaled, bias))
}

#[target_feature(enable = "neon")]
unsafe fn quantize_neon(src: &[f32], dst: &mut [i16]) {
    let n = src.len();
    let sp = src.as_ptr();
    let dp = dst.as_mut_ptr();

    let mut i = 0;
    while i + F32_BLOCK <= n {
        let a = q8_8_lanes(vld1q_f32(sp.add(i)));
        let b = q8_8_lanes(vld1q_f32(sp.add(i + 4)));
        vst1q_s16(dp.add(i), vcombine_s16(vqmovn_s32(a), vqmovn_s32(b)));
        i += F32_BLOCK;
    }

    quantize_into(&src[i..], &mut dst[i..]);
}

#[target_feature(enable = "neon")]
unsafe fn scaled_add_neon(coefficient: f32, x: &[f32], w: &mut [f32]) {
    let n = x.len();
    let xp = x.as_ptr();
    let wp = w.as_mut_ptr();
    let c = vdupq_n_f32(coefficient);

    let mut i = 0;
    while i + F32_BLOCK <= n {
        let w0 = vfmaq_f32(vld1q_f32(wp.add(i)), vld1q_f32(xp.add(i)), c);
        let w1 = vfmaq_f32(vld1q_f32(wp.add(i + 4)), vld1q_f32(xp.add(i + 4)), c);
        vst1q_f32(wp.add(i), w0);
        vst1q_f32(wp.add(i + 4), w1);
        i += F32_BLOCK;
    }

    scaled_add_into(coefficient, &x[i..], &mut w[i..]);
}

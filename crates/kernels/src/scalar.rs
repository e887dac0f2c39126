//! Portable scalar kernels
//!
//! These are the reference implementations. The vector backends reuse the
//! free functions here for their remainder tails.

use qlogit_fixed_point::float_to_q8_8_saturating;

use crate::backend::VectorKernels;
use crate::check_len;

/// Scalar fallback backend, available on every target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scalar;

impl VectorKernels for Scalar {
    fn dot_f32(&self, w: &[f32], x: &[f32]) -> f32 {
        check_len(w.len(), x.len());
        accumulate_f32(0.0, w, x)
    }

    fn dot_q8_8(&self, w: &[i16], x: &[i16]) -> i32 {
        check_len(w.len(), x.len());
        accumulate_q8_8(0, w, x)
    }

    fn quantize(&self, src: &[f32], dst: &mut [i16]) {
        check_len(src.len(), dst.len());
        quantize_into(src, dst);
    }

    fn scaled_add(&self, coefficient: f32, x: &[f32], w: &mut [f32]) {
        check_len(x.len(), w.len());
        scaled_add_into(coefficient, x, w);
    }
}

/// Continue a running float sum with `w[i] * x[i]`
#[inline]
pub(crate) fn accumulate_f32(init: f32, w: &[f32], x: &[f32]) -> f32 {
    let mut sum = init;
    for (&wi, &xi) in w.iter().zip(x) {
        sum += wi * xi;
    }
    sum
}

/// Continue a wrapping 32-bit sum of Q8.8 products
#[inline]
pub(crate) fn accumulate_q8_8(init: i32, w: &[i16], x: &[i16]) -> i32 {
    w.iter()
        .zip(x)
        .fold(init, |acc, (&a, &b)| acc.wrapping_add(i32::from(a) * i32::from(b)))
}

#[inline]
pub(crate) fn quantize_into(src: &[f32], dst: &mut [i16]) {
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = float_to_q8_8_saturating(s);
    }
}

#[inline]
pub(crate) fn scaled_add_into(coefficient: f32, x: &[f32], w: &mut [f32]) {
    for (wi, &xi) in w.iter_mut().zip(x) {
        *wi += coefficient * xi;
    }
}

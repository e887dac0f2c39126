//! Scalar float reference implementation
//!
//! Straight loops with no quantization and no vector kernels. Every error
//! figure the harness reports is measured against these functions.

use qlogit_kernels::sigmoid;

/// Plain f32 logistic unit for reference/verification
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarReference;

impl ScalarReference {
    /// Sum of `w[i] * x[i]`, accumulated left to right
    pub fn dot(w: &[f32], x: &[f32]) -> f32 {
        assert_eq!(w.len(), x.len(), "paired vectors must have equal length");
        let mut sum = 0.0f32;
        for (wi, xi) in w.iter().zip(x) {
            sum += wi * xi;
        }
        sum
    }

    /// `sigmoid(w . x)` with the exact logistic function
    pub fn predict(w: &[f32], x: &[f32]) -> f32 {
        sigmoid(Self::dot(w, x))
    }

    /// `w[i] += lr * (label - prediction) * x[i]`
    pub fn sgd_step(prediction: f32, label: f32, w: &mut [f32], x: &[f32], learning_rate: f32) {
        assert_eq!(w.len(), x.len(), "paired vectors must have equal length");
        let coefficient = learning_rate * (label - prediction);
        for (wi, xi) in w.iter_mut().zip(x) {
            *wi += coefficient * xi;
        }
    }
}

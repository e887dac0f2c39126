//! Single-example weight updates

use qlogit_fixed_point::Q8_8;

use crate::backend::{SimdBackend, VectorKernels};

/// One in-place gradient step: `w[i] += lr * (label - prediction) * x[i]`
pub fn sgd_step<K: VectorKernels + ?Sized>(
    kernels: &K,
    prediction: f32,
    label: f32,
    weights: &mut [f32],
    inputs: &[f32],
    learning_rate: f32,
) {
    let coefficient = learning_rate * (label - prediction);
    kernels.scaled_add(coefficient, inputs, weights);
}

/// [`sgd_step`] with a Q8.8 prediction, decoded before use
pub fn sgd_step_q8_8<K: VectorKernels + ?Sized>(
    kernels: &K,
    prediction: Q8_8,
    label: f32,
    weights: &mut [f32],
    inputs: &[f32],
    learning_rate: f32,
) {
    sgd_step(kernels, prediction.to_f32(), label, weights, inputs, learning_rate);
}

/// A weight update rule for a single logistic unit.
///
/// `Sgd` is the only rule provided. Momentum-style rules can be added as
/// further implementations carrying their own per-weight state.
pub trait UpdateRule {
    fn apply(&mut self, prediction: f32, label: f32, weights: &mut [f32], inputs: &[f32]);
}

/// Plain stochastic gradient descent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sgd {
    pub learning_rate: f32,
    pub backend: SimdBackend,
}

impl Sgd {
    pub fn new(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            backend: SimdBackend::detect(),
        }
    }
}

impl UpdateRule for Sgd {
    fn apply(&mut self, prediction: f32, label: f32, weights: &mut [f32], inputs: &[f32]) {
        sgd_step(&self.backend, prediction, label, weights, inputs, self.learning_rate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::Scalar;

    #[test]
    fn test_single_step_is_deterministic() {
        for backend in SimdBackend::available() {
            let mut weights = [0.0f32, 0.0];
            sgd_step(&backend, 0.0, 1.0, &mut weights, &[1.0, 1.0], 0.1);
            assert_eq!(weights, [0.1, 0.1], "{backend}");
        }
    }

    #[test]
    fn test_q8_8_prediction_is_decoded() {
        let mut a = [0.5f32; 20];
        let mut b = [0.5f32; 20];
        let inputs = [1.0f32; 20];
        sgd_step_q8_8(&Scalar, Q8_8(64), 1.0, &mut a, &inputs, 0.5);
        sgd_step(&Scalar, 0.25, 1.0, &mut b, &inputs, 0.5);
        assert_eq!(a, b);
        assert!(a.iter().all(|&w| (w - 0.875).abs() < 1e-6));
    }

    #[test]
    fn test_correct_prediction_leaves_weights() {
        let mut weights = [0.3f32, -0.2, 0.7];
        sgd_step(&SimdBackend::detect(), 1.0, 1.0, &mut weights, &[5.0, 5.0, 5.0], 0.1);
        assert_eq!(weights, [0.3, -0.2, 0.7]);
    }

    #[test]
    fn test_vector_and_scalar_steps_agree() {
        let inputs: Vec<f32> = (0..67).map(|i| ((i * 13) % 29) as f32 / 29.0 - 0.5).collect();
        let start: Vec<f32> = (0..67).map(|i| ((i * 7) % 31) as f32 / 31.0 - 0.5).collect();
        for backend in SimdBackend::available() {
            let mut vector = start.clone();
            let mut scalar = start.clone();
            sgd_step(&backend, 0.3, 1.0, &mut vector, &inputs, 0.01);
            sgd_step(&Scalar, 0.3, 1.0, &mut scalar, &inputs, 0.01);
            let mean_diff: f32 = vector
                .iter()
                .zip(&scalar)
                .map(|(a, b)| (a - b).abs())
                .sum::<f32>()
                / 67.0;
            assert!(mean_diff < 1e-6, "{backend}: {mean_diff}");
        }
    }

    #[test]
    fn test_update_rule_through_trait_object() {
        let mut rule: Box<dyn UpdateRule> = Box::new(Sgd::new(0.5));
        let mut weights = [1.0f32, 1.0];
        rule.apply(1.0, 0.0, &mut weights, &[1.0, -1.0]);
        assert_eq!(weights, [0.5, 1.5]);
    }
}

//! qlogit End-to-End Tests
//!
//! Cross-crate checks of the codec, kernels, sigmoid table, SGD step and the
//! logistic unit against the scalar float reference.

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use qlogit_fixed_point::{
    float_to_q8_8, float_to_q8_8_saturating, q8_8_to_float, AlignedVec, Q8_8, MAX_Q,
};
use qlogit_harness::ScalarReference;
use qlogit_kernels::{
    sgd_step, sgd_step_q8_8, sigmoid, Scalar, SigmoidTable, SimdBackend, VectorKernels,
};
use qlogit_model::{Activation, LogisticConfig, LogisticUnit};

fn uniform(rng: &mut ChaCha8Rng, n: usize) -> AlignedVec<f32> {
    let mut v = AlignedVec::<f32>::zeroed(n);
    for x in v.iter_mut() {
        *x = rng.gen_range(-1.0..=1.0);
    }
    v
}

fn quantized(backend: SimdBackend, src: &[f32]) -> AlignedVec<i16> {
    let mut dst = AlignedVec::<i16>::zeroed(src.len());
    backend.quantize(src, &mut dst);
    dst
}

// =============================================================================
// Section 1: Fixed-Point Codec
// =============================================================================

mod codec_tests {
    use super::*;

    /// Round-trip stays within one LSB across the representable range
    #[test]
    fn test_round_trip_bound() {
        let mut v = -128.0f32;
        while v <= 127.99 {
            let back = q8_8_to_float(float_to_q8_8(v));
            assert!((back - v).abs() <= 1.0 / 256.0 + 1e-6, "v={v} back={back}");
            v += 0.0137;
        }
    }

    /// Out-of-range values clamp to the boundary encodings
    #[test]
    fn test_saturation() {
        let top = float_to_q8_8_saturating(127.9940);
        let bottom = float_to_q8_8_saturating(-128.0);
        for backend in SimdBackend::available() {
            let src = [500.0f32, 128.0, 127.995, -128.01, -1e6, 0.0];
            let mut dst = [0i16; 6];
            backend.quantize(&src, &mut dst);
            assert_eq!(dst, [top, top, top, bottom, bottom, 0], "{backend}");
        }
    }

    /// NaN takes the same saturated value on every backend
    #[test]
    fn test_nan_is_deterministic() {
        let expected = float_to_q8_8(MAX_Q);
        let src = vec![f32::NAN; 37];
        for backend in SimdBackend::available() {
            let dst = quantized(backend, &src);
            assert!(dst.iter().all(|&q| q == expected), "{backend}");
        }
        assert_eq!(float_to_q8_8(f32::NAN), 0);
    }
}

// =============================================================================
// Section 2: Reduction Kernels
// =============================================================================

mod kernel_tests {
    use super::*;

    const LENGTHS: [usize; 6] = [1, 15, 16, 17, 32, 4096];

    /// Vectorized float dot agrees with the scalar reference within 1e-4 * n
    #[test]
    fn test_dot_f32_equivalence() {
        let mut rng = ChaCha8Rng::seed_from_u64(101);
        for n in LENGTHS {
            let w = uniform(&mut rng, n);
            let x = uniform(&mut rng, n);
            let reference = ScalarReference::dot(&w, &x);
            for backend in SimdBackend::available() {
                let got = backend.dot_f32(&w, &x);
                assert!(
                    (got - reference).abs() <= 1e-4 * n as f32,
                    "{backend} n={n}: {got} vs {reference}"
                );
            }
        }
    }

    /// Q8.8 dot equals the scalar integer multiply-accumulate exactly
    #[test]
    fn test_dot_q8_8_exactness() {
        let mut rng = ChaCha8Rng::seed_from_u64(103);
        for n in LENGTHS {
            let w = quantized(SimdBackend::Scalar, &uniform(&mut rng, n));
            let x = quantized(SimdBackend::Scalar, &uniform(&mut rng, n));
            let expected: i64 = w.iter().zip(x.iter()).map(|(&a, &b)| i64::from(a) * i64::from(b)).sum();
            for backend in SimdBackend::available() {
                assert_eq!(i64::from(backend.dot_q8_8(&w, &x)), expected, "{backend} n={n}");
            }
        }
    }

    /// Lengths off the lane width give the scalar result
    #[test]
    fn test_tail_correctness() {
        let mut rng = ChaCha8Rng::seed_from_u64(107);
        for backend in SimdBackend::available() {
            let width = backend.lane_width_f32().max(backend.lane_width_i16());
            for n in [width - 1, width + 1, 2 * width + 3, 3 * width + width / 2] {
                if n == 0 {
                    continue;
                }
                let w = uniform(&mut rng, n);
                let x = uniform(&mut rng, n);

                let got = backend.dot_f32(&w, &x);
                let reference = Scalar.dot_f32(&w, &x);
                assert!((got - reference).abs() <= 1e-4 * n as f32, "{backend} n={n}");

                let wq = quantized(backend, &w);
                let xq = quantized(backend, &x);
                assert_eq!(wq, quantized(SimdBackend::Scalar, &w), "{backend} n={n}");
                assert_eq!(backend.dot_q8_8(&wq, &xq), Scalar.dot_q8_8(&wq, &xq), "{backend} n={n}");
            }
        }
    }
}

// =============================================================================
// Section 3: Sigmoid Table
// =============================================================================

mod sigmoid_tests {
    use super::*;

    #[test]
    fn test_table_monotonicity() {
        let table = SigmoidTable::new();
        assert!(table.entries().windows(2).all(|p| p[0] <= p[1]));
    }

    /// A Q16.16 accumulator from the fixed dot lands on the right entry
    #[test]
    fn test_accumulator_lookup() {
        let table = SigmoidTable::new();
        let w = [Q8_8::from_f32(0.5).raw(); 4];
        let x = [Q8_8::from_f32(0.5).raw(); 4];
        // 4 * 0.25 = 1.0
        let acc = SimdBackend::detect().dot_q8_8(&w, &x);
        assert_eq!(acc, 1 << 16);
        assert_eq!(table.lookup_q16_16(acc), Q8_8::from_f32(sigmoid(1.0)));
    }
}

// =============================================================================
// Section 4: SGD Step
// =============================================================================

mod sgd_tests {
    use super::*;

    #[test]
    fn test_single_step_determinism() {
        for backend in SimdBackend::available() {
            let mut weights = [0.0f32, 0.0];
            sgd_step(&backend, 0.0, 1.0, &mut weights, &[1.0, 1.0], 0.1);
            assert_eq!(weights, [0.1, 0.1], "{backend}");
        }
    }

    /// Vector and scalar steps agree up to reassociation
    #[test]
    fn test_vector_matches_reference() {
        let mut rng = ChaCha8Rng::seed_from_u64(109);
        for n in [17usize, 64, 1000] {
            let x = uniform(&mut rng, n);
            let start = uniform(&mut rng, n);
            let prediction = Q8_8::from_f32(0.3);

            let mut reference = start.clone();
            ScalarReference::sgd_step(prediction.to_f32(), 1.0, &mut reference, &x, 0.01);

            for backend in SimdBackend::available() {
                let mut weights = start.clone();
                sgd_step_q8_8(&backend, prediction, 1.0, &mut weights, &x, 0.01);
                for (a, b) in weights.iter().zip(reference.iter()) {
                    assert!((a - b).abs() <= 1e-6, "{backend} n={n}");
                }
            }
        }
    }
}

// =============================================================================
// Section 5: Logistic Unit End-to-End
// =============================================================================

mod model_tests {
    use super::*;

    /// Fixed-point inference stays close to the scalar float reference
    #[test]
    fn test_end_to_end_error_bound() {
        let mut rng = ChaCha8Rng::seed_from_u64(113);
        let n = 32;
        let table = Arc::new(SigmoidTable::new());
        let config = LogisticConfig::new(n);

        let mut total_error = 0.0f64;
        let trials = 10_000;
        for _ in 0..trials {
            let w = uniform(&mut rng, n);
            let x = uniform(&mut rng, n);
            let mut unit = LogisticUnit::with_weights(&config, table.clone(), &w).unwrap();
            unit.set_inputs(&x).unwrap();

            let approx = unit.infer_fixed_to_float();
            let reference = ScalarReference::predict(&w, &x);
            total_error += f64::from((approx - reference).abs());
        }

        let mae = total_error / trials as f64;
        assert!(mae < 0.01, "mean absolute error {mae}");
    }

    /// Float paths: exact activation tracks the reference, table path is close
    #[test]
    fn test_float_inference_paths() {
        let mut rng = ChaCha8Rng::seed_from_u64(127);
        let table = Arc::new(SigmoidTable::new());
        let w = uniform(&mut rng, 100);
        let x = uniform(&mut rng, 100);
        let reference = ScalarReference::predict(&w, &x);

        let mut exact = LogisticUnit::with_weights(&LogisticConfig::new(100), table.clone(), &w).unwrap();
        exact.set_inputs(&x).unwrap();
        assert!((exact.infer_float() - reference).abs() < 1e-4);

        let config = LogisticConfig::new(100).with_activation(Activation::Table);
        let mut approx = LogisticUnit::with_weights(&config, table, &w).unwrap();
        approx.set_inputs(&x).unwrap();
        // saturation at |z| = 4 costs at most 1 - sigmoid(4) plus output rounding
        assert!((approx.infer_float() - reference).abs() < 0.025);
    }

    /// Training on linearly separable data classifies held-out points
    #[test]
    fn test_training_converges_on_separable_data() {
        let n = 16;
        let mut rng = ChaCha8Rng::seed_from_u64(131);
        let config = LogisticConfig::new(n).with_learning_rate(0.1).with_seed(7);
        let mut unit = LogisticUnit::new(&config, Arc::new(SigmoidTable::new())).unwrap();

        // label = 1 iff x[0] + x[1] > 0
        let sample = |rng: &mut ChaCha8Rng| {
            let x = uniform(rng, n);
            let label = if x[0] + x[1] > 0.0 { 1.0 } else { 0.0 };
            (x, label)
        };

        for _ in 0..4000 {
            let (x, label) = sample(&mut rng);
            unit.train_step(&x, label).unwrap();
        }
        assert!(unit.weights().is_synced());

        let mut correct = 0;
        let trials = 1000;
        for _ in 0..trials {
            let (x, label) = sample(&mut rng);
            unit.set_inputs(&x).unwrap();
            let p = unit.infer_fixed_to_float();
            if unit.classify(p) == (label == 1.0) {
                correct += 1;
            }
        }
        assert!(correct >= 850, "accuracy {correct}/{trials}");
    }
}

//! Inference and SGD benchmark runners
//!
//! Each runner draws fresh uniform `[-1, 1]` weights and inputs per
//! iteration, times `reps` back-to-back calls of every variant, and records
//! the error of the vectorized variants against [`ScalarReference`].
//! Warmup iterations run the same code but are not recorded.

use std::collections::BTreeMap;
use std::hint::black_box;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use qlogit_fixed_point::{AlignedVec, Q8_8};
use qlogit_kernels::{sgd_step_q8_8, SigmoidTable, SimdBackend, VectorKernels};

use crate::error::{HarnessError, Result};
use crate::reference::ScalarReference;
use crate::stats::{SampleStats, Speedup};

/// File name of the inference report inside `output_dir`
pub const INFERENCE_REPORT_FILE: &str = "Inference_Benchmark.json";

/// File name of the SGD report inside `output_dir`
pub const SGD_REPORT_FILE: &str = "SGD_Benchmark.json";

/// Benchmark configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Feature counts to benchmark
    pub feature_sizes: Vec<usize>,
    /// Recorded iterations per feature size
    pub iterations: usize,
    /// Calls per timed measurement
    pub reps: usize,
    /// Iterations excluded from results
    pub warmup: usize,
    /// Learning rate for the SGD runner
    pub learning_rate: f32,
    /// Seed for the input generator
    pub seed: u64,
    /// Directory the JSON reports are written to
    pub output_dir: PathBuf,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            feature_sizes: vec![32, 64],
            iterations: 100_000,
            reps: 100,
            warmup: 100,
            learning_rate: 0.001,
            seed: 0x5eed,
            output_dir: PathBuf::from("."),
        }
    }
}

impl BenchConfig {
    /// Defaults overridden by `QLOGIT_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(sizes) = std::env::var("QLOGIT_FEATURE_SIZES") {
            let parsed: std::result::Result<Vec<usize>, _> =
                sizes.split(',').map(|s| s.trim().parse()).collect();
            if let Ok(s) = parsed {
                config.feature_sizes = s;
            }
        }

        if let Ok(iterations) = std::env::var("QLOGIT_ITERATIONS") {
            if let Ok(i) = iterations.parse() {
                config.iterations = i;
            }
        }

        if let Ok(reps) = std::env::var("QLOGIT_REPS") {
            if let Ok(r) = reps.parse() {
                config.reps = r;
            }
        }

        if let Ok(warmup) = std::env::var("QLOGIT_WARMUP") {
            if let Ok(w) = warmup.parse() {
                config.warmup = w;
            }
        }

        if let Ok(lr) = std::env::var("QLOGIT_LEARNING_RATE") {
            if let Ok(l) = lr.parse() {
                config.learning_rate = l;
            }
        }

        if let Ok(seed) = std::env::var("QLOGIT_SEED") {
            if let Ok(s) = seed.parse() {
                config.seed = s;
            }
        }

        if let Ok(dir) = std::env::var("QLOGIT_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }

        config
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.feature_sizes.is_empty() || self.feature_sizes.contains(&0) {
            return Err(HarnessError::InvalidInput(
                "feature_sizes must be non-empty and positive".into(),
            ));
        }
        if self.iterations == 0 || self.reps == 0 {
            return Err(HarnessError::InvalidInput(format!(
                "iterations ({}) and reps ({}) must be positive",
                self.iterations, self.reps
            )));
        }
        if !self.learning_rate.is_finite() {
            return Err(HarnessError::InvalidInput(format!(
                "learning_rate ({}) must be finite",
                self.learning_rate
            )));
        }
        Ok(())
    }

    fn rng_for(&self, n: usize) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.seed ^ (n as u64).rotate_left(32))
    }
}

/// Latency (ns per call), error and speedup figures for one feature size
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceReport {
    pub feature_count: usize,
    pub backend: String,
    pub scalar_f32_latency_ns: SampleStats,
    pub vector_f32_latency_ns: SampleStats,
    pub vector_q8_8_latency_ns: SampleStats,
    /// |vector f32 + table sigmoid - scalar reference|
    pub vector_f32_error: SampleStats,
    /// |Q8.8 + table sigmoid - scalar reference|
    pub vector_q8_8_error: SampleStats,
    pub q8_8_vs_scalar: Speedup,
    pub f32_vs_scalar: Speedup,
    pub q8_8_vs_f32: Speedup,
}

/// Latency and weight drift of the vectorized SGD step for one feature size
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SgdReport {
    pub feature_count: usize,
    pub backend: String,
    pub scalar_f32_latency_ns: SampleStats,
    pub vector_f32_latency_ns: SampleStats,
    /// Mean |vector weight - scalar weight| after one step
    pub vector_f32_error: SampleStats,
    pub f32_vs_scalar: Speedup,
}

fn summarize(values: &[f64], what: &str) -> Result<SampleStats> {
    SampleStats::from_values(values)
        .ok_or_else(|| HarnessError::InvalidInput(format!("no samples recorded for {what}")))
}

fn fill_uniform(rng: &mut ChaCha8Rng, dst: &mut [f32]) {
    for v in dst.iter_mut() {
        *v = rng.gen_range(-1.0..=1.0);
    }
}

/// Nanoseconds per call of `f`, averaged over `reps` calls
fn time_per_call<F: FnMut()>(reps: usize, mut f: F) -> f64 {
    let start = Instant::now();
    for _ in 0..reps {
        f();
    }
    start.elapsed().as_nanos() as f64 / reps as f64
}

/// Benchmark the three inference paths on `n` features
pub fn run_inference_bench(n: usize, config: &BenchConfig) -> Result<InferenceReport> {
    config.validate()?;
    if n == 0 {
        return Err(HarnessError::InvalidInput("feature count must be positive".into()));
    }

    let backend = SimdBackend::detect();
    let table = SigmoidTable::new();
    let mut rng = config.rng_for(n);

    let mut weights = AlignedVec::<f32>::zeroed(n);
    let mut inputs = AlignedVec::<f32>::zeroed(n);
    let mut weights_q = AlignedVec::<i16>::zeroed(n);
    let mut inputs_q = AlignedVec::<i16>::zeroed(n);

    let mut scalar_latency = Vec::with_capacity(config.iterations);
    let mut f32_latency = Vec::with_capacity(config.iterations);
    let mut q8_8_latency = Vec::with_capacity(config.iterations);
    let mut f32_error = Vec::with_capacity(config.iterations);
    let mut q8_8_error = Vec::with_capacity(config.iterations);

    tracing::debug!(n, %backend, iterations = config.iterations, "Inference benchmark");

    for iteration in 0..config.warmup + config.iterations {
        fill_uniform(&mut rng, &mut weights);
        fill_uniform(&mut rng, &mut inputs);
        backend.quantize(&weights, &mut weights_q);
        backend.quantize(&inputs, &mut inputs_q);

        let scalar_ns = time_per_call(config.reps, || {
            black_box(ScalarReference::predict(black_box(&weights), black_box(&inputs)));
        });
        let f32_ns = time_per_call(config.reps, || {
            let z = backend.dot_f32(black_box(&weights), black_box(&inputs));
            black_box(table.lookup_f32(z));
        });
        let q8_8_ns = time_per_call(config.reps, || {
            let acc = backend.dot_q8_8(black_box(&weights_q), black_box(&inputs_q));
            black_box(table.lookup_q16_16(acc));
        });

        if iteration < config.warmup {
            continue;
        }

        let reference = ScalarReference::predict(&weights, &inputs);
        let f32_result = table.lookup_f32(backend.dot_f32(&weights, &inputs)).to_f32();
        let q8_8_result = table
            .lookup_q16_16(backend.dot_q8_8(&weights_q, &inputs_q))
            .to_f32();

        scalar_latency.push(scalar_ns);
        f32_latency.push(f32_ns);
        q8_8_latency.push(q8_8_ns);
        f32_error.push(f64::from((f32_result - reference).abs()));
        q8_8_error.push(f64::from((q8_8_result - reference).abs()));
    }

    let scalar_f32_latency_ns = summarize(&scalar_latency, "scalar f32 inference")?;
    let vector_f32_latency_ns = summarize(&f32_latency, "vector f32 inference")?;
    let vector_q8_8_latency_ns = summarize(&q8_8_latency, "vector Q8.8 inference")?;

    Ok(InferenceReport {
        feature_count: n,
        backend: backend.to_string(),
        q8_8_vs_scalar: Speedup::from_p95(&vector_q8_8_latency_ns, &scalar_f32_latency_ns),
        f32_vs_scalar: Speedup::from_p95(&vector_f32_latency_ns, &scalar_f32_latency_ns),
        q8_8_vs_f32: Speedup::from_p95(&vector_q8_8_latency_ns, &vector_f32_latency_ns),
        vector_f32_error: summarize(&f32_error, "vector f32 error")?,
        vector_q8_8_error: summarize(&q8_8_error, "vector Q8.8 error")?,
        scalar_f32_latency_ns,
        vector_f32_latency_ns,
        vector_q8_8_latency_ns,
    })
}

/// Benchmark the vectorized SGD step against the scalar one on `n` features.
///
/// The vectorized step receives the prediction as Q8.8, the scalar step as
/// f32, so the recorded drift includes prediction quantization.
pub fn run_sgd_bench(n: usize, config: &BenchConfig) -> Result<SgdReport> {
    config.validate()?;
    if n == 0 {
        return Err(HarnessError::InvalidInput("feature count must be positive".into()));
    }

    let backend = SimdBackend::detect();
    let lr = config.learning_rate;
    let mut rng = config.rng_for(n);

    let mut weights = AlignedVec::<f32>::zeroed(n);
    let mut inputs = AlignedVec::<f32>::zeroed(n);

    let mut scalar_latency = Vec::with_capacity(config.iterations);
    let mut vector_latency = Vec::with_capacity(config.iterations);
    let mut drift = Vec::with_capacity(config.iterations);

    tracing::debug!(n, %backend, iterations = config.iterations, "SGD benchmark");

    for iteration in 0..config.warmup + config.iterations {
        fill_uniform(&mut rng, &mut weights);
        fill_uniform(&mut rng, &mut inputs);
        let label: f32 = rng.gen_range(-1.0..=1.0);
        let prediction: f32 = rng.gen_range(-1.0..=1.0);
        let prediction_q = Q8_8::from_f32(prediction);

        let mut vector_weights = weights.clone();
        let mut scalar_weights = weights.clone();

        let vector_ns = time_per_call(config.reps, || {
            sgd_step_q8_8(&backend, prediction_q, label, &mut vector_weights, black_box(&inputs), lr);
        });
        let scalar_ns = time_per_call(config.reps, || {
            ScalarReference::sgd_step(prediction, label, &mut scalar_weights, black_box(&inputs), lr);
        });
        black_box((&vector_weights, &scalar_weights));

        if iteration < config.warmup {
            continue;
        }

        vector_weights.copy_from_slice(&weights)?;
        scalar_weights.copy_from_slice(&weights)?;
        sgd_step_q8_8(&backend, prediction_q, label, &mut vector_weights, &inputs, lr);
        ScalarReference::sgd_step(prediction, label, &mut scalar_weights, &inputs, lr);

        let sum_abs_diff: f32 = vector_weights
            .iter()
            .zip(scalar_weights.iter())
            .map(|(a, b)| (a - b).abs())
            .sum();

        vector_latency.push(vector_ns);
        scalar_latency.push(scalar_ns);
        drift.push(f64::from(sum_abs_diff / n as f32));
    }

    let scalar_f32_latency_ns = summarize(&scalar_latency, "scalar f32 SGD")?;
    let vector_f32_latency_ns = summarize(&vector_latency, "vector f32 SGD")?;

    Ok(SgdReport {
        feature_count: n,
        backend: backend.to_string(),
        f32_vs_scalar: Speedup::from_p95(&vector_f32_latency_ns, &scalar_f32_latency_ns),
        vector_f32_error: summarize(&drift, "vector f32 SGD drift")?,
        scalar_f32_latency_ns,
        vector_f32_latency_ns,
    })
}

/// Write `reports` as pretty JSON keyed by feature count
pub fn write_json_report<T: Serialize>(path: &Path, reports: &BTreeMap<usize, T>) -> Result<()> {
    let keyed: BTreeMap<String, &T> = reports.iter().map(|(n, r)| (n.to_string(), r)).collect();

    let mut writer = BufWriter::new(std::fs::File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, &keyed)?;
    writer.flush()?;

    tracing::info!(path = %path.display(), sizes = reports.len(), "Wrote benchmark report");
    Ok(())
}

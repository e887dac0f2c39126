//! Single logistic unit: inference and SGD update

use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use qlogit_fixed_point::{AlignedVec, Q8_8};
use qlogit_kernels::{sigmoid, Sgd, SigmoidTable, SimdBackend, UpdateRule, VectorKernels};

use crate::config::{Activation, LogisticConfig};
use crate::error::{ModelError, Result};
use crate::weights::Weights;

/// One logistic neuron over `feature_count` inputs.
///
/// Inputs are staged with [`set_inputs`](Self::set_inputs) into aligned
/// scratch buffers (float and Q8.8) before any inference or update call.
/// An instance owns all of its buffers; share it across threads only behind
/// external synchronization.
#[derive(Debug, Clone)]
pub struct LogisticUnit {
    feature_count: usize,
    threshold: f32,
    activation: Activation,
    table: Arc<SigmoidTable>,
    backend: SimdBackend,
    rule: Sgd,
    weights: Weights,
    inputs: AlignedVec<f32>,
    inputs_q8_8: AlignedVec<i16>,
}

impl LogisticUnit {
    /// Build a unit with Xavier-initialised weights
    pub fn new(config: &LogisticConfig, table: Arc<SigmoidTable>) -> Result<Self> {
        config.validate()?;

        let backend = SimdBackend::detect();
        let mut rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let weights = Weights::xavier(config.feature_count, config.alignment, &mut rng, &backend)?;

        tracing::debug!(
            features = config.feature_count,
            seed = ?config.seed,
            %backend,
            "Initialised logistic unit with Xavier weights"
        );

        Self::assemble(config, table, backend, weights)
    }

    /// Build a unit around caller-provided float weights
    pub fn with_weights(
        config: &LogisticConfig,
        table: Arc<SigmoidTable>,
        weights: &[f32],
    ) -> Result<Self> {
        config.validate()?;
        if weights.len() != config.feature_count {
            return Err(ModelError::DimensionMismatch {
                expected: config.feature_count,
                got: weights.len(),
            });
        }

        let backend = SimdBackend::detect();
        let weights = Weights::from_slice(weights, config.alignment, &backend)?;
        Self::assemble(config, table, backend, weights)
    }

    fn assemble(
        config: &LogisticConfig,
        table: Arc<SigmoidTable>,
        backend: SimdBackend,
        weights: Weights,
    ) -> Result<Self> {
        Ok(Self {
            feature_count: config.feature_count,
            threshold: config.threshold,
            activation: config.activation,
            table,
            backend,
            rule: Sgd {
                learning_rate: config.learning_rate,
                backend,
            },
            weights,
            inputs: AlignedVec::with_alignment(config.alignment, config.feature_count)?,
            inputs_q8_8: AlignedVec::with_alignment(config.alignment, config.feature_count)?,
        })
    }

    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    pub fn learning_rate(&self) -> f32 {
        self.rule.learning_rate
    }

    pub fn set_learning_rate(&mut self, learning_rate: f32) {
        self.rule.learning_rate = learning_rate;
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold;
    }

    /// Backend the kernels dispatch to
    pub fn backend(&self) -> SimdBackend {
        self.backend
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    /// The staged float inputs
    pub fn inputs(&self) -> &[f32] {
        &self.inputs
    }

    /// Copy `x` into the scratch buffers and quantize it
    pub fn set_inputs(&mut self, x: &[f32]) -> Result<()> {
        if x.len() != self.feature_count {
            return Err(ModelError::DimensionMismatch {
                expected: self.feature_count,
                got: x.len(),
            });
        }
        self.inputs.copy_from_slice(x)?;
        self.backend.quantize(&self.inputs, &mut self.inputs_q8_8);
        Ok(())
    }

    /// Probability from the float weights, using the configured activation
    pub fn infer_float(&self) -> f32 {
        let z = self.backend.dot_f32(self.weights.float(), &self.inputs);
        match self.activation {
            Activation::Exact => sigmoid(z),
            Activation::Table => self.table.lookup_f32(z).to_f32(),
        }
    }

    /// Vectorized float dot product followed by the sigmoid table
    pub fn infer_float_approx(&self) -> f32 {
        let z = self.backend.dot_f32(self.weights.float(), &self.inputs);
        self.table.lookup_f32(z).to_f32()
    }

    /// Q8.8 dot product followed by the sigmoid table.
    ///
    /// A stale weight mirror is re-quantized first.
    pub fn infer_fixed(&mut self) -> Q8_8 {
        let (_, fixed) = self.weights.synced_views(&self.backend);
        let acc = self.backend.dot_q8_8(fixed, &self.inputs_q8_8);
        self.table.lookup_q16_16(acc)
    }

    /// [`infer_fixed`](Self::infer_fixed), decoded
    pub fn infer_fixed_to_float(&mut self) -> f32 {
        self.infer_fixed().to_f32()
    }

    /// Whether `probability` reaches the decision threshold
    pub fn classify(&self, probability: f32) -> bool {
        probability >= self.threshold
    }

    /// One SGD step on the float weights with the staged inputs, then
    /// re-quantize the mirror
    pub fn update_weights(&mut self, prediction: f32, label: f32) {
        let rule = &mut self.rule;
        let inputs = &self.inputs;
        self.weights
            .update_with(&self.backend, |w| rule.apply(prediction, label, w, inputs));
    }

    /// Stage `x`, predict on the fixed-point path, update towards `label`.
    ///
    /// Returns the decoded prediction made before the update.
    pub fn train_step(&mut self, x: &[f32], label: f32) -> Result<f32> {
        self.set_inputs(x)?;
        let prediction = self.infer_fixed_to_float();
        self.update_weights(prediction, label);
        Ok(prediction)
    }
}

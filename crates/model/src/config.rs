//! Logistic unit configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use qlogit_fixed_point::DEFAULT_ALIGNMENT;

use crate::error::{ModelError, Result};

/// Activation used by [`LogisticUnit::infer_float`](crate::LogisticUnit::infer_float)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    /// `1 / (1 + e^-x)` evaluated in f32
    #[default]
    Exact,
    /// Saturating Q8.8 quantize, then the sigmoid table
    Table,
}

/// Logistic unit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticConfig {
    /// Number of input features (weight vector length)
    pub feature_count: usize,

    /// SGD learning rate
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,

    /// Decision threshold applied to the predicted probability
    #[serde(default = "default_threshold")]
    pub threshold: f32,

    /// Byte alignment of weight and scratch buffers
    #[serde(default = "default_alignment")]
    pub alignment: usize,

    /// Activation for float inference
    #[serde(default)]
    pub activation: Activation,

    /// Seed for weight initialisation; drawn from entropy when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_learning_rate() -> f32 { 0.001 }
fn default_threshold() -> f32 { 0.5 }
fn default_alignment() -> usize { DEFAULT_ALIGNMENT }

impl LogisticConfig {
    /// Config with default hyperparameters for `feature_count` inputs
    pub fn new(feature_count: usize) -> Self {
        Self {
            feature_count,
            learning_rate: default_learning_rate(),
            threshold: default_threshold(),
            alignment: default_alignment(),
            activation: Activation::default(),
            seed: None,
        }
    }

    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Load config from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.feature_count == 0 {
            return Err(ModelError::Config("feature_count must be positive".into()));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(ModelError::Config(format!(
                "learning_rate ({}) must be finite and positive",
                self.learning_rate
            )));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ModelError::Config(format!(
                "threshold ({}) must lie in [0, 1]",
                self.threshold
            )));
        }
        if !self.alignment.is_power_of_two() || self.alignment < DEFAULT_ALIGNMENT {
            return Err(ModelError::Config(format!(
                "alignment ({}) must be a power of two no smaller than {}",
                self.alignment, DEFAULT_ALIGNMENT
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = LogisticConfig::new(64);
        assert_eq!(config.feature_count, 64);
        assert_eq!(config.learning_rate, 0.001);
        assert_eq!(config.threshold, 0.5);
        assert_eq!(config.alignment, 32);
        assert_eq!(config.activation, Activation::Exact);
        config.validate().unwrap();
    }

    #[test]
    fn test_json_defaults() {
        let config: LogisticConfig =
            serde_json::from_str(r#"{ "feature_count": 16, "activation": "table" }"#).unwrap();
        assert_eq!(config.feature_count, 16);
        assert_eq!(config.activation, Activation::Table);
        assert_eq!(config.learning_rate, 0.001);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "feature_count": 8, "learning_rate": 0.05, "threshold": 0.7, "seed": 42 }}"#
        )
        .unwrap();

        let config = LogisticConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.feature_count, 8);
        assert_eq!(config.learning_rate, 0.05);
        assert_eq!(config.threshold, 0.7);
        assert_eq!(config.seed, Some(42));
    }

    #[test]
    fn test_from_missing_file() {
        assert!(matches!(
            LogisticConfig::from_json_file("/nonexistent/qlogit.json"),
            Err(ModelError::Io(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(LogisticConfig::new(0).validate().is_err());
        assert!(LogisticConfig::new(4).with_learning_rate(0.0).validate().is_err());
        assert!(LogisticConfig::new(4).with_learning_rate(f32::NAN).validate().is_err());
        assert!(LogisticConfig::new(4).with_threshold(1.5).validate().is_err());

        let mut config = LogisticConfig::new(4);
        config.alignment = 48;
        assert!(matches!(config.validate(), Err(ModelError::Config(_))));
        config.alignment = 16;
        assert!(config.validate().is_err());
        config.alignment = 64;
        config.validate().unwrap();
    }
}

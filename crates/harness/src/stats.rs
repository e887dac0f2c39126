//! Summary statistics for latency and error samples

use serde::{Deserialize, Serialize};

/// Statistical summary of a sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleStats {
    pub count: usize,
    pub mean: f64,
    /// `sorted[len / 2]`
    pub median: f64,
    pub p95: f64,
    pub p99: f64,
    pub min: f64,
    pub max: f64,
}

impl SampleStats {
    /// Summarise `values`; `None` when there are none
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let mean = sorted.iter().sum::<f64>() / sorted.len() as f64;

        Some(Self {
            count: sorted.len(),
            mean,
            median: sorted[sorted.len() / 2],
            p95: percentile(&sorted, 0.95),
            p99: percentile(&sorted, 0.99),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
        })
    }
}

/// `sorted[floor(len * p)]`, clamped to the last element
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let idx = (sorted.len() as f64 * p) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// p95 latency of a candidate relative to a baseline, rounded to two decimals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speedup {
    /// Candidate is this many times faster
    Speedup(f64),
    /// Candidate is this many times slower
    Slowdown(f64),
}

impl Speedup {
    pub fn from_p95(candidate: &SampleStats, baseline: &SampleStats) -> Self {
        let ratio = baseline.p95 / candidate.p95;
        if ratio < 1.0 {
            Speedup::Slowdown(round2(1.0 / ratio))
        } else {
            Speedup::Speedup(round2(ratio))
        }
    }

    /// The ratio as a speedup factor (below 1 for a slowdown)
    pub fn factor(self) -> f64 {
        match self {
            Speedup::Speedup(x) => x,
            Speedup::Slowdown(x) => 1.0 / x,
        }
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

impl std::fmt::Display for Speedup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Speedup::Speedup(x) => write!(f, "{x:.2}x speedup"),
            Speedup::Slowdown(x) => write!(f, "{x:.2}x slowdown"),
        }
    }
}

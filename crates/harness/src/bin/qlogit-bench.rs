//! qlogit Benchmark CLI
//!
//! Times scalar, vectorized f32 and Q8.8 inference and SGD for each feature
//! size and writes `Inference_Benchmark.json` / `SGD_Benchmark.json`.
//!
//! # Usage
//!
//! ```bash
//! # Both benchmarks with defaults (or QLOGIT_* environment overrides)
//! qlogit-bench all
//!
//! # Inference only, larger vectors, fewer iterations
//! qlogit-bench inference --sizes 1024,4096 --iterations 10000
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use qlogit_harness::{
    run_inference_bench, run_sgd_bench, write_json_report, BenchConfig, INFERENCE_REPORT_FILE,
    SGD_REPORT_FILE,
};

#[derive(Parser)]
#[command(name = "qlogit-bench")]
#[command(version)]
#[command(about = "Benchmark Q8.8 and f32 logistic kernels against scalar code")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Benchmark the three inference paths
    Inference(BenchArgs),

    /// Benchmark the SGD weight update
    Sgd(BenchArgs),

    /// Run both benchmarks
    All(BenchArgs),
}

#[derive(Args)]
struct BenchArgs {
    /// Comma-separated feature counts
    #[arg(short, long, value_delimiter = ',')]
    sizes: Option<Vec<usize>>,

    /// Recorded iterations per feature count
    #[arg(short, long)]
    iterations: Option<usize>,

    /// Calls per timed measurement
    #[arg(short, long)]
    reps: Option<usize>,

    /// Unrecorded warmup iterations
    #[arg(short, long)]
    warmup: Option<usize>,

    /// Learning rate for the SGD benchmark
    #[arg(long)]
    learning_rate: Option<f32>,

    /// Input generator seed
    #[arg(long)]
    seed: Option<u64>,

    /// Directory for the JSON reports
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

impl BenchArgs {
    fn apply(self, mut config: BenchConfig) -> BenchConfig {
        if let Some(sizes) = self.sizes {
            config.feature_sizes = sizes;
        }
        if let Some(iterations) = self.iterations {
            config.iterations = iterations;
        }
        if let Some(reps) = self.reps {
            config.reps = reps;
        }
        if let Some(warmup) = self.warmup {
            config.warmup = warmup;
        }
        if let Some(lr) = self.learning_rate {
            config.learning_rate = lr;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        config
    }
}

fn inference(config: &BenchConfig) -> Result<()> {
    let mut reports = BTreeMap::new();
    for &n in &config.feature_sizes {
        let report = run_inference_bench(n, config)?;
        tracing::info!(
            n,
            backend = %report.backend,
            scalar_p95_ns = report.scalar_f32_latency_ns.p95,
            f32_p95_ns = report.vector_f32_latency_ns.p95,
            q8_8_p95_ns = report.vector_q8_8_latency_ns.p95,
            q8_8_mean_error = report.vector_q8_8_error.mean,
            "Q8.8 vs scalar: {}",
            report.q8_8_vs_scalar
        );
        reports.insert(n, report);
    }
    write_json_report(&config.output_dir.join(INFERENCE_REPORT_FILE), &reports)?;
    Ok(())
}

fn sgd(config: &BenchConfig) -> Result<()> {
    let mut reports = BTreeMap::new();
    for &n in &config.feature_sizes {
        let report = run_sgd_bench(n, config)?;
        tracing::info!(
            n,
            backend = %report.backend,
            scalar_p95_ns = report.scalar_f32_latency_ns.p95,
            vector_p95_ns = report.vector_f32_latency_ns.p95,
            mean_drift = report.vector_f32_error.mean,
            "Vector SGD vs scalar: {}",
            report.f32_vs_scalar
        );
        reports.insert(n, report);
    }
    write_json_report(&config.output_dir.join(SGD_REPORT_FILE), &reports)?;
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qlogit_harness=info,qlogit_bench=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let (args, run_inference, run_sgd) = match cli.command {
        Commands::Inference(args) => (args, true, false),
        Commands::Sgd(args) => (args, false, true),
        Commands::All(args) => (args, true, true),
    };

    let config = args.apply(BenchConfig::from_env());
    config.validate()?;
    std::fs::create_dir_all(&config.output_dir)?;

    tracing::info!("qlogit-bench v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        sizes = ?config.feature_sizes,
        iterations = config.iterations,
        reps = config.reps,
        "Output directory: {:?}",
        config.output_dir
    );

    if run_sgd {
        sgd(&config)?;
    }
    if run_inference {
        inference(&config)?;
    }

    Ok(())
}

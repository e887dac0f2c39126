//! qlogit Test Harness
//!
//! Scalar-float reference implementation, sample statistics and the
//! inference/SGD benchmark runners used to compare the vectorized float and
//! Q8.8 paths against plain scalar code.

mod bench;
mod error;
mod reference;
mod stats;

pub use bench::{
    run_inference_bench, run_sgd_bench, write_json_report, BenchConfig, InferenceReport,
    SgdReport, INFERENCE_REPORT_FILE, SGD_REPORT_FILE,
};
pub use error::{HarnessError, Result};
pub use reference::ScalarReference;
pub use stats::{SampleStats, Speedup};

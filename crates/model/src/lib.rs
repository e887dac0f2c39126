//! qlogit Model
//!
//! A single logistic unit: float weights with a Q8.8 mirror, scratch input
//! buffers, and inference in three numeric domains (exact float, vectorized
//! float with table sigmoid, Q8.8 fixed point) followed by an SGD update.

mod config;
mod error;
mod logistic;
mod weights;

pub use config::{Activation, LogisticConfig};
pub use error::{ModelError, Result};
pub use logistic::LogisticUnit;
pub use weights::{xavier_limit, Weights};

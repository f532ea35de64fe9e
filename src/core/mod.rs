

pub mod config;
pub mod error;

pub use config::EstimatorConfig;
pub use error::{EstimatorError, GenerationFailure, GenerationStage, Result};

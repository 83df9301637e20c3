//! `engine` crate — batch models and the batch runner.

pub mod models;
pub mod error;
pub mod executor;

pub use models::{BatchOutcome, FailurePolicy, OutputItem};
pub use error::EngineError;
pub use executor::{BatchConfig, BatchRunner};

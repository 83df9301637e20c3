//! Node-level error type.

use thiserror::Error;

/// Errors returned by a node's `execute` method.
///
/// Every variant terminates processing of the current item only. The batch
/// runner decides whether that failure aborts the run or is recorded as the
/// item's result.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NodeError {
    /// The video source answered with a non-2xx status, or the transfer broke.
    #[error("Failed to download video: {0}")]
    Download(String),

    /// Declared (`content-length`) or actual size is over the configured cap.
    #[error("Video size ({actual_mb:.2} MB) exceeds maximum allowed size ({limit_mb} MB)")]
    SizeLimitExceeded { actual_mb: f64, limit_mb: f64 },

    /// The generation endpoint failed or rejected the request.
    #[error("{0}")]
    Generation(String),

    /// A required parameter is missing or invalid.
    #[error("invalid parameter '{name}': {message}")]
    Config { name: String, message: String },
}

impl NodeError {
    pub(crate) fn config(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            name: name.into(),
            message: message.into(),
        }
    }
}

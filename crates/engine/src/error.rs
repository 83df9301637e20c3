//! Engine-level error types.

use thiserror::Error;

use nodes::NodeError;

/// Errors produced by a batch run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An item failed under the fail-fast policy; the run was aborted.
    #[error("item {index} failed: {source}")]
    ItemFailed { index: usize, source: NodeError },
}

impl EngineError {
    /// Index of the input item that caused the error.
    pub fn item_index(&self) -> usize {
        match self {
            Self::ItemFailed { index, .. } => *index,
        }
    }
}

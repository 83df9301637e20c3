//! Data models for a batch run.
//!
//! Every type here is request-scoped: nothing outlives the `run` call that
//! produced it.

use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use nodes::NodeError;

// ---------------------------------------------------------------------------
// FailurePolicy
// ---------------------------------------------------------------------------

/// What a failing item does to the rest of the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// The first failure aborts the run and is returned as an error.
    #[default]
    FailFast,
    /// A failure becomes `{ "error": message }` at the item's position.
    ContinueOnFailure,
}

// ---------------------------------------------------------------------------
// OutputItem
// ---------------------------------------------------------------------------

/// One entry of the output sequence, tied back to its input by index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputItem {
    pub json: Value,
    #[serde(rename = "pairedItem")]
    pub paired_item: usize,
}

impl OutputItem {
    pub fn success(index: usize, json: Value) -> Self {
        Self {
            json,
            paired_item: index,
        }
    }

    pub fn failure(index: usize, err: &NodeError) -> Self {
        Self {
            json: json!({ "error": err.to_string() }),
            paired_item: index,
        }
    }

    /// Message of a failed item, `None` for a success.
    pub fn error(&self) -> Option<&str> {
        self.json.get("error").and_then(Value::as_str)
    }
}

// ---------------------------------------------------------------------------
// BatchOutcome
// ---------------------------------------------------------------------------

/// Result of a batch run that was not aborted by a fail-fast error.
#[derive(Debug)]
pub struct BatchOutcome {
    pub execution_id: Uuid,
    /// One entry per processed item, in input order.
    pub items: Vec<OutputItem>,
    /// The run stopped early on a cancellation signal; `items` holds the
    /// results completed before it.
    pub cancelled: bool,
}

//! Batch execution engine.
//!
//! `BatchRunner` is the central orchestrator:
//! 1. Iterates input items strictly in order, one at a time.
//! 2. Dispatches each item via `ExecutableNode`.
//! 3. Places each result at its item's index (`pairedItem`).
//! 4. Applies the `FailurePolicy`: abort on the first failure, or record the
//!    failure as that item's result and carry on.
//! 5. Checks the cancellation token before starting each item.

use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn, Span};
use uuid::Uuid;

use nodes::{ExecutableNode, ExecutionContext};

use crate::models::{BatchOutcome, FailurePolicy, OutputItem};
use crate::EngineError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tuning knobs for the runner.
#[derive(Debug, Clone, Default)]
pub struct BatchConfig {
    /// Chosen by the caller's execution context.
    pub failure_policy: FailurePolicy,
}

// ---------------------------------------------------------------------------
// BatchRunner
// ---------------------------------------------------------------------------

/// Runs one node over a sequence of items.
///
/// The node (and whatever client it holds) is built once by the caller and
/// shared by every item of the run.
pub struct BatchRunner {
    node: Arc<dyn ExecutableNode>,
    config: BatchConfig,
}

impl BatchRunner {
    pub fn new(node: Arc<dyn ExecutableNode>, config: BatchConfig) -> Self {
        Self { node, config }
    }

    /// Process `items` and return one output per processed item.
    ///
    /// # Errors
    /// [`EngineError::ItemFailed`] for the first failing item when the policy
    /// is [`FailurePolicy::FailFast`]. Items after it are never started.
    #[instrument(skip_all, fields(items = items.len(), execution_id = tracing::field::Empty))]
    pub async fn run(
        &self,
        items: Vec<Value>,
        cancel: &CancellationToken,
    ) -> Result<BatchOutcome, EngineError> {
        let execution_id = Uuid::new_v4();
        Span::current().record("execution_id", tracing::field::display(execution_id));

        let total = items.len();
        let mut output = Vec::with_capacity(total);

        for (index, input) in items.into_iter().enumerate() {
            if cancel.is_cancelled() {
                warn!("batch cancelled before item {index}; {} of {total} items completed", output.len());
                return Ok(BatchOutcome {
                    execution_id,
                    items: output,
                    cancelled: true,
                });
            }

            let ctx = ExecutionContext {
                execution_id,
                item_index: index,
            };

            match self.node.execute(input, &ctx).await {
                Ok(json) => {
                    info!("item {index} succeeded");
                    output.push(OutputItem::success(index, json));
                }

                Err(err) => match self.config.failure_policy {
                    FailurePolicy::ContinueOnFailure => {
                        warn!("item {index} failed, continuing: {err}");
                        output.push(OutputItem::failure(index, &err));
                    }
                    FailurePolicy::FailFast => {
                        error!("item {index} failed, aborting batch: {err}");
                        return Err(EngineError::ItemFailed { index, source: err });
                    }
                },
            }
        }

        info!("batch {execution_id} finished: {total} items");

        Ok(BatchOutcome {
            execution_id,
            items: output,
            cancelled: false,
        })
    }
}

//! `MockGenerator` — a test double for `ContentGenerator`.
//!
//! Useful in unit and integration tests where a real Gemini endpoint is
//! either unavailable or irrelevant.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::generator::ContentGenerator;
use crate::params::GeminiModel;
use crate::payload::RequestPayload;
use crate::NodeError;

/// Behaviour injected into `MockGenerator` at construction time.
pub enum MockBehaviour {
    /// Return the given text on every call.
    ReturnText(String),
    /// Fail every call with a `Generation` error.
    Fail(String),
    /// Return `text`, except on the zero-based call `call`, which fails.
    FailOnCall {
        call: usize,
        text: String,
        message: String,
    },
}

/// One recorded `generate` invocation.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub model: GeminiModel,
    pub payload: RequestPayload,
    pub temperature: f64,
}

/// A mock generator that records every call it receives and returns a
/// programmer-specified result.
pub struct MockGenerator {
    /// What the generator will do when `generate` is called.
    pub behaviour: MockBehaviour,
    /// All calls seen by this generator (in call order).
    pub calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockGenerator {
    fn with(behaviour: MockBehaviour) -> Self {
        Self {
            behaviour,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock that always succeeds with the given text.
    pub fn returning(text: impl Into<String>) -> Self {
        Self::with(MockBehaviour::ReturnText(text.into()))
    }

    /// Create a mock that always fails.
    pub fn failing(msg: impl Into<String>) -> Self {
        Self::with(MockBehaviour::Fail(msg.into()))
    }

    /// Create a mock that succeeds except on the `call`-th invocation.
    pub fn failing_on_call(call: usize, text: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::with(MockBehaviour::FailOnCall {
            call,
            text: text.into(),
            message: msg.into(),
        })
    }

    /// Number of times `generate` has been called.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Snapshot of the recorded calls.
    pub fn recorded(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentGenerator for MockGenerator {
    async fn generate(
        &self,
        model: GeminiModel,
        payload: &RequestPayload,
        temperature: f64,
    ) -> Result<String, NodeError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(RecordedCall {
                model,
                payload: payload.clone(),
                temperature,
            });
            calls.len() - 1
        };

        match &self.behaviour {
            MockBehaviour::ReturnText(text) => Ok(text.clone()),
            MockBehaviour::Fail(msg) => Err(NodeError::Generation(msg.clone())),
            MockBehaviour::FailOnCall { call, text, message } => {
                if index == *call {
                    Err(NodeError::Generation(message.clone()))
                } else {
                    Ok(text.clone())
                }
            }
        }
    }
}

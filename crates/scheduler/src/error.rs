//! Scheduler error types.

use planit_store::StoreError;
use thiserror::Error;

/// A threshold-level failure. Caught by the orchestrator, which logs it and
/// moves on to the next threshold.
#[derive(Debug, Error)]
pub enum EvaluateError {
    #[error("task query for threshold '{label}' failed: {source}")]
    Query {
        label: String,
        #[source]
        source: StoreError,
    },

    #[error("evaluation of threshold '{label}' panicked: {message}")]
    Panicked { label: String, message: String },
}

impl EvaluateError {
    pub fn label(&self) -> &str {
        match self {
            EvaluateError::Query { label, .. } | EvaluateError::Panicked { label, .. } => label,
        }
    }
}

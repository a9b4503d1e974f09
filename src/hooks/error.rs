//! Hook invocation errors.

use super::HookPhase;
use thiserror::Error;

/// Errors raised while invoking a hook callback.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HookError {
    #[error("Hook callback failed: {message}")]
    Callback { message: String },

    #[error("{phase} hook panicked: {message}")]
    Panicked { phase: HookPhase, message: String },

    #[error("{phase} hook did not complete synchronously")]
    NotSynchronous { phase: HookPhase },

    #[error("View '{view}' of state '{state}' has no template or component")]
    InvalidView { state: String, view: String },
}

impl HookError {
    /// Failure returned from inside a callback effect.
    pub fn failed(message: impl Into<String>) -> Self {
        HookError::Callback {
            message: message.into(),
        }
    }
}

//! Errors raised while creating a transition.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransitionError {
    #[error("No such state '{name}'")]
    UnknownState { name: String },

    #[error("Reload state '{name}' is not registered")]
    ReloadStateNotFound { name: String },
}

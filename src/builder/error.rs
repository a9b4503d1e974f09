//! Build errors for state declarations.

use thiserror::Error;

/// A single problem found in a state declaration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeclarationError {
    #[error("State name is empty")]
    EmptyName,

    #[error("State '{name}' is already registered")]
    DuplicateState { name: String },

    #[error("Param '{id}' is declared more than once")]
    DuplicateParam { id: String },

    #[error("Resolve '{name}' is declared more than once")]
    DuplicateResolve { name: String },

    #[error("Resolve name is empty")]
    EmptyResolveName,

    #[error("Resolve name '{name}' is reserved")]
    ReservedResolve { name: String },
}

/// Errors that can occur when registering a state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("Parent '{parent}' of state '{state}' is not registered")]
    UnknownParent { state: String, parent: String },

    #[error("State '{state}' has {} invalid declaration(s): {}", .errors.len(), join(.errors))]
    Invalid {
        state: String,
        errors: Vec<DeclarationError>,
    },
}

fn join(errors: &[DeclarationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

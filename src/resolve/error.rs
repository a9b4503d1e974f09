//! Resolve error types.

use thiserror::Error;

/// Errors produced while resolving a resolvable.
///
/// Cloneable: a failure is cached on the resolvable and handed to every
/// current and future awaiter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    /// Raised by a factory effect; the owning resolvable's name is attached
    /// when the failure is recorded.
    #[error("Resolve factory failed: {message}")]
    Factory { message: String },

    #[error("Resolve '{name}' failed: {message}")]
    Failed { name: String, message: String },

    #[error("Resolve '{name}' panicked: {message}")]
    Panicked { name: String, message: String },

    #[error("Resolve dependency cycle: {}", .cycle.join(" -> "))]
    Cycle { cycle: Vec<String> },
}

impl ResolveError {
    /// Failure raised from inside a factory.
    pub fn factory(message: impl Into<String>) -> Self {
        ResolveError::Factory {
            message: message.into(),
        }
    }

    /// Attach the resolvable name to an anonymous factory failure.
    pub(crate) fn within(self, name: &str) -> Self {
        match self {
            ResolveError::Factory { message } => ResolveError::Failed {
                name: name.to_string(),
                message,
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn within_names_factory_failures_only() {
        let named = ResolveError::factory("boom").within("user");
        assert_eq!(
            named,
            ResolveError::Failed {
                name: "user".into(),
                message: "boom".into()
            }
        );

        let cycle = ResolveError::Cycle {
            cycle: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(cycle.clone().within("x"), cycle);
        assert_eq!(cycle.to_string(), "Resolve dependency cycle: a -> b -> a");
    }
}

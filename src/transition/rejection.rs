//! Why a transition did not succeed.

use crate::core::RecordedOutcome;
use crate::hooks::HookError;
use crate::resolve::ResolveError;
use crate::transition::TransitionError;
use std::fmt;
use thiserror::Error;

/// Distinguishable reason tag of a [`Rejection`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RejectionKind {
    /// Target equals the current position; nothing happened
    Ignored,
    /// A newer transition started before this one settled
    Superseded,
    /// A hook cancelled the transition
    Aborted,
    /// A hook rejected the transition
    Rejected,
    /// A hook redirected to another target
    Redirected { to: String },
    /// A hook, resolve or redirect failed
    Error,
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionKind::Ignored => f.write_str("ignored"),
            RejectionKind::Superseded => f.write_str("superseded"),
            RejectionKind::Aborted => f.write_str("aborted"),
            RejectionKind::Rejected => f.write_str("rejected"),
            RejectionKind::Redirected { to } => write!(f, "redirected to '{to}'"),
            RejectionKind::Error => f.write_str("error"),
        }
    }
}

/// Underlying failure of an error rejection.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RejectionCause {
    #[error(transparent)]
    Hook(#[from] HookError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// The settled failure value of a transition.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Transition {kind}: {message}")]
pub struct Rejection {
    pub kind: RejectionKind,
    pub message: String,
    #[source]
    pub cause: Option<RejectionCause>,
}

impl Rejection {
    fn new(kind: RejectionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    pub fn ignored() -> Self {
        Self::new(RejectionKind::Ignored, "target is the current state")
    }

    pub fn superseded() -> Self {
        Self::new(RejectionKind::Superseded, "a newer transition has started")
    }

    pub fn aborted(message: impl Into<String>) -> Self {
        Self::new(RejectionKind::Aborted, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(RejectionKind::Rejected, message)
    }

    pub fn redirected(to: impl Into<String>) -> Self {
        let to = to.into();
        Self::new(RejectionKind::Redirected { to: to.clone() }, format!("redirected to '{to}'"))
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(RejectionKind::Error, message)
    }

    pub fn hook(err: HookError) -> Self {
        Self::caused_by(RejectionCause::Hook(err))
    }

    pub fn resolve(err: ResolveError) -> Self {
        Self::caused_by(RejectionCause::Resolve(err))
    }

    pub fn transition(err: TransitionError) -> Self {
        Self::caused_by(RejectionCause::Transition(err))
    }

    fn caused_by(cause: RejectionCause) -> Self {
        Self {
            kind: RejectionKind::Error,
            message: cause.to_string(),
            cause: Some(cause),
        }
    }

    /// True for outcomes that are not failures of the transition itself.
    pub fn is_benign(&self) -> bool {
        matches!(self.kind, RejectionKind::Ignored | RejectionKind::Superseded)
    }

    pub(crate) fn recorded(&self) -> RecordedOutcome {
        match &self.kind {
            RejectionKind::Ignored => RecordedOutcome::Ignored,
            RejectionKind::Superseded => RecordedOutcome::Superseded,
            RejectionKind::Aborted => RecordedOutcome::Aborted,
            RejectionKind::Rejected => RecordedOutcome::Rejected(self.message.clone()),
            RejectionKind::Redirected { to } => RecordedOutcome::Redirected(to.clone()),
            RejectionKind::Error => RecordedOutcome::Error(self.message.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn causes_become_error_rejections() {
        let rejection = Rejection::resolve(ResolveError::factory("down").within("user"));

        assert_eq!(rejection.kind, RejectionKind::Error);
        assert_eq!(rejection.message, "Resolve 'user' failed: down");
        assert!(matches!(rejection.cause, Some(RejectionCause::Resolve(_))));
    }

    #[test]
    fn ignored_and_superseded_are_benign() {
        assert!(Rejection::ignored().is_benign());
        assert!(Rejection::superseded().is_benign());
        assert!(!Rejection::rejected("no").is_benign());
    }

    #[test]
    fn display_carries_kind_and_message() {
        assert_eq!(
            Rejection::aborted("cancelled by hook").to_string(),
            "Transition aborted: cancelled by hook"
        );
        assert_eq!(
            Rejection::redirected("login").recorded(),
            RecordedOutcome::Redirected("login".into())
        );
    }
}

//! Hook registration and the hook pipeline.
//!
//! A hook is a [`Callback`] registered for one [`HookPhase`] together with
//! [`MatchCriteria`](crate::core::MatchCriteria). Callbacks return a
//! Stillwater effect producing a [`HookResult`]; the effect runs against the
//! caller's environment when the step executes.

mod builder;
mod error;
mod hook;
mod registry;

pub use builder::HookBuilder;
pub use error::HookError;
pub use hook::{HookSource, TransitionHook};
pub(crate) use hook::panic_message;
pub use registry::{Deregistration, HookOptions, HookRegistry, RegisteredHook};

use crate::core::{Environment, StateRef};
use crate::resolve::Locals;
use crate::transition::{Rejection, TargetState, Transition};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use stillwater::effect::BoxedEffect;

/// Callback signature shared by every hook and state lifecycle callback.
pub type HookFn<Env> =
    Arc<dyn Fn(&HookContext<'_, Env>) -> BoxedEffect<HookResult, HookError, Env> + Send + Sync>;

/// Pipeline phase a hook is registered for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HookPhase {
    OnBefore,
    OnStart,
    On,
    OnExit,
    OnRetain,
    OnEnter,
    OnFinish,
    OnSuccess,
    OnError,
}

impl HookPhase {
    /// Phases whose callbacks must complete without suspending.
    pub fn is_synchronous(self) -> bool {
        matches!(self, HookPhase::OnBefore)
    }

    /// Phases generated once per exiting, retained or entering node.
    pub fn is_state_scoped(self) -> bool {
        matches!(self, HookPhase::OnExit | HookPhase::OnRetain | HookPhase::OnEnter)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HookPhase::OnBefore => "onBefore",
            HookPhase::OnStart => "onStart",
            HookPhase::On => "on",
            HookPhase::OnExit => "onExit",
            HookPhase::OnRetain => "onRetain",
            HookPhase::OnEnter => "onEnter",
            HookPhase::OnFinish => "onFinish",
            HookPhase::OnSuccess => "onSuccess",
            HookPhase::OnError => "onError",
        }
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome signalled by a hook callback.
#[derive(Clone, Debug, PartialEq)]
pub enum HookResult {
    /// Proceed with the next step
    Continue,
    /// Abort the transition without an error
    Cancel,
    /// Reject the transition with a reason
    Reject(String),
    /// Abandon this transition and start a new one towards the target
    Redirect(TargetState),
}

impl HookResult {
    pub fn reject(reason: impl Into<String>) -> Self {
        HookResult::Reject(reason.into())
    }

    pub fn redirect(target: TargetState) -> Self {
        HookResult::Redirect(target)
    }
}

impl From<bool> for HookResult {
    /// `false` cancels, `true` continues.
    fn from(proceed: bool) -> Self {
        if proceed {
            HookResult::Continue
        } else {
            HookResult::Cancel
        }
    }
}

/// Everything a callback can see when it is invoked.
pub struct HookContext<'a, Env: Environment = ()> {
    pub transition: &'a Transition<Env>,
    pub phase: HookPhase,
    /// The exiting, retained or entering state for state-scoped phases
    pub state: Option<&'a StateRef<Env>>,
    /// The callback's declared dependencies
    pub locals: &'a Locals,
    /// The failure being reported, for `onError` hooks
    pub error: Option<&'a Rejection>,
}

/// A hook callback with its declared dependency names.
pub struct Callback<Env: Environment = ()> {
    func: HookFn<Env>,
    deps: Vec<String>,
}

impl<Env: Environment> Callback<Env> {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&HookContext<'_, Env>) -> BoxedEffect<HookResult, HookError, Env>
            + Send
            + Sync
            + 'static,
    {
        Self {
            func: Arc::new(func),
            deps: Vec::new(),
        }
    }

    /// Declare the resolvables this callback receives as locals.
    pub fn with_deps<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deps = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn deps(&self) -> &[String] {
        &self.deps
    }

    pub(crate) fn call(&self, context: &HookContext<'_, Env>) -> BoxedEffect<HookResult, HookError, Env> {
        (self.func)(context)
    }
}

impl<Env: Environment> Clone for Callback<Env> {
    fn clone(&self) -> Self {
        Self {
            func: Arc::clone(&self.func),
            deps: self.deps.clone(),
        }
    }
}

impl<Env: Environment> fmt::Debug for Callback<Env> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback").field("deps", &self.deps).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean_results_map_to_continue_or_cancel() {
        assert_eq!(HookResult::from(true), HookResult::Continue);
        assert_eq!(HookResult::from(false), HookResult::Cancel);
    }

    #[test]
    fn phase_names_match_registration_api() {
        assert_eq!(HookPhase::OnBefore.to_string(), "onBefore");
        assert!(HookPhase::OnBefore.is_synchronous());
        assert!(!HookPhase::OnStart.is_synchronous());
        assert!(HookPhase::OnRetain.is_state_scoped());
        assert!(!HookPhase::OnFinish.is_state_scoped());
    }
}

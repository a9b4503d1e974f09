//! One invocable hook step.

use super::{Callback, HookContext, HookError, HookPhase, HookResult};
use crate::core::{Environment, StateRef};
use crate::resolve::{Locals, ResolveContext};
use crate::transition::{Rejection, StepOutcome, Transition};
use futures_util::FutureExt;
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use stillwater::effect::{BoxedEffect, Effect};

/// Where a pipeline hook came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookSource {
    /// Registered through the hook registration API
    Registered(u64),
    /// The state's own `on_enter`, `on_exit` or `on_retain` callback
    State,
}

/// A callback bound to its phase, state and resolve context.
pub struct TransitionHook<Env: Environment = ()> {
    phase: HookPhase,
    source: HookSource,
    callback: Callback<Env>,
    state: Option<StateRef<Env>>,
    context: ResolveContext<Env>,
}

impl<Env: Environment> TransitionHook<Env> {
    pub fn new(
        phase: HookPhase,
        source: HookSource,
        callback: Callback<Env>,
        state: Option<StateRef<Env>>,
        context: ResolveContext<Env>,
    ) -> Self {
        Self {
            phase,
            source,
            callback,
            state,
            context,
        }
    }

    pub fn phase(&self) -> HookPhase {
        self.phase
    }

    pub fn source(&self) -> HookSource {
        self.source
    }

    pub fn state(&self) -> Option<&StateRef<Env>> {
        self.state.as_ref()
    }

    pub fn context(&self) -> &ResolveContext<Env> {
        &self.context
    }

    /// Resolve the callback's locals, invoke it and run its effect.
    ///
    /// Panics and failures become [`StepOutcome::Error`].
    pub async fn invoke_step(
        &self,
        transition: &Transition<Env>,
        env: &Env,
        error: Option<&Rejection>,
    ) -> StepOutcome {
        let options = transition.resolve_options();
        let locals = match self
            .context
            .resolve_locals(self.callback.deps(), env, &options)
            .await
        {
            Ok(locals) => locals,
            Err(err) => return StepOutcome::Error(Rejection::resolve(err)),
        };
        let effect = match self.call(transition, &locals, error) {
            Ok(effect) => effect,
            Err(err) => return StepOutcome::Error(Rejection::hook(err)),
        };
        match AssertUnwindSafe(effect.run(env)).catch_unwind().await {
            Ok(Ok(result)) => StepOutcome::from(result),
            Ok(Err(err)) => StepOutcome::Error(Rejection::hook(err)),
            Err(payload) => StepOutcome::Error(Rejection::hook(HookError::Panicked {
                phase: self.phase,
                message: panic_message(payload.as_ref()),
            })),
        }
    }

    /// Invoke a hook that must not suspend.
    ///
    /// A hook whose locals or effect are still pending after one poll fails
    /// with [`HookError::NotSynchronous`].
    pub fn invoke_sync(&self, transition: &Transition<Env>, env: &Env) -> StepOutcome {
        self.invoke_step(transition, env, None)
            .now_or_never()
            .unwrap_or_else(|| {
                StepOutcome::Error(Rejection::hook(HookError::NotSynchronous { phase: self.phase }))
            })
    }

    fn call(
        &self,
        transition: &Transition<Env>,
        locals: &Locals,
        error: Option<&Rejection>,
    ) -> Result<BoxedEffect<HookResult, HookError, Env>, HookError> {
        let context = HookContext {
            transition,
            phase: self.phase,
            state: self.state.as_ref(),
            locals,
            error,
        };
        catch_unwind(AssertUnwindSafe(|| self.callback.call(&context))).map_err(|payload| {
            HookError::Panicked {
                phase: self.phase,
                message: panic_message(payload.as_ref()),
            }
        })
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl<Env: Environment> fmt::Debug for TransitionHook<Env> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionHook")
            .field("phase", &self.phase)
            .field("source", &self.source)
            .field("state", &self.state.as_ref().map(|s| s.name()))
            .field("deps", &self.callback.deps())
            .finish()
    }
}

impl<Env: Environment> fmt::Display for TransitionHook<Env> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            Some(state) => write!(f, "{}({})", self.phase, state.name()),
            None => write!(f, "{}", self.phase),
        }
    }
}

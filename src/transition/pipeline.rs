//! Typed pipeline steps and their outcomes.

use super::{Rejection, TargetState, Transition};
use crate::core::Environment;
use crate::hooks::{HookResult, TransitionHook};
use crate::resolve::{ResolveContext, ResolvePolicy};
use std::fmt;

/// What a step asks the driver loop to do next.
#[derive(Clone, Debug, PartialEq)]
pub enum StepOutcome {
    Continue,
    Reject(Rejection),
    Redirect(TargetState),
    Error(Rejection),
}

impl From<HookResult> for StepOutcome {
    fn from(result: HookResult) -> Self {
        match result {
            HookResult::Continue => StepOutcome::Continue,
            HookResult::Cancel => StepOutcome::Reject(Rejection::aborted("cancelled by hook")),
            HookResult::Reject(reason) => StepOutcome::Reject(Rejection::rejected(reason)),
            HookResult::Redirect(target) => StepOutcome::Redirect(target),
        }
    }
}

/// One entry of the asynchronous chain.
pub enum Step<Env: Environment = ()> {
    Hook(TransitionHook<Env>),
    /// Resolve every eager resolvable of the target path
    ResolvePath(ResolveContext<Env>),
    /// Resolve the resolvables declared on an entering node
    ResolveNode(ResolveContext<Env>),
}

impl<Env: Environment> Step<Env> {
    pub async fn run(&self, transition: &Transition<Env>, env: &Env) -> StepOutcome {
        let options = transition.resolve_options();
        let resolved = match self {
            Step::Hook(hook) => return hook.invoke_step(transition, env, None).await,
            Step::ResolvePath(context) => {
                context
                    .resolve_path(Some(ResolvePolicy::Eager), env, &options)
                    .await
            }
            Step::ResolveNode(context) => context.resolve_node(env, &options).await,
        };
        match resolved {
            Ok(()) => StepOutcome::Continue,
            Err(err) => StepOutcome::Error(Rejection::resolve(err)),
        }
    }
}

impl<Env: Environment> fmt::Debug for Step<Env> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Hook(hook) => f.debug_tuple("Hook").field(hook).finish(),
            Step::ResolvePath(_) => f.write_str("ResolvePath"),
            Step::ResolveNode(context) => f
                .debug_tuple("ResolveNode")
                .field(&context.path().last().map(|n| n.state().name()))
                .finish(),
        }
    }
}

impl<Env: Environment> fmt::Display for Step<Env> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Hook(hook) => write!(f, "{hook}"),
            Step::ResolvePath(_) => f.write_str("resolve(eager)"),
            Step::ResolveNode(context) => match context.path().last() {
                Some(node) => write!(f, "resolve({})", node.state().name()),
                None => f.write_str("resolve()"),
            },
        }
    }
}

/// Ordered hooks and steps of one transition.
pub struct Pipeline<Env: Environment = ()> {
    /// Synchronous hooks run before anything else
    pub before: Vec<TransitionHook<Env>>,
    pub steps: Vec<Step<Env>>,
    pub success: Vec<TransitionHook<Env>>,
    pub error: Vec<TransitionHook<Env>>,
}

impl<Env: Environment> Pipeline<Env> {
    /// Display names of the asynchronous steps, in execution order.
    pub fn describe(&self) -> Vec<String> {
        self.steps.iter().map(ToString::to_string).collect()
    }
}

impl<Env: Environment> fmt::Debug for Pipeline<Env> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("before", &self.before)
            .field("steps", &self.steps)
            .field("success", &self.success)
            .field("error", &self.error)
            .finish()
    }
}

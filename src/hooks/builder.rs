//! Assembles the ordered hook pipeline of a transition.

use super::{Callback, HookPhase, HookRegistry, HookSource, TransitionHook};
use crate::core::{Environment, Node, StateRef};
use crate::resolve::ResolveContext;
use crate::transition::{Pipeline, Step, Transition};

/// Builds the [`Pipeline`] for one transition from the registered hooks and
/// the transition's tree changes.
///
/// Registered hooks are filtered by their criteria against a `(to, from)`
/// pair and ordered by priority. For state-scoped phases the pair is built
/// per node:
///
/// | phase      | `to`                | `from`              |
/// |------------|---------------------|---------------------|
/// | `onExit`   | transition target   | the exiting state   |
/// | `onRetain` | the retained state  | transition origin   |
/// | `onEnter`  | the entering state  | transition origin   |
/// | others     | transition target   | transition origin   |
pub struct HookBuilder<'a, Env: Environment = ()> {
    transition: &'a Transition<Env>,
    registry: &'a HookRegistry<Env>,
}

impl<'a, Env: Environment> HookBuilder<'a, Env> {
    pub fn new(transition: &'a Transition<Env>, registry: &'a HookRegistry<Env>) -> Self {
        Self {
            transition,
            registry,
        }
    }

    pub fn build(&self) -> Pipeline<Env> {
        let changes = self.transition.tree_changes();
        let to_state = changes.to_state();
        let from_state = changes.from_state();
        let to_context = ResolveContext::new(changes.to.clone());
        let from_context = ResolveContext::new(changes.from.clone());

        let before = self.registered(HookPhase::OnBefore, to_state, from_state, None, &from_context);

        let mut steps = Vec::new();
        steps.extend(self.steps(HookPhase::OnStart, to_state, from_state, None, &from_context));
        steps.extend(self.steps(HookPhase::On, to_state, from_state, None, &to_context));
        steps.push(Step::ResolvePath(to_context.clone()));

        for node in changes.exiting.nodes().iter().rev() {
            let state = node.state();
            let context = from_context.isolate_root_to(state);
            steps.extend(self.steps(HookPhase::OnExit, to_state, Some(state), Some(state), &context));
            steps.extend(own_callback(HookPhase::OnExit, node, &context));
        }

        for node in changes.retained.nodes() {
            let state = node.state();
            let context = to_context.isolate_root_to(state);
            steps.extend(self.steps(HookPhase::OnRetain, Some(state), from_state, Some(state), &context));
            steps.extend(own_callback(HookPhase::OnRetain, node, &context));
        }

        for node in changes.entering.nodes() {
            let state = node.state();
            let context = to_context.isolate_root_to(state);
            steps.push(Step::ResolveNode(context.clone()));
            steps.extend(self.steps(HookPhase::OnEnter, Some(state), from_state, Some(state), &context));
            steps.extend(own_callback(HookPhase::OnEnter, node, &context));
        }

        steps.extend(self.steps(HookPhase::OnFinish, to_state, from_state, None, &to_context));

        Pipeline {
            before,
            steps,
            success: self.registered(HookPhase::OnSuccess, to_state, from_state, None, &to_context),
            error: self.registered(HookPhase::OnError, to_state, from_state, None, &to_context),
        }
    }

    fn steps(
        &self,
        phase: HookPhase,
        to: Option<&StateRef<Env>>,
        from: Option<&StateRef<Env>>,
        state: Option<&StateRef<Env>>,
        context: &ResolveContext<Env>,
    ) -> impl Iterator<Item = Step<Env>> {
        self.registered(phase, to, from, state, context)
            .into_iter()
            .map(Step::Hook)
    }

    fn registered(
        &self,
        phase: HookPhase,
        to: Option<&StateRef<Env>>,
        from: Option<&StateRef<Env>>,
        state: Option<&StateRef<Env>>,
        context: &ResolveContext<Env>,
    ) -> Vec<TransitionHook<Env>> {
        self.registry
            .matching(phase, to.map(|s| &**s), from.map(|s| &**s))
            .into_iter()
            .map(|hook| {
                TransitionHook::new(
                    phase,
                    HookSource::Registered(hook.id),
                    hook.callback,
                    state.cloned(),
                    context.clone(),
                )
            })
            .collect()
    }
}

fn own_callback<Env: Environment>(
    phase: HookPhase,
    node: &Node<Env>,
    context: &ResolveContext<Env>,
) -> Option<Step<Env>> {
    let state = node.state();
    let callback: Option<&Callback<Env>> = match phase {
        HookPhase::OnExit => state.on_exit(),
        HookPhase::OnRetain => state.on_retain(),
        HookPhase::OnEnter => state.on_enter(),
        _ => None,
    };
    callback.map(|callback| {
        Step::Hook(TransitionHook::new(
            phase,
            HookSource::State,
            callback.clone(),
            Some(state.clone()),
            context.clone(),
        ))
    })
}

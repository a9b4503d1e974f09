//! One attempted navigation and its hook pipeline.

use super::{
    PathName, Pipeline, Rejection, RejectionKind, Reload, Signal, StepOutcome, TargetState,
    TransitionError, TransitionOptions, TransitionService,
};
use crate::core::{
    ancestry, Environment, MatchCriteria, Path, RawParams, RecordedOutcome, StateRef,
    TreeChanges, ViewDeclaration,
};
use crate::hooks::{HookBuilder, HookError, TransitionHook};
use crate::resolve::{ResolveContext, ResolveOptions};
use crate::trace::{TraceEvent, Tracer};
use futures_util::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Settled result of a transition: the state reached, or why not.
pub type Completion<Env> = Result<StateRef<Env>, Rejection>;

/// Lifecycle of a [`Transition`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionStatus {
    Created,
    Running,
    Ignored,
    /// Superseded by a newer transition
    Aborted,
    Resolved,
    Rejected,
}

impl TransitionStatus {
    pub fn is_settled(self) -> bool {
        !matches!(self, TransitionStatus::Created | TransitionStatus::Running)
    }
}

/// A view of a state together with the context it renders in.
pub struct ViewConfig<Env: Environment = ()> {
    pub name: String,
    pub view: ViewDeclaration,
    pub state: StateRef<Env>,
    pub context: ResolveContext<Env>,
    pub params: RawParams,
}

impl<Env: Environment> ViewConfig<Env> {
    /// Fails when the view has nothing to render.
    pub fn validate(&self) -> Result<(), HookError> {
        if self.view.has_content() {
            Ok(())
        } else {
            Err(HookError::InvalidView {
                state: self.state.name().to_string(),
                view: self.name.clone(),
            })
        }
    }
}

impl<Env: Environment> fmt::Debug for ViewConfig<Env> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewConfig")
            .field("name", &self.name)
            .field("view", &self.view)
            .field("state", &self.state.name())
            .field("params", &self.params)
            .finish()
    }
}

/// One navigation attempt from the current path towards a target.
///
/// A transition is immutable apart from its status and completion signals.
/// Redirecting never changes it; [`redirect`](Transition::redirect) builds a
/// new transition linked back through [`previous`](Transition::previous).
pub struct Transition<Env: Environment = ()> {
    id: u64,
    to_state: StateRef<Env>,
    tree_changes: TreeChanges<Env>,
    target: TargetState,
    reload_state: Option<StateRef<Env>>,
    previous: Option<Arc<Transition<Env>>>,
    redirect_depth: usize,
    service: TransitionService<Env>,
    status: Mutex<TransitionStatus>,
    prepromise: Signal<Completion<Env>>,
    promise: Signal<Completion<Env>>,
    redirects: Signal<Completion<Env>>,
}

impl<Env: Environment> Transition<Env> {
    pub(crate) fn create(
        service: &TransitionService<Env>,
        from: &Path<Env>,
        target: TargetState,
        previous: Option<Arc<Transition<Env>>>,
    ) -> Result<Self, TransitionError> {
        let to_state = service
            .state(&target.state)
            .ok_or_else(|| TransitionError::UnknownState {
                name: target.state.clone(),
            })?;
        let reload_state = match &target.options.reload {
            Reload::None => None,
            Reload::All => ancestry(&to_state).into_iter().next(),
            Reload::State(name) => Some(service.state(name).ok_or_else(|| {
                TransitionError::ReloadStateNotFound { name: name.clone() }
            })?),
        };
        let inherit = target.options.inherit.then_some(from);
        let to_path = Path::from_target(&to_state, &target.params, inherit);
        let tree_changes = TreeChanges::calculate(from, &to_path, reload_state.as_ref());
        let redirect_depth = previous.as_ref().map_or(0, |p| p.redirect_depth + 1);

        Ok(Self {
            id: service.next_id(),
            to_state,
            tree_changes,
            target,
            reload_state,
            previous,
            redirect_depth,
            service: service.clone(),
            status: Mutex::new(TransitionStatus::Created),
            prepromise: Signal::new(),
            promise: Signal::new(),
            redirects: Signal::new(),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Leaf state of the `from` path.
    pub fn from(&self) -> Option<&StateRef<Env>> {
        self.tree_changes.from_state()
    }

    /// The target state.
    pub fn to(&self) -> &StateRef<Env> {
        &self.to_state
    }

    pub fn target(&self) -> &TargetState {
        &self.target
    }

    pub fn options(&self) -> &TransitionOptions {
        &self.target.options
    }

    /// The transition this one was redirected from.
    pub fn previous(&self) -> Option<&Arc<Transition<Env>>> {
        self.previous.as_ref()
    }

    pub fn tree_changes(&self) -> &TreeChanges<Env> {
        &self.tree_changes
    }

    pub fn path(&self, name: PathName) -> &Path<Env> {
        match name {
            PathName::From => &self.tree_changes.from,
            PathName::To => &self.tree_changes.to,
            PathName::Retained => &self.tree_changes.retained,
            PathName::Exiting => &self.tree_changes.exiting,
            PathName::Entering => &self.tree_changes.entering,
        }
    }

    /// Merged param values of one of the paths.
    pub fn params(&self, name: PathName) -> RawParams {
        self.path(name).param_values()
    }

    /// True when the transition's `(to, from)` pair satisfies `criteria`.
    pub fn is(&self, criteria: &MatchCriteria<Env>) -> bool {
        criteria.matches(Some(&*self.to_state), self.from().map(|s| &**s))
    }

    pub fn entering(&self) -> Vec<StateRef<Env>> {
        self.tree_changes.entering.states()
    }

    /// Exiting states, leaf first.
    pub fn exiting(&self) -> Vec<StateRef<Env>> {
        let mut states = self.tree_changes.exiting.states();
        states.reverse();
        states
    }

    pub fn retained(&self) -> Vec<StateRef<Env>> {
        self.tree_changes.retained.states()
    }

    /// Resolve context of a path, isolated to `state` when given.
    pub fn context(&self, name: PathName, state: Option<&StateRef<Env>>) -> ResolveContext<Env> {
        let context = ResolveContext::new(self.path(name).clone());
        match state {
            Some(state) => context.isolate_root_to(state),
            None => context,
        }
    }

    /// View configs of every state on `path`, each with a context taken
    /// from `context_path`.
    pub fn views(&self, path: PathName, context_path: PathName) -> Vec<ViewConfig<Env>> {
        let params = self.params(PathName::To);
        self.path(path)
            .states()
            .into_iter()
            .flat_map(|state| {
                let context = self.context(context_path, Some(&state));
                state
                    .views()
                    .iter()
                    .map(|(name, view)| ViewConfig {
                        name: name.clone(),
                        view: view.clone(),
                        state: Arc::clone(&state),
                        context: context.clone(),
                        params: params.clone(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// True when the target is the current position and no reload was
    /// requested.
    pub fn ignored(&self) -> bool {
        if self.reload_state.is_some() {
            return false;
        }
        let (from, to) = (&self.tree_changes.from, &self.tree_changes.to);
        from.len() == to.len()
            && from.nodes().iter().zip(to.nodes()).all(|(a, b)| {
                Arc::ptr_eq(a.state(), b.state())
                    && a.state().params().non_dynamic_equal(a.params(), b.params())
            })
    }

    pub fn status(&self) -> TransitionStatus {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// True while no newer transition has started.
    pub fn is_active(&self) -> bool {
        self.service.active_id() == Some(self.id)
    }

    /// Settled after the new path is committed, before success hooks run.
    pub async fn prepromise(&self) -> Option<Completion<Env>> {
        self.prepromise.wait().await
    }

    /// Settled after success or error hooks have run.
    pub async fn promise(&self) -> Option<Completion<Env>> {
        self.promise.wait().await
    }

    /// Settled with the outcome of the redirect chain starting here.
    pub async fn redirects(&self) -> Option<Completion<Env>> {
        self.redirects.wait().await
    }

    /// The promise outcome, if already settled.
    pub fn outcome(&self) -> Option<Completion<Env>> {
        self.promise.peek()
    }

    /// A new transition from the same `from` path towards `target`.
    ///
    /// `options` replaces the target's own options when given.
    pub fn redirect(
        self: &Arc<Self>,
        target: TargetState,
        options: Option<TransitionOptions>,
    ) -> Result<Arc<Transition<Env>>, TransitionError> {
        let target = match options {
            Some(options) => target.with_options(options),
            None => target,
        };
        Transition::create(
            &self.service,
            &self.tree_changes.from,
            target,
            Some(Arc::clone(self)),
        )
        .map(Arc::new)
    }

    pub(crate) fn tracer(&self) -> Tracer {
        self.service
            .tracer()
            .enabled(self.service.config().trace || self.target.options.trace)
    }

    pub(crate) fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            tracer: self.tracer(),
            transition: Some(self.id),
        }
    }

    /// Run the transition to completion.
    ///
    /// Resolves with the outcome of the whole redirect chain starting here.
    /// Only the first call runs the pipeline; later calls wait for its
    /// outcome.
    pub fn run<'a>(self: &Arc<Self>, env: &'a Env) -> BoxFuture<'a, Completion<Env>> {
        let transition = Arc::clone(self);
        async move {
            if transition.start() {
                transition.execute(env).await
            } else {
                transition
                    .redirects
                    .wait()
                    .await
                    .unwrap_or_else(|| Err(Rejection::superseded()))
            }
        }
        .boxed()
    }

    // Created -> Running, at most once.
    fn start(&self) -> bool {
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        if *status != TransitionStatus::Created {
            return false;
        }
        *status = TransitionStatus::Running;
        true
    }

    async fn execute(self: &Arc<Self>, env: &Env) -> Completion<Env> {
        let tracer = self.tracer();
        tracer.emit(TraceEvent::TransitionStart {
            id: self.id,
            from: self.from().map(|s| s.name().to_string()),
            to: self.to_state.name().to_string(),
        });
        tracing::debug!(transition = %self, "transition started");

        if self.ignored() {
            tracer.emit(TraceEvent::TransitionIgnored {
                id: self.id,
                to: self.to_state.name().to_string(),
            });
            self.service.clear_active();
            let rejection = Rejection::ignored();
            self.finish(TransitionStatus::Ignored, &rejection.recorded());
            let completion = Err(rejection);
            self.prepromise.settle(completion.clone());
            self.promise.settle(completion.clone());
            self.redirects.settle(completion.clone());
            return completion;
        }

        self.service.activate(self.id);
        let pipeline = HookBuilder::new(self.as_ref(), self.service.registry()).build();

        let outcome = match self.run_before(&pipeline.before, env) {
            StepOutcome::Continue => self.run_steps(&pipeline, env).await,
            halted => halted,
        };
        match outcome {
            StepOutcome::Continue => self.succeed(&pipeline, env).await,
            StepOutcome::Reject(rejection) | StepOutcome::Error(rejection) => {
                self.fail(&pipeline, env, rejection).await
            }
            StepOutcome::Redirect(target) => self.follow_redirect(&pipeline, env, target).await,
        }
    }

    fn run_before(&self, hooks: &[TransitionHook<Env>], env: &Env) -> StepOutcome {
        for hook in hooks {
            match hook.invoke_sync(self, env) {
                StepOutcome::Continue => {}
                halted => {
                    tracing::debug!(transition = %self, hook = %hook, "before hook halted transition");
                    return halted;
                }
            }
        }
        StepOutcome::Continue
    }

    async fn run_steps(&self, pipeline: &Pipeline<Env>, env: &Env) -> StepOutcome {
        for step in &pipeline.steps {
            if !self.is_active() {
                return StepOutcome::Reject(Rejection::superseded());
            }
            let outcome = step.run(self, env).await;
            if !self.is_active() {
                tracing::debug!(transition = %self, step = %step, "superseded while step ran");
                return StepOutcome::Reject(Rejection::superseded());
            }
            match outcome {
                StepOutcome::Continue => {}
                halted => {
                    tracing::debug!(transition = %self, step = %step, "step halted transition");
                    return halted;
                }
            }
        }
        StepOutcome::Continue
    }

    async fn succeed(&self, pipeline: &Pipeline<Env>, env: &Env) -> Completion<Env> {
        if !self.service.commit(self.id, &self.tree_changes.to) {
            return self.fail(pipeline, env, Rejection::superseded()).await;
        }
        self.finish(TransitionStatus::Resolved, &RecordedOutcome::Success);
        let completion: Completion<Env> = Ok(Arc::clone(&self.to_state));
        self.prepromise.settle(completion.clone());

        for hook in &pipeline.success {
            let outcome = hook.invoke_step(self, env, None).await;
            if outcome != StepOutcome::Continue {
                tracing::warn!(transition = %self, hook = %hook, ?outcome, "success hook outcome ignored");
            }
        }

        self.promise.settle(completion.clone());
        self.redirects.settle(completion.clone());
        completion
    }

    async fn fail(&self, pipeline: &Pipeline<Env>, env: &Env, rejection: Rejection) -> Completion<Env> {
        let status = match rejection.kind {
            RejectionKind::Superseded => TransitionStatus::Aborted,
            _ => TransitionStatus::Rejected,
        };
        self.finish(status, &rejection.recorded());
        tracing::debug!(transition = %self, %rejection, "transition rejected");
        self.prepromise.settle(Err(rejection.clone()));

        for hook in &pipeline.error {
            let outcome = hook.invoke_step(self, env, Some(&rejection)).await;
            if outcome != StepOutcome::Continue {
                tracing::warn!(transition = %self, hook = %hook, ?outcome, "error hook outcome ignored");
            }
        }
        if pipeline.error.is_empty() && !rejection.is_benign() {
            self.service.handle_error(&rejection);
        }

        let completion = Err(rejection);
        self.promise.settle(completion.clone());
        self.redirects.settle(completion.clone());
        completion
    }

    async fn follow_redirect(
        self: &Arc<Self>,
        pipeline: &Pipeline<Env>,
        env: &Env,
        target: TargetState,
    ) -> Completion<Env> {
        if !self.is_active() {
            return self.fail(pipeline, env, Rejection::superseded()).await;
        }
        let max = self.service.config().max_redirects;
        if self.redirect_depth >= max {
            let rejection = Rejection::error(format!(
                "too many redirects ({max}) while redirecting to {target}"
            ));
            return self.fail(pipeline, env, rejection).await;
        }
        let next = match self.redirect(target, None) {
            Ok(next) => next,
            Err(err) => return self.fail(pipeline, env, Rejection::transition(err)).await,
        };
        tracing::debug!(transition = %self, redirect = %next, "transition redirected");

        let rejection = Rejection::redirected(next.to().name());
        self.finish(TransitionStatus::Rejected, &rejection.recorded());
        self.prepromise.settle(Err(rejection.clone()));
        self.promise.settle(Err(rejection));

        let completion = next.run(env).await;
        self.redirects.settle(completion.clone());
        completion
    }

    fn set_status(&self, status: TransitionStatus) {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = status;
    }

    fn finish(&self, status: TransitionStatus, outcome: &RecordedOutcome) {
        self.set_status(status);
        self.service.record(self, outcome.clone());
        self.tracer().emit(TraceEvent::TransitionSettled {
            id: self.id,
            outcome: format!("{outcome:?}"),
        });
    }
}

impl<Env: Environment> fmt::Display for Transition<Env> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let from = self.from().map_or("", |s| s.name());
        write!(
            f,
            "Transition#{}( '{}'{} -> '{}'{} )",
            self.id,
            from,
            self.params(PathName::From),
            self.to_state.name(),
            self.params(PathName::To),
        )
    }
}

impl<Env: Environment> fmt::Debug for Transition<Env> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("tree_changes", &self.tree_changes)
            .field("previous", &self.previous.as_ref().map(|p| p.id))
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{StateBuilder, StateRegistry};
    use crate::config::RouterConfig;
    use crate::core::{same_state, ParamSpec, ViewDeclaration};
    use crate::hooks::{Callback, HookOptions, HookResult};
    use crate::params;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use stillwater::prelude::*;

    fn service() -> TransitionService {
        let registry: StateRegistry = StateRegistry::new();
        registry
            .register(StateBuilder::new("app").view("main", ViewDeclaration::template("<app/>")))
            .unwrap();
        registry
            .register(
                StateBuilder::new("app.users")
                    .param(ParamSpec::new("page").dynamic())
                    .view("list", ViewDeclaration::default()),
            )
            .unwrap();
        registry
            .register(StateBuilder::new("app.users.detail").param(ParamSpec::new("id")))
            .unwrap();
        TransitionService::new(registry, RouterConfig::default())
    }

    fn target(state: &str, params: RawParams) -> TargetState {
        TargetState::new(state, params)
    }

    #[tokio::test]
    async fn display_shows_both_ends() {
        let service = service();
        service.go(target("app.users.detail", params! { "id" => 4 }), &()).await.unwrap();

        let next = service.create(target("app", RawParams::new())).unwrap();

        assert_eq!(
            next.to_string(),
            format!("Transition#{}( 'app.users.detail'{{\"id\":4}} -> 'app'{{}} )", next.id())
        );
    }

    #[tokio::test]
    async fn exiting_is_leaf_first() {
        let service = service();
        service.go(target("app.users.detail", params! { "id" => 1 }), &()).await.unwrap();

        let next = service.create(target("app", RawParams::new())).unwrap();
        let names: Vec<_> = next.exiting().iter().map(|s| s.name().to_string()).collect();

        assert_eq!(names, vec!["app.users.detail", "app.users"]);
        assert_eq!(next.retained().len(), 1);
        assert!(next.entering().is_empty());
    }

    #[tokio::test]
    async fn dynamic_param_change_is_ignored() {
        let service = service();
        service.go(target("app.users", params! { "page" => 1 }), &()).await.unwrap();

        let same = service.create(target("app.users", params! { "page" => 2 })).unwrap();
        let reload = service
            .create(
                target("app.users", params! { "page" => 2 })
                    .with_options(TransitionOptions::default().reload(Reload::All)),
            )
            .unwrap();

        assert!(same.ignored());
        assert!(!reload.ignored());
        assert_eq!(reload.entering().len(), 2);
    }

    #[test]
    fn unknown_reload_state_fails_creation() {
        let service = service();
        let err = service
            .create(
                target("app", RawParams::new())
                    .with_options(TransitionOptions::default().reload(Reload::State("nope".into()))),
            )
            .unwrap_err();

        assert_eq!(err, TransitionError::ReloadStateNotFound { name: "nope".into() });
    }

    #[test]
    fn views_flag_missing_content() {
        let service = service();
        let transition = service.create(target("app.users", RawParams::new())).unwrap();

        let views = transition.views(PathName::Entering, PathName::To);

        assert_eq!(views.len(), 2);
        assert!(views[0].validate().is_ok());
        assert_eq!(
            views[1].validate(),
            Err(HookError::InvalidView {
                state: "app.users".into(),
                view: "list".into()
            })
        );
    }

    fn names(path: &Path) -> Vec<String> {
        path.states().iter().map(|s| s.name().to_string()).collect()
    }

    #[tokio::test]
    async fn redirect_keeps_from_path_and_links_previous() {
        let service = service();
        service.go(target("app.users.detail", params! { "id" => 1 }), &()).await.unwrap();
        let original = service.create(target("app.users", RawParams::new())).unwrap();
        let options_before = original.options().clone();
        let exiting_before = names(original.path(PathName::Exiting));
        let entering_before = names(original.path(PathName::Entering));

        let redirected = original
            .redirect(
                target("app.users.detail", params! { "id" => 9 }),
                Some(TransitionOptions::default().reload(Reload::All).traced()),
            )
            .unwrap();

        assert_eq!(redirected.previous().map(|p| p.id()), Some(original.id()));
        let (before, after) = (original.path(PathName::From), redirected.path(PathName::From));
        assert_eq!(before.len(), after.len());
        assert!(before
            .nodes()
            .iter()
            .zip(after.nodes())
            .all(|(a, b)| same_state(a.state(), b.state())));
        assert_eq!(redirected.options().reload, Reload::All);
        assert_eq!(original.options(), &options_before);
        assert_eq!(original.to().name(), "app.users");
        assert_eq!(names(original.path(PathName::Exiting)), exiting_before);
        assert_eq!(names(original.path(PathName::Entering)), entering_before);
        assert_eq!(original.status(), TransitionStatus::Created);
        assert_eq!(redirected.params(PathName::To).get("id"), Some(&serde_json::json!(9)));
    }

    #[tokio::test]
    async fn running_twice_replays_nothing() {
        let service = service();
        let entered = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&entered);
        service.on_enter(
            MatchCriteria::any(),
            Callback::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                pure(HookResult::Continue).boxed()
            }),
            HookOptions::default(),
        );
        let transition = service.create(target("app", RawParams::new())).unwrap();

        let first = transition.run(&()).await.unwrap();
        let second = transition.run(&()).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(entered.load(Ordering::SeqCst), 1);
        assert_eq!(service.history().len(), 1);
        assert_eq!(transition.status(), TransitionStatus::Resolved);
    }

    #[test]
    fn is_matches_against_criteria() {
        let service = service();
        let transition = service.create(target("app.users", RawParams::new())).unwrap();

        assert!(transition.is(&MatchCriteria::any().to("app.*")));
        assert!(!transition.is(&MatchCriteria::any().from("app")));
        assert_eq!(transition.status(), TransitionStatus::Created);
    }
}

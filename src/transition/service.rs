//! The transition service: hook registration, transition creation and the
//! current position.

use super::{Completion, Rejection, TargetState, Transition, TransitionError};
use crate::config::RouterConfig;
use crate::core::{
    Environment, MatchCriteria, Path, RecordedOutcome, StateProvider, StateRef,
    TransitionHistory, TransitionRecord,
};
use crate::hooks::{Callback, Deregistration, HookOptions, HookPhase, HookRegistry, RegisteredHook};
use crate::trace::Tracer;
use chrono::Utc;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Handler called with a rejection no `onError` hook claimed.
pub type ErrorHandler = Arc<dyn Fn(&Rejection) + Send + Sync>;

struct ServiceInner<Env: Environment> {
    config: RouterConfig,
    provider: Arc<dyn StateProvider<Env> + Send + Sync>,
    registry: HookRegistry<Env>,
    tracer: Tracer,
    active: AtomicU64,
    next_id: AtomicU64,
    error_handler: RwLock<ErrorHandler>,
    current: RwLock<Path<Env>>,
    history: RwLock<TransitionHistory>,
}

/// Creates and runs transitions and tracks the committed position.
///
/// Cloning is cheap; clones share hooks, the current path and the active
/// transition token.
pub struct TransitionService<Env: Environment = ()> {
    inner: Arc<ServiceInner<Env>>,
}

fn default_error_handler() -> ErrorHandler {
    Arc::new(|rejection: &Rejection| {
        tracing::error!(%rejection, cause = ?rejection.cause, "unhandled transition rejection");
    })
}

macro_rules! hook_registration {
    ($($(#[$doc:meta])* $name:ident => $phase:expr;)*) => {
        $(
            $(#[$doc])*
            pub fn $name(
                &self,
                criteria: MatchCriteria<Env>,
                callback: Callback<Env>,
                options: HookOptions,
            ) -> Deregistration {
                self.inner.registry.register($phase, criteria, callback, options)
            }
        )*
    };
}

impl<Env: Environment> TransitionService<Env> {
    pub fn new<P>(provider: P, config: RouterConfig) -> Self
    where
        P: StateProvider<Env> + Send + Sync + 'static,
    {
        Self::with_tracer(provider, config, Tracer::disabled())
    }

    /// A service whose trace events go to `tracer`'s sink.
    pub fn with_tracer<P>(provider: P, config: RouterConfig, tracer: Tracer) -> Self
    where
        P: StateProvider<Env> + Send + Sync + 'static,
    {
        let registry = HookRegistry::new(config.default_priority);
        Self {
            inner: Arc::new(ServiceInner {
                config,
                provider: Arc::new(provider),
                registry,
                tracer,
                active: AtomicU64::new(0),
                next_id: AtomicU64::new(1),
                error_handler: RwLock::new(default_error_handler()),
                current: RwLock::new(Path::empty()),
                history: RwLock::new(TransitionHistory::new()),
            }),
        }
    }

    hook_registration! {
        /// Synchronous hooks run before anything else; they may cancel or redirect.
        on_before => HookPhase::OnBefore;
        on_start => HookPhase::OnStart;
        on => HookPhase::On;
        /// Run once per entering state, root first.
        on_enter => HookPhase::OnEnter;
        on_retain => HookPhase::OnRetain;
        /// Run once per exiting state, leaf first.
        on_exit => HookPhase::OnExit;
        on_finish => HookPhase::OnFinish;
        on_success => HookPhase::OnSuccess;
        on_error => HookPhase::OnError;
    }

    /// Registered hooks of one phase, in execution order.
    pub fn get_hooks(&self, phase: HookPhase) -> Vec<RegisteredHook<Env>> {
        self.inner.registry.hooks_for(phase)
    }

    pub fn set_default_error_handler<F>(&self, handler: F)
    where
        F: Fn(&Rejection) + Send + Sync + 'static,
    {
        *self
            .inner
            .error_handler
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(handler);
    }

    /// A transition from the current path towards `target`.
    pub fn create(&self, target: TargetState) -> Result<Arc<Transition<Env>>, TransitionError> {
        let from = self.current_path();
        self.create_from(&from, target)
    }

    pub fn create_from(
        &self,
        from: &Path<Env>,
        target: TargetState,
    ) -> Result<Arc<Transition<Env>>, TransitionError> {
        Transition::create(self, from, target, None).map(Arc::new)
    }

    /// Create a transition from the current path and run it.
    ///
    /// Resolves with the final outcome of the redirect chain.
    pub async fn go(&self, target: TargetState, env: &Env) -> Completion<Env> {
        let transition = self.create(target).map_err(Rejection::transition)?;
        transition.run(env).await
    }

    pub fn current_path(&self) -> Path<Env> {
        self.inner
            .current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Leaf of the current path.
    pub fn current_state(&self) -> Option<StateRef<Env>> {
        self.current_path().last().map(|node| Arc::clone(node.state()))
    }

    pub fn history(&self) -> TransitionHistory {
        self.inner
            .history
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn config(&self) -> &RouterConfig {
        &self.inner.config
    }

    /// Id of the transition currently allowed to commit.
    pub fn active_id(&self) -> Option<u64> {
        match self.inner.active.load(Ordering::SeqCst) {
            0 => None,
            id => Some(id),
        }
    }

    /// Replace the current path without running a transition.
    pub(crate) fn replace_current(&self, path: Path<Env>) {
        *self
            .inner
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = path;
    }

    pub(crate) fn provider(&self) -> &(dyn StateProvider<Env> + Send + Sync) {
        self.inner.provider.as_ref()
    }

    pub(crate) fn state(&self, name: &str) -> Option<StateRef<Env>> {
        self.inner.provider.state(name)
    }

    pub(crate) fn registry(&self) -> &HookRegistry<Env> {
        &self.inner.registry
    }

    pub(crate) fn tracer(&self) -> Tracer {
        self.inner.tracer.clone()
    }

    pub(crate) fn next_id(&self) -> u64 {
        self.inner.next_id.fetch_add(1, Ordering::SeqCst)
    }

    pub(crate) fn activate(&self, id: u64) {
        self.inner.active.store(id, Ordering::SeqCst);
    }

    pub(crate) fn clear_active(&self) {
        self.inner.active.store(0, Ordering::SeqCst);
    }

    /// Commit `path` if `id` is still the active transition.
    pub(crate) fn commit(&self, id: u64, path: &Path<Env>) -> bool {
        let mut current = self
            .inner
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if self.inner.active.load(Ordering::SeqCst) != id {
            return false;
        }
        *current = path.clone();
        true
    }

    pub(crate) fn record(&self, transition: &Transition<Env>, outcome: RecordedOutcome) {
        let record = TransitionRecord {
            id: transition.id(),
            from: transition.from().map(|s| s.name().to_string()),
            to: transition.to().name().to_string(),
            params: transition.params(super::PathName::To),
            outcome,
            timestamp: Utc::now(),
        };
        let mut history = self
            .inner
            .history
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let max = self.inner.config.max_history;
        *history = std::mem::take(&mut *history).record_bounded(record, max);
    }

    pub(crate) fn handle_error(&self, rejection: &Rejection) {
        let handler = Arc::clone(
            &self
                .inner
                .error_handler
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        );
        handler(rejection);
    }
}

impl<Env: Environment> Clone for TransitionService<Env> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<Env: Environment> fmt::Debug for TransitionService<Env> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionService")
            .field("config", &self.inner.config)
            .field("hooks", &self.inner.registry)
            .field("active", &self.active_id())
            .field("current", &self.current_state().map(|s| s.name().to_string()))
            .finish()
    }
}

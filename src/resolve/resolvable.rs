//! Lazily evaluated, memoized dependency values.

use super::context::{Locals, ResolveContext};
use super::error::ResolveError;
use super::graph::find_cycle;
use crate::core::Environment;
use crate::hooks::panic_message;
use crate::trace::{TraceEvent, Tracer};
use futures_util::future::{try_join_all, BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use stillwater::effect::{BoxedEffect, Effect};

/// Name of the literal resolvable every materialized node is seeded with.
pub const STATE_PARAMS: &str = "$stateParams";

/// Type-erased resolved value.
pub type ResolvedData = Arc<dyn Any + Send + Sync>;

pub type ResolveResult = Result<ResolvedData, ResolveError>;

/// Factory producing a fresh effect for one evaluation.
pub type ResolveFn<Env> =
    Arc<dyn Fn(Locals) -> BoxedEffect<ResolvedData, ResolveError, Env> + Send + Sync>;

/// Handle shared by every awaiter of one evaluation.
pub type SharedResolve = Shared<BoxFuture<'static, ResolveResult>>;

/// Wrap a value as resolved data.
pub fn resolved<T: Any + Send + Sync>(value: T) -> ResolvedData {
    Arc::new(value)
}

/// When a resolvable is evaluated during a transition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolvePolicy {
    /// Resolved when its node is entered
    #[default]
    Lazy,
    /// Resolved up front, before any state is exited or entered
    Eager,
}

/// Completion state of a resolvable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolveStatus {
    Unresolved,
    Pending,
    Resolved,
    Failed,
}

enum Source<Env: Environment> {
    Factory(ResolveFn<Env>),
    Value(ResolvedData),
}

impl<Env: Environment> Clone for Source<Env> {
    fn clone(&self) -> Self {
        match self {
            Source::Factory(factory) => Source::Factory(Arc::clone(factory)),
            Source::Value(value) => Source::Value(Arc::clone(value)),
        }
    }
}

/// A state's declared resolve: name, dependency names and factory.
///
/// Declarations are immutable; every transition that enters the state
/// builds a fresh [`Resolvable`] from them.
pub struct ResolveDeclaration<Env: Environment = ()> {
    name: String,
    deps: Vec<String>,
    source: Source<Env>,
    policy: ResolvePolicy,
}

impl<Env: Environment> ResolveDeclaration<Env> {
    pub fn new<I, S, F>(name: impl Into<String>, deps: I, factory: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(Locals) -> BoxedEffect<ResolvedData, ResolveError, Env> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            deps: deps.into_iter().map(Into::into).collect(),
            source: Source::Factory(Arc::new(factory)),
            policy: ResolvePolicy::Lazy,
        }
    }

    /// A declaration whose value is known up front.
    pub fn value(name: impl Into<String>, data: ResolvedData) -> Self {
        Self {
            name: name.into(),
            deps: Vec::new(),
            source: Source::Value(data),
            policy: ResolvePolicy::Lazy,
        }
    }

    pub fn eager(mut self) -> Self {
        self.policy = ResolvePolicy::Eager;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn deps(&self) -> &[String] {
        &self.deps
    }

    pub fn policy(&self) -> ResolvePolicy {
        self.policy
    }
}

impl<Env: Environment> Clone for ResolveDeclaration<Env> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            deps: self.deps.clone(),
            source: self.source.clone(),
            policy: self.policy,
        }
    }
}

impl<Env: Environment> fmt::Debug for ResolveDeclaration<Env> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveDeclaration")
            .field("name", &self.name)
            .field("deps", &self.deps)
            .field("policy", &self.policy)
            .finish()
    }
}

/// Options threaded through a resolve.
#[derive(Clone, Debug, Default)]
pub struct ResolveOptions {
    pub tracer: Tracer,
    /// Id of the transition driving the resolve, for trace events
    pub transition: Option<u64>,
}

/// A named, lazily evaluated value evaluated at most once.
///
/// The first [`get`](Resolvable::get) starts evaluation; every later call,
/// concurrent or not, receives the same shared handle. A failure is cached
/// just like a value.
pub struct Resolvable<Env: Environment = ()> {
    name: String,
    deps: Vec<String>,
    policy: ResolvePolicy,
    source: Source<Env>,
    slot: Mutex<Option<SharedResolve>>,
}

impl<Env: Environment> Resolvable<Env> {
    /// Fresh, unresolved resolvable for `decl`.
    pub fn new(decl: &ResolveDeclaration<Env>) -> Self {
        let slot = match &decl.source {
            Source::Value(data) => Some(ready(Ok(Arc::clone(data)))),
            Source::Factory(_) => None,
        };
        Self {
            name: decl.name.clone(),
            deps: decl.deps.clone(),
            policy: decl.policy,
            source: decl.source.clone(),
            slot: Mutex::new(slot),
        }
    }

    /// Pre-seeded resolvable holding a literal value.
    pub fn from_value(name: impl Into<String>, data: ResolvedData) -> Self {
        Self::new(&ResolveDeclaration::value(name, data))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn deps(&self) -> &[String] {
        &self.deps
    }

    pub fn policy(&self) -> ResolvePolicy {
        self.policy
    }

    pub fn status(&self) -> ResolveStatus {
        match self.lock().as_ref() {
            None => ResolveStatus::Unresolved,
            Some(shared) => match shared.peek() {
                None => ResolveStatus::Pending,
                Some(Ok(_)) => ResolveStatus::Resolved,
                Some(Err(_)) => ResolveStatus::Failed,
            },
        }
    }

    /// The resolved value, once available.
    pub fn data(&self) -> Option<ResolvedData> {
        self.lock()
            .as_ref()
            .and_then(|shared| shared.peek().cloned())
            .and_then(Result::ok)
    }

    /// The cached failure, if evaluation failed.
    pub fn error(&self) -> Option<ResolveError> {
        self.lock()
            .as_ref()
            .and_then(|shared| shared.peek().cloned())
            .and_then(Result::err)
    }

    /// Return the existing evaluation or start one within `context`.
    ///
    /// Dependencies are looked up in `context` truncated at the node that
    /// declares this resolvable, with this resolvable's own name omitted
    /// from that node.
    pub fn get(
        self: &Arc<Self>,
        context: &ResolveContext<Env>,
        env: &Env,
        options: &ResolveOptions,
    ) -> SharedResolve {
        let mut slot = self.lock();
        if let Some(existing) = slot.as_ref() {
            return existing.clone();
        }
        let evaluation = Arc::clone(self)
            .evaluate(context.clone(), env.clone(), options.clone())
            .shared();
        *slot = Some(evaluation.clone());
        evaluation
    }

    fn evaluate(
        self: Arc<Self>,
        context: ResolveContext<Env>,
        env: Env,
        options: ResolveOptions,
    ) -> BoxFuture<'static, ResolveResult> {
        async move {
            options.tracer.emit(TraceEvent::ResolveStart {
                transition: options.transition,
                name: self.name.clone(),
            });
            tracing::debug!(resolvable = %self.name, "resolve started");

            let result = self.run_factory(&context, &env, &options).await;

            options.tracer.emit(TraceEvent::ResolveEnd {
                transition: options.transition,
                name: self.name.clone(),
                ok: result.is_ok(),
            });
            tracing::debug!(resolvable = %self.name, ok = result.is_ok(), "resolve finished");
            result
        }
        .boxed()
    }

    async fn run_factory(
        self: &Arc<Self>,
        context: &ResolveContext<Env>,
        env: &Env,
        options: &ResolveOptions,
    ) -> ResolveResult {
        let factory = match &self.source {
            Source::Factory(factory) => Arc::clone(factory),
            Source::Value(data) => return Ok(Arc::clone(data)),
        };
        if let Some(cycle) = find_cycle(context, self) {
            return Err(ResolveError::Cycle { cycle });
        }

        let scope = context.scope_for(self);
        let visible = scope.resolvables(None, &[self.name.as_str()]);
        let pending: Vec<_> = self
            .deps
            .iter()
            .filter_map(|dep| match visible.get(dep) {
                Some(resolvable) => {
                    let name = dep.clone();
                    let value = resolvable.get(&scope, env, options);
                    Some(value.map(move |result: ResolveResult| result.map(|data| (name, data))).boxed())
                }
                None => {
                    tracing::warn!(resolvable = %self.name, dependency = %dep, "dependency not visible");
                    None
                }
            })
            .collect();
        let locals = Locals::new(try_join_all(pending).await?);

        let evaluation = AssertUnwindSafe(async { factory(locals).run(env).await });
        match evaluation.catch_unwind().await {
            Ok(result) => result.map_err(|err| err.within(&self.name)),
            Err(payload) => Err(ResolveError::Panicked {
                name: self.name.clone(),
                message: panic_message(payload.as_ref()),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<SharedResolve>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn ready(result: ResolveResult) -> SharedResolve {
    futures_util::future::ready(result).boxed().shared()
}

impl<Env: Environment> fmt::Debug for Resolvable<Env> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolvable")
            .field("name", &self.name)
            .field("deps", &self.deps)
            .field("policy", &self.policy)
            .field("status", &self.status())
            .finish()
    }
}

impl<Env: Environment> fmt::Display for Resolvable<Env> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Resolvable(name: {}, requires: [{}])", self.name, self.deps.join(","))
    }
}

//! Registered hooks, ordered by priority.

use super::{Callback, HookPhase};
use crate::core::{Environment, MatchCriteria, State};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

/// Per-registration options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookOptions {
    /// Higher runs first; unset uses the configured default
    #[serde(default)]
    pub priority: Option<i32>,
}

impl HookOptions {
    pub fn priority(priority: i32) -> Self {
        Self {
            priority: Some(priority),
        }
    }
}

/// A hook as stored in the registry.
pub struct RegisteredHook<Env: Environment = ()> {
    pub id: u64,
    pub phase: HookPhase,
    pub criteria: MatchCriteria<Env>,
    pub callback: Callback<Env>,
    pub priority: i32,
}

impl<Env: Environment> Clone for RegisteredHook<Env> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            phase: self.phase,
            criteria: self.criteria.clone(),
            callback: self.callback.clone(),
            priority: self.priority,
        }
    }
}

impl<Env: Environment> fmt::Debug for RegisteredHook<Env> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredHook")
            .field("id", &self.id)
            .field("phase", &self.phase)
            .field("criteria", &self.criteria)
            .field("priority", &self.priority)
            .finish()
    }
}

trait RemoveHook: Send + Sync {
    fn remove(&self, id: u64) -> bool;
}

struct RegistryInner<Env: Environment> {
    hooks: RwLock<Vec<RegisteredHook<Env>>>,
    next_id: AtomicU64,
}

impl<Env: Environment> RemoveHook for RegistryInner<Env> {
    fn remove(&self, id: u64) -> bool {
        let mut hooks = self.hooks.write().unwrap_or_else(PoisonError::into_inner);
        let before = hooks.len();
        hooks.retain(|hook| hook.id != id);
        hooks.len() != before
    }
}

/// Handle returned by registration; removes the hook when invoked.
///
/// Dropping the handle keeps the hook registered.
#[derive(Clone)]
pub struct Deregistration {
    id: u64,
    registry: Weak<dyn RemoveHook>,
}

impl Deregistration {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Remove the hook. Returns false if it was already removed.
    pub fn deregister(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.remove(self.id))
    }
}

impl fmt::Debug for Deregistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deregistration").field("id", &self.id).finish()
    }
}

/// Shared store of registered hooks.
pub struct HookRegistry<Env: Environment = ()> {
    inner: Arc<RegistryInner<Env>>,
    default_priority: i32,
}

impl<Env: Environment> HookRegistry<Env> {
    pub fn new(default_priority: i32) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                hooks: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
            default_priority,
        }
    }

    pub fn register(
        &self,
        phase: HookPhase,
        criteria: MatchCriteria<Env>,
        callback: Callback<Env>,
        options: HookOptions,
    ) -> Deregistration {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let hook = RegisteredHook {
            id,
            phase,
            criteria,
            callback,
            priority: options.priority.unwrap_or(self.default_priority),
        };
        self.inner
            .hooks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(hook);
        tracing::debug!(hook = id, %phase, "hook registered");

        let inner: Arc<dyn RemoveHook> = self.inner.clone();
        Deregistration {
            id,
            registry: Arc::downgrade(&inner),
        }
    }

    /// Hooks of `phase`, highest priority first, registration order on ties.
    pub fn hooks_for(&self, phase: HookPhase) -> Vec<RegisteredHook<Env>> {
        let mut hooks: Vec<_> = self
            .inner
            .hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|hook| hook.phase == phase)
            .cloned()
            .collect();
        hooks.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));
        hooks
    }

    /// Hooks of `phase` whose criteria match the `(to, from)` pair.
    pub fn matching(
        &self,
        phase: HookPhase,
        to: Option<&State<Env>>,
        from: Option<&State<Env>>,
    ) -> Vec<RegisteredHook<Env>> {
        self.hooks_for(phase)
            .into_iter()
            .filter(|hook| hook.criteria.matches(to, from))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner
            .hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<Env: Environment> Clone for HookRegistry<Env> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            default_priority: self.default_priority,
        }
    }
}

impl<Env: Environment> Default for HookRegistry<Env> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<Env: Environment> fmt::Debug for HookRegistry<Env> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("hooks", &self.len())
            .field("default_priority", &self.default_priority)
            .finish()
    }
}

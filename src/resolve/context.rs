//! Path-scoped lookup of resolvables and the locals handed to callbacks.

use super::error::ResolveError;
use super::resolvable::{Resolvable, ResolveOptions, ResolvePolicy, ResolvedData};
use crate::core::{Environment, Path, StateRef};
use futures_util::future::try_join_all;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Resolved dependency values, in declared order.
#[derive(Clone, Default)]
pub struct Locals {
    entries: Vec<(String, ResolvedData)>,
}

impl Locals {
    pub fn new(entries: Vec<(String, ResolvedData)>) -> Self {
        Self { entries }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Typed access by dependency name.
    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        self.raw(name).and_then(|data| data.downcast_ref::<T>())
    }

    pub fn raw(&self, name: &str) -> Option<&ResolvedData> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, data)| data)
    }

    /// Positional access.
    pub fn at(&self, index: usize) -> Option<&ResolvedData> {
        self.entries.get(index).map(|(_, data)| data)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.raw(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Locals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Read-only view of the resolvables visible along a path.
///
/// A node's own resolvable shadows an ancestor's resolvable of the same
/// name.
pub struct ResolveContext<Env: Environment = ()> {
    path: Path<Env>,
}

impl<Env: Environment> ResolveContext<Env> {
    pub fn new(path: Path<Env>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path<Env> {
        &self.path
    }

    /// Shadowed name map of the resolvables visible at `to` (or the leaf).
    ///
    /// Names in `omit_own_locals` are skipped on that last node only, so an
    /// ancestor's resolvable of the same name stays visible.
    pub fn resolvables(
        &self,
        to: Option<&StateRef<Env>>,
        omit_own_locals: &[&str],
    ) -> BTreeMap<String, Arc<Resolvable<Env>>> {
        let path = match to {
            Some(state) => self.path.path_from_root_to(state),
            None => self.path.clone(),
        };
        let last = path.len().saturating_sub(1);
        let mut visible = BTreeMap::new();
        for (idx, node) in path.nodes().iter().enumerate() {
            for resolvable in node.resolvables() {
                if idx == last && omit_own_locals.contains(&resolvable.name()) {
                    continue;
                }
                visible.insert(resolvable.name().to_string(), Arc::clone(resolvable));
            }
        }
        visible
    }

    /// Context truncated at `state`, hiding siblings and descendants.
    pub fn isolate_root_to(&self, state: &StateRef<Env>) -> Self {
        Self::new(self.path.path_from_root_to(state))
    }

    /// Context truncated at the node declaring `resolvable`.
    ///
    /// Unchanged when no node of this context owns it.
    pub fn scope_for(&self, resolvable: &Arc<Resolvable<Env>>) -> Self {
        let owner = self
            .path
            .nodes()
            .iter()
            .position(|node| node.resolvables().iter().any(|r| Arc::ptr_eq(r, resolvable)));
        match owner {
            Some(idx) => Self::new(self.path.slice(..=idx)),
            None => self.clone(),
        }
    }

    /// The declared dependencies of `resolvable` that are visible to it.
    pub fn dependencies_of(&self, resolvable: &Arc<Resolvable<Env>>) -> Vec<Arc<Resolvable<Env>>> {
        let visible = self
            .scope_for(resolvable)
            .resolvables(None, &[resolvable.name()]);
        resolvable
            .deps()
            .iter()
            .filter_map(|dep| visible.get(dep).cloned())
            .collect()
    }

    /// Resolve the named dependencies against the whole context.
    ///
    /// Names with no visible resolvable are skipped.
    pub async fn resolve_locals(
        &self,
        deps: &[String],
        env: &Env,
        options: &ResolveOptions,
    ) -> Result<Locals, ResolveError> {
        let visible = self.resolvables(None, &[]);
        let pending = deps.iter().filter_map(|dep| match visible.get(dep) {
            Some(resolvable) => {
                let value = resolvable.get(self, env, options);
                let name = dep.clone();
                Some(async move { value.await.map(|data| (name, data)) })
            }
            None => {
                tracing::warn!(dependency = %dep, "dependency not visible in resolve context");
                None
            }
        });
        try_join_all(pending).await.map(Locals::new)
    }

    /// Resolve `deps` and hand them to `f`.
    pub async fn invoke_later<T, F>(
        &self,
        deps: &[String],
        f: F,
        env: &Env,
        options: &ResolveOptions,
    ) -> Result<T, ResolveError>
    where
        F: FnOnce(Locals) -> T,
    {
        self.resolve_locals(deps, env, options).await.map(f)
    }

    /// Resolve every visible resolvable, optionally restricted to one policy.
    pub async fn resolve_path(
        &self,
        policy: Option<ResolvePolicy>,
        env: &Env,
        options: &ResolveOptions,
    ) -> Result<(), ResolveError> {
        let pending = self
            .resolvables(None, &[])
            .into_values()
            .filter(|r| policy.is_none_or(|p| r.policy() == p))
            .map(|r| r.get(self, env, options));
        try_join_all(pending).await.map(|_| ())
    }

    /// Resolve the resolvables declared on the leaf node.
    pub async fn resolve_node(&self, env: &Env, options: &ResolveOptions) -> Result<(), ResolveError> {
        let Some(leaf) = self.path.last() else {
            return Ok(());
        };
        let pending = leaf.resolvables().iter().map(|r| r.get(self, env, options));
        try_join_all(pending).await.map(|_| ())
    }
}

impl<Env: Environment> Clone for ResolveContext<Env> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
        }
    }
}

impl<Env: Environment> fmt::Debug for ResolveContext<Env> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveContext").field("path", &self.path).finish()
    }
}

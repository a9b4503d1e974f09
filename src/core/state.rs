//! Registered states and the provider interface that looks them up.
//!
//! A [`State`] is immutable once registered. States form a tree through
//! their parent reference; two states are the same state only when they
//! are the same registered instance.

use crate::core::params::ParamSpecs;
use crate::hooks::Callback;
use crate::resolve::ResolveDeclaration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Bounds required of the environment that hook and resolve effects run in.
///
/// The environment is opaque to the engine: it is only ever handed to
/// `Effect::run`.
pub trait Environment: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Environment for T {}

/// Shared handle to a registered state.
pub type StateRef<Env = ()> = Arc<State<Env>>;

/// View declaration carried by a state for the rendering layer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewDeclaration {
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub template_url: Option<String>,
    #[serde(default)]
    pub controller: Option<String>,
    #[serde(default)]
    pub component: Option<String>,
}

impl ViewDeclaration {
    pub fn template(template: impl Into<String>) -> Self {
        Self {
            template: Some(template.into()),
            ..Self::default()
        }
    }

    pub fn component(component: impl Into<String>) -> Self {
        Self {
            component: Some(component.into()),
            ..Self::default()
        }
    }

    pub fn with_controller(mut self, controller: impl Into<String>) -> Self {
        self.controller = Some(controller.into());
        self
    }

    /// True when the view can be rendered at all.
    pub fn has_content(&self) -> bool {
        self.template.is_some() || self.template_url.is_some() || self.component.is_some()
    }
}

/// A node of the declared navigation tree.
pub struct State<Env: Environment = ()> {
    pub(crate) name: String,
    pub(crate) parent: Option<StateRef<Env>>,
    pub(crate) params: ParamSpecs,
    pub(crate) resolves: Vec<ResolveDeclaration<Env>>,
    pub(crate) views: BTreeMap<String, ViewDeclaration>,
    pub(crate) on_enter: Option<Callback<Env>>,
    pub(crate) on_exit: Option<Callback<Env>>,
    pub(crate) on_retain: Option<Callback<Env>>,
}

impl<Env: Environment> State<Env> {
    /// Fully qualified, dot separated state name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&StateRef<Env>> {
        self.parent.as_ref()
    }

    /// Params declared by this state itself (not its ancestors).
    pub fn params(&self) -> &ParamSpecs {
        &self.params
    }

    pub fn resolves(&self) -> &[ResolveDeclaration<Env>] {
        &self.resolves
    }

    pub fn views(&self) -> &BTreeMap<String, ViewDeclaration> {
        &self.views
    }

    pub fn on_enter(&self) -> Option<&Callback<Env>> {
        self.on_enter.as_ref()
    }

    pub fn on_exit(&self) -> Option<&Callback<Env>> {
        self.on_exit.as_ref()
    }

    pub fn on_retain(&self) -> Option<&Callback<Env>> {
        self.on_retain.as_ref()
    }

    /// Number of ancestors above this state.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.parent.as_ref();
        while let Some(parent) = current {
            depth += 1;
            current = parent.parent.as_ref();
        }
        depth
    }

    /// True when `self` is `other` or one of its ancestors.
    pub fn includes(&self, other: &State<Env>) -> bool {
        let mut current = Some(other);
        while let Some(state) = current {
            if std::ptr::eq(state, self) {
                return true;
            }
            current = state.parent.as_deref();
        }
        false
    }
}

/// Root-first chain of states ending at `state`.
pub fn ancestry<Env: Environment>(state: &StateRef<Env>) -> Vec<StateRef<Env>> {
    let mut chain = vec![Arc::clone(state)];
    let mut current = state.parent.clone();
    while let Some(parent) = current {
        current = parent.parent.clone();
        chain.push(parent);
    }
    chain.reverse();
    chain
}

/// Identity comparison of registered states.
pub fn same_state<Env: Environment>(a: &StateRef<Env>, b: &StateRef<Env>) -> bool {
    Arc::ptr_eq(a, b)
}

impl<Env: Environment> fmt::Debug for State<Env> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name.as_str()))
            .field("params", &self.params)
            .field(
                "resolves",
                &self.resolves.iter().map(|r| r.name()).collect::<Vec<_>>(),
            )
            .field("views", &self.views.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<Env: Environment> fmt::Display for State<Env> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Synchronous lookup of registered states by name.
///
/// The engine never registers states itself; it only consumes them.
pub trait StateProvider<Env: Environment = ()> {
    fn state(&self, name: &str) -> Option<StateRef<Env>>;
}

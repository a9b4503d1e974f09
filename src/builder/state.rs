//! Fluent builder for state declarations.

use crate::core::{Environment, ParamSpec, ViewDeclaration};
use crate::hooks::Callback;
use crate::resolve::ResolveDeclaration;
use std::collections::BTreeMap;

/// Builder for a single state declaration.
///
/// The parent defaults to the dotted prefix of the name (`app.users` has
/// parent `app`) unless set explicitly.
///
/// # Example
///
/// ```rust
/// use waypoint::builder::StateBuilder;
/// use waypoint::core::{ParamSpec, ViewDeclaration};
///
/// let builder: StateBuilder = StateBuilder::new("app.users.detail")
///     .param(ParamSpec::new("id"))
///     .view("main", ViewDeclaration::component("user-detail"));
///
/// assert_eq!(builder.parent_name(), Some("app.users"));
/// ```
pub struct StateBuilder<Env: Environment = ()> {
    pub(crate) name: String,
    pub(crate) parent: Option<String>,
    pub(crate) params: Vec<ParamSpec>,
    pub(crate) resolves: Vec<ResolveDeclaration<Env>>,
    pub(crate) views: BTreeMap<String, ViewDeclaration>,
    pub(crate) on_enter: Option<Callback<Env>>,
    pub(crate) on_exit: Option<Callback<Env>>,
    pub(crate) on_retain: Option<Callback<Env>>,
}

impl<Env: Environment> StateBuilder<Env> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            params: Vec::new(),
            resolves: Vec::new(),
            views: BTreeMap::new(),
            on_enter: None,
            on_exit: None,
            on_retain: None,
        }
    }

    /// Set the parent explicitly.
    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    pub fn resolve(mut self, declaration: ResolveDeclaration<Env>) -> Self {
        self.resolves.push(declaration);
        self
    }

    pub fn view(mut self, name: impl Into<String>, view: ViewDeclaration) -> Self {
        self.views.insert(name.into(), view);
        self
    }

    pub fn on_enter(mut self, callback: Callback<Env>) -> Self {
        self.on_enter = Some(callback);
        self
    }

    pub fn on_exit(mut self, callback: Callback<Env>) -> Self {
        self.on_exit = Some(callback);
        self
    }

    pub fn on_retain(mut self, callback: Callback<Env>) -> Self {
        self.on_retain = Some(callback);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Explicit parent, or the dotted prefix of the name.
    pub fn parent_name(&self) -> Option<&str> {
        self.parent
            .as_deref()
            .or_else(|| self.name.rsplit_once('.').map(|(prefix, _)| prefix))
    }
}

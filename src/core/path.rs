//! Nodes and paths: one full navigation position, root first.
//!
//! Paths are values. Slicing, concatenating and adapting always build a new
//! path and never touch the nodes of the original.

use super::params::RawParams;
use super::state::{ancestry, same_state, Environment, StateRef};
use crate::resolve::{resolved, Resolvable, STATE_PARAMS};
use std::fmt;
use std::ops::{Bound, RangeBounds};
use std::sync::Arc;

/// One `(state, param values, resolvables)` triple within a path.
///
/// Cloning a node shares its resolvables, so a retained node keeps the
/// values its resolvables already produced.
pub struct Node<Env: Environment = ()> {
    state: StateRef<Env>,
    params: RawParams,
    resolvables: Arc<Vec<Arc<Resolvable<Env>>>>,
}

impl<Env: Environment> Node<Env> {
    /// A bare param node with no resolvables.
    pub fn new(state: StateRef<Env>, params: RawParams) -> Self {
        Self {
            state,
            params,
            resolvables: Arc::new(Vec::new()),
        }
    }

    /// A node carrying the given resolvables.
    pub fn with_resolvables(
        state: StateRef<Env>,
        params: RawParams,
        resolvables: Vec<Arc<Resolvable<Env>>>,
    ) -> Self {
        Self {
            state,
            params,
            resolvables: Arc::new(resolvables),
        }
    }

    pub fn state(&self) -> &StateRef<Env> {
        &self.state
    }

    /// The state's own param values at this node.
    pub fn params(&self) -> &RawParams {
        &self.params
    }

    pub fn resolvables(&self) -> &[Arc<Resolvable<Env>>] {
        &self.resolvables
    }

    pub fn resolvable(&self, name: &str) -> Option<&Arc<Resolvable<Env>>> {
        self.resolvables.iter().find(|r| r.name() == name)
    }

    /// Same state and resolvables, different param values.
    pub fn with_params(&self, params: RawParams) -> Self {
        Self {
            state: Arc::clone(&self.state),
            params,
            resolvables: Arc::clone(&self.resolvables),
        }
    }

    /// Build fresh resolvables from the state's declarations.
    ///
    /// `path_params` are the merged values from the root down to this node;
    /// they are pre-seeded as the literal `$stateParams` resolvable.
    pub fn materialize(&self, path_params: &RawParams) -> Self {
        let mut resolvables: Vec<Arc<Resolvable<Env>>> = self
            .state
            .resolves()
            .iter()
            .map(|decl| Arc::new(Resolvable::new(decl)))
            .collect();
        if !resolvables.iter().any(|r| r.name() == STATE_PARAMS) {
            resolvables.push(Arc::new(Resolvable::from_value(
                STATE_PARAMS,
                resolved(path_params.clone()),
            )));
        }
        Self::with_resolvables(Arc::clone(&self.state), self.params.clone(), resolvables)
    }
}

impl<Env: Environment> Clone for Node<Env> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            params: self.params.clone(),
            resolvables: Arc::clone(&self.resolvables),
        }
    }
}

impl<Env: Environment> fmt::Debug for Node<Env> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("state", &self.state.name())
            .field("params", &self.params)
            .field(
                "resolvables",
                &self.resolvables.iter().map(|r| r.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Ordered root-to-leaf sequence of nodes.
pub struct Path<Env: Environment = ()> {
    nodes: Vec<Node<Env>>,
}

impl<Env: Environment> Path<Env> {
    pub fn new(nodes: Vec<Node<Env>>) -> Self {
        Self { nodes }
    }

    pub fn empty() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Param path from the root to `state`, distributing `params` to the
    /// states that declare them.
    ///
    /// Params missing from `params` are taken from `inherit` (when given),
    /// then from declared defaults.
    pub fn from_target(state: &StateRef<Env>, params: &RawParams, inherit: Option<&Path<Env>>) -> Self {
        let inherited = inherit.map(Path::param_values);
        let nodes = ancestry(state)
            .into_iter()
            .map(|state| {
                let own = state.params().values_from(params, inherited.as_ref());
                Node::new(state, own)
            })
            .collect();
        Self { nodes }
    }

    pub fn nodes(&self) -> &[Node<Env>] {
        &self.nodes
    }

    pub fn states(&self) -> Vec<StateRef<Env>> {
        self.nodes.iter().map(|n| Arc::clone(n.state())).collect()
    }

    pub fn first(&self) -> Option<&Node<Env>> {
        self.nodes.first()
    }

    pub fn last(&self) -> Option<&Node<Env>> {
        self.nodes.last()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Sub-path over `range`, clamped to the path's length.
    pub fn slice<R: RangeBounds<usize>>(&self, range: R) -> Self {
        let len = self.nodes.len();
        let end = match range.end_bound() {
            Bound::Included(&end) => end.saturating_add(1),
            Bound::Excluded(&end) => end,
            Bound::Unbounded => len,
        }
        .min(len);
        let start = match range.start_bound() {
            Bound::Included(&start) => start,
            Bound::Excluded(&start) => start.saturating_add(1),
            Bound::Unbounded => 0,
        }
        .min(end);
        Self {
            nodes: self.nodes[start..end].to_vec(),
        }
    }

    pub fn concat(&self, other: &Path<Env>) -> Self {
        let mut nodes = self.nodes.clone();
        nodes.extend(other.nodes.iter().cloned());
        Self { nodes }
    }

    /// Map every node through `f` (which also receives the node index).
    pub fn adapt<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&Node<Env>, usize) -> Node<Env>,
    {
        Self {
            nodes: self.nodes.iter().enumerate().map(|(i, n)| f(n, i)).collect(),
        }
    }

    /// Replace every node with a fresh resolve-bearing node.
    pub fn materialize(&self, base: &RawParams) -> Self {
        let mut merged = base.clone();
        self.adapt(|node, _| {
            merged = merged.merged(node.params());
            node.materialize(&merged)
        })
    }

    /// All param values of the path merged root to leaf.
    pub fn param_values(&self) -> RawParams {
        self.nodes
            .iter()
            .fold(RawParams::new(), |acc, node| acc.merged(node.params()))
    }

    pub fn index_of(&self, state: &StateRef<Env>) -> Option<usize> {
        self.nodes.iter().position(|n| same_state(n.state(), state))
    }

    /// The sub-path from the root down to and including `state`.
    ///
    /// Empty when `state` is not on this path.
    pub fn path_from_root_to(&self, state: &StateRef<Env>) -> Self {
        match self.index_of(state) {
            Some(idx) => self.slice(..=idx),
            None => Self::empty(),
        }
    }
}

impl<Env: Environment> Clone for Path<Env> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
        }
    }
}

impl<Env: Environment> Default for Path<Env> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<Env: Environment> fmt::Debug for Path<Env> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.nodes.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{StateBuilder, StateRegistry};
    use crate::core::{ParamSpec, StateProvider};
    use serde_json::json;

    fn registry() -> StateRegistry {
        let registry: StateRegistry = StateRegistry::new();
        registry
            .register(StateBuilder::new("app").param(ParamSpec::new("lang").with_default("en")))
            .unwrap();
        registry
            .register(StateBuilder::new("app.user").param(ParamSpec::new("id")))
            .unwrap();
        registry
            .register(StateBuilder::new("app.user.tab").param(ParamSpec::new("tab").dynamic()))
            .unwrap();
        registry
    }

    fn path(registry: &StateRegistry, params: RawParams) -> Path {
        let leaf = registry.state("app.user.tab").unwrap();
        Path::from_target(&leaf, &params, None)
    }

    #[test]
    fn from_target_distributes_params_to_declaring_states() {
        let registry = registry();
        let path = path(&registry, RawParams::new().with("id", 5).with("tab", "info"));

        assert_eq!(path.len(), 3);
        assert_eq!(path.nodes()[0].params().get("lang"), Some(&json!("en")));
        assert_eq!(path.nodes()[1].params().get("id"), Some(&json!(5)));
        assert!(!path.nodes()[1].params().contains("tab"));
        assert_eq!(path.nodes()[2].params().get("tab"), Some(&json!("info")));
    }

    #[test]
    fn slice_and_concat_build_new_paths() {
        let registry = registry();
        let path = path(&registry, RawParams::new().with("id", 1));

        let head = path.slice(..1);
        let tail = path.slice(1..);
        let joined = head.concat(&tail);

        assert_eq!(head.len(), 1);
        assert_eq!(tail.len(), 2);
        assert_eq!(joined.len(), path.len());
        assert_eq!(path.len(), 3);
        assert_eq!(
            joined.last().unwrap().state().name(),
            path.last().unwrap().state().name()
        );
    }

    #[test]
    fn slice_clamps_out_of_range_bounds() {
        let registry = registry();
        let path = path(&registry, RawParams::new().with("id", 1));

        assert_eq!(path.slice(1..10).len(), 2);
        assert!(path.slice(5..).is_empty());
        assert!(path.slice((Bound::Included(2), Bound::Excluded(1))).is_empty());
        assert_eq!(path.slice(..=1).len(), 2);
    }

    #[test]
    fn adapt_leaves_original_untouched() {
        let registry = registry();
        let path = path(&registry, RawParams::new().with("id", 1));

        let adapted = path.adapt(|node, _| node.with_params(RawParams::new().with("x", 1)));

        assert_eq!(adapted.nodes()[1].params().get("x"), Some(&json!(1)));
        assert_eq!(path.nodes()[1].params().get("id"), Some(&json!(1)));
    }

    #[test]
    fn materialize_seeds_merged_state_params() {
        let registry = registry();
        let path = path(&registry, RawParams::new().with("id", 9)).materialize(&RawParams::new());

        let seeded = path.nodes()[1].resolvable(STATE_PARAMS).unwrap();
        let params = seeded.data().unwrap();
        let params = params.downcast_ref::<RawParams>().unwrap();

        assert_eq!(params.get("lang"), Some(&json!("en")));
        assert_eq!(params.get("id"), Some(&json!(9)));
    }

    #[test]
    fn path_from_root_to_truncates_at_state() {
        let registry = registry();
        let path = path(&registry, RawParams::new());
        let user = registry.state("app.user").unwrap();
        let other: StateRegistry = StateRegistry::new();
        other.register(StateBuilder::new("elsewhere")).unwrap();

        assert_eq!(path.path_from_root_to(&user).len(), 2);
        assert!(path
            .path_from_root_to(&other.state("elsewhere").unwrap())
            .is_empty());
    }
}

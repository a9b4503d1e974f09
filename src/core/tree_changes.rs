//! Tree diffing between the current path and a target path.

use super::path::{Node, Path};
use super::state::{same_state, Environment, StateRef};

/// The derived paths of a transition.
///
/// `retained` is the common prefix of `from` and `to` (with `to`'s param
/// values applied), `exiting` the rest of `from` and `entering` the rest of
/// `to`. All paths are stored root to leaf.
pub struct TreeChanges<Env: Environment = ()> {
    pub from: Path<Env>,
    pub to: Path<Env>,
    pub retained: Path<Env>,
    pub exiting: Path<Env>,
    pub entering: Path<Env>,
}

impl<Env: Environment> TreeChanges<Env> {
    /// Diff `from` against the param path `to`.
    ///
    /// Retention stops at the first index where the `from` state is the
    /// reload state, the states differ, or a non-dynamic param differs.
    /// Entering nodes are materialized with fresh resolvables; retained
    /// nodes keep the resolvables they already had.
    pub fn calculate(from: &Path<Env>, to: &Path<Env>, reload_state: Option<&StateRef<Env>>) -> Self {
        let keep = retained_len(from, to, reload_state);

        let retained = from
            .slice(..keep)
            .adapt(|node, idx| node.with_params(to.nodes()[idx].params().clone()));
        let exiting = from.slice(keep..);
        let entering = to.slice(keep..).materialize(&retained.param_values());
        let to = retained.concat(&entering);

        Self {
            from: from.clone(),
            to,
            retained,
            exiting,
            entering,
        }
    }

    /// Leaf state of the `from` path, if any.
    pub fn from_state(&self) -> Option<&StateRef<Env>> {
        self.from.last().map(Node::state)
    }

    /// Leaf state of the `to` path.
    pub fn to_state(&self) -> Option<&StateRef<Env>> {
        self.to.last().map(Node::state)
    }
}

fn retained_len<Env: Environment>(
    from: &Path<Env>,
    to: &Path<Env>,
    reload_state: Option<&StateRef<Env>>,
) -> usize {
    from.nodes()
        .iter()
        .zip(to.nodes())
        .take_while(|(a, b)| {
            let reloading = reload_state.is_some_and(|reload| same_state(a.state(), reload));
            !reloading && nodes_match(a, b)
        })
        .count()
}

fn nodes_match<Env: Environment>(a: &Node<Env>, b: &Node<Env>) -> bool {
    same_state(a.state(), b.state()) && a.state().params().non_dynamic_equal(a.params(), b.params())
}

impl<Env: Environment> Clone for TreeChanges<Env> {
    fn clone(&self) -> Self {
        Self {
            from: self.from.clone(),
            to: self.to.clone(),
            retained: self.retained.clone(),
            exiting: self.exiting.clone(),
            entering: self.entering.clone(),
        }
    }
}

impl<Env: Environment> std::fmt::Debug for TreeChanges<Env> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeChanges")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("retained", &self.retained)
            .field("exiting", &self.exiting)
            .field("entering", &self.entering)
            .finish()
    }
}

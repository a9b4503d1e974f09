//! In-memory state registry.

use super::error::BuildError;
use super::state::StateBuilder;
use super::validation::validate;
use crate::core::{Environment, ParamSpecs, RawParams, State, StateProvider, StateRef};
use crate::transition::{TargetState, TransitionError};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use stillwater::validation::Validation;

/// Registry of built states, usable as the engine's [`StateProvider`].
///
/// Clones share the same set of states, so a registry handed to a
/// [`TransitionService`](crate::transition::TransitionService) still sees
/// states registered afterwards.
pub struct StateRegistry<Env: Environment = ()> {
    states: Arc<RwLock<BTreeMap<String, StateRef<Env>>>>,
}

impl<Env: Environment> StateRegistry<Env> {
    pub fn new() -> Self {
        Self {
            states: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Validate and register a state. The parent must already be registered.
    pub fn register(&self, builder: StateBuilder<Env>) -> Result<StateRef<Env>, BuildError> {
        let mut states = self.states.write().unwrap_or_else(PoisonError::into_inner);

        if let Validation::Failure(errors) = validate(&builder, |name| states.contains_key(name)) {
            return Err(BuildError::Invalid {
                state: builder.name.clone(),
                errors: errors.iter().cloned().collect(),
            });
        }

        let parent = match builder.parent_name() {
            Some(parent) => Some(states.get(parent).cloned().ok_or_else(|| {
                BuildError::UnknownParent {
                    state: builder.name.clone(),
                    parent: parent.to_string(),
                }
            })?),
            None => None,
        };

        let state = Arc::new(State {
            name: builder.name,
            parent,
            params: ParamSpecs::new(builder.params),
            resolves: builder.resolves,
            views: builder.views,
            on_enter: builder.on_enter,
            on_exit: builder.on_exit,
            on_retain: builder.on_retain,
        });
        tracing::debug!(state = %state.name(), "state registered");
        states.insert(state.name().to_string(), Arc::clone(&state));
        Ok(state)
    }

    /// Target for a registered state.
    pub fn target(&self, name: &str, params: RawParams) -> Result<TargetState, TransitionError> {
        if self.contains(name) {
            Ok(TargetState::new(name, params))
        } else {
            Err(TransitionError::UnknownState {
                name: name.to_string(),
            })
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<Env: Environment> StateProvider<Env> for StateRegistry<Env> {
    fn state(&self, name: &str) -> Option<StateRef<Env>> {
        self.states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}

impl<Env: Environment> Clone for StateRegistry<Env> {
    fn clone(&self) -> Self {
        Self {
            states: Arc::clone(&self.states),
        }
    }
}

impl<Env: Environment> Default for StateRegistry<Env> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Env: Environment> fmt::Debug for StateRegistry<Env> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateRegistry")
            .field("states", &self.names())
            .finish()
    }
}

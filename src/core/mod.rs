//! Core navigation types and the tree-diff engine.
//!
//! This module contains the pure part of the engine:
//! - Param declarations and the param comparison service
//! - Registered states and hook match criteria
//! - Paths and nodes
//! - Tree changes between two paths
//! - Immutable transition history
//!
//! Nothing in here runs effects; the imperative shell lives in
//! [`crate::transition`].

mod history;
mod matcher;
mod params;
mod path;
mod state;
mod tree_changes;

pub use history::{RecordedOutcome, TransitionHistory, TransitionRecord};
pub use matcher::{MatchCriteria, StateMatcher, StatePredicate};
pub use params::{ParamSpec, ParamSpecs, RawParams};
pub use path::{Node, Path};
pub use state::{
    ancestry, same_state, Environment, State, StateProvider, StateRef, ViewDeclaration,
};
pub use tree_changes::TreeChanges;

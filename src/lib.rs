//! Waypoint: a hierarchical state-transition engine.
//!
//! Waypoint moves an application between positions in a tree of named
//! states. Pure data (params, paths, the tree diff) lives in [`core`]; the
//! imperative shell that runs hooks and resolves as Stillwater effects lives
//! in [`transition`].
//!
//! # Core Concepts
//!
//! - **State**: a node of the tree with params, resolves, views and
//!   lifecycle callbacks, declared through [`builder::StateBuilder`]
//! - **Path**: the root-to-leaf chain of states with their param values
//! - **Tree changes**: which states a transition exits, retains and enters
//! - **Resolves**: named asynchronous dependencies, memoized per node
//! - **Hooks**: callbacks registered per phase and matched by state criteria
//! - **Transition**: one navigation attempt, which can be ignored,
//!   superseded, cancelled, rejected or redirected
//!
//! # Example
//!
//! ```rust
//! use waypoint::builder::{StateBuilder, StateRegistry};
//! use waypoint::core::{MatchCriteria, ParamSpec};
//! use waypoint::hooks::{Callback, HookOptions, HookResult};
//! use waypoint::{params, RouterConfig, TargetState, TransitionService};
//! use stillwater::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let registry: StateRegistry = StateRegistry::new();
//! registry.register(StateBuilder::new("app")).unwrap();
//! registry
//!     .register(StateBuilder::new("app.user").param(ParamSpec::new("id")))
//!     .unwrap();
//!
//! let service = TransitionService::new(registry, RouterConfig::default());
//! service.on_enter(
//!     MatchCriteria::any().to("app.*"),
//!     Callback::new(|_| pure(HookResult::Continue).boxed()),
//!     HookOptions::default(),
//! );
//!
//! let user = service
//!     .go(TargetState::new("app.user", params! { "id" => 42 }), &())
//!     .await
//!     .unwrap();
//!
//! assert_eq!(user.name(), "app.user");
//! assert_eq!(service.history().visited(), vec!["app.user"]);
//! # }
//! ```

pub mod builder;
pub mod checkpoint;
pub mod config;
pub mod core;
pub mod hooks;
pub mod resolve;
pub mod trace;
pub mod transition;

// Re-export commonly used types
pub use builder::{StateBuilder, StateRegistry};
pub use checkpoint::PathSnapshot;
pub use config::RouterConfig;
pub use core::{MatchCriteria, ParamSpec, Path, RawParams, State, StateProvider, TreeChanges};
pub use hooks::{Callback, HookContext, HookPhase, HookResult};
pub use resolve::{Locals, ResolveDeclaration};
pub use transition::{
    Rejection, RejectionKind, TargetState, Transition, TransitionOptions, TransitionService,
};

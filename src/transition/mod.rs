//! Transitions: creation, the pipeline driver and completion signals.
//!
//! A [`Transition`] is one navigation attempt. Running it executes, in
//! order:
//!
//! 1. synchronous `onBefore` hooks
//! 2. `onStart` and `on` hooks
//! 3. eager resolves of the target path
//! 4. per exiting state (leaf first): `onExit` hooks, then the state's own callback
//! 5. per retained state: `onRetain` hooks, then the state's own callback
//! 6. per entering state (root first): the node's resolves, `onEnter` hooks,
//!    then the state's own callback
//! 7. `onFinish` hooks
//! 8. `onSuccess` or `onError` hooks
//!
//! Before every step the driver checks that no newer transition has started;
//! a superseded transition stops and rejects with
//! [`RejectionKind::Superseded`].

mod error;
mod navigation;
mod options;
mod pipeline;
mod rejection;
mod service;
mod signal;

pub use error::TransitionError;
pub use navigation::{Completion, Transition, TransitionStatus, ViewConfig};
pub use options::{PathName, Reload, TargetState, TransitionOptions};
pub use pipeline::{Pipeline, Step, StepOutcome};
pub use rejection::{Rejection, RejectionCause, RejectionKind};
pub use service::{ErrorHandler, TransitionService};
pub use signal::Signal;

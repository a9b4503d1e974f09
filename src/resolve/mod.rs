//! Lazy, memoized dependency resolution.
//!
//! States declare [`ResolveDeclaration`]s. Entering a state materializes a
//! fresh [`Resolvable`] per declaration; a [`ResolveContext`] over the path
//! decides which resolvables each dependency name refers to.

mod context;
mod error;
mod graph;
mod resolvable;

pub use context::{Locals, ResolveContext};
pub use error::ResolveError;
pub use resolvable::{
    resolved, Resolvable, ResolveDeclaration, ResolveFn, ResolveOptions, ResolvePolicy,
    ResolveResult, ResolveStatus, ResolvedData, SharedResolve, STATE_PARAMS,
};

//! Builder API for state declarations.
//!
//! The engine only consumes states through [`StateProvider`]. This module
//! provides a fluent [`StateBuilder`], declaration validation that reports
//! every problem at once, and [`StateRegistry`], an in-memory provider.
//!
//! [`StateProvider`]: crate::core::StateProvider

pub mod error;
pub mod macros;
pub mod registry;
pub mod state;
pub mod validation;

pub use error::{BuildError, DeclarationError};
pub use registry::StateRegistry;
pub use state::StateBuilder;
pub use validation::validate;

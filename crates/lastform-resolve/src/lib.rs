//! Formula resolver for the lastform recompute engine.
//!
//! Owns an arena of quantities, binds formula variables to each other with
//! deferred resolution, splits global quantities into per-variant clones
//! where required, and evaluates everything in dependency order.

pub mod error;
pub mod resolver;

pub use error::{ResolveError, Result};
pub use resolver::{Registration, Resolver};

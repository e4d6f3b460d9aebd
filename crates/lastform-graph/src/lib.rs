//! Demand-driven operation graph scheduler.
//!
//! Operations exchange data through [`artifact::ArtifactStore`] slots that
//! carry two flags: `valid` (the content reflects its inputs) and `needed`
//! (some consumer requires it). The [`builder::Builder`] propagates both
//! flags to a fixed point and then runs every operation whose inputs are
//! fresh and whose output is stale and demanded, until the graph settles.

pub mod artifact;
pub mod builder;
pub mod error;
pub mod operation;

pub use artifact::{ArtifactId, ArtifactState, ArtifactStore, Slot};
pub use builder::Builder;
pub use error::{GraphError, Result};
pub use operation::Operation;

//! Resolver error types.

use lastform_core::formula::{CompileError, EvalError};
use lastform_core::group::Group;

/// Errors that can occur during formula resolution and evaluation.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Resolution stalled: the named quantities participate in at least one
    /// reference cycle.
    #[error("cyclic reference among quantities: {}", .names.join(", "))]
    CyclicReference {
        /// Every quantity still unresolved when resolution stalled.
        names: Vec<String>,
    },

    /// A formula references a name that was never registered in any group.
    #[error("undefined variable '{name}' referenced by {}", .referenced_by.join(", "))]
    UndefinedVariable {
        /// The unregistered variable name.
        name: String,
        /// The quantities whose formulas read it.
        referenced_by: Vec<String>,
    },

    /// No quantity matches the requested id/group pair.
    #[error("no quantity with id {id} in group '{group}'")]
    NotFound {
        /// The numeric id that was looked up.
        id: u32,
        /// The group the lookup was scoped to.
        group: Group,
    },

    /// No quantity matches the requested name/group pair.
    #[error("no quantity named '{name}' in group '{group}'")]
    NameNotFound {
        /// The name that was looked up.
        name: String,
        /// The group the lookup was scoped to.
        group: Group,
    },

    /// A quantity's formula failed to compile.
    #[error("quantity '{name}': {source}")]
    Compile {
        /// The quantity whose formula is broken.
        name: String,
        /// The compiler's report.
        source: CompileError,
    },

    /// A compiled formula failed to execute.
    #[error("quantity '{name}': {source}")]
    Eval {
        /// The quantity being evaluated.
        name: String,
        /// The evaluator's report.
        source: EvalError,
    },

    /// `calculate` was called without a preceding successful `update`.
    #[error("quantity '{name}' is not resolved; call update() first")]
    NotResolved {
        /// The quantity with missing compiled state.
        name: String,
    },
}

/// Convenience alias used throughout the resolver crate.
pub type Result<T> = std::result::Result<T, ResolveError>;

impl ResolveError {
    /// Returns `true` for a failed id or name lookup.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::NameNotFound { .. })
    }

    /// Returns `true` for a stalled-resolution diagnostic (cycle or
    /// undefined variable).
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            Self::CyclicReference { .. } | Self::UndefinedVariable { .. }
        )
    }
}

//! Scheduler error types.

/// Errors that can occur while wiring or driving the operation graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// An operation's port was never connected to an artifact. This is a
    /// programmer error in graph assembly, not a data error.
    #[error("operation '{operation}' is not wired: missing {}", .ports.join(", "))]
    NotWired {
        /// The operation with dangling ports.
        operation: String,
        /// The names of the unconnected ports.
        ports: Vec<String>,
    },

    /// An artifact was read before its owning operation produced it.
    #[error("artifact '{name}' has not been produced")]
    NotProduced {
        /// The artifact's diagnostic name.
        name: String,
    },

    /// An artifact payload was read with the wrong type.
    #[error("artifact '{name}' holds a different payload type")]
    TypeMismatch {
        /// The artifact's diagnostic name.
        name: String,
    },

    /// One or more operations reported unmet preconditions; nothing was
    /// executed. The string aggregates one `"<name>: <reason>"` line per
    /// operation.
    #[error("preconditions not met:\n{0}")]
    Preconditions(String),

    /// An operation's `run` failed.
    #[error("operation '{operation}' failed: {message}")]
    Execution {
        /// The operation that failed.
        operation: String,
        /// What went wrong.
        message: String,
    },

    /// Flag propagation kept changing flags past the round bound. Only a
    /// non-monotone `propagate` implementation can cause this.
    #[error("flag propagation did not settle after {rounds} rounds")]
    Divergent {
        /// Rounds executed before giving up.
        rounds: usize,
    },
}

/// Convenience alias used throughout the graph crate.
pub type Result<T> = std::result::Result<T, GraphError>;

impl GraphError {
    /// Creates an [`GraphError::Execution`] for the given operation.
    pub fn execution(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Returns `true` for assembly-time programmer errors.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::NotWired { .. })
    }
}

use thiserror::Error;

use crate::env::EnvVar;

/// Errors surfaced by a cluster operation. Display text is what operators see,
/// both in the log and in the returned error.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("{0} must be set")]
    EnvUnset(EnvVar),

    #[error("{0} cannot be blank")]
    EnvBlank(EnvVar),

    /// Reserved for a real yes/no gate; `CommandDescriptor::warn` never
    /// produces it today.
    #[allow(dead_code)]
    #[error("operation cancelled by user")]
    ConfirmationDeclined,

    #[error("{diagnostics}")]
    PartialFleetFailure {
        failed: usize,
        total: usize,
        diagnostics: String,
    },

    #[error("{0}")]
    TopologyUnavailable(String),

    #[error("Invalid cluster topology: {0}")]
    InvalidTopology(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ClusterError>;

use thiserror::Error;

use crate::domain::StrategyRejection;
use crate::sequencer::SequenceFailure;

/// Unified error type for chart-release operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Version parsing error: {0}")]
    Version(String),

    #[error("Branch error: {0}")]
    Branch(String),

    #[error("{0}")]
    Strategy(#[from] StrategyRejection),

    #[error("Pre-flight check failed: {0}")]
    Preflight(String),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Dependency refresh failed: {0}")]
    Dependency(String),

    #[error("Repository error: {0}")]
    Vcs(String),

    #[error(transparent)]
    Sequence(#[from] SequenceFailure),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in chart-release
pub type Result<T> = std::result::Result<T, ReleaseError>;

impl ReleaseError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        ReleaseError::Config(msg.into())
    }

    /// Create a version error with context
    pub fn version(msg: impl Into<String>) -> Self {
        ReleaseError::Version(msg.into())
    }

    pub fn branch(msg: impl Into<String>) -> Self {
        ReleaseError::Branch(msg.into())
    }

    pub fn preflight(msg: impl Into<String>) -> Self {
        ReleaseError::Preflight(msg.into())
    }

    /// Create a manifest error with context
    pub fn manifest(msg: impl Into<String>) -> Self {
        ReleaseError::Manifest(msg.into())
    }

    pub fn dependency(msg: impl Into<String>) -> Self {
        ReleaseError::Dependency(msg.into())
    }

    /// Create a repository error with context
    pub fn vcs(msg: impl Into<String>) -> Self {
        ReleaseError::Vcs(msg.into())
    }

    /// Category tag printed in front of the message on stderr.
    ///
    /// Precondition errors leave no trace, mutation errors may leave edited
    /// working-tree files but nothing committed, vcs errors may leave local
    /// commits, tags or branches behind.
    pub fn category(&self) -> &'static str {
        match self {
            ReleaseError::Config(_)
            | ReleaseError::Version(_)
            | ReleaseError::Branch(_)
            | ReleaseError::Strategy(_)
            | ReleaseError::Preflight(_) => "precondition",
            ReleaseError::Manifest(_) | ReleaseError::Dependency(_) | ReleaseError::Io(_) => {
                "mutation"
            }
            ReleaseError::Git(_) | ReleaseError::Vcs(_) | ReleaseError::Sequence(_) => "vcs",
        }
    }
}

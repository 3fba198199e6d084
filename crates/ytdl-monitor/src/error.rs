//! Error types for supervised downloads.

use std::io;
use std::process::ExitStatus;
use std::sync::Arc;

use thiserror::Error;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the supervising operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The process could not be spawned (binary missing, permission denied, ...).
    #[error("failed to launch `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The process started but its stdout pipe could not be bound.
    #[error("failed to capture stdout of `{program}`")]
    StdoutUnavailable { program: String },

    /// The process ran and finished unsuccessfully.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("download cancelled")]
    Cancelled,

    #[error("download task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    /// Whether the process never got to run.
    pub fn is_launch(&self) -> bool {
        matches!(self, Self::Launch { .. } | Self::StdoutUnavailable { .. })
    }

    /// Whether the process ran and reported a failure.
    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// The underlying execution failure, if any.
    pub fn as_execution(&self) -> Option<&ExecutionError> {
        match self {
            Self::Execution(e) => Some(e),
            _ => None,
        }
    }
}

/// Failure of a process that was started successfully.
///
/// Cloneable so the same value can be returned to the caller and delivered
/// on the event channel.
#[derive(Debug, Clone, Error)]
pub enum ExecutionError {
    /// Non-zero exit code, or terminated by a signal.
    #[error("`{program}` exited with {status}")]
    Exited { program: String, status: ExitStatus },

    #[error("failed to wait for `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: Arc<io::Error>,
    },
}

impl ExecutionError {
    /// Exit code reported by the process, `None` when killed by a signal or
    /// when waiting failed.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Exited { status, .. } => status.code(),
            Self::Wait { .. } => None,
        }
    }

    pub fn program(&self) -> &str {
        match self {
            Self::Exited { program, .. } | Self::Wait { program, .. } => program,
        }
    }
}

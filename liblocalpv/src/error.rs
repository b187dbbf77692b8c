//! Local volume provisioner error types.
//!
//! All failures in `liblocalpv` are represented by [`LocalPvError`], which
//! derives [`thiserror::Error`] and also implements
//! [`Serialize`]/[`Deserialize`] so errors can travel across the QUIC
//! transport layer.
//!
//! A deletion that is declined because the volume belongs to another
//! provisioner or node is *not* an error; see
//! [`DeleteOutcome::Ignored`](crate::types::DeleteOutcome::Ignored).

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Filesystem operation that failed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FsOp {
    Create,
    Chmod,
    Remove,
}

impl fmt::Display for FsOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create directory",
            Self::Chmod => "set permissions on",
            Self::Remove => "remove directory",
        })
    }
}

/// Unified error type for provisioner operations.
#[derive(Debug, Error, Serialize, Deserialize, Clone)]
pub enum LocalPvError {
    /// The caller supplied an invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A filesystem operation failed. Final for this call; the caller
    /// decides whether to retry.
    #[error("failed to {op} {path}: {reason}")]
    Terminal {
        /// Which operation failed.
        op: FsOp,
        /// Path the operation targeted.
        path: String,
        /// Underlying cause.
        reason: String,
    },

    /// Startup configuration is missing or invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A QUIC / transport-level error.
    #[error("transport error: {0}")]
    Transport(String),

    /// An unclassified internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LocalPvError {
    /// Wrap a filesystem failure on `path`.
    pub fn terminal(op: FsOp, path: &Path, e: impl fmt::Display) -> Self {
        Self::Terminal {
            op,
            path: path.display().to_string(),
            reason: e.to_string(),
        }
    }

    /// Create a [`LocalPvError::Transport`] from anything that implements
    /// [`std::fmt::Display`].
    pub fn transport<E: fmt::Display>(e: E) -> Self {
        Self::Transport(e.to_string())
    }

    /// Create a [`LocalPvError::Internal`] from anything that implements
    /// [`std::fmt::Display`].
    pub fn internal<E: fmt::Display>(e: E) -> Self {
        Self::Internal(e.to_string())
    }

    /// Whether this is a filesystem failure surfaced as final.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal { .. })
    }
}

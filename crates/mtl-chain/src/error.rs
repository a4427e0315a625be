use std::fmt;
use std::time::Duration;

use mtl_types::Address;

/// Contract-level revert conditions of the MilletTrace contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevertReason {
    /// `createMilletBatch` targeted an id that already exists.
    BatchExists,
    /// The referenced batch was never created.
    BatchNotFound,
    /// The sender is not permitted to perform the call.
    Unauthorized,
    /// The batch id was empty.
    EmptyBatchId,
}

impl fmt::Display for RevertReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BatchExists => write!(f, "batch already exists"),
            Self::BatchNotFound => write!(f, "batch does not exist"),
            Self::Unauthorized => write!(f, "sender not authorized"),
            Self::EmptyBatchId => write!(f, "batch id is empty"),
        }
    }
}

/// Errors reported by an execution environment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    /// The contract rejected the call. The transaction had no effect.
    #[error("reverted: {reason}: {message}")]
    Revert {
        reason: RevertReason,
        message: String,
    },

    /// The environment refused the transaction for a non-contract reason.
    #[error("transaction rejected: {0}")]
    Rejected(String),

    #[error("no contract deployed at {0}")]
    UnknownContract(Address),

    /// No response within the deadline. The call may still have been applied.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The endpoint could not be reached or the exchange failed midway.
    #[error("transport error: {0}")]
    Transport(String),

    /// A response could not be decoded into the expected shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// The request itself was malformed.
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl ChainError {
    pub fn revert(reason: RevertReason, message: impl Into<String>) -> Self {
        Self::Revert {
            reason,
            message: message.into(),
        }
    }

    /// The revert reason, if this is a contract revert.
    pub fn revert_reason(&self) -> Option<RevertReason> {
        match self {
            Self::Revert { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// Returns `true` when the outcome of a write is unknown.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Transport(_))
    }
}

pub type ChainResult<T> = Result<T, ChainError>;

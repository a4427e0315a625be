use std::fmt;

use thiserror::Error;

use mtl_chain::{ChainError, RevertReason};
use mtl_types::{AccountId, BatchId, TypeError};

#[derive(Debug, Error)]
pub enum LedgerError {
    /// The environment could not be reached or bound at connect time.
    #[error("connection failed: {0}")]
    Connection(String),

    /// A write was rejected or its outcome could not be observed.
    ///
    /// When `ambiguous` is set the transaction may still have been applied.
    #[error("{operation} failed: {message}")]
    Submission {
        operation: &'static str,
        message: String,
        ambiguous: bool,
    },

    #[error("batch already exists: {0}")]
    DuplicateBatch(BatchId),

    #[error("batch not found: {0}")]
    BatchNotFound(BatchId),

    #[error("account {account} is not authorized to {operation}")]
    Unauthorized {
        operation: &'static str,
        account: AccountId,
    },

    #[error("no batch with id {0}")]
    NotFound(BatchId),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Stable discriminant of [`LedgerError`] for callers that branch on the kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Connection,
    Submission,
    DuplicateBatch,
    BatchNotFound,
    Unauthorized,
    NotFound,
    InvalidInput,
    Decode,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connection => "connection",
            Self::Submission => "submission",
            Self::DuplicateBatch => "duplicate_batch",
            Self::BatchNotFound => "batch_not_found",
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::InvalidInput => "invalid_input",
            Self::Decode => "decode",
            Self::Config => "config",
        };
        f.write_str(s)
    }
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection(_) => ErrorKind::Connection,
            Self::Submission { .. } => ErrorKind::Submission,
            Self::DuplicateBatch(_) => ErrorKind::DuplicateBatch,
            Self::BatchNotFound(_) => ErrorKind::BatchNotFound,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Decode(_) => ErrorKind::Decode,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Whether retrying the same call (or a regenerated id) may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Submission { .. } | Self::DuplicateBatch(_))
    }

    /// Whether a failed write may nevertheless have been applied.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Submission { ambiguous: true, .. })
    }

    /// Classify a failed write of `operation` on `batch_id` sent from `account`.
    pub(crate) fn from_write(
        operation: &'static str,
        batch_id: &BatchId,
        account: AccountId,
        err: ChainError,
    ) -> Self {
        // An undecodable response to a write says nothing about whether it applied.
        let ambiguous = err.is_ambiguous() || matches!(err, ChainError::Decode(_));
        match err {
            ChainError::Revert { reason, message } => match reason {
                RevertReason::BatchExists => Self::DuplicateBatch(batch_id.clone()),
                RevertReason::BatchNotFound => Self::BatchNotFound(batch_id.clone()),
                RevertReason::Unauthorized => Self::Unauthorized { operation, account },
                RevertReason::EmptyBatchId => Self::InvalidInput(message),
            },
            ChainError::BadRequest(message) => Self::InvalidInput(message),
            other => Self::Submission {
                operation,
                message: other.to_string(),
                ambiguous,
            },
        }
    }
}

impl From<ChainError> for LedgerError {
    /// Classify a failed read.
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::Decode(message) => Self::Decode(message),
            ChainError::BadRequest(message) => Self::InvalidInput(message),
            other => Self::Connection(other.to_string()),
        }
    }
}

impl From<TypeError> for LedgerError {
    fn from(err: TypeError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

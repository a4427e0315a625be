use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use mtl_types::{AccountId, Address};

use crate::error::{ChainError, RevertReason};

pub const PROTOCOL_VERSION: u32 = 1;

/// HTTP endpoint paths served by a node.
pub mod endpoints {
    pub const HEALTH: &str = "/v1/health";
    pub const ACCOUNTS: &str = "/v1/accounts";
    pub const CONTRACT: &str = "/v1/contracts/:address";
    pub const CALL: &str = "/v1/contracts/:address/call";
    pub const SEND: &str = "/v1/contracts/:address/send";
    pub const MINE: &str = "/v1/dev/mine";

    pub fn contract(address: &mtl_types::Address) -> String {
        format!("/v1/contracts/{address}")
    }

    pub fn call(address: &mtl_types::Address) -> String {
        format!("/v1/contracts/{address}/call")
    }

    pub fn send(address: &mtl_types::Address) -> String {
        format!("/v1/contracts/{address}/send")
    }
}

/// Health check response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub protocol_version: u32,
    pub block_number: u64,
}

impl HealthResponse {
    pub fn ok(block_number: u64) -> Self {
        Self {
            status: "ok".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            protocol_version: PROTOCOL_VERSION,
            block_number,
        }
    }
}

/// Deployment info for a contract address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractInfo {
    pub address: Address,
    pub name: String,
    pub deployed: bool,
}

/// Body of a read-only contract call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallRequest {
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

/// Body of a transaction submission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SendRequest {
    pub from: AccountId,
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

/// Body of a dev-node request to mine empty blocks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MineRequest {
    #[serde(default = "MineRequest::default_blocks")]
    pub blocks: u64,
}

impl MineRequest {
    fn default_blocks() -> u64 {
        1
    }
}

/// Result of a mine request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MineResponse {
    pub block_number: u64,
}

/// Envelope for every response body: `{"result": ..}` or `{"error": ..}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RpcResponse<T> {
    Result(T),
    Error(RpcError),
}

impl<T> RpcResponse<T> {
    pub fn into_result(self) -> Result<T, RpcError> {
        match self {
            Self::Result(value) => Ok(value),
            Self::Error(err) => Err(err),
        }
    }
}

/// Machine-readable error category on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RpcErrorKind {
    BatchExists,
    BatchNotFound,
    Unauthorized,
    EmptyBatchId,
    Rejected,
    UnknownContract,
    BadRequest,
    Internal,
}

impl RpcErrorKind {
    /// HTTP status a node answers with for this kind.
    pub fn status_code(self) -> u16 {
        match self {
            Self::BatchExists => 409,
            Self::BatchNotFound | Self::UnknownContract => 404,
            Self::Unauthorized => 403,
            Self::EmptyBatchId | Self::BadRequest => 400,
            Self::Rejected => 422,
            Self::Internal => 500,
        }
    }
}

impl fmt::Display for RpcErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::BatchExists => "batch_exists",
            Self::BatchNotFound => "batch_not_found",
            Self::Unauthorized => "unauthorized",
            Self::EmptyBatchId => "empty_batch_id",
            Self::Rejected => "rejected",
            Self::UnknownContract => "unknown_contract",
            Self::BadRequest => "bad_request",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub kind: RpcErrorKind,
    pub message: String,
}

impl RpcError {
    pub fn new(kind: RpcErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Rebuild the chain error a node reported. `contract` is the address the
    /// request targeted.
    pub fn into_chain_error(self, contract: &Address) -> ChainError {
        let revert = |reason| ChainError::revert(reason, self.message.clone());
        match self.kind {
            RpcErrorKind::BatchExists => revert(RevertReason::BatchExists),
            RpcErrorKind::BatchNotFound => revert(RevertReason::BatchNotFound),
            RpcErrorKind::Unauthorized => revert(RevertReason::Unauthorized),
            RpcErrorKind::EmptyBatchId => revert(RevertReason::EmptyBatchId),
            RpcErrorKind::Rejected => ChainError::Rejected(self.message),
            RpcErrorKind::UnknownContract => ChainError::UnknownContract(*contract),
            RpcErrorKind::BadRequest => ChainError::BadRequest(self.message),
            // The node failed after accepting the request.
            RpcErrorKind::Internal => ChainError::Transport(self.message),
        }
    }
}

impl From<&ChainError> for RpcError {
    fn from(err: &ChainError) -> Self {
        let kind = match err {
            ChainError::Revert { reason, .. } => match reason {
                RevertReason::BatchExists => RpcErrorKind::BatchExists,
                RevertReason::BatchNotFound => RpcErrorKind::BatchNotFound,
                RevertReason::Unauthorized => RpcErrorKind::Unauthorized,
                RevertReason::EmptyBatchId => RpcErrorKind::EmptyBatchId,
            },
            ChainError::Rejected(_) => RpcErrorKind::Rejected,
            ChainError::UnknownContract(_) => RpcErrorKind::UnknownContract,
            ChainError::BadRequest(_) => RpcErrorKind::BadRequest,
            ChainError::Timeout(_) | ChainError::Transport(_) | ChainError::Decode(_) => {
                RpcErrorKind::Internal
            }
        };
        let message = match err {
            ChainError::Revert { message, .. } => message.clone(),
            ChainError::Rejected(m) | ChainError::BadRequest(m) => m.clone(),
            other => other.to_string(),
        };
        Self { kind, message }
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

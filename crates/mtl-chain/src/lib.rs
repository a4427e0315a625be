//! Execution-environment boundary for the Millet Trace Ledger (MTL).
//!
//! This crate owns everything between the ledger components and the
//! consensus-ordered host of the MilletTrace contract:
//! - `Transaction` / `Query` call surface and the positional wire encoding (`abi`)
//! - The `ExecutionEnvironment` trait boundary
//! - `InMemoryChain`, an in-process host with finality lag and fault injection
//! - `HttpChain`, the HTTP transport to a remote node, and its wire `protocol`
//! - Write authorization policies enforced by the host

pub mod abi;
pub mod contract;
pub mod error;
pub mod http;
pub mod memory;
pub mod policy;
pub mod protocol;
pub mod traits;

pub use contract::{methods, BatchInfo, BatchStatus, Query, Transaction, CONTRACT_NAME};
pub use error::{ChainError, ChainResult, RevertReason};
pub use http::HttpChain;
pub use memory::{ChainConfig, Fault, InMemoryChain};
pub use policy::{AccessPolicy, RecorderPolicy, VerifierPolicy};
pub use protocol::{RpcError, RpcErrorKind, RpcResponse, PROTOCOL_VERSION};
pub use traits::ExecutionEnvironment;

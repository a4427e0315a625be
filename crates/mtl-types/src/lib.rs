//! Foundation types for the Millet Trace Ledger (MTL).
//!
//! Every other MTL crate depends on `mtl-types`.
//!
//! # Key Types
//!
//! - [`Address`] — account or contract address on the execution environment
//! - [`BatchId`] — non-empty, globally unique batch identifier
//! - [`Batch`] / [`BatchInput`] — provenance batch read model and creation payload
//! - [`Stage`] — open supply-chain stage vocabulary
//! - [`TraceabilityRecord`] / [`RecordInput`] — accepted event and its payload
//! - [`TxReceipt`] — acceptance receipt of a write transaction
//! - [`BlockTime`] — environment-assigned block timestamp

pub mod batch;
pub mod error;
pub mod identity;
pub mod receipt;
pub mod record;
pub mod temporal;

pub use batch::{Batch, BatchDraft, BatchId, BatchInput};
pub use error::TypeError;
pub use identity::{AccountId, Address, ADDRESS_LEN};
pub use receipt::{TxHash, TxReceipt};
pub use record::{RecordInput, Stage, TraceabilityRecord};
pub use temporal::BlockTime;

//! Client-side components of the Millet Trace Ledger.
//!
//! A [`LedgerClient`] holds one bound connection to the contract host. The
//! components borrow it:
//! - [`BatchRegistry`]: create, mint, and look up batches
//! - [`TraceabilityLedger`]: append and list stage records
//! - [`VerificationGate`]: set or revoke the verified flag
//! - [`LedgerQueryFacade`]: batch summaries and totals

pub mod client;
pub mod config;
pub mod error;
pub mod query;
pub mod registry;
pub mod traceability;
pub mod verification;

pub use client::LedgerClient;
pub use config::{AccountSelector, ClientConfig};
pub use error::{ErrorKind, LedgerError, LedgerResult};
pub use query::{BatchSummary, LedgerQueryFacade};
pub use registry::BatchRegistry;
pub use traceability::TraceabilityLedger;
pub use verification::VerificationGate;

pub use mtl_crypto::{BatchIdGenerator, CertificateHash, CertificateHasher};
pub use mtl_types::{
    AccountId, Address, Batch, BatchDraft, BatchId, BatchInput, BlockTime, RecordInput, Stage,
    TraceabilityRecord, TxHash, TxReceipt,
};

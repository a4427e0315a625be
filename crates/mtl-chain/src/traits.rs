use async_trait::async_trait;

use mtl_types::{AccountId, Address, BatchId, TraceabilityRecord, TxReceipt};

use crate::contract::{BatchInfo, BatchStatus, Transaction};
use crate::error::ChainResult;

/// Boundary to the consensus-ordered environment hosting the contract.
///
/// Writes are discrete transactions: `send` resolves once the environment
/// reports acceptance or failure, and the environment alone decides the
/// global order of concurrent writes. Reads reflect the most recently
/// finalized state and may lag a write that was just accepted.
///
/// Implementations:
/// - [`crate::InMemoryChain`] — in-process simulation for tests and the dev node
/// - [`crate::HttpChain`] — HTTP transport to a remote node
#[async_trait]
pub trait ExecutionEnvironment: Send + Sync {
    /// Accounts the environment can sign for, in a stable order.
    async fn accounts(&self) -> ChainResult<Vec<AccountId>>;

    /// Whether a contract is deployed at `contract`.
    async fn is_deployed(&self, contract: &Address) -> ChainResult<bool>;

    /// Submit a transaction from `from` and wait for its receipt.
    async fn send(
        &self,
        contract: &Address,
        from: &AccountId,
        tx: &Transaction,
    ) -> ChainResult<TxReceipt>;

    /// `getBatchInfo`. Unknown ids yield default fields with `exists == false`.
    async fn batch_info(&self, contract: &Address, batch_id: &BatchId) -> ChainResult<BatchInfo>;

    /// `getBatchStatus`. Unknown ids yield the default status.
    async fn batch_status(&self, contract: &Address, batch_id: &BatchId)
        -> ChainResult<BatchStatus>;

    /// `getTraceabilityRecords`, in acceptance order. Unknown ids yield no records.
    async fn traceability_records(
        &self,
        contract: &Address,
        batch_id: &BatchId,
    ) -> ChainResult<Vec<TraceabilityRecord>>;

    /// `getTotalBatches`.
    async fn total_batches(&self, contract: &Address) -> ChainResult<u64>;
}

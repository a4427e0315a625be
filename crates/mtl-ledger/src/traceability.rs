use mtl_chain::{methods, Transaction};
use mtl_types::{BatchId, RecordInput, TraceabilityRecord, TxReceipt};

use crate::client::LedgerClient;
use crate::error::{LedgerError, LedgerResult};

/// Append-only stage history of each batch.
pub struct TraceabilityLedger<'a> {
    client: &'a LedgerClient,
}

impl<'a> TraceabilityLedger<'a> {
    pub fn new(client: &'a LedgerClient) -> Self {
        Self { client }
    }

    /// Append one stage record. The environment assigns the timestamp and
    /// stores the record unverified.
    pub async fn append(&self, batch_id: &BatchId, record: RecordInput) -> LedgerResult<TxReceipt> {
        self.client
            .submit(Transaction::AddTraceabilityRecord {
                batch_id: batch_id.clone(),
                record,
            })
            .await
    }

    /// All records of a batch in acceptance order.
    pub async fn list(&self, batch_id: &BatchId) -> LedgerResult<Vec<TraceabilityRecord>> {
        let env = self.client.environment();
        let contract = self.client.contract();

        self.client.trace_read(methods::GET_BATCH_INFO, batch_id);
        if !env.batch_info(&contract, batch_id).await?.exists {
            return Err(LedgerError::BatchNotFound(batch_id.clone()));
        }

        self.client.trace_read(methods::GET_TRACEABILITY_RECORDS, batch_id);
        Ok(env.traceability_records(&contract, batch_id).await?)
    }
}

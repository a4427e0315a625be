use serde::{Deserialize, Serialize};

use mtl_chain::methods;
use mtl_types::{Batch, BatchId, Stage, TraceabilityRecord};

use crate::client::LedgerClient;
use crate::error::LedgerResult;

/// A batch together with its full stage history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub batch: Batch,
    pub records: Vec<TraceabilityRecord>,
}

impl BatchSummary {
    /// Stage of the most recent record.
    pub fn current_stage(&self) -> Option<&Stage> {
        self.records.last().map(|r| &r.stage)
    }

    pub fn stages(&self) -> impl Iterator<Item = &Stage> {
        self.records.iter().map(|r| &r.stage)
    }

    pub fn is_verified(&self) -> bool {
        self.batch.verified
    }
}

/// Read-only views composed from the registry and the traceability ledger.
pub struct LedgerQueryFacade<'a> {
    client: &'a LedgerClient,
}

impl<'a> LedgerQueryFacade<'a> {
    pub fn new(client: &'a LedgerClient) -> Self {
        Self { client }
    }

    pub async fn batch_summary(&self, batch_id: &BatchId) -> LedgerResult<BatchSummary> {
        let batch = self.client.registry().get(batch_id).await?;
        self.client.trace_read(methods::GET_TRACEABILITY_RECORDS, batch_id);
        let records = self
            .client
            .environment()
            .traceability_records(&self.client.contract(), batch_id)
            .await?;
        Ok(BatchSummary { batch, records })
    }

    /// Number of batches ever created. Never decreases.
    pub async fn total_batches(&self) -> LedgerResult<u64> {
        let contract = self.client.contract();
        self.client.trace_read(methods::GET_TOTAL_BATCHES, &contract);
        Ok(self.client.environment().total_batches(&contract).await?)
    }
}

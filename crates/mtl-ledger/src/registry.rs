use rand::Rng;
use tracing::{debug, warn};

use mtl_chain::{methods, Transaction};
use mtl_crypto::{BatchIdGenerator, Clock};
use mtl_types::{Batch, BatchDraft, BatchId, BatchInput, TxReceipt};

use crate::client::LedgerClient;
use crate::error::{LedgerError, LedgerResult};

/// Creation and lookup of batches.
pub struct BatchRegistry<'a> {
    client: &'a LedgerClient,
}

impl<'a> BatchRegistry<'a> {
    pub fn new(client: &'a LedgerClient) -> Self {
        Self { client }
    }

    /// Register a new batch owned by the client's account.
    ///
    /// Fails with [`LedgerError::DuplicateBatch`] when the id is taken.
    pub async fn create(&self, batch: BatchInput) -> LedgerResult<TxReceipt> {
        self.client
            .submit(Transaction::CreateMilletBatch(batch))
            .await
    }

    /// Generate an id for `draft` and create it, regenerating on collision.
    pub async fn mint<C: Clock, R: Rng>(
        &self,
        draft: BatchDraft,
        generator: &mut BatchIdGenerator<C, R>,
    ) -> LedgerResult<(BatchId, TxReceipt)> {
        let attempts = self.client.config().mint_attempts.max(1);
        let mut attempt = 1;
        loop {
            let batch_id = generator.new_batch_id();
            match self.create(draft.clone().with_id(batch_id.clone())).await {
                Ok(receipt) => return Ok((batch_id, receipt)),
                Err(LedgerError::DuplicateBatch(taken)) if attempt < attempts => {
                    warn!(batch_id = %taken, attempt, "generated id already taken, regenerating");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Full batch, including its verification flag.
    pub async fn get(&self, batch_id: &BatchId) -> LedgerResult<Batch> {
        let env = self.client.environment();
        let contract = self.client.contract();
        self.client.trace_read(methods::GET_BATCH_INFO, batch_id);

        let info = env.batch_info(&contract, batch_id).await?;
        if !info.exists {
            debug!(batch_id = %batch_id, "batch not found");
            return Err(LedgerError::NotFound(batch_id.clone()));
        }
        let status = env.batch_status(&contract, batch_id).await?;
        info.into_batch(&status)
            .ok_or_else(|| LedgerError::Decode(format!("getBatchInfo returned an invalid id for {batch_id}")))
    }

    pub async fn exists(&self, batch_id: &BatchId) -> LedgerResult<bool> {
        self.client.trace_read(methods::GET_BATCH_INFO, batch_id);
        let info = self
            .client
            .environment()
            .batch_info(&self.client.contract(), batch_id)
            .await?;
        Ok(info.exists)
    }
}

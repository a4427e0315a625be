use std::sync::Arc;

use tracing::{debug, info, warn};

use mtl_chain::{ChainError, ExecutionEnvironment, HttpChain, Transaction};
use mtl_types::{AccountId, Address, TxReceipt};

use crate::config::ClientConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::query::LedgerQueryFacade;
use crate::registry::BatchRegistry;
use crate::traceability::TraceabilityLedger;
use crate::verification::VerificationGate;

/// One bound connection to the contract host: environment, signing account,
/// and contract address.
///
/// Components borrow the client; none of them opens a connection of its own.
pub struct LedgerClient {
    env: Arc<dyn ExecutionEnvironment>,
    config: ClientConfig,
    account: AccountId,
    contract: Address,
}

impl LedgerClient {
    /// Connect to the node at `config.endpoint` over HTTP.
    pub async fn connect(config: &ClientConfig) -> LedgerResult<Self> {
        let env = Arc::new(HttpChain::with_timeout(
            config.endpoint.clone(),
            config.submit_timeout,
        ));
        Self::with_environment(env, config).await
    }

    /// Bind to an already constructed environment.
    pub async fn with_environment(
        env: Arc<dyn ExecutionEnvironment>,
        config: &ClientConfig,
    ) -> LedgerResult<Self> {
        config.validate()?;
        let contract = config.contract()?;

        let accounts = env
            .accounts()
            .await
            .map_err(|e| LedgerError::Connection(format!("{}: {e}", config.endpoint)))?;
        if accounts.is_empty() {
            return Err(LedgerError::Connection(format!(
                "{}: no accounts available",
                config.endpoint
            )));
        }
        let account = config.account.select(&accounts).ok_or_else(|| {
            LedgerError::Connection(format!(
                "account {} not available ({} accounts)",
                config.account,
                accounts.len()
            ))
        })?;

        let deployed = env
            .is_deployed(&contract)
            .await
            .map_err(|e| LedgerError::Connection(format!("{}: {e}", config.endpoint)))?;
        if !deployed {
            return Err(LedgerError::Connection(format!(
                "no contract deployed at {contract}"
            )));
        }

        info!(
            endpoint = %config.endpoint,
            account = %account,
            contract = %contract,
            "ledger client connected"
        );
        Ok(Self {
            env,
            config: config.clone(),
            account,
            contract,
        })
    }

    /// The signing account all writes are sent from.
    pub fn account(&self) -> AccountId {
        self.account
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn environment(&self) -> &Arc<dyn ExecutionEnvironment> {
        &self.env
    }

    pub fn registry(&self) -> BatchRegistry<'_> {
        BatchRegistry::new(self)
    }

    pub fn traceability(&self) -> TraceabilityLedger<'_> {
        TraceabilityLedger::new(self)
    }

    pub fn verification(&self) -> VerificationGate<'_> {
        VerificationGate::new(self)
    }

    pub fn queries(&self) -> LedgerQueryFacade<'_> {
        LedgerQueryFacade::new(self)
    }

    /// Submit a write and wait for its receipt, bounded by `submit_timeout`.
    pub(crate) async fn submit(&self, tx: Transaction) -> LedgerResult<TxReceipt> {
        let operation = tx.method();
        let deadline = self.config.submit_timeout;

        let outcome = tokio::time::timeout(
            deadline,
            self.env.send(&self.contract, &self.account, &tx),
        )
        .await
        .unwrap_or(Err(ChainError::Timeout(deadline)));

        match outcome {
            Ok(receipt) => {
                info!(
                    operation,
                    batch_id = %tx.batch_id(),
                    tx = %receipt.transaction_hash.short(),
                    block = receipt.block_number,
                    "write accepted"
                );
                Ok(receipt)
            }
            Err(err) => {
                let err = LedgerError::from_write(operation, tx.batch_id(), self.account, err);
                warn!(operation, batch_id = %tx.batch_id(), error = %err, "write failed");
                Err(err)
            }
        }
    }

    pub(crate) fn trace_read(&self, method: &str, target: &dyn std::fmt::Display) {
        debug!(method, target = %target, contract = %self.contract.short(), "contract read");
    }
}

impl std::fmt::Debug for LedgerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerClient")
            .field("endpoint", &self.config.endpoint)
            .field("account", &self.account)
            .field("contract", &self.contract)
            .finish()
    }
}

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use mtl_crypto::ContentHasher;
use mtl_types::{
    AccountId, Address, Batch, BatchId, BlockTime, TraceabilityRecord, TxHash, TxReceipt,
};

use crate::contract::{BatchInfo, BatchStatus, Transaction, CONTRACT_NAME};
use crate::error::{ChainError, ChainResult, RevertReason};
use crate::policy::AccessPolicy;
use crate::traits::ExecutionEnvironment;

/// Configuration for an [`InMemoryChain`].
#[derive(Clone, Debug)]
pub struct ChainConfig {
    /// Label from which account and contract addresses are derived.
    pub network: String,
    /// Number of unlocked accounts. The first one deploys the contract.
    pub accounts: usize,
    /// Blocks mined on top of a transaction before reads observe it.
    pub confirmations: u64,
    pub policy: AccessPolicy,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            network: "mtl-dev".into(),
            accounts: 10,
            confirmations: 0,
            policy: AccessPolicy::default(),
        }
    }
}

/// A failure to inject into the next submitted transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fault {
    /// Refuse the transaction without applying it.
    Reject(String),
    /// Apply the transaction, then hold the response back.
    DelayAfterApply(Duration),
}

#[derive(Clone, Debug, Default)]
struct ContractState {
    batches: HashMap<BatchId, Batch>,
    creation_order: Vec<BatchId>,
    records: HashMap<BatchId, Vec<TraceabilityRecord>>,
}

impl ContractState {
    /// Validate and apply one transaction. Leaves the state untouched on error.
    fn apply(
        &mut self,
        tx: &Transaction,
        from: &AccountId,
        admin: &AccountId,
        policy: &AccessPolicy,
        timestamp: BlockTime,
    ) -> ChainResult<()> {
        match tx {
            Transaction::CreateMilletBatch(input) => {
                if self.batches.contains_key(&input.batch_id) {
                    return Err(ChainError::revert(
                        RevertReason::BatchExists,
                        input.batch_id.as_str(),
                    ));
                }
                self.batches
                    .insert(input.batch_id.clone(), Batch::from_input(input, *from));
                self.creation_order.push(input.batch_id.clone());
            }
            Transaction::AddTraceabilityRecord { batch_id, record } => {
                if !self.batches.contains_key(batch_id) {
                    return Err(ChainError::revert(
                        RevertReason::BatchNotFound,
                        batch_id.as_str(),
                    ));
                }
                if !policy.may_record(from) {
                    return Err(ChainError::revert(
                        RevertReason::Unauthorized,
                        format!("{from} may not record stages"),
                    ));
                }
                self.records
                    .entry(batch_id.clone())
                    .or_default()
                    .push(TraceabilityRecord::accepted(record, timestamp));
            }
            Transaction::VerifyBatch { batch_id, verified } => {
                let batch = self.batches.get_mut(batch_id).ok_or_else(|| {
                    ChainError::revert(RevertReason::BatchNotFound, batch_id.as_str())
                })?;
                if !policy.may_verify(from, &batch.owner, admin) {
                    return Err(ChainError::revert(
                        RevertReason::Unauthorized,
                        format!("{from} may not verify {batch_id}"),
                    ));
                }
                batch.verified = *verified;
            }
        }
        Ok(())
    }
}

struct PendingTx {
    block: u64,
    timestamp: BlockTime,
    from: AccountId,
    tx: Transaction,
}

struct ChainState {
    block_number: u64,
    block_time: BlockTime,
    nonce: u64,
    /// All accepted transactions applied; used to validate new writes.
    head: ContractState,
    /// Only transactions with enough confirmations applied; served to reads.
    finalized: ContractState,
    pending: VecDeque<PendingTx>,
}

#[derive(Serialize)]
struct TxPreimage<'a> {
    network: &'a str,
    block: u64,
    nonce: u64,
    from: &'a AccountId,
    tx: &'a Transaction,
}

/// In-process simulation of the contract host.
///
/// Every write takes the state lock, is validated against the head state,
/// and is mined into its own block, so writes are totally ordered in lock
/// acquisition order. Reads only see transactions buried under
/// `confirmations` blocks.
pub struct InMemoryChain {
    config: ChainConfig,
    accounts: Vec<AccountId>,
    contract: Address,
    inner: RwLock<ChainState>,
    faults: Mutex<VecDeque<Fault>>,
}

impl InMemoryChain {
    pub fn new(config: ChainConfig) -> Self {
        let accounts: Vec<AccountId> = (0..config.accounts.max(1))
            .map(|i| Address::derive(&format!("{}/account/{i}", config.network)))
            .collect();
        let contract = Address::derive(&format!("{}/contract/{CONTRACT_NAME}", config.network));
        info!(
            network = %config.network,
            contract = %contract,
            accounts = accounts.len(),
            confirmations = config.confirmations,
            "in-memory chain started"
        );
        Self {
            config,
            accounts,
            contract,
            inner: RwLock::new(ChainState {
                block_number: 0,
                block_time: BlockTime::now(),
                nonce: 0,
                head: ContractState::default(),
                finalized: ContractState::default(),
                pending: VecDeque::new(),
            }),
            faults: Mutex::new(VecDeque::new()),
        }
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Address of the deployed MilletTrace contract.
    pub fn contract_address(&self) -> Address {
        self.contract
    }

    /// The deploying account, which acts as contract admin.
    pub fn admin(&self) -> AccountId {
        self.accounts[0]
    }

    pub fn account(&self, index: usize) -> Option<AccountId> {
        self.accounts.get(index).copied()
    }

    pub fn block_number(&self) -> u64 {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).block_number
    }

    /// Number of accepted transactions not yet visible to reads.
    pub fn pending_count(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).pending.len()
    }

    /// Queue a fault for the next submitted transaction.
    pub fn inject_fault(&self, fault: Fault) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(fault);
    }

    /// Mine `count` empty blocks, finalizing transactions that become deep enough.
    pub fn mine_empty_blocks(&self, count: u64) -> u64 {
        let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        for _ in 0..count {
            Self::next_block(&mut state);
            self.finalize(&mut state);
        }
        debug!(block = state.block_number, "mined {count} empty block(s)");
        state.block_number
    }

    fn next_block(state: &mut ChainState) {
        state.block_number += 1;
        state.block_time = state.block_time.max(BlockTime::now());
    }

    fn finalize(&self, state: &mut ChainState) {
        let head = state.block_number;
        while let Some(front) = state.pending.front() {
            if front.block + self.config.confirmations > head {
                break;
            }
            let Some(pending) = state.pending.pop_front() else {
                break;
            };
            if let Err(e) = state.finalized.apply(
                &pending.tx,
                &pending.from,
                &self.accounts[0],
                &self.config.policy,
                pending.timestamp,
            ) {
                // Head validation already accepted this transaction in the same order.
                warn!(block = pending.block, error = %e, "finalized state diverged from head");
            }
        }
    }

    fn check_contract(&self, contract: &Address) -> ChainResult<()> {
        if *contract != self.contract {
            return Err(ChainError::UnknownContract(*contract));
        }
        Ok(())
    }

    fn check_sender(&self, from: &AccountId) -> ChainResult<()> {
        if !self.accounts.contains(from) {
            return Err(ChainError::Rejected(format!("unknown sender account {from}")));
        }
        Ok(())
    }

    fn mine(&self, from: &AccountId, tx: &Transaction) -> ChainResult<TxReceipt> {
        let mut state = self.write_state()?;

        let timestamp = state.block_time.max(BlockTime::now());
        state.head.apply(
            tx,
            from,
            &self.accounts[0],
            &self.config.policy,
            timestamp,
        )?;

        Self::next_block(&mut state);
        state.block_time = timestamp.max(state.block_time);
        state.nonce += 1;

        let preimage = TxPreimage {
            network: &self.config.network,
            block: state.block_number,
            nonce: state.nonce,
            from,
            tx,
        };
        let hash = ContentHasher::TRANSACTION
            .hash_json(&preimage)
            .map_err(|e| ChainError::Rejected(e.to_string()))?;

        let block = state.block_number;
        let receipt = TxReceipt {
            transaction_hash: TxHash::from_bytes(hash),
            block_number: block,
            accepted_at: timestamp,
        };
        state.pending.push_back(PendingTx {
            block,
            timestamp,
            from: *from,
            tx: tx.clone(),
        });
        self.finalize(&mut state);
        Ok(receipt)
    }

    fn read<T>(&self, f: impl FnOnce(&ContractState) -> T) -> ChainResult<T> {
        let state = self.read_state()?;
        Ok(f(&state.finalized))
    }

    fn read_state(&self) -> ChainResult<RwLockReadGuard<'_, ChainState>> {
        self.inner
            .read()
            .map_err(|_| ChainError::Rejected("chain read lock poisoned".into()))
    }

    fn write_state(&self) -> ChainResult<RwLockWriteGuard<'_, ChainState>> {
        self.inner
            .write()
            .map_err(|_| ChainError::Rejected("chain write lock poisoned".into()))
    }
}

impl Default for InMemoryChain {
    fn default() -> Self {
        Self::new(ChainConfig::default())
    }
}

#[async_trait]
impl ExecutionEnvironment for InMemoryChain {
    async fn accounts(&self) -> ChainResult<Vec<AccountId>> {
        Ok(self.accounts.clone())
    }

    async fn is_deployed(&self, contract: &Address) -> ChainResult<bool> {
        Ok(*contract == self.contract)
    }

    async fn send(
        &self,
        contract: &Address,
        from: &AccountId,
        tx: &Transaction,
    ) -> ChainResult<TxReceipt> {
        self.check_contract(contract)?;
        self.check_sender(from)?;

        let fault = self
            .faults
            .lock()
            .map_err(|_| ChainError::Rejected("fault queue lock poisoned".into()))?
            .pop_front();
        if let Some(Fault::Reject(reason)) = &fault {
            warn!(method = tx.method(), batch_id = %tx.batch_id(), %reason, "injected rejection");
            return Err(ChainError::Rejected(reason.clone()));
        }

        let receipt = match self.mine(from, tx) {
            Ok(receipt) => receipt,
            Err(e) => {
                debug!(method = tx.method(), batch_id = %tx.batch_id(), error = %e, "transaction reverted");
                return Err(e);
            }
        };
        info!(
            method = tx.method(),
            batch_id = %tx.batch_id(),
            tx = %receipt.transaction_hash.short(),
            block = receipt.block_number,
            "transaction mined"
        );

        if let Some(Fault::DelayAfterApply(delay)) = fault {
            tokio::time::sleep(delay).await;
        }
        Ok(receipt)
    }

    async fn batch_info(&self, contract: &Address, batch_id: &BatchId) -> ChainResult<BatchInfo> {
        self.check_contract(contract)?;
        self.read(|s| {
            s.batches
                .get(batch_id)
                .map(BatchInfo::from_batch)
                .unwrap_or_default()
        })
    }

    async fn batch_status(
        &self,
        contract: &Address,
        batch_id: &BatchId,
    ) -> ChainResult<BatchStatus> {
        self.check_contract(contract)?;
        self.read(|s| BatchStatus {
            verified: s
                .batches
                .get(batch_id)
                .map(|batch| batch.verified)
                .unwrap_or(false),
            record_count: s.records.get(batch_id).map_or(0, |r| r.len() as u64),
        })
    }

    async fn traceability_records(
        &self,
        contract: &Address,
        batch_id: &BatchId,
    ) -> ChainResult<Vec<TraceabilityRecord>> {
        self.check_contract(contract)?;
        self.read(|s| s.records.get(batch_id).cloned().unwrap_or_default())
    }

    async fn total_batches(&self, contract: &Address) -> ChainResult<u64> {
        self.check_contract(contract)?;
        self.read(|s| s.creation_order.len() as u64)
    }
}

impl std::fmt::Debug for InMemoryChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryChain")
            .field("network", &self.config.network)
            .field("contract", &self.contract)
            .field("block_number", &self.block_number())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::policy::VerifierPolicy;
    use mtl_types::{BatchDraft, BatchInput, RecordInput, Stage};

    fn id(s: &str) -> BatchId {
        BatchId::new(s).unwrap()
    }

    fn input(batch_id: &str) -> BatchInput {
        BatchDraft {
            farmer_id: "F1".into(),
            millet_type: "Pearl Millet".into(),
            variety: "HHB67".into(),
            harvest_date: "2024-03-01".into(),
            quality_grade: "A".into(),
            organic_certified: true,
        }
        .with_id(id(batch_id))
    }

    fn create(batch_id: &str) -> Transaction {
        Transaction::CreateMilletBatch(input(batch_id))
    }

    fn record(batch_id: &str, stage: Stage, operator: &str) -> Transaction {
        Transaction::AddTraceabilityRecord {
            batch_id: id(batch_id),
            record: RecordInput::new(stage, "Bihar", operator),
        }
    }

    #[tokio::test]
    async fn create_then_read() {
        let chain = InMemoryChain::default();
        let contract = chain.contract_address();
        let farmer = chain.account(1).unwrap();

        let receipt = chain.send(&contract, &farmer, &create("B1")).await.unwrap();
        assert_eq!(receipt.block_number, 1);

        let info = chain.batch_info(&contract, &id("B1")).await.unwrap();
        assert!(info.exists);
        assert_eq!(info.owner, farmer);
        assert_eq!(info.variety, "HHB67");
        assert_eq!(chain.total_batches(&contract).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unknown_batch_reads_as_default() {
        let chain = InMemoryChain::default();
        let contract = chain.contract_address();
        let info = chain.batch_info(&contract, &id("nope")).await.unwrap();
        assert!(!info.exists);
        assert!(info.owner.is_zero());
        assert!(info.batch_id.is_empty());
        assert!(chain.traceability_records(&contract, &id("nope")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_create_reverts_without_mutation() {
        let chain = InMemoryChain::default();
        let contract = chain.contract_address();
        let admin = chain.admin();
        chain.send(&contract, &admin, &create("B1")).await.unwrap();

        let other = chain.account(2).unwrap();
        let err = chain.send(&contract, &other, &create("B1")).await.unwrap_err();
        assert_eq!(err.revert_reason(), Some(RevertReason::BatchExists));

        let info = chain.batch_info(&contract, &id("B1")).await.unwrap();
        assert_eq!(info.owner, admin);
        assert_eq!(chain.total_batches(&contract).await.unwrap(), 1);
        assert_eq!(chain.block_number(), 1);
    }

    #[tokio::test]
    async fn record_for_unknown_batch_reverts() {
        let chain = InMemoryChain::default();
        let contract = chain.contract_address();
        let err = chain
            .send(&contract, &chain.admin(), &record("ghost", Stage::Planting, "Op1"))
            .await
            .unwrap_err();
        assert_eq!(err.revert_reason(), Some(RevertReason::BatchNotFound));
        assert!(chain.traceability_records(&contract, &id("ghost")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn records_keep_acceptance_order_and_timestamps() {
        let chain = InMemoryChain::default();
        let contract = chain.contract_address();
        let admin = chain.admin();
        chain.send(&contract, &admin, &create("B1")).await.unwrap();

        let stages = [Stage::Planting, Stage::Harvesting, Stage::parse("sorting"), Stage::Packaging];
        for (i, stage) in stages.iter().enumerate() {
            let from = chain.account(i + 1).unwrap();
            chain
                .send(&contract, &from, &record("B1", stage.clone(), &format!("Op{i}")))
                .await
                .unwrap();
        }

        let records = chain.traceability_records(&contract, &id("B1")).await.unwrap();
        let got: Vec<Stage> = records.iter().map(|r| r.stage.clone()).collect();
        assert_eq!(got, stages.to_vec());
        assert!(records.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert!(records.iter().all(|r| !r.verified));

        let status = chain.batch_status(&contract, &id("B1")).await.unwrap();
        assert_eq!(status.record_count, 4);
    }

    #[tokio::test]
    async fn verification_is_gated_and_revocable() {
        let chain = InMemoryChain::default();
        let contract = chain.contract_address();
        let owner = chain.account(3).unwrap();
        let stranger = chain.account(4).unwrap();
        chain.send(&contract, &owner, &create("B1")).await.unwrap();

        let verify = |verified| Transaction::VerifyBatch {
            batch_id: id("B1"),
            verified,
        };

        let err = chain.send(&contract, &stranger, &verify(true)).await.unwrap_err();
        assert_eq!(err.revert_reason(), Some(RevertReason::Unauthorized));

        chain.send(&contract, &owner, &verify(true)).await.unwrap();
        assert!(chain.batch_status(&contract, &id("B1")).await.unwrap().verified);

        chain.send(&contract, &chain.admin(), &verify(false)).await.unwrap();
        assert!(!chain.batch_status(&contract, &id("B1")).await.unwrap().verified);
    }

    #[tokio::test]
    async fn listed_verifiers_policy() {
        let config = ChainConfig::default();
        let inspector = Address::derive(&format!("{}/account/5", config.network));
        let chain = InMemoryChain::new(ChainConfig {
            policy: AccessPolicy {
                verifiers: VerifierPolicy::Listed([inspector].into()),
                ..AccessPolicy::default()
            },
            ..config
        });
        let contract = chain.contract_address();
        chain.send(&contract, &chain.admin(), &create("B1")).await.unwrap();

        let verify = Transaction::VerifyBatch {
            batch_id: id("B1"),
            verified: true,
        };
        let err = chain.send(&contract, &chain.admin(), &verify).await.unwrap_err();
        assert_eq!(err.revert_reason(), Some(RevertReason::Unauthorized));
        chain.send(&contract, &inspector, &verify).await.unwrap();
    }

    #[tokio::test]
    async fn verify_unknown_batch_reports_not_found_before_authorization() {
        let chain = InMemoryChain::default();
        let contract = chain.contract_address();
        let stranger = chain.account(9).unwrap();
        let err = chain
            .send(
                &contract,
                &stranger,
                &Transaction::VerifyBatch {
                    batch_id: id("ghost"),
                    verified: true,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.revert_reason(), Some(RevertReason::BatchNotFound));
    }

    #[tokio::test]
    async fn reads_lag_until_confirmed() {
        let chain = InMemoryChain::new(ChainConfig {
            confirmations: 2,
            ..ChainConfig::default()
        });
        let contract = chain.contract_address();
        let admin = chain.admin();

        chain.send(&contract, &admin, &create("B1")).await.unwrap();
        assert!(!chain.batch_info(&contract, &id("B1")).await.unwrap().exists);
        assert_eq!(chain.pending_count(), 1);

        // Head state already rejects the duplicate.
        let err = chain.send(&contract, &admin, &create("B1")).await.unwrap_err();
        assert_eq!(err.revert_reason(), Some(RevertReason::BatchExists));

        chain.mine_empty_blocks(1);
        assert!(!chain.batch_info(&contract, &id("B1")).await.unwrap().exists);
        chain.mine_empty_blocks(1);
        assert!(chain.batch_info(&contract, &id("B1")).await.unwrap().exists);
        assert_eq!(chain.pending_count(), 0);
    }

    #[tokio::test]
    async fn unknown_contract_and_sender() {
        let chain = InMemoryChain::default();
        let bogus = Address::derive("elsewhere");
        assert!(!chain.is_deployed(&bogus).await.unwrap());
        assert!(chain.is_deployed(&chain.contract_address()).await.unwrap());
        assert_eq!(
            chain.total_batches(&bogus).await.unwrap_err(),
            ChainError::UnknownContract(bogus)
        );

        let outsider = Address::derive("outsider");
        let err = chain
            .send(&chain.contract_address(), &outsider, &create("B1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::Rejected(_)));
    }

    #[tokio::test]
    async fn injected_rejection_does_not_apply() {
        let chain = InMemoryChain::default();
        let contract = chain.contract_address();
        chain.inject_fault(Fault::Reject("out of gas".into()));

        let err = chain.send(&contract, &chain.admin(), &create("B1")).await.unwrap_err();
        assert_eq!(err, ChainError::Rejected("out of gas".into()));
        assert_eq!(chain.total_batches(&contract).await.unwrap(), 0);

        chain.send(&contract, &chain.admin(), &create("B1")).await.unwrap();
        assert_eq!(chain.total_batches(&contract).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delayed_fault_still_applies() {
        let chain = InMemoryChain::default();
        let contract = chain.contract_address();
        chain.inject_fault(Fault::DelayAfterApply(Duration::from_millis(20)));
        chain.send(&contract, &chain.admin(), &create("B1")).await.unwrap();
        assert!(chain.batch_info(&contract, &id("B1")).await.unwrap().exists);
    }

    #[tokio::test]
    async fn transaction_hashes_are_unique() {
        let chain = InMemoryChain::default();
        let contract = chain.contract_address();
        let admin = chain.admin();
        chain.send(&contract, &admin, &create("B1")).await.unwrap();
        let a = chain.send(&contract, &admin, &record("B1", Stage::Shipping, "Op1")).await.unwrap();
        let b = chain.send(&contract, &admin, &record("B1", Stage::Shipping, "Op1")).await.unwrap();
        assert_ne!(a.transaction_hash, b.transaction_hash);
        assert!(b.block_number > a.block_number);
    }

    #[tokio::test]
    async fn concurrent_appends_are_all_accepted() {
        let chain = Arc::new(InMemoryChain::default());
        let contract = chain.contract_address();
        chain.send(&contract, &chain.admin(), &create("B1")).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let chain = chain.clone();
            handles.push(tokio::spawn(async move {
                let from = chain.account(i % 10).unwrap();
                chain
                    .send(&contract, &from, &record("B1", Stage::Processing, &format!("Op{i}")))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let records = chain.traceability_records(&contract, &id("B1")).await.unwrap();
        assert_eq!(records.len(), 8);
        let mut operators: Vec<String> = records.iter().map(|r| r.operator.clone()).collect();
        operators.sort();
        operators.dedup();
        assert_eq!(operators.len(), 8);
    }
}

use serde::{Deserialize, Serialize};

use mtl_types::{Address, Batch, BatchId, BatchInput, RecordInput};

/// Name of the contract bound by ledger clients.
pub const CONTRACT_NAME: &str = "MilletTrace";

/// A state-changing contract call, submitted as one transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transaction {
    /// `createMilletBatch(batchId, farmerId, milletType, variety, harvestDate, qualityGrade, organicCertified)`
    CreateMilletBatch(BatchInput),
    /// `addTraceabilityRecord(batchId, stage, location, operator, notes, certificateHash)`
    AddTraceabilityRecord {
        batch_id: BatchId,
        record: RecordInput,
    },
    /// `verifyBatch(batchId, verified)`
    VerifyBatch { batch_id: BatchId, verified: bool },
}

impl Transaction {
    /// Contract method name.
    pub fn method(&self) -> &'static str {
        match self {
            Self::CreateMilletBatch(_) => methods::CREATE_MILLET_BATCH,
            Self::AddTraceabilityRecord { .. } => methods::ADD_TRACEABILITY_RECORD,
            Self::VerifyBatch { .. } => methods::VERIFY_BATCH,
        }
    }

    /// The batch this transaction targets.
    pub fn batch_id(&self) -> &BatchId {
        match self {
            Self::CreateMilletBatch(input) => &input.batch_id,
            Self::AddTraceabilityRecord { batch_id, .. } => batch_id,
            Self::VerifyBatch { batch_id, .. } => batch_id,
        }
    }
}

/// A read-only contract call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Query {
    GetBatchInfo(BatchId),
    GetBatchStatus(BatchId),
    GetTraceabilityRecords(BatchId),
    GetTotalBatches,
}

impl Query {
    pub fn method(&self) -> &'static str {
        match self {
            Self::GetBatchInfo(_) => methods::GET_BATCH_INFO,
            Self::GetBatchStatus(_) => methods::GET_BATCH_STATUS,
            Self::GetTraceabilityRecords(_) => methods::GET_TRACEABILITY_RECORDS,
            Self::GetTotalBatches => methods::GET_TOTAL_BATCHES,
        }
    }
}

/// Contract method names as they appear on the wire.
pub mod methods {
    pub const CREATE_MILLET_BATCH: &str = "createMilletBatch";
    pub const ADD_TRACEABILITY_RECORD: &str = "addTraceabilityRecord";
    pub const VERIFY_BATCH: &str = "verifyBatch";
    pub const GET_BATCH_INFO: &str = "getBatchInfo";
    pub const GET_BATCH_STATUS: &str = "getBatchStatus";
    pub const GET_TRACEABILITY_RECORDS: &str = "getTraceabilityRecords";
    pub const GET_TOTAL_BATCHES: &str = "getTotalBatches";
}

/// Named form of the `getBatchInfo` result.
///
/// For a batch that was never created the contract returns default-valued
/// fields and `exists == false`; `exists` is the only authoritative signal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchInfo {
    pub batch_id: String,
    pub farmer_id: String,
    pub millet_type: String,
    pub variety: String,
    pub harvest_date: String,
    pub quality_grade: String,
    pub organic_certified: bool,
    pub owner: Address,
    pub exists: bool,
}

impl BatchInfo {
    /// Info for a live batch.
    pub fn from_batch(batch: &Batch) -> Self {
        Self {
            batch_id: batch.batch_id.to_string(),
            farmer_id: batch.farmer_id.clone(),
            millet_type: batch.millet_type.clone(),
            variety: batch.variety.clone(),
            harvest_date: batch.harvest_date.clone(),
            quality_grade: batch.quality_grade.clone(),
            organic_certified: batch.organic_certified,
            owner: batch.owner,
            exists: true,
        }
    }

    /// Assemble the full read model. Returns `None` unless `exists` is set.
    pub fn into_batch(self, status: &BatchStatus) -> Option<Batch> {
        if !self.exists {
            return None;
        }
        let batch_id = BatchId::new(self.batch_id).ok()?;
        Some(Batch {
            batch_id,
            farmer_id: self.farmer_id,
            millet_type: self.millet_type,
            variety: self.variety,
            harvest_date: self.harvest_date,
            quality_grade: self.quality_grade,
            organic_certified: self.organic_certified,
            owner: self.owner,
            verified: status.verified,
        })
    }
}

/// Named form of the `getBatchStatus` result.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStatus {
    pub verified: bool,
    pub record_count: u64,
}

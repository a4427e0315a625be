use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::identity::AccountId;

/// Globally unique identifier of a provenance batch.
///
/// Generated client-side and never reassigned. The only validation applied
/// is non-emptiness; uniqueness is enforced by the execution environment.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BatchId(String);

impl BatchId {
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(TypeError::EmptyBatchId);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BatchId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BatchId> for String {
    fn from(id: BatchId) -> Self {
        id.0
    }
}

impl AsRef<str> for BatchId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BatchId({})", self.0)
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Descriptive attributes of a batch, before an identifier is assigned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDraft {
    pub farmer_id: String,
    pub millet_type: String,
    pub variety: String,
    pub harvest_date: String,
    pub quality_grade: String,
    pub organic_certified: bool,
}

impl BatchDraft {
    /// Attach an identifier, producing a creation payload.
    pub fn with_id(self, batch_id: BatchId) -> BatchInput {
        BatchInput {
            batch_id,
            farmer_id: self.farmer_id,
            millet_type: self.millet_type,
            variety: self.variety,
            harvest_date: self.harvest_date,
            quality_grade: self.quality_grade,
            organic_certified: self.organic_certified,
        }
    }
}

/// Payload of a batch creation request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchInput {
    pub batch_id: BatchId,
    pub farmer_id: String,
    pub millet_type: String,
    pub variety: String,
    pub harvest_date: String,
    pub quality_grade: String,
    pub organic_certified: bool,
}

/// A registered batch as read back from the ledger.
///
/// Descriptive fields and `owner` are immutable once created. `verified` is
/// changed only through the verification gate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub batch_id: BatchId,
    pub farmer_id: String,
    pub millet_type: String,
    pub variety: String,
    pub harvest_date: String,
    pub quality_grade: String,
    pub organic_certified: bool,
    pub owner: AccountId,
    pub verified: bool,
}

impl Batch {
    /// A freshly created, unverified batch owned by `owner`.
    pub fn from_input(input: &BatchInput, owner: AccountId) -> Self {
        Self {
            batch_id: input.batch_id.clone(),
            farmer_id: input.farmer_id.clone(),
            millet_type: input.millet_type.clone(),
            variety: input.variety.clone(),
            harvest_date: input.harvest_date.clone(),
            quality_grade: input.quality_grade.clone(),
            organic_certified: input.organic_certified,
            owner,
            verified: false,
        }
    }

    /// Returns `true` if every descriptive field equals the creation payload.
    pub fn matches_input(&self, input: &BatchInput) -> bool {
        self.batch_id == input.batch_id
            && self.farmer_id == input.farmer_id
            && self.millet_type == input.millet_type
            && self.variety == input.variety
            && self.harvest_date == input.harvest_date
            && self.quality_grade == input.quality_grade
            && self.organic_certified == input.organic_certified
    }
}

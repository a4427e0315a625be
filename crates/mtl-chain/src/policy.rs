use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use mtl_types::AccountId;

/// Who may call `verifyBatch`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "accounts")]
pub enum VerifierPolicy {
    Anyone,
    /// The batch owner or the contract admin (the deploying account).
    OwnerOrAdmin,
    Listed(BTreeSet<AccountId>),
}

/// Who may call `addTraceabilityRecord`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "accounts")]
pub enum RecorderPolicy {
    Anyone,
    Listed(BTreeSet<AccountId>),
}

/// Write authorization enforced by the contract host.
///
/// Batch creation is open to every account. The default policy lets anyone
/// record stages and restricts verification to the owner or admin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPolicy {
    pub verifiers: VerifierPolicy,
    pub recorders: RecorderPolicy,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self {
            verifiers: VerifierPolicy::OwnerOrAdmin,
            recorders: RecorderPolicy::Anyone,
        }
    }
}

impl AccessPolicy {
    /// No restrictions on any write.
    pub fn open() -> Self {
        Self {
            verifiers: VerifierPolicy::Anyone,
            recorders: RecorderPolicy::Anyone,
        }
    }

    pub fn may_verify(&self, account: &AccountId, owner: &AccountId, admin: &AccountId) -> bool {
        match &self.verifiers {
            VerifierPolicy::Anyone => true,
            VerifierPolicy::OwnerOrAdmin => account == owner || account == admin,
            VerifierPolicy::Listed(accounts) => accounts.contains(account),
        }
    }

    pub fn may_record(&self, account: &AccountId) -> bool {
        match &self.recorders {
            RecorderPolicy::Anyone => true,
            RecorderPolicy::Listed(accounts) => accounts.contains(account),
        }
    }
}

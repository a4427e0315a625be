use std::convert::Infallible;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::temporal::BlockTime;

/// Supply-chain phase described by a traceability record.
///
/// The vocabulary is open: values outside the six known phases are kept
/// verbatim in [`Stage::Other`] and round-trip unchanged. Stages compare by
/// their stored text, so `Other("harvesting")` equals `Harvesting`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Stage {
    Planting,
    Harvesting,
    Processing,
    Packaging,
    Shipping,
    Delivery,
    Other(String),
}

impl Stage {
    /// The six phases known to collaborators, in supply-chain order.
    pub const KNOWN: [Stage; 6] = [
        Stage::Planting,
        Stage::Harvesting,
        Stage::Processing,
        Stage::Packaging,
        Stage::Shipping,
        Stage::Delivery,
    ];

    /// Parse a stored stage value. Never fails.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "planting" => Self::Planting,
            "harvesting" => Self::Harvesting,
            "processing" => Self::Processing,
            "packaging" => Self::Packaging,
            "shipping" => Self::Shipping,
            "delivery" => Self::Delivery,
            other => Self::Other(other.to_string()),
        }
    }

    /// The stored text of this stage.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Planting => "planting",
            Self::Harvesting => "harvesting",
            Self::Processing => "processing",
            Self::Packaging => "packaging",
            Self::Shipping => "shipping",
            Self::Delivery => "delivery",
            Self::Other(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl PartialEq for Stage {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Stage {}

impl Hash for Stage {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl FromStr for Stage {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<String> for Stage {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<Stage> for String {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied content of a traceability record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordInput {
    pub stage: Stage,
    pub location: String,
    pub operator: String,
    pub notes: String,
    /// Opaque digest string; see `mtl_crypto::CertificateHasher`.
    pub certificate_hash: String,
}

impl RecordInput {
    pub fn new(stage: Stage, location: impl Into<String>, operator: impl Into<String>) -> Self {
        Self {
            stage,
            location: location.into(),
            operator: operator.into(),
            notes: String::new(),
            certificate_hash: String::new(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_certificate_hash(mut self, hash: impl Into<String>) -> Self {
        self.certificate_hash = hash.into();
        self
    }
}

/// One accepted supply-chain event.
///
/// `timestamp` and `verified` are assigned by the execution environment at
/// acceptance. Records never change after acceptance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceabilityRecord {
    pub stage: Stage,
    pub location: String,
    pub timestamp: BlockTime,
    pub operator: String,
    pub notes: String,
    pub certificate_hash: String,
    pub verified: bool,
}

impl TraceabilityRecord {
    /// Build the accepted form of `input` at block time `timestamp`.
    pub fn accepted(input: &RecordInput, timestamp: BlockTime) -> Self {
        Self {
            stage: Stage::parse(input.stage.as_str()),
            location: input.location.clone(),
            timestamp,
            operator: input.operator.clone(),
            notes: input.notes.clone(),
            certificate_hash: input.certificate_hash.clone(),
            verified: false,
        }
    }

    /// Returns `true` if the caller-supplied fields equal `input`.
    pub fn matches_input(&self, input: &RecordInput) -> bool {
        self.stage == input.stage
            && self.location == input.location
            && self.operator == input.operator
            && self.notes == input.notes
            && self.certificate_hash == input.certificate_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_stages_parse() {
        for stage in Stage::KNOWN {
            assert_eq!(Stage::parse(stage.as_str()), stage);
            assert!(stage.is_known());
        }
    }

    #[test]
    fn unknown_stage_kept_verbatim() {
        let stage = Stage::parse("Cold Storage");
        assert_eq!(stage, Stage::Other("Cold Storage".into()));
        assert_eq!(stage.as_str(), "Cold Storage");
        assert!(!stage.is_known());
    }

    #[test]
    fn stage_parsing_is_case_sensitive() {
        assert_eq!(Stage::parse("Harvesting"), Stage::Other("Harvesting".into()));
    }

    #[test]
    fn spelled_out_known_stage_equals_variant() {
        let spelled = Stage::Other("harvesting".into());
        assert_eq!(spelled, Stage::Harvesting);
        assert_ne!(Stage::Other("Harvesting".into()), Stage::Harvesting);

        let set: std::collections::HashSet<Stage> = [Stage::Harvesting].into_iter().collect();
        assert!(set.contains(&spelled));
    }

    #[test]
    fn accepted_record_normalises_known_stage() {
        let input = RecordInput::new(Stage::Other("shipping".into()), "Patna", "Op2");
        let record = TraceabilityRecord::accepted(&input, BlockTime::from_secs(5));
        assert!(matches!(record.stage, Stage::Shipping));
        assert!(record.stage.is_known());
        assert!(record.matches_input(&input));
    }

    #[test]
    fn stage_serializes_as_string() {
        let json = serde_json::to_string(&Stage::Shipping).unwrap();
        assert_eq!(json, "\"shipping\"");
        let parsed: Stage = serde_json::from_str("\"milling\"").unwrap();
        assert_eq!(parsed, Stage::Other("milling".into()));
    }

    #[test]
    fn accepted_record_is_unverified() {
        let input = RecordInput::new(Stage::Harvesting, "Bihar", "Op1").with_certificate_hash("0xab");
        let record = TraceabilityRecord::accepted(&input, BlockTime::from_secs(10));
        assert!(!record.verified);
        assert_eq!(record.timestamp, BlockTime::from_secs(10));
        assert!(record.matches_input(&input));
    }

    proptest! {
        #[test]
        fn any_stage_text_roundtrips(raw in ".*") {
            let stage = Stage::parse(&raw);
            prop_assert_eq!(stage.as_str(), raw.as_str());
            prop_assert_eq!(String::from(stage), raw);
        }
    }
}

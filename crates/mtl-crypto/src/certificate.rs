use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::hasher::{ContentHasher, HasherError};

/// Fixed-length digest of a certificate payload.
///
/// Stored on the ledger as its `0x`-prefixed hex string and never
/// interpreted there.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CertificateHash([u8; 32]);

impl CertificateHash {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(s: &str) -> Result<Self, HasherError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| HasherError::Serialization(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| HasherError::Serialization(format!("expected 32 bytes, got {}", b.len())))?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for CertificateHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CertificateHash(0x{})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for CertificateHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for CertificateHash {
    type Err = HasherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<CertificateHash> for String {
    fn from(hash: CertificateHash) -> Self {
        hash.to_hex()
    }
}

impl Serialize for CertificateHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for CertificateHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Deterministic hashing of arbitrary certificate payloads.
///
/// The payload is serialized to canonical JSON (sorted keys, compact) and
/// hashed with domain-separated BLAKE3. Identical payloads always produce
/// the same digest regardless of field order.
#[derive(Clone, Copy, Debug, Default)]
pub struct CertificateHasher;

impl CertificateHasher {
    pub fn new() -> Self {
        Self
    }

    pub fn hash<T: Serialize>(&self, payload: &T) -> Result<CertificateHash, HasherError> {
        ContentHasher::CERTIFICATE
            .hash_json(payload)
            .map(CertificateHash)
    }

    /// Recompute the digest of `payload` and compare with `expected`.
    pub fn verify<T: Serialize>(&self, payload: &T, expected: &CertificateHash) -> Result<bool, HasherError> {
        Ok(self.hash(payload)? == *expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn same_payload_same_digest() {
        let payload = json!({"lab": "NABL-42", "moisture": 11.5, "organic": true});
        let hasher = CertificateHasher::new();
        assert_eq!(hasher.hash(&payload).unwrap(), hasher.hash(&payload).unwrap());
    }

    #[test]
    fn key_order_does_not_matter() {
        let hasher = CertificateHasher::new();
        let a = json!({"lab": "NABL-42", "grade": "A"});
        let b = json!({"grade": "A", "lab": "NABL-42"});
        assert_eq!(hasher.hash(&a).unwrap(), hasher.hash(&b).unwrap());
    }

    #[test]
    fn differing_field_changes_digest() {
        let hasher = CertificateHasher::new();
        let a = json!({"lab": "NABL-42", "grade": "A"});
        let b = json!({"lab": "NABL-42", "grade": "B"});
        assert_ne!(hasher.hash(&a).unwrap(), hasher.hash(&b).unwrap());
    }

    #[test]
    fn digest_renders_as_prefixed_hex() {
        let digest = CertificateHasher::new().hash(&json!({"x": 1})).unwrap();
        let hex = digest.to_string();
        assert!(hex.starts_with("0x"));
        assert_eq!(hex.len(), 66);
        assert_eq!(hex.parse::<CertificateHash>().unwrap(), digest);
    }

    #[test]
    fn verify_matches_payload() {
        let hasher = CertificateHasher::new();
        let payload = json!({"inspector": "Op1"});
        let digest = hasher.hash(&payload).unwrap();
        assert!(hasher.verify(&payload, &digest).unwrap());
        assert!(!hasher.verify(&json!({"inspector": "Op2"}), &digest).unwrap());
    }

    #[test]
    fn typed_payloads_hash_like_their_json() {
        #[derive(Serialize)]
        struct Certificate {
            lab: String,
            grade: String,
        }
        let hasher = CertificateHasher::new();
        let typed = Certificate {
            lab: "NABL-42".into(),
            grade: "A".into(),
        };
        let untyped = json!({"grade": "A", "lab": "NABL-42"});
        assert_eq!(hasher.hash(&typed).unwrap(), hasher.hash(&untyped).unwrap());
    }

    proptest! {
        #[test]
        fn hashing_is_deterministic(lab in ".*", score in any::<i64>(), organic in any::<bool>()) {
            let hasher = CertificateHasher::new();
            let payload = json!({"lab": lab, "score": score, "organic": organic});
            prop_assert_eq!(hasher.hash(&payload).unwrap(), hasher.hash(&payload.clone()).unwrap());
        }

        #[test]
        fn distinct_payloads_give_distinct_digests(a in ".*", b in ".*") {
            prop_assume!(a != b);
            let hasher = CertificateHasher::new();
            let left = hasher.hash(&json!({"notes": a})).unwrap();
            let right = hasher.hash(&json!({"notes": b})).unwrap();
            prop_assert_ne!(left, right);
        }
    }
}

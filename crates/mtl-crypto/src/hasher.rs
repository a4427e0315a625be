use std::collections::BTreeMap;

use serde_json::Value;

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag (e.g. `"mtl-certificate-v1"`) that is
/// prepended to every hash computation, so a certificate payload and a
/// transaction with identical bytes never share a digest.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for certificate payloads.
    pub const CERTIFICATE: Self = Self {
        domain: "mtl-certificate-v1",
    };
    /// Hasher for transaction hashes assigned by the in-memory chain.
    pub const TRANSACTION: Self = Self {
        domain: "mtl-transaction-v1",
    };

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        *hasher.finalize().as_bytes()
    }

    /// Hash a serializable value in its canonical JSON form.
    pub fn hash_json<T: serde::Serialize>(&self, value: &T) -> Result<[u8; 32], HasherError> {
        let canonical = canonical_json(value)?;
        Ok(self.hash(canonical.as_bytes()))
    }
}

/// Canonical JSON encoding: object keys sorted recursively, compact output.
///
/// Two values that differ only in key order encode identically.
pub fn canonical_json<T: serde::Serialize>(value: &T) -> Result<String, HasherError> {
    let value = serde_json::to_value(value).map_err(|e| HasherError::Serialization(e.to_string()))?;
    serde_json::to_string(&sort_keys(value)).map_err(|e| HasherError::Serialization(e.to_string()))
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, sort_keys(v))).collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum HasherError {
    #[error("serialization error: {0}")]
    Serialization(String),
}

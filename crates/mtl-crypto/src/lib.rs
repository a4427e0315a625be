//! Hashing and identifier primitives for the Millet Trace Ledger.
//!
//! Provides domain-separated BLAKE3 hashing with canonical JSON encoding,
//! certificate digests, and client-side batch identifier generation with
//! injectable clock and randomness.
//!
//! All crypto operations wrap established libraries — no custom cryptography.

pub mod batch_id;
pub mod certificate;
pub mod hasher;

pub use batch_id::{BatchIdGenerator, Clock, FixedClock, SystemClock, BATCH_ID_PREFIX, RANDOM_SUFFIX_LEN};
pub use certificate::{CertificateHash, CertificateHasher};
pub use hasher::{canonical_json, ContentHasher, HasherError};

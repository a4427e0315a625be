use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Block timestamp assigned by the execution environment.
///
/// Whole seconds since the UNIX epoch, the resolution contract hosts report.
/// Record timestamps are never supplied by callers.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockTime(u64);

impl BlockTime {
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Self(secs)
    }

    /// The zero timestamp (uninitialised storage).
    pub const fn zero() -> Self {
        Self(0)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Convert to a UTC datetime. Fails only for values beyond chrono's range.
    pub fn to_datetime(&self) -> Result<DateTime<Utc>, TypeError> {
        let secs = i64::try_from(self.0)
            .map_err(|_| TypeError::InvalidTimestamp(self.0.to_string()))?;
        DateTime::from_timestamp(secs, 0).ok_or_else(|| TypeError::InvalidTimestamp(self.0.to_string()))
    }

    /// The later of `self` and `other`. Block clocks never step backwards.
    pub fn max(self, other: Self) -> Self {
        if other > self {
            other
        } else {
            self
        }
    }
}

impl From<DateTime<Utc>> for BlockTime {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp().max(0) as u64)
    }
}

impl fmt::Debug for BlockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockTime({})", self.0)
    }
}

impl fmt::Display for BlockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Ok(dt) => write!(f, "{}", dt.to_rfc3339()),
            Err(_) => write!(f, "{}s", self.0),
        }
    }
}

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use mtl_types::{AccountId, Address};

use crate::error::{LedgerError, LedgerResult};

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:7545";
pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MINT_ATTEMPTS: u32 = 3;

pub const ENV_ENDPOINT: &str = "MTL_ENDPOINT";
pub const ENV_CONTRACT: &str = "MTL_CONTRACT";
pub const ENV_ACCOUNT: &str = "MTL_ACCOUNT";
pub const ENV_SUBMIT_TIMEOUT_SECS: &str = "MTL_SUBMIT_TIMEOUT_SECS";

/// Which of the environment's accounts a client signs with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountSelector {
    /// Position in the environment's account list.
    Index(usize),
    Address(AccountId),
}

impl Default for AccountSelector {
    fn default() -> Self {
        Self::Index(0)
    }
}

impl AccountSelector {
    pub fn select(&self, accounts: &[AccountId]) -> Option<AccountId> {
        match self {
            Self::Index(i) => accounts.get(*i).copied(),
            Self::Address(addr) => accounts.iter().find(|a| *a == addr).copied(),
        }
    }
}

impl FromStr for AccountSelector {
    type Err = LedgerError;

    /// Either a decimal index or a `0x` address.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with("0x") {
            return Address::from_hex(s)
                .map(Self::Address)
                .map_err(|e| LedgerError::Config(format!("account {s:?}: {e}")));
        }
        s.parse::<usize>()
            .map(Self::Index)
            .map_err(|_| LedgerError::Config(format!("account {s:?}: expected index or 0x address")))
    }
}

impl fmt::Display for AccountSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "#{i}"),
            Self::Address(addr) => write!(f, "{addr}"),
        }
    }
}

/// Settings a [`crate::LedgerClient`] is created from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub endpoint: String,
    /// Address of the bound contract. Required at connect time.
    pub contract: Option<Address>,
    pub account: AccountSelector,
    #[serde(with = "duration_secs")]
    pub submit_timeout: Duration,
    /// Ids tried by `BatchRegistry::mint` before giving up on collisions.
    pub mint_attempts: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            contract: None,
            account: AccountSelector::default(),
            submit_timeout: DEFAULT_SUBMIT_TIMEOUT,
            mint_attempts: DEFAULT_MINT_ATTEMPTS,
        }
    }
}

impl ClientConfig {
    pub fn for_contract(contract: Address) -> Self {
        Self {
            contract: Some(contract),
            ..Self::default()
        }
    }

    pub fn from_toml_str(s: &str) -> LedgerResult<Self> {
        toml::from_str(s).map_err(|e| LedgerError::Config(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| LedgerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Load from an optional file, then apply `MTL_*` environment overrides.
    pub fn load(path: Option<&Path>) -> LedgerResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from `lookup`, keyed by the `MTL_*` variable names.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> LedgerResult<()> {
        if let Some(endpoint) = lookup(ENV_ENDPOINT) {
            self.endpoint = endpoint;
        }
        if let Some(contract) = lookup(ENV_CONTRACT) {
            let addr = Address::from_hex(contract.trim())
                .map_err(|e| LedgerError::Config(format!("{ENV_CONTRACT}: {e}")))?;
            self.contract = Some(addr);
        }
        if let Some(account) = lookup(ENV_ACCOUNT) {
            self.account = account.parse()?;
        }
        if let Some(secs) = lookup(ENV_SUBMIT_TIMEOUT_SECS) {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|_| LedgerError::Config(format!("{ENV_SUBMIT_TIMEOUT_SECS}: {secs:?}")))?;
            self.submit_timeout = Duration::from_secs(secs);
        }
        Ok(())
    }

    pub fn contract(&self) -> LedgerResult<Address> {
        self.contract
            .ok_or_else(|| LedgerError::Config("no contract address configured".into()))
    }

    pub fn validate(&self) -> LedgerResult<()> {
        if self.endpoint.trim().is_empty() {
            return Err(LedgerError::Config("endpoint is empty".into()));
        }
        if self.mint_attempts == 0 {
            return Err(LedgerError::Config("mint_attempts must be at least 1".into()));
        }
        if self.submit_timeout.is_zero() {
            return Err(LedgerError::Config("submit_timeout must be positive".into()));
        }
        self.contract().map(|_| ())
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

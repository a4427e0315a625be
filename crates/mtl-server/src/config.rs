use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};

use mtl_chain::{AccessPolicy, ChainConfig, RecorderPolicy, VerifierPolicy};

use crate::error::{ServerError, ServerResult};

pub const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([127, 0, 0, 1], 7545);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Label the dev accounts and contract address are derived from.
    pub network: String,
    pub accounts: usize,
    pub confirmations: u64,
    pub verifiers: VerifierPolicy,
    pub recorders: RecorderPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let chain = ChainConfig::default();
        Self {
            bind_addr: SocketAddr::from(DEFAULT_BIND_ADDR),
            network: chain.network,
            accounts: chain.accounts,
            confirmations: chain.confirmations,
            verifiers: chain.policy.verifiers,
            recorders: chain.policy.recorders,
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(s: &str) -> ServerResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| ServerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> ServerResult<()> {
        if self.accounts == 0 {
            return Err(ServerError::Config("accounts must be at least 1".into()));
        }
        if self.network.trim().is_empty() {
            return Err(ServerError::Config("network label is empty".into()));
        }
        Ok(())
    }

    pub fn chain_config(&self) -> ChainConfig {
        ChainConfig {
            network: self.network.clone(),
            accounts: self.accounts,
            confirmations: self.confirmations,
            policy: AccessPolicy {
                verifiers: self.verifiers.clone(),
                recorders: self.recorders.clone(),
            },
        }
    }
}

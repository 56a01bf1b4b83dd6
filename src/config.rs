//! Node configuration: defaults plus environment overrides.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::ConfigError;

pub const BIND_ADDR_VAR: &str = "LEDGER_BIND_ADDR";
pub const KEY_PATH_VAR: &str = "LEDGER_KEY_PATH";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    pub bind_addr: SocketAddr,
    /// Ed25519 seed used by the document processor.
    pub key_path: PathBuf,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8001)),
            key_path: PathBuf::from("data").join("key.bin"),
        }
    }
}

impl NodeConfig {
    /// Defaults overridden by `LEDGER_BIND_ADDR` / `LEDGER_KEY_PATH`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        if let Some(addr) = lookup(BIND_ADDR_VAR) {
            cfg.bind_addr = addr.parse().map_err(|e: std::net::AddrParseError| {
                ConfigError::InvalidVar {
                    var: BIND_ADDR_VAR,
                    reason: e.to_string(),
                }
            })?;
        }
        if let Some(path) = lookup(KEY_PATH_VAR).filter(|p| !p.trim().is_empty()) {
            cfg.key_path = PathBuf::from(path);
        }
        Ok(cfg)
    }
}

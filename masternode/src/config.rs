//! Masternode configuration file (masternode.conf) support
//!
//! Format: alias address:port operator_privkey collateral_txid collateral_vout
//!
//! Example:
//! mn1 51.15.30.7:24000 7rEmb3kQxVxNB1d7sbXg4G1TkW3CjvQbCp8Jq2eNvZdMhVfAqGm 2bcd3c84c84f87eaa86e4e56834c92927a07f9e18718810b92e0d0324456a67c 0

use crate::error::ConfigError;
use ember_core::{Hash256, OutPoint};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

/// One controlled masternode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasternodeConfigEntry {
    /// Alias used by control commands.
    pub alias: String,
    /// Advertised address of the remote masternode.
    pub address: SocketAddr,
    /// Operator private key, in wallet import format.
    pub operator_privkey: String,
    /// Outpoint of the locked collateral.
    pub collateral_outpoint: OutPoint,
}

impl MasternodeConfigEntry {
    fn parse_line(line: &str, line_num: usize) -> Result<Self, ConfigError> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() != 5 {
            return Err(ConfigError::Parse {
                line: line_num,
                message: format!(
                    "expected 5 fields, got {}; format: alias address:port privkey txid vout",
                    parts.len()
                ),
            });
        }

        let address: SocketAddr = parts[1].parse().map_err(|_| ConfigError::Parse {
            line: line_num,
            message: format!("invalid address: {}", parts[1]),
        })?;

        let txid = Hash256::from_hex(parts[3]).ok_or_else(|| ConfigError::Parse {
            line: line_num,
            message: format!("invalid collateral txid: {}", parts[3]),
        })?;

        let vout: u32 = parts[4].parse().map_err(|_| ConfigError::Parse {
            line: line_num,
            message: format!("invalid output index: {}", parts[4]),
        })?;

        Ok(MasternodeConfigEntry {
            alias: parts[0].to_string(),
            address,
            operator_privkey: parts[2].to_string(),
            collateral_outpoint: OutPoint::new(txid, vout),
        })
    }
}

/// Parsed masternode.conf contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MasternodeConfig {
    entries: Vec<MasternodeConfigEntry>,
}

impl MasternodeConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::parse(&fs::read_to_string(path)?)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let mut entries: Vec<MasternodeConfigEntry> = Vec::new();
        for (i, raw) in contents.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let entry = MasternodeConfigEntry::parse_line(line, i + 1)?;
            if entries.iter().any(|e| e.alias == entry.alias) {
                return Err(ConfigError::DuplicateAlias(entry.alias));
            }
            entries.push(entry);
        }
        Ok(MasternodeConfig { entries })
    }

    pub fn entries(&self) -> &[MasternodeConfigEntry] {
        &self.entries
    }

    pub fn find_alias(&self, alias: &str) -> Option<&MasternodeConfigEntry> {
        self.entries.iter().find(|e| e.alias == alias)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

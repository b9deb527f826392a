//! Network selection and magic bytes.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkType {
    Mainnet,
    Testnet,
}

impl NetworkType {
    /// Four magic bytes identifying the network in persisted artifacts.
    pub fn magic(&self) -> [u8; 4] {
        match self {
            NetworkType::Mainnet => [0x45, 0x4d, 0x42, 0x52],
            NetworkType::Testnet => [0x74, 0x45, 0x4d, 0x42],
        }
    }

    /// Abuse scoring for list requests only applies on the public network.
    pub fn is_public(&self) -> bool {
        matches!(self, NetworkType::Mainnet)
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkType::Mainnet => write!(f, "mainnet"),
            NetworkType::Testnet => write!(f, "testnet"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magics_differ_per_network() {
        assert_ne!(NetworkType::Mainnet.magic(), NetworkType::Testnet.magic());
    }
}

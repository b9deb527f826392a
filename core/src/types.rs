//! Outpoints, scripts, and key material as they appear on the wire.

use crate::hash::{key_digest, Hash256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to a transaction output. The registry's primary key.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct OutPoint {
    pub txid: Hash256,
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: Hash256, vout: u32) -> Self {
        OutPoint { txid, vout }
    }

    /// The all-zero outpoint is the wire encoding of "no specific entry".
    pub fn null() -> Self {
        OutPoint::default()
    }

    pub fn is_null(&self) -> bool {
        self.txid.is_zero() && self.vout == 0
    }

    /// 36-byte form: txid followed by the little-endian output index.
    pub fn to_bytes(&self) -> [u8; 36] {
        let mut out = [0u8; 36];
        out[..32].copy_from_slice(self.txid.as_bytes());
        out[32..].copy_from_slice(&self.vout.to_le_bytes());
        out
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

/// Transaction input as carried by gossip messages. The script-sig must be
/// empty on announcements; a non-empty one is dropped by validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TxIn {
    pub prevout: OutPoint,
    pub script_sig: Script,
}

impl TxIn {
    pub fn from_outpoint(prevout: OutPoint) -> Self {
        TxIn {
            prevout,
            script_sig: Script::empty(),
        }
    }
}

/// An owned byte script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Script(Vec<u8>);

const OP_DUP: u8 = 0x76;
const OP_HASH160: u8 = 0xa9;
const OP_EQUAL: u8 = 0x87;
const OP_EQUALVERIFY: u8 = 0x88;
const OP_CHECKSIG: u8 = 0xac;

impl Script {
    pub fn new(bytes: Vec<u8>) -> Self {
        Script(bytes)
    }

    pub fn empty() -> Self {
        Script(Vec::new())
    }

    /// Canonical 25-byte pay-to-pubkey-hash script for a 20-byte key digest.
    pub fn pay_to_key_digest(digest: &[u8; 20]) -> Self {
        let mut bytes = Vec::with_capacity(25);
        bytes.push(OP_DUP);
        bytes.push(OP_HASH160);
        bytes.push(20);
        bytes.extend_from_slice(digest);
        bytes.push(OP_EQUALVERIFY);
        bytes.push(OP_CHECKSIG);
        Script(bytes)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Script-hash outputs (multisig wrappers) look like
    /// `OP_HASH160 <20 bytes> OP_EQUAL`.
    pub fn is_pay_to_script_hash(&self) -> bool {
        self.0.len() == 23 && self.0[0] == OP_HASH160 && self.0[1] == 20 && self.0[22] == OP_EQUAL
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

/// A serialized public key: 33 bytes compressed or 65 bytes uncompressed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct PublicKey(Vec<u8>);

impl PublicKey {
    pub fn new(bytes: Vec<u8>) -> Self {
        PublicKey(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_canonical(&self) -> bool {
        match self.0.len() {
            33 => self.0[0] == 0x02 || self.0[0] == 0x03,
            65 => self.0[0] == 0x04,
            _ => false,
        }
    }

    /// 20-byte digest addressing this key, if the key has a valid shape.
    pub fn key_id(&self) -> Option<[u8; 20]> {
        if !self.is_canonical() {
            return None;
        }
        Some(key_digest(&self.0))
    }

    /// Canonical pay-to-pubkey-hash script for this key.
    pub fn address_script(&self) -> Option<Script> {
        self.key_id().map(|id| Script::pay_to_key_digest(&id))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

/// A DER-encoded signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Signature(Vec<u8>);

impl Signature {
    pub fn new(bytes: Vec<u8>) -> Self {
        Signature(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::sha256d;

    fn compressed_key() -> PublicKey {
        let mut bytes = vec![0x02];
        bytes.extend_from_slice(&[0x11; 32]);
        PublicKey::new(bytes)
    }

    #[test]
    fn null_outpoint_is_null() {
        assert!(OutPoint::null().is_null());
        assert!(!OutPoint::new(sha256d(b"tx"), 0).is_null());
        assert!(!OutPoint::new(Hash256::ZERO, 1).is_null());
    }

    #[test]
    fn outpoint_bytes_include_index() {
        let txid = sha256d(b"tx");
        let a = OutPoint::new(txid, 0).to_bytes();
        let b = OutPoint::new(txid, 1).to_bytes();
        assert_ne!(a, b);
        assert_eq!(&a[..32], txid.as_bytes());
    }

    #[test]
    fn canonical_key_builds_25_byte_script() {
        let script = compressed_key().address_script().unwrap();
        assert_eq!(script.len(), 25);
        assert!(!script.is_pay_to_script_hash());
    }

    #[test]
    fn malformed_key_has_no_script() {
        assert!(PublicKey::new(vec![0x02; 12]).address_script().is_none());
        assert!(PublicKey::new(vec![0x07; 33]).address_script().is_none());
    }

    #[test]
    fn p2sh_shape_detected() {
        let mut bytes = vec![0xa9, 20];
        bytes.extend_from_slice(&[0x22; 20]);
        bytes.push(0x87);
        assert!(Script::new(bytes).is_pay_to_script_hash());
        assert!(!compressed_key().address_script().unwrap().is_pay_to_script_hash());
    }
}

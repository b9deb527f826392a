//! Signature verification seam.

use ember_core::{OutPoint, PublicKey, Signature};

/// Verifies operator signatures and collateral ownership.
pub trait MessageVerifier: Send + Sync {
    /// ECDSA-style check of `sig` over `message` under `key`.
    fn verify(&self, key: &PublicKey, sig: &Signature, message: &[u8]) -> bool;

    /// Whether `key` owns the output referenced by `outpoint`.
    fn owns_output(&self, key: &PublicKey, outpoint: &OutPoint) -> bool;
}

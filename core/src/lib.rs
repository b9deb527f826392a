//! Ember Core - shared primitives for the masternode network
//!
//! Everything the higher layers agree on lives here: digests, the wire
//! codec primitives, outpoint/script/key types, network parameters, and
//! protocol constants.

pub mod codec;
pub mod constants;
pub mod hash;
pub mod network;
pub mod types;

pub use hash::Hash256;
pub use network::NetworkType;
pub use types::{OutPoint, PublicKey, Script, Signature, TxIn};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

//! Ember Masternode Module
//!
//! Maintains the eventually-consistent masternode directory: admission of
//! untrusted gossip (collateral proof, signatures, freshness bounds),
//! the in-memory registry with its expiration sweep, deterministic
//! per-block ranking, and the checksummed on-disk cache.

pub mod chain;
pub mod config;
pub mod entry;
pub mod error;
pub mod gossip;
pub mod maintenance;
pub mod messages;
pub mod peers;
pub mod ranker;
pub mod registry;
pub mod signer;
pub mod snapshot;
pub mod validator;

#[cfg(test)]
pub(crate) mod testutil;

pub use chain::{ChainView, CollateralProbe, MempoolVerdict};
pub use entry::{ActiveState, Entry, EntryVariant};
pub use gossip::GossipProtocol;
pub use messages::GossipMessage;
pub use registry::Registry;
pub use snapshot::SnapshotFile;
pub use validator::{RejectReason, Verdict};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

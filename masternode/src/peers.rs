//! Capabilities injected by the peer manager and the local identity.
//!
//! The gossip layer calls these while holding its dispatch lock and the
//! registry lock; implementations must not call back into the registry.

use crate::messages::GossipMessage;
use ember_core::{OutPoint, PublicKey};
use std::net::SocketAddr;

/// Identifies a live peer connection.
pub type PeerId = SocketAddr;

/// Outbound surface of the peer manager.
pub trait PeerSink: Send + Sync {
    /// Queue a message to one peer.
    fn push(&self, peer: PeerId, msg: &GossipMessage);

    /// Queue a message to every connected peer.
    fn broadcast(&self, msg: &GossipMessage);

    /// Raise `peer`'s misbehavior score.
    fn misbehaving(&self, peer: PeerId, score: u32);

    /// Offer a reachable masternode address to the address book.
    fn add_address(&self, addr: SocketAddr, source: PeerId, penalty_secs: i64);

    /// TCP reachability probe of a masternode's advertised address.
    fn probe_port(&self, addr: SocketAddr) -> bool;
}

/// The local node's masternode identity, if it runs one.
pub trait ActiveIdentity: Send + Sync {
    /// Operator key of the local masternode, when configured.
    fn operator_pubkey(&self) -> Option<PublicKey>;

    /// True while the local masternode has not yet learned its own outpoint;
    /// an announcement carrying our key must then re-validate as a create.
    fn awaiting_outpoint(&self) -> bool;

    /// Called when the registry admits an announcement carrying our key.
    fn on_remote_activation(&self, outpoint: &OutPoint, addr: SocketAddr);
}

/// Payment accounting collaborator for ranking tie-breaks.
pub trait PaymentLedger: Send + Sync {
    /// Seconds since `outpoint` last received a payment.
    fn seconds_since_payment(&self, outpoint: &OutPoint) -> i64;
}

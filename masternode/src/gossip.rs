//! Gossip message dispatch.
//!
//! One dispatch mutex serializes message processing so that each peer's
//! message runs atomically with respect to the others; the registry keeps
//! its own lock underneath and the two are never held in reverse order.
//! Peer-manager callbacks run while these locks are held and must not
//! re-enter the registry.

use crate::chain::ChainView;
use crate::entry::{Entry, EntryVariant};
use crate::messages::{
    AnnounceMessage, GossipMessage, ListRequestMessage, PingMessage, VoteMessage,
};
use crate::peers::{ActiveIdentity, PeerId, PeerSink};
use crate::registry::Registry;
use crate::signer::MessageVerifier;
use crate::validator::{self, Verdict, MISBEHAVIOR_LIST_ABUSE};
use ember_core::constants::{
    ADDRESS_PENALTY_SECONDS, MIN_ANNOUNCE_INTERVAL, MIN_PEER_PROTOCOL, MIN_PING_INTERVAL,
    PROTOCOL_VERSION,
};
use ember_core::{NetworkType, Script, TxIn};
use parking_lot::Mutex;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct GossipProtocol {
    registry: Arc<Registry>,
    chain: Arc<dyn ChainView>,
    signer: Arc<dyn MessageVerifier>,
    peers: Arc<dyn PeerSink>,
    identity: Arc<dyn ActiveIdentity>,
    network: NetworkType,
    dispatch: Mutex<()>,
}

impl GossipProtocol {
    pub fn new(
        registry: Arc<Registry>,
        chain: Arc<dyn ChainView>,
        signer: Arc<dyn MessageVerifier>,
        peers: Arc<dyn PeerSink>,
        identity: Arc<dyn ActiveIdentity>,
        network: NetworkType,
    ) -> Self {
        GossipProtocol {
            registry,
            chain,
            signer,
            peers,
            identity,
            network,
            dispatch: Mutex::new(()),
        }
    }

    /// Entry point from the peer manager.
    pub fn handle_message(&self, from: PeerId, msg: GossipMessage) {
        let _guard = self.dispatch.lock();
        let now = self.chain.adjusted_time();
        match msg {
            GossipMessage::Announce(m) => self.handle_announce(from, m, now),
            GossipMessage::Ping(m) => self.handle_ping(from, m, now),
            GossipMessage::Vote(m) => self.handle_vote(from, m, now),
            GossipMessage::ListRequest(m) => self.handle_list_request(from, m, now),
        }
    }

    /// Ask `peer` for the full list, unless we asked inside the window.
    pub fn request_list(&self, peer: PeerId) {
        let now = self.chain.adjusted_time();
        if !self.registry.should_ask_list(peer, now) {
            debug!(peer = %peer, "already asked this peer for the list; skipping");
            return;
        }
        self.peers.push(
            peer,
            &GossipMessage::ListRequest(ListRequestMessage {
                vin: TxIn::default(),
            }),
        );
        self.registry.mark_ask_list_sent(peer, now);
    }

    fn handle_announce(&self, from: PeerId, msg: AnnounceMessage, now: i64) {
        match validator::screen_announcement(&msg, self.chain.as_ref(), self.signer.as_ref()) {
            Verdict::Accept => {}
            verdict => return self.apply_verdict(from, verdict, "announce"),
        }

        let outpoint = msg.vin.prevout;

        // An announcement carrying our own operator key while our outpoint
        // is still undefined is our remote activation: it must take the
        // create path and re-prove collateral.
        let ours_pending = self.identity.awaiting_outpoint()
            && self.identity.operator_pubkey().as_ref() == Some(&msg.operator_pubkey);

        if !ours_pending {
            if let Some(stored) = self.registry.find_by_outpoint(&outpoint) {
                self.update_existing(from, msg, stored, now);
                return;
            }
        }

        match validator::verify_collateral(&msg, self.chain.as_ref(), self.signer.as_ref()) {
            Verdict::Accept => {}
            verdict => return self.apply_verdict(from, verdict, "announce"),
        }

        let is_local = is_private_address(&msg.address);
        let mut entry = Entry::from_announcement(&msg);

        // Script-hash (multisig) reward routing is not supported when
        // admitting a new extended entry; in-place updates leave such
        // scripts alone.
        if entry.variant == EntryVariant::Extended && entry.reward_address.is_pay_to_script_hash() {
            entry.reward_address = Script::empty();
            entry.reward_percent = 0;
        }

        if self.peers.probe_port(msg.address) {
            entry.port_reachable = true;
            self.peers
                .add_address(msg.address, from, ADDRESS_PENALTY_SECONDS);
        } else {
            entry.port_reachable = false;
        }

        entry.check(now, self.chain.as_ref());

        if self.registry.add(entry) {
            info!(address = %msg.address, %outpoint, "admitted new masternode entry");
        } else {
            debug!(%outpoint, "collateral already registered; keeping stored entry");
        }

        // this announcement carrying our operator key means we have been
        // remotely activated
        if self.identity.operator_pubkey().as_ref() == Some(&msg.operator_pubkey)
            && msg.protocol_version == PROTOCOL_VERSION
        {
            self.identity.on_remote_activation(&outpoint, msg.address);
        }

        if msg.count == -1 && !is_local {
            self.peers.broadcast(&GossipMessage::Announce(msg));
        }
    }

    /// In-place update of a known entry. Only organic broadcasts
    /// (`count == -1`) from the same collateral key refresh anything, and
    /// only outside the per-entry announce window; key-to-outpoint binding
    /// was proven at admission.
    fn update_existing(&self, from: PeerId, msg: AnnounceMessage, stored: Entry, now: i64) {
        let outpoint = msg.vin.prevout;

        if msg.count != -1
            || stored.collateral_pubkey != msg.collateral_pubkey
            || stored.updated_within(MIN_ANNOUNCE_INTERVAL, now)
        {
            return;
        }

        if stored.sig_time >= msg.sig_time {
            self.registry.modify(&outpoint, |e| e.update_last_seen(now));
            return;
        }

        let port_reachable = self.peers.probe_port(msg.address);
        if port_reachable {
            self.peers
                .add_address(msg.address, from, ADDRESS_PENALTY_SECONDS);
        }

        let chain = self.chain.as_ref();
        let enabled = self
            .registry
            .modify(&outpoint, |e| {
                e.update_last_seen(now);
                e.port_reachable = port_reachable;
                e.operator_pubkey = msg.operator_pubkey.clone();
                e.sig_time = msg.sig_time;
                e.announcement_sig = msg.signature.clone();
                e.protocol_version = msg.protocol_version;
                e.network_address = msg.address;
                if let Some(reward) = &msg.reward {
                    e.reward_address = reward.address.clone();
                    e.reward_percent = reward.percent;
                }
                e.variant = msg.variant();
                e.check(now, chain);
                e.is_enabled()
            })
            .unwrap_or(false);

        if enabled {
            debug!(address = %msg.address, %outpoint, "updated masternode entry");
            self.peers.broadcast(&GossipMessage::Announce(msg));
        }
    }

    fn handle_ping(&self, from: PeerId, msg: PingMessage, now: i64) {
        let outpoint = msg.vin.prevout;

        let Some(stored) = self.registry.find_by_outpoint(&outpoint) else {
            // Unknown entry: ask the sender for it, at most once per window.
            if self.registry.should_ask_entry(&outpoint, now) {
                debug!(%outpoint, peer = %from, "requesting missing entry from pinging peer");
                self.peers.push(
                    from,
                    &GossipMessage::ListRequest(ListRequestMessage {
                        vin: TxIn::from_outpoint(outpoint),
                    }),
                );
                self.registry.mark_ask_entry_sent(&outpoint, now);
            }
            return;
        };

        if stored.protocol_version < MIN_PEER_PROTOCOL {
            return;
        }

        match validator::validate_ping(&msg, &stored, now, self.signer.as_ref()) {
            Verdict::Accept => {}
            verdict => return self.apply_verdict(from, verdict, "ping"),
        }

        // The asserted ping time always advances; state and relay only
        // move when the entry has been quiet past the ping interval.
        let throttled = stored.updated_within(MIN_PING_INTERVAL, now);
        let chain = self.chain.as_ref();
        let relay = self
            .registry
            .modify(&outpoint, |e| {
                e.last_ping_time = msg.sig_time;
                if throttled {
                    return false;
                }
                if msg.stop {
                    e.disable();
                    info!(%outpoint, "masternode requested removal");
                } else {
                    e.update_last_seen(now);
                    e.check(now, chain);
                    if !e.is_enabled() {
                        return false;
                    }
                }
                true
            })
            .unwrap_or(false);

        if relay {
            self.peers.broadcast(&GossipMessage::Ping(msg));
        }
    }

    fn handle_vote(&self, from: PeerId, msg: VoteMessage, now: i64) {
        let outpoint = msg.vin.prevout;
        let Some(stored) = self.registry.find_by_outpoint(&outpoint) else {
            return;
        };

        match validator::validate_vote(&msg, &stored, now, self.signer.as_ref()) {
            Verdict::Accept => {}
            verdict => return self.apply_verdict(from, verdict, "vote"),
        }

        self.registry.modify(&outpoint, |e| {
            e.vote_value = msg.vote_value;
            e.last_vote_time = now;
        });
        self.peers.broadcast(&GossipMessage::Vote(msg));
    }

    fn handle_list_request(&self, from: PeerId, msg: ListRequestMessage, now: i64) {
        let full_dump = msg.vin.prevout.is_null();

        if full_dump && self.network.is_public() && !is_private_ip(&from.ip()) {
            if !self.registry.list_request_allowed(from, now) {
                warn!(peer = %from, "repeated full list request inside ask window");
                self.peers.misbehaving(from, MISBEHAVIOR_LIST_ABUSE);
                return;
            }
            self.registry.note_list_request_served(from, now);
        }

        let entries = self.registry.snapshot_entries();
        let count = entries.len() as i32;
        let mut sent = 0;

        for (i, entry) in entries.iter().enumerate() {
            if is_private_address(&entry.network_address) || !entry.is_enabled() {
                continue;
            }
            if full_dump || msg.vin.prevout == entry.collateral_outpoint {
                self.peers.push(
                    from,
                    &GossipMessage::Announce(entry.to_announcement(count, i as i32)),
                );
                sent += 1;
                if !full_dump {
                    debug!(peer = %from, outpoint = %entry.collateral_outpoint, "sent single masternode entry");
                    return;
                }
            }
        }
        debug!(peer = %from, sent, "served masternode list");
    }

    fn apply_verdict(&self, from: PeerId, verdict: Verdict, what: &'static str) {
        match verdict {
            Verdict::Accept => {}
            Verdict::Reject(reason) => {
                debug!(peer = %from, %reason, what, "dropped message");
            }
            Verdict::Misbehavior { score, reason } => {
                warn!(peer = %from, %reason, score, what, "penalized peer");
                self.peers.misbehaving(from, score);
            }
        }
    }
}

/// RFC1918 and loopback ranges never gossip outside their own network.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback(),
        IpAddr::V6(v6) => v6.is_loopback(),
    }
}

fn is_private_address(addr: &SocketAddr) -> bool {
    is_private_ip(&addr.ip())
}

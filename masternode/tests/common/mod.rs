//! Shared fixtures for the integration tests: canned chain state, a
//! permissive signer, and a recording peer manager.

#![allow(dead_code)]

use ember_core::hash::sha256d;
use ember_core::{Hash256, OutPoint, PublicKey, Script, Signature, TxIn};
use ember_masternode::chain::{ChainView, CollateralProbe, MempoolVerdict};
use ember_masternode::messages::{AnnounceMessage, GossipMessage, RewardFields};
use ember_masternode::peers::{ActiveIdentity, PeerId, PeerSink};
use ember_masternode::signer::MessageVerifier;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicI64, Ordering};

pub struct TestChain {
    pub best_height: i64,
    pub hashes: HashMap<i64, Hash256>,
    pub times: HashMap<i64, i64>,
    pub tx_age: HashMap<Hash256, u32>,
    pub tx_height: HashMap<Hash256, i64>,
    pub spent: HashSet<OutPoint>,
    now: AtomicI64,
}

impl TestChain {
    pub fn new(now: i64) -> Self {
        let mut hashes = HashMap::new();
        let mut times = HashMap::new();
        for h in 0..=200 {
            hashes.insert(h, sha256d(format!("block-{h}").as_bytes()));
            times.insert(h, 1_600_000_000 + h * 60);
        }
        TestChain {
            best_height: 200,
            hashes,
            times,
            tx_age: HashMap::new(),
            tx_height: HashMap::new(),
            spent: HashSet::new(),
            now: AtomicI64::new(now),
        }
    }

    pub fn set_now(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Record `txid` as mined at `height`, with depth taken from the tip.
    pub fn commit_tx(&mut self, txid: Hash256, height: i64) {
        self.tx_height.insert(txid, height);
        self.tx_age
            .insert(txid, (self.best_height - height + 1) as u32);
    }
}

impl ChainView for TestChain {
    fn best_height(&self) -> i64 {
        self.best_height
    }

    fn block_hash_at_height(&self, height: i64) -> Option<Hash256> {
        self.hashes.get(&height).copied()
    }

    fn block_time_at_height(&self, height: i64) -> Option<i64> {
        self.times.get(&height).copied()
    }

    fn transaction_age_in_blocks(&self, txid: &Hash256) -> Option<u32> {
        self.tx_age.get(txid).copied()
    }

    fn transaction_height(&self, txid: &Hash256) -> Option<i64> {
        self.tx_height.get(txid).copied()
    }

    fn required_collateral(&self, _height: i64) -> u64 {
        10_000
    }

    fn mempool_would_accept(&self, probe: &CollateralProbe) -> MempoolVerdict {
        if self.spent.contains(&probe.outpoint) {
            MempoolVerdict::Rejected { dos_score: 0 }
        } else {
            MempoolVerdict::Acceptable
        }
    }

    fn adjusted_time(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Accepts every signature and every ownership claim.
pub struct PermissiveSigner;

impl MessageVerifier for PermissiveSigner {
    fn verify(&self, _key: &PublicKey, _sig: &Signature, _message: &[u8]) -> bool {
        true
    }

    fn owns_output(&self, _key: &PublicKey, _outpoint: &OutPoint) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    Pushed { peer: PeerId, tag: &'static str },
    Broadcast { tag: &'static str },
    Misbehaving { peer: PeerId, score: u32 },
    AddressAdded { addr: SocketAddr },
}

#[derive(Default)]
pub struct RecordingPeers {
    pub events: Mutex<Vec<PeerEvent>>,
}

impl RecordingPeers {
    pub fn new() -> Self {
        RecordingPeers::default()
    }

    pub fn broadcasts_of(&self, tag: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, PeerEvent::Broadcast { tag: t } if *t == tag))
            .count()
    }

    pub fn pushes_to(&self, peer: PeerId) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, PeerEvent::Pushed { peer: p, .. } if *p == peer))
            .count()
    }

    pub fn misbehavior_of(&self, peer: PeerId) -> u32 {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                PeerEvent::Misbehaving { peer: p, score } if *p == peer => Some(*score),
                _ => None,
            })
            .sum()
    }
}

impl PeerSink for RecordingPeers {
    fn push(&self, peer: PeerId, msg: &GossipMessage) {
        self.events.lock().push(PeerEvent::Pushed {
            peer,
            tag: msg.tag_name(),
        });
    }

    fn broadcast(&self, msg: &GossipMessage) {
        self.events.lock().push(PeerEvent::Broadcast {
            tag: msg.tag_name(),
        });
    }

    fn misbehaving(&self, peer: PeerId, score: u32) {
        self.events.lock().push(PeerEvent::Misbehaving { peer, score });
    }

    fn add_address(&self, addr: SocketAddr, _source: PeerId, _penalty_secs: i64) {
        self.events.lock().push(PeerEvent::AddressAdded { addr });
    }

    fn probe_port(&self, _addr: SocketAddr) -> bool {
        true
    }
}

/// No local masternode configured.
pub struct NoIdentity;

impl ActiveIdentity for NoIdentity {
    fn operator_pubkey(&self) -> Option<PublicKey> {
        None
    }

    fn awaiting_outpoint(&self) -> bool {
        false
    }

    fn on_remote_activation(&self, _outpoint: &OutPoint, _addr: SocketAddr) {}
}

pub fn pubkey(prefix: u8, fill: u8) -> PublicKey {
    let mut bytes = vec![prefix];
    bytes.extend_from_slice(&[fill; 32]);
    PublicKey::new(bytes)
}

/// Organic extended announcement (`count == -1`) from a public address.
pub fn make_announce(txid: Hash256, sig_time: i64, reward_percent: i32) -> AnnounceMessage {
    AnnounceMessage {
        vin: TxIn::from_outpoint(OutPoint::new(txid, 0)),
        address: "51.15.30.7:24000".parse().unwrap(),
        signature: Signature::new(vec![0x30; 8]),
        sig_time,
        collateral_pubkey: pubkey(0x02, 0xaa),
        operator_pubkey: pubkey(0x03, 0xbb),
        count: -1,
        current: 0,
        last_updated: sig_time,
        protocol_version: 70047,
        reward: Some(RewardFields {
            address: Script::pay_to_key_digest(&[0x11; 20]),
            percent: reward_percent,
        }),
    }
}

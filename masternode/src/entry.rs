//! A single masternode's state and its small state machine.

use crate::chain::{ChainView, CollateralProbe, MempoolVerdict};
use crate::messages::{AnnounceMessage, RewardFields};
use crate::peers::PaymentLedger;
use ember_core::constants::EXPIRY_SECONDS;
use ember_core::hash::sha256d;
use ember_core::{Hash256, OutPoint, PublicKey, Script, Signature};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::net::SocketAddr;

/// Where an entry is in its lifecycle. `Remove` and `CollateralSpent` are
/// terminal until the next sweep erases the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActiveState {
    PreEnabled,
    Enabled,
    Expired,
    Remove,
    CollateralSpent,
}

impl fmt::Display for ActiveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreEnabled => write!(f, "pre-enabled"),
            Self::Enabled => write!(f, "enabled"),
            Self::Expired => write!(f, "expired"),
            Self::Remove => write!(f, "remove"),
            Self::CollateralSpent => write!(f, "collateral-spent"),
        }
    }
}

/// Legacy entries carry no reward routing; extended entries do. The tag
/// also decides which canonical preimage an announcement signs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryVariant {
    Legacy,
    Extended,
}

/// One masternode, keyed by the outpoint of its locked collateral.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub collateral_outpoint: OutPoint,
    pub network_address: SocketAddr,
    pub collateral_pubkey: PublicKey,
    pub operator_pubkey: PublicKey,
    pub announcement_sig: Signature,
    /// Operator-asserted announcement time; never decreases.
    pub sig_time: i64,
    /// Local clock time of the last valid liveness signal.
    pub last_seen: i64,
    /// Operator-asserted ping time; strictly increasing.
    pub last_ping_time: i64,
    pub last_vote_time: i64,
    pub vote_value: i32,
    pub protocol_version: i32,
    pub port_reachable: bool,
    pub reward_address: Script,
    pub reward_percent: i32,
    pub variant: EntryVariant,
    pub active_state: ActiveState,
}

impl Entry {
    /// Build a fresh entry from an admitted announcement. Starts
    /// pre-enabled; the first `check` promotes it.
    pub fn from_announcement(msg: &AnnounceMessage) -> Self {
        let (reward_address, reward_percent) = match &msg.reward {
            Some(r) => (r.address.clone(), r.percent),
            None => (Script::empty(), 0),
        };
        Entry {
            collateral_outpoint: msg.vin.prevout,
            network_address: msg.address,
            collateral_pubkey: msg.collateral_pubkey.clone(),
            operator_pubkey: msg.operator_pubkey.clone(),
            announcement_sig: msg.signature.clone(),
            sig_time: msg.sig_time,
            last_seen: msg.last_updated,
            last_ping_time: 0,
            last_vote_time: 0,
            vote_value: 0,
            protocol_version: msg.protocol_version,
            port_reachable: true,
            reward_address,
            reward_percent,
            variant: msg.variant(),
            active_state: ActiveState::PreEnabled,
        }
    }

    /// Rebuild the announcement this entry would gossip, for list replies.
    pub fn to_announcement(&self, count: i32, current: i32) -> AnnounceMessage {
        AnnounceMessage {
            vin: ember_core::TxIn::from_outpoint(self.collateral_outpoint),
            address: self.network_address,
            signature: self.announcement_sig.clone(),
            sig_time: self.sig_time,
            collateral_pubkey: self.collateral_pubkey.clone(),
            operator_pubkey: self.operator_pubkey.clone(),
            count,
            current,
            last_updated: self.last_seen,
            protocol_version: self.protocol_version,
            reward: match self.variant {
                EntryVariant::Extended => Some(RewardFields {
                    address: self.reward_address.clone(),
                    percent: self.reward_percent,
                }),
                EntryVariant::Legacy => None,
            },
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.active_state == ActiveState::Enabled
    }

    /// Whether the entry produced a liveness signal within `window` seconds.
    pub fn updated_within(&self, window: i64, now: i64) -> bool {
        now - self.last_seen <= window
    }

    pub fn update_last_seen(&mut self, now: i64) {
        self.last_seen = now;
    }

    /// Operator-requested removal; the next sweep erases the entry.
    pub fn disable(&mut self) {
        self.active_state = ActiveState::Remove;
    }

    /// Recompute `active_state` from liveness and collateral status.
    pub fn check(&mut self, now: i64, chain: &dyn ChainView) {
        if matches!(
            self.active_state,
            ActiveState::CollateralSpent | ActiveState::Remove
        ) {
            return;
        }
        if !self.updated_within(EXPIRY_SECONDS, now) {
            self.active_state = ActiveState::Expired;
            return;
        }
        let probe = CollateralProbe::for_collateral(chain, self.collateral_outpoint);
        self.active_state = match chain.mempool_would_accept(&probe) {
            MempoolVerdict::Acceptable => ActiveState::Enabled,
            MempoolVerdict::Rejected { .. } => ActiveState::CollateralSpent,
        };
    }

    /// Deterministic per-block score, derived from the hash of the block
    /// `modulus` back from `block_height`. `None` when that block is unknown.
    pub fn score_for(&self, block_height: i64, modulus: i64, chain: &dyn ChainView) -> Option<Score> {
        let hash = chain.block_hash_at_height(block_height - modulus)?;
        Some(self.score_at(&hash))
    }

    /// Score against a known block hash: sha256d(block hash, outpoint).
    pub fn score_at(&self, block_hash: &Hash256) -> Score {
        let mut buf = Vec::with_capacity(68);
        buf.extend_from_slice(block_hash.as_bytes());
        buf.extend_from_slice(&self.collateral_outpoint.to_bytes());
        let digest = sha256d(&buf);
        let top: [u8; 4] = digest.as_bytes()[..4].try_into().unwrap_or([0u8; 4]);
        Score {
            value: u32::from_be_bytes(top),
            tiebreak: self.collateral_outpoint,
        }
    }

    /// Blocks since the collateral transaction confirmed; 0 while uncommitted.
    pub fn collateral_age(&self, chain: &dyn ChainView) -> u32 {
        chain
            .transaction_age_in_blocks(&self.collateral_outpoint.txid)
            .unwrap_or(0)
    }

    pub fn seconds_since_payment(&self, payments: &dyn PaymentLedger) -> i64 {
        payments.seconds_since_payment(&self.collateral_outpoint)
    }
}

/// Winner comparator: top 32 bits of the score digest, ties broken by
/// outpoint byte order (the lower outpoint ranks higher).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub value: u32,
    pub tiebreak: OutPoint,
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value
            .cmp(&other.value)
            .then_with(|| other.tiebreak.cmp(&self.tiebreak))
    }
}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

//! Stateless admission checks for inbound gossip.
//!
//! The validator consults the chain and signer collaborators and returns a
//! verdict; misbehavior scoring and relay decisions belong to the gossip
//! layer. Announcement checks run in two stages: a cheap screen (time
//! bounds, shapes, signature) that also guards in-place updates, and the
//! expensive collateral proof run once per new entry.

use crate::chain::{ChainView, CollateralProbe, MempoolVerdict};
use crate::entry::Entry;
use crate::messages::{ping_preimage, vote_preimage, AnnounceMessage, PingMessage, VoteMessage};
use crate::signer::MessageVerifier;
use ember_core::constants::{
    FUTURE_DRIFT_SECONDS, MIN_CONFIRMATIONS, MIN_PEER_PROTOCOL, MIN_VALID_SIG_TIME,
    MIN_VOTE_INTERVAL,
};
use thiserror::Error;

/// Score for malformed or forged message material.
pub const MISBEHAVIOR_MALFORMED: u32 = 100;
/// Score for announcing collateral without enough confirmations.
pub const MISBEHAVIOR_SHALLOW_COLLATERAL: u32 = 20;
/// Score for hammering the full-list endpoint.
pub const MISBEHAVIOR_LIST_ABUSE: u32 = 34;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("operator timestamp predates the epoch floor")]
    StaleSigTime,

    #[error("sig_time is later than last_updated")]
    InconsistentTimes,

    #[error("advertised address has port zero")]
    BadPort,

    #[error("operator timestamp too far in the future")]
    FutureSigTime,

    #[error("protocol version below the network minimum")]
    ObsoleteProtocol,

    #[error("reward percentage outside 0..=100")]
    RewardPercentOutOfRange,

    #[error("public key does not encode to a canonical script")]
    MalformedPubkey,

    #[error("announcement input carries a script-sig")]
    NonEmptyScriptSig,

    #[error("signature does not verify")]
    BadSignature,

    #[error("public key does not own the collateral outpoint")]
    PubkeyOutpointMismatch,

    #[error("collateral outpoint not acceptable to the mempool")]
    CollateralUnacceptable,

    #[error("collateral transaction not yet committed")]
    CollateralUncommitted,

    #[error("collateral lacks the required confirmations")]
    InsufficientConfirmations,

    #[error("sig_time predates the collateral's confirmation")]
    PrematureSigTime,

    #[error("ping does not supersede the stored one")]
    SupersededPing,

    #[error("vote arrived inside the per-entry throttle window")]
    VoteThrottled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    /// Drop without penalizing the sender.
    Reject(RejectReason),
    /// Drop and raise the sender's misbehavior score.
    Misbehavior { score: u32, reason: RejectReason },
}

impl Verdict {
    pub fn is_accept(&self) -> bool {
        matches!(self, Verdict::Accept)
    }
}

/// Cheap announcement checks: freshness bounds, field shapes, and the
/// announcement signature. Sufficient to gate an in-place update.
pub fn screen_announcement(
    msg: &AnnounceMessage,
    chain: &dyn ChainView,
    signer: &dyn MessageVerifier,
) -> Verdict {
    if msg.sig_time < MIN_VALID_SIG_TIME {
        return Verdict::Reject(RejectReason::StaleSigTime);
    }
    if msg.sig_time > msg.last_updated {
        return Verdict::Reject(RejectReason::InconsistentTimes);
    }
    if msg.address.port() == 0 {
        return Verdict::Reject(RejectReason::BadPort);
    }
    if msg.sig_time > chain.adjusted_time() + FUTURE_DRIFT_SECONDS {
        return Verdict::Reject(RejectReason::FutureSigTime);
    }
    if msg.protocol_version < MIN_PEER_PROTOCOL {
        return Verdict::Reject(RejectReason::ObsoleteProtocol);
    }
    if let Some(reward) = &msg.reward {
        if !(0..=100).contains(&reward.percent) {
            return Verdict::Reject(RejectReason::RewardPercentOutOfRange);
        }
    }
    if !has_canonical_script(&msg.collateral_pubkey) || !has_canonical_script(&msg.operator_pubkey)
    {
        return Verdict::Misbehavior {
            score: MISBEHAVIOR_MALFORMED,
            reason: RejectReason::MalformedPubkey,
        };
    }
    if !msg.vin.script_sig.is_empty() {
        return Verdict::Reject(RejectReason::NonEmptyScriptSig);
    }
    if !signer.verify(&msg.collateral_pubkey, &msg.signature, &msg.preimage()) {
        return Verdict::Misbehavior {
            score: MISBEHAVIOR_MALFORMED,
            reason: RejectReason::BadSignature,
        };
    }
    Verdict::Accept
}

/// The expensive half of announcement admission: key-to-outpoint binding,
/// the mempool dry run, confirmation depth, and temporal sanity. Run once
/// per new entry.
pub fn verify_collateral(
    msg: &AnnounceMessage,
    chain: &dyn ChainView,
    signer: &dyn MessageVerifier,
) -> Verdict {
    if !signer.owns_output(&msg.collateral_pubkey, &msg.vin.prevout) {
        return Verdict::Misbehavior {
            score: MISBEHAVIOR_MALFORMED,
            reason: RejectReason::PubkeyOutpointMismatch,
        };
    }

    let probe = CollateralProbe::for_collateral(chain, msg.vin.prevout);
    if let MempoolVerdict::Rejected { dos_score } = chain.mempool_would_accept(&probe) {
        if dos_score > 0 {
            return Verdict::Misbehavior {
                score: dos_score,
                reason: RejectReason::CollateralUnacceptable,
            };
        }
        return Verdict::Reject(RejectReason::CollateralUnacceptable);
    }

    match chain.transaction_age_in_blocks(&msg.vin.prevout.txid) {
        None => return Verdict::Reject(RejectReason::CollateralUncommitted),
        Some(age) if age < MIN_CONFIRMATIONS => {
            return Verdict::Misbehavior {
                score: MISBEHAVIOR_SHALLOW_COLLATERAL,
                reason: RejectReason::InsufficientConfirmations,
            };
        }
        Some(_) => {}
    }

    // sig_time must postdate the block where the collateral reached its
    // required confirmation depth
    if let Some(tx_height) = chain.transaction_height(&msg.vin.prevout.txid) {
        let conf_height = tx_height + i64::from(MIN_CONFIRMATIONS) - 1;
        if let Some(conf_time) = chain.block_time_at_height(conf_height) {
            if conf_time > msg.sig_time {
                return Verdict::Reject(RejectReason::PrematureSigTime);
            }
        }
    }

    Verdict::Accept
}

/// Full announcement validation: screen plus collateral proof.
pub fn validate_announcement(
    msg: &AnnounceMessage,
    chain: &dyn ChainView,
    signer: &dyn MessageVerifier,
) -> Verdict {
    match screen_announcement(msg, chain, signer) {
        Verdict::Accept => verify_collateral(msg, chain, signer),
        other => other,
    }
}

/// Ping admission against the stored entry: a one-hour freshness window
/// around now, strict supersession of the stored ping time, and a
/// signature under the operator key over the stored address.
pub fn validate_ping(
    msg: &PingMessage,
    entry: &Entry,
    now: i64,
    signer: &dyn MessageVerifier,
) -> Verdict {
    if msg.sig_time > now + FUTURE_DRIFT_SECONDS {
        return Verdict::Reject(RejectReason::FutureSigTime);
    }
    if msg.sig_time <= now - FUTURE_DRIFT_SECONDS {
        return Verdict::Reject(RejectReason::StaleSigTime);
    }
    if msg.sig_time <= entry.last_ping_time {
        return Verdict::Reject(RejectReason::SupersededPing);
    }
    let preimage = ping_preimage(&entry.network_address, msg.sig_time, msg.stop);
    if !signer.verify(&entry.operator_pubkey, &msg.signature, &preimage) {
        return Verdict::Reject(RejectReason::BadSignature);
    }
    Verdict::Accept
}

/// Vote admission: one vote per entry per hour, signed by the operator key.
pub fn validate_vote(
    msg: &VoteMessage,
    entry: &Entry,
    now: i64,
    signer: &dyn MessageVerifier,
) -> Verdict {
    if now - entry.last_vote_time < MIN_VOTE_INTERVAL {
        return Verdict::Reject(RejectReason::VoteThrottled);
    }
    let preimage = vote_preimage(&msg.vin.prevout, msg.vote_value);
    if !signer.verify(&entry.operator_pubkey, &msg.signature, &preimage) {
        return Verdict::Reject(RejectReason::BadSignature);
    }
    Verdict::Accept
}

fn has_canonical_script(key: &ember_core::PublicKey) -> bool {
    key.address_script().map(|s| s.len() == 25).unwrap_or(false)
}

//! What the registry core consumes from the blockchain.

use ember_core::constants::COIN;
use ember_core::{Hash256, OutPoint, Script};

/// Synthetic one-input, one-output spend used to dry-run a collateral
/// outpoint through mempool acceptance. The output pays a fixed throwaway
/// script; only the input side matters for acceptance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollateralProbe {
    pub outpoint: OutPoint,
    pub value: u64,
    pub script_pubkey: Script,
}

impl CollateralProbe {
    /// Probe spending `outpoint` for one unit less than the collateral
    /// required at the current tip. Accepted only while the UTXO is
    /// unspent and holds the full collateral amount.
    pub fn for_collateral(chain: &dyn ChainView, outpoint: OutPoint) -> Self {
        let required = chain.required_collateral(chain.best_height());
        CollateralProbe {
            outpoint,
            value: required.saturating_sub(1) * COIN,
            script_pubkey: Script::pay_to_key_digest(&[0u8; 20]),
        }
    }
}

/// Outcome of the mempool dry run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MempoolVerdict {
    Acceptable,
    /// Spent, missing, or otherwise invalid. A positive score is the DoS
    /// penalty the mempool assigned to the submitter.
    Rejected { dos_score: u32 },
}

/// Chain state consumed by validation and ranking.
pub trait ChainView: Send + Sync {
    /// Height of the best block.
    fn best_height(&self) -> i64;

    /// Hash of the block at `height`, if known.
    fn block_hash_at_height(&self, height: i64) -> Option<Hash256>;

    /// Timestamp of the block at `height`, if known.
    fn block_time_at_height(&self, height: i64) -> Option<i64>;

    /// Confirmations of `txid`, or `None` while uncommitted.
    fn transaction_age_in_blocks(&self, txid: &Hash256) -> Option<u32>;

    /// Height of the block containing `txid`, if committed.
    fn transaction_height(&self, txid: &Hash256) -> Option<i64>;

    /// Collateral (whole coins) required for a masternode at `height`.
    fn required_collateral(&self, height: i64) -> u64;

    /// Would the mempool accept this spend right now?
    fn mempool_would_accept(&self, probe: &CollateralProbe) -> MempoolVerdict;

    /// Network-adjusted wall clock.
    fn adjusted_time(&self) -> i64;
}

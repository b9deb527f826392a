//! Deterministic winner selection and ranking.
//!
//! Every function here is a pure function of the registry snapshot and
//! block hashes. No clock is consulted, so nodes that have synchronized
//! the chain agree on the winner at any height even if their registries
//! were populated at different wall-clock times.

use crate::chain::ChainView;
use crate::entry::{Entry, Score};
use crate::registry::Registry;
use ember_core::OutPoint;

/// Rank computations fix the score block one behind the target height.
const RANK_MODULUS: i64 = 1;

/// Enabled entry with the highest score at `block_height`, scored against
/// the block `modulus` back. `None` when that block is unknown or no entry
/// qualifies.
pub fn current_winner(
    registry: &Registry,
    chain: &dyn ChainView,
    modulus: i64,
    block_height: i64,
    min_protocol: i32,
) -> Option<Entry> {
    let hash = chain.block_hash_at_height(block_height - modulus)?;
    registry
        .snapshot_entries()
        .into_iter()
        .filter(|e| e.protocol_version >= min_protocol && e.is_enabled())
        .max_by_key(|e| e.score_at(&hash))
}

/// 1-based rank of `outpoint` at `block_height`, or `None` when the block
/// is unknown or the outpoint is absent from the eligible set.
pub fn rank_of(
    registry: &Registry,
    chain: &dyn ChainView,
    outpoint: &OutPoint,
    block_height: i64,
    min_protocol: i32,
    only_active: bool,
) -> Option<usize> {
    let ranked = scored_entries(registry, chain, block_height, min_protocol, only_active)?;
    ranked
        .iter()
        .position(|(_, e)| e.collateral_outpoint == *outpoint)
        .map(|i| i + 1)
}

/// Entry holding 1-based `rank` at `block_height`.
pub fn entry_at_rank(
    registry: &Registry,
    chain: &dyn ChainView,
    rank: usize,
    block_height: i64,
    min_protocol: i32,
    only_active: bool,
) -> Option<Entry> {
    let ranked = scored_entries(registry, chain, block_height, min_protocol, only_active)?;
    ranked.into_iter().nth(rank.checked_sub(1)?).map(|(_, e)| e)
}

/// All enabled entries ranked best-first. Empty when the block is unknown.
pub fn all_ranks(
    registry: &Registry,
    chain: &dyn ChainView,
    block_height: i64,
    min_protocol: i32,
) -> Vec<(usize, Entry)> {
    scored_entries(registry, chain, block_height, min_protocol, true)
        .map(|ranked| {
            ranked
                .into_iter()
                .enumerate()
                .map(|(i, (_, e))| (i + 1, e))
                .collect()
        })
        .unwrap_or_default()
}

fn scored_entries(
    registry: &Registry,
    chain: &dyn ChainView,
    block_height: i64,
    min_protocol: i32,
    only_active: bool,
) -> Option<Vec<(Score, Entry)>> {
    let hash = chain.block_hash_at_height(block_height - RANK_MODULUS)?;
    let mut scored: Vec<(Score, Entry)> = registry
        .snapshot_entries()
        .into_iter()
        .filter(|e| e.protocol_version >= min_protocol)
        .filter(|e| !only_active || e.is_enabled())
        .map(|e| (e.score_at(&hash), e))
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    Some(scored)
}

//! In-memory masternode directory.
//!
//! One mutex covers the entry set and the three gossip rate-limit maps.
//! Every public operation acquires it exactly once; reads copy out, so no
//! caller holds a reference across the lock. Mutations go through
//! [`Registry::modify`], which re-resolves the entry under the lock.

use crate::chain::ChainView;
use crate::entry::{ActiveState, Entry};
use crate::peers::PaymentLedger;
use ember_core::constants::{ENTRY_ASK_INTERVAL, LIST_ASK_INTERVAL, MIN_PEER_PROTOCOL};
use ember_core::{OutPoint, PublicKey};
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use tracing::debug;

/// Everything the registry lock protects. Serialized wholesale into the
/// snapshot file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct RegistryState {
    pub entries: HashMap<OutPoint, Entry>,
    /// Peer -> earliest time we will honor another full dump.
    pub inbound_list_requests: HashMap<SocketAddr, i64>,
    /// Peer -> earliest time we will re-ask for the full list.
    pub outbound_list_requests: HashMap<SocketAddr, i64>,
    /// Outpoint -> earliest time we will re-ask for that entry.
    pub outbound_entry_requests: HashMap<OutPoint, i64>,
    /// Monotonic counter consumed by the anon-mixing scheduler.
    pub dsq_counter: u64,
}

pub struct Registry {
    state: Mutex<RegistryState>,
    min_protocol: i32,
}

impl Registry {
    pub fn new() -> Self {
        Self::with_min_protocol(MIN_PEER_PROTOCOL)
    }

    /// Registry that prunes entries below `min_protocol` on sweep.
    pub fn with_min_protocol(min_protocol: i32) -> Self {
        Registry {
            state: Mutex::new(RegistryState::default()),
            min_protocol,
        }
    }

    /// Insert a new entry. Fails when the collateral outpoint is already
    /// registered.
    pub fn add(&self, entry: Entry) -> bool {
        let mut state = self.state.lock();
        if state.entries.contains_key(&entry.collateral_outpoint) {
            return false;
        }
        debug!(
            address = %entry.network_address,
            total = state.entries.len() + 1,
            "adding new masternode entry"
        );
        state.entries.insert(entry.collateral_outpoint, entry);
        true
    }

    pub fn remove(&self, outpoint: &OutPoint) -> bool {
        let mut state = self.state.lock();
        let removed = state.entries.remove(outpoint).is_some();
        if removed {
            debug!(%outpoint, total = state.entries.len(), "removed masternode entry");
        }
        removed
    }

    /// Drop every entry, rate-limit record, and the dsq counter.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        *state = RegistryState::default();
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    pub fn find_by_outpoint(&self, outpoint: &OutPoint) -> Option<Entry> {
        self.state.lock().entries.get(outpoint).cloned()
    }

    pub fn find_by_operator_pubkey(&self, key: &PublicKey) -> Option<Entry> {
        self.state
            .lock()
            .entries
            .values()
            .find(|e| &e.operator_pubkey == key)
            .cloned()
    }

    /// Run `f` against the stored entry, re-resolving it under the lock.
    pub fn modify<R>(&self, outpoint: &OutPoint, f: impl FnOnce(&mut Entry) -> R) -> Option<R> {
        let mut state = self.state.lock();
        state.entries.get_mut(outpoint).map(f)
    }

    /// Uniform pick over enabled entries.
    pub fn pick_random(&self) -> Option<Entry> {
        let state = self.state.lock();
        let enabled: Vec<&Entry> = state.entries.values().filter(|e| e.is_enabled()).collect();
        enabled.choose(&mut rand::thread_rng()).map(|e| (*e).clone())
    }

    /// Uniform pick over enabled entries at or above `min_protocol`,
    /// skipping `excluded` outpoints.
    pub fn pick_random_excluding(&self, excluded: &[OutPoint], min_protocol: i32) -> Option<Entry> {
        let state = self.state.lock();
        let eligible: Vec<&Entry> = state
            .entries
            .values()
            .filter(|e| e.is_enabled() && e.protocol_version >= min_protocol)
            .filter(|e| !excluded.contains(&e.collateral_outpoint))
            .collect();
        eligible.choose(&mut rand::thread_rng()).map(|e| (*e).clone())
    }

    /// Enabled entry longest without payment, among those whose collateral
    /// is at least `min_age` blocks deep and not in `excluded`.
    pub fn pick_oldest_not_in(
        &self,
        excluded: &[OutPoint],
        min_age: u32,
        chain: &dyn ChainView,
        payments: &dyn PaymentLedger,
    ) -> Option<Entry> {
        let state = self.state.lock();
        state
            .entries
            .values()
            .filter(|e| e.is_enabled())
            .filter(|e| e.collateral_age(chain) >= min_age)
            .filter(|e| !excluded.contains(&e.collateral_outpoint))
            .max_by_key(|e| e.seconds_since_payment(payments))
            .cloned()
    }

    pub fn count_enabled(&self, min_protocol: i32) -> usize {
        self.state
            .lock()
            .entries
            .values()
            .filter(|e| e.is_enabled() && e.protocol_version >= min_protocol)
            .count()
    }

    /// Re-check every entry, erase the dead ones, and drop rate-limit
    /// records whose deadlines have passed.
    pub fn sweep(&self, now: i64, chain: &dyn ChainView) {
        let mut state = self.state.lock();
        for entry in state.entries.values_mut() {
            entry.check(now, chain);
        }
        let min_protocol = self.min_protocol;
        let before = state.entries.len();
        state.entries.retain(|_, e| {
            !matches!(
                e.active_state,
                ActiveState::Remove | ActiveState::CollateralSpent
            ) && e.protocol_version >= min_protocol
        });
        if state.entries.len() != before {
            debug!(
                removed = before - state.entries.len(),
                total = state.entries.len(),
                "swept inactive masternode entries"
            );
        }
        state.inbound_list_requests.retain(|_, deadline| *deadline >= now);
        state.outbound_list_requests.retain(|_, deadline| *deadline >= now);
        state.outbound_entry_requests.retain(|_, deadline| *deadline >= now);
    }

    /// True while `peer` is outside its full-dump window.
    pub fn list_request_allowed(&self, peer: SocketAddr, now: i64) -> bool {
        match self.state.lock().inbound_list_requests.get(&peer) {
            Some(deadline) => now >= *deadline,
            None => true,
        }
    }

    pub fn note_list_request_served(&self, peer: SocketAddr, now: i64) {
        self.state
            .lock()
            .inbound_list_requests
            .insert(peer, now + LIST_ASK_INTERVAL);
    }

    /// True when we may ask `peer` for the full list again.
    pub fn should_ask_list(&self, peer: SocketAddr, now: i64) -> bool {
        match self.state.lock().outbound_list_requests.get(&peer) {
            Some(deadline) => now >= *deadline,
            None => true,
        }
    }

    pub fn mark_ask_list_sent(&self, peer: SocketAddr, now: i64) {
        self.state
            .lock()
            .outbound_list_requests
            .insert(peer, now + LIST_ASK_INTERVAL);
    }

    /// True when we may re-request `outpoint` from whoever mentions it.
    pub fn should_ask_entry(&self, outpoint: &OutPoint, now: i64) -> bool {
        match self.state.lock().outbound_entry_requests.get(outpoint) {
            Some(deadline) => now >= *deadline,
            None => true,
        }
    }

    pub fn mark_ask_entry_sent(&self, outpoint: &OutPoint, now: i64) {
        self.state
            .lock()
            .outbound_entry_requests
            .insert(*outpoint, now + ENTRY_ASK_INTERVAL);
    }

    /// Return the current dsq counter and advance it.
    pub fn rotate_dsq_counter(&self) -> u64 {
        let mut state = self.state.lock();
        let value = state.dsq_counter;
        state.dsq_counter += 1;
        value
    }

    /// Point-in-time clone of every entry.
    pub fn snapshot_entries(&self) -> Vec<Entry> {
        self.state.lock().entries.values().cloned().collect()
    }

    /// Clone of the full lock-protected state, for snapshot serialization
    /// outside the lock.
    pub(crate) fn export_state(&self) -> RegistryState {
        self.state.lock().clone()
    }

    pub(crate) fn replace_state(&self, state: RegistryState) {
        *self.state.lock() = state;
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        write!(
            f,
            "masternodes: {}, peers who asked us for the list: {}, peers we asked for the list: {}, entries we asked for: {}, dsq counter: {}",
            state.entries.len(),
            state.inbound_list_requests.len(),
            state.outbound_list_requests.len(),
            state.outbound_entry_requests.len(),
            state.dsq_counter
        )
    }
}

//! Protocol constants shared across the node.

/// Smallest indivisible unit of the currency.
pub const COIN: u64 = 100_000_000;

/// Confirmations a collateral transaction needs before its masternode counts.
pub const MIN_CONFIRMATIONS: u32 = 15;

/// Seconds without a liveness signal before an entry expires.
pub const EXPIRY_SECONDS: i64 = 65 * 60;

/// Minimum seconds between accepted announcement updates for one entry.
pub const MIN_ANNOUNCE_INTERVAL: i64 = 60 * 60;

/// Minimum seconds between accepted pings for one entry.
pub const MIN_PING_INTERVAL: i64 = 5 * 60;

/// Seconds before we honor (or repeat) a full list request.
pub const LIST_ASK_INTERVAL: i64 = 3 * 60 * 60;

/// Seconds before we re-request a single missing entry.
pub const ENTRY_ASK_INTERVAL: i64 = 15 * 60;

/// Announcements stamped before this are historical replays and dropped.
pub const MIN_VALID_SIG_TIME: i64 = 1_511_159_400;

/// Upper bound on operator-asserted timestamps relative to adjusted time.
pub const FUTURE_DRIFT_SECONDS: i64 = 60 * 60;

/// Minimum seconds between accepted governance votes for one entry.
pub const MIN_VOTE_INTERVAL: i64 = 60 * 60;

/// Oldest protocol version still admitted to the registry.
pub const MIN_PEER_PROTOCOL: i32 = 70047;

/// Protocol version this node speaks.
pub const PROTOCOL_VERSION: i32 = 70047;

/// Penalty window applied when feeding a relayed address to the address book.
pub const ADDRESS_PENALTY_SECONDS: i64 = 2 * 60 * 60;

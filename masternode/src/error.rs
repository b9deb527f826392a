//! Masternode error types.

use thiserror::Error;

/// Failure kinds for the on-disk registry cache.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot file does not exist")]
    FileMissing,

    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot checksum mismatch, data corrupted")]
    HashMismatch,

    #[error("invalid snapshot magic string")]
    BadMagic,

    #[error("snapshot written for a different network")]
    BadNetwork,

    #[error("snapshot payload has an invalid format")]
    BadFormat,
}

/// Errors from masternode.conf parsing.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("duplicate alias: {0}")]
    DuplicateAlias(String),
}

//! Error types for the relay

use thiserror::Error;

/// Result type for relay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Relay errors
#[derive(Error, Debug)]
pub enum Error {
    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Actor state not yet loaded or load failed
    #[error("Actor not ready: {0}")]
    NotReady(String),

    /// Expected on-chain record absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Ledger query failed
    #[error("Ledger query failed: {0}")]
    LedgerQuery(String),

    /// Settlement transaction could not be broadcast
    #[error("Broadcast failed: {0}")]
    Broadcast(String),

    /// Actor mailbox closed or response channel dropped
    #[error("Mailbox error: {0}")]
    Mailbox(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::LedgerQuery(err.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

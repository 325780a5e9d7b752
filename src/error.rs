//! Error types for connecting, writing and reading user records.

use thiserror::Error;

use crate::config::ConfigError;
use crate::session::DriverError;

/// The error returned by every public operation of the crate.
///
/// Nothing is recovered locally: each variant aborts the operation that
/// produced it and is handed to the caller unchanged.
#[derive(Debug, Error)]
pub enum Error {
    /// The session could not be established or verified.
    #[error("connection error: {0}")]
    Connection(#[from] ConnectError),

    /// The session refused to open a transaction.
    #[error("could not start transaction: {0}")]
    TransactionStart(#[source] DriverError),

    /// The insert failed and the transaction was rolled back.
    ///
    /// `rollback` carries the rollback failure, if the rollback itself
    /// failed. It is secondary: `source` is always the write failure.
    #[error("insert failed, transaction rolled back: {source}")]
    Write {
        #[source]
        source: DriverError,
        rollback: Option<DriverError>,
    },

    /// The insert succeeded but the commit did not; the row may or may not
    /// be durable.
    #[error("commit failed, write durability unknown: {0}")]
    Commit(#[source] DriverError),

    /// The select could not be executed or its cursor could not advance.
    #[error("query failed: {0}")]
    Query(#[source] DriverError),

    /// A row's value could not be read as the expected type.
    #[error("could not read row {row}: {reason}")]
    RowScan {
        row: usize,
        #[source]
        reason: ScanError,
    },

    /// The record is unusable before it reaches the store.
    #[error("invalid user record: {0}")]
    InvalidRecord(&'static str),

    /// Closing the session failed.
    #[error("could not close connection: {0}")]
    Close(#[source] DriverError),
}

impl Error {
    /// The rollback failure attached to a [`Error::Write`], if any.
    pub fn rollback_error(&self) -> Option<&DriverError> {
        match self {
            Error::Write { rollback, .. } => rollback.as_ref(),
            _ => None,
        }
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Connection(ConnectError::Config(err))
    }
}

/// Why a connection attempt failed.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("invalid connection parameters: {0}")]
    Config(#[from] ConfigError),

    #[error("could not open session: {0}")]
    Open(#[source] DriverError),

    #[error("health check failed: {0}")]
    Ping(#[source] DriverError),
}

/// Why a single column could not be decoded.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("expected {expected}, found {found}")]
    UnexpectedType {
        expected: &'static str,
        found: &'static str,
    },
}

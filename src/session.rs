//! The seam between the transactional core and a concrete database client.
//!
//! A driver implements [`Session`] (one live session), [`Transaction`]
//! (an open unit of work on that session) and [`Row`] (one row under a
//! cursor). The core only ever issues begin, execute, commit, rollback,
//! query and ping through these traits.

use std::ops::ControlFlow;

use thiserror::Error;
use tracing::{debug, info};

use crate::config::DbConfig;
use crate::error::{ConnectError, Error};
use crate::query::{SqlQuery, Value};

/// Failure reported by the underlying database client.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[cfg(feature = "mysql")]
    #[error(transparent)]
    MySql(#[from] mysql::Error),

    #[error("column {0} is not present in the result row")]
    MissingColumn(usize),
}

/// One row under an open cursor.
pub trait Row {
    fn column(&self, idx: usize) -> Result<Value, DriverError>;
}

/// An open transaction. Consumed by exactly one of `commit` or `rollback`.
pub trait Transaction {
    /// Execute a parameterized statement, returning the affected row count.
    fn execute(&mut self, query: &SqlQuery) -> Result<u64, DriverError>;

    fn commit(self) -> Result<(), DriverError>;

    fn rollback(self) -> Result<(), DriverError>;
}

/// One live database session.
pub trait Session {
    type Tx<'a>: Transaction
    where
        Self: 'a;

    /// Round-trip health check.
    fn ping(&mut self) -> Result<(), DriverError>;

    /// Open a transaction. The session is borrowed until it is resolved,
    /// so nothing else can run on it meanwhile.
    fn begin(&mut self) -> Result<Self::Tx<'_>, DriverError>;

    /// Run a parameterless query and hand every row to `visit` in cursor
    /// order until the cursor is exhausted or `visit` breaks.
    ///
    /// The cursor is released before this returns, on every path.
    fn scan(
        &mut self,
        sql: &str,
        visit: &mut dyn FnMut(&dyn Row) -> ControlFlow<()>,
    ) -> Result<(), DriverError>;

    fn close(self) -> Result<(), DriverError>
    where
        Self: Sized;
}

/// A driver that can open a session from connection parameters.
pub trait Connect: Session + Sized {
    fn open(config: &DbConfig) -> Result<Self, DriverError>;
}

/// A live, verified session exclusively owned by the caller.
///
/// Closed exactly once: either explicitly through [`ConnectionHandle::close`],
/// which consumes the handle, or implicitly when it is dropped.
#[derive(Debug)]
pub struct ConnectionHandle<S: Session> {
    session: S,
}

impl<S: Session> ConnectionHandle<S> {
    /// Wrap an already-open session after verifying it answers a ping.
    pub fn establish(mut session: S) -> Result<Self, Error> {
        session.ping().map_err(ConnectError::Ping)?;
        Ok(Self { session })
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    pub fn close(self) -> Result<(), Error> {
        self.session.close().map_err(Error::Close)?;
        debug!("connection closed");
        Ok(())
    }
}

/// Open a session with the given parameters and verify it is alive.
///
/// Single attempt, no retry. Every failure is an [`Error::Connection`].
pub fn connect<S: Connect>(config: &DbConfig) -> Result<ConnectionHandle<S>, Error> {
    let target = config.redacted_target();
    debug!(%target, "opening session");
    let session = S::open(config).map_err(ConnectError::Open)?;
    let handle = ConnectionHandle::establish(session)?;
    info!(%target, "connected to database");
    Ok(handle)
}

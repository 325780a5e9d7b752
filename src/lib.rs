//! Transactional user-record access over SQLite and MySQL sessions.
//!
//! # Intention
//!
//! - Open one verified database session from validated parameters.
//! - Insert a user record atomically: begin, write, then commit, or roll
//!   back when the write fails.
//! - Read user names back through a cursor that is always released.
//!
//! # Architectural Boundaries
//!
//! - Only database access code belongs here; no process exits, no printing.
//! - Drivers plug in behind the [`session`] traits. SQLite is always built;
//!   MySQL is behind the `mysql` feature, which is on by default.
//! - Schema creation and migrations belong to the caller.

pub mod config;
pub mod error;
#[cfg(feature = "mysql")]
pub mod mysql;
pub mod query;
pub mod reader;
pub mod session;
pub mod sqlite;
pub mod writer;

pub use config::{ConfigError, DbConfig};
pub use error::{ConnectError, Error, ScanError};
pub use query::{SqlQuery, Value};
pub use reader::list_user_names;
pub use session::{connect, Connect, ConnectionHandle, DriverError, Row, Session, Transaction};
pub use sqlite::SqliteSession;
pub use writer::{insert_user_transactional, UserRecord};

#[cfg(feature = "mysql")]
pub use crate::mysql::MySqlSession;

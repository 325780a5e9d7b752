//! SQLite session driver.
//!
//! SQLite has no network session: `database` is the path of an existing
//! database file (or `:memory:`). User, password, host and port are
//! validated by [`DbConfig`] but not used here.

use std::ops::ControlFlow;
use std::path::Path;

use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection, OpenFlags, ToSql};
use tracing::debug;

use crate::config::DbConfig;
use crate::query::{SqlQuery, Value};
use crate::session::{Connect, DriverError, Row, Session, Transaction};

pub const IN_MEMORY: &str = ":memory:";

#[derive(Debug)]
pub struct SqliteSession {
    conn: Connection,
}

impl SqliteSession {
    /// Open an existing database file. A missing file is an error rather
    /// than a fresh empty database.
    pub fn open_existing(path: impl AsRef<Path>) -> Result<Self, DriverError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, DriverError> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Wrap a connection the caller already opened.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }
}

impl Connect for SqliteSession {
    fn open(config: &DbConfig) -> Result<Self, DriverError> {
        match config.database() {
            IN_MEMORY => Self::open_in_memory(),
            path => Self::open_existing(path),
        }
    }
}

impl Session for SqliteSession {
    type Tx<'a> = SqliteTransaction<'a>;

    fn ping(&mut self) -> Result<(), DriverError> {
        // Touching sqlite_master forces the file header to be read, so a
        // path that is not a database fails here rather than later.
        self.conn
            .query_row("SELECT count(*) FROM sqlite_master", [], |row| {
                row.get::<_, i64>(0)
            })?;
        Ok(())
    }

    fn begin(&mut self) -> Result<Self::Tx<'_>, DriverError> {
        Ok(SqliteTransaction {
            tx: self.conn.transaction()?,
        })
    }

    fn scan(
        &mut self,
        sql: &str,
        visit: &mut dyn FnMut(&dyn Row) -> ControlFlow<()>,
    ) -> Result<(), DriverError> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            if visit(row).is_break() {
                break;
            }
        }
        Ok(())
    }

    fn close(self) -> Result<(), DriverError> {
        self.conn.close().map_err(|(_, err)| DriverError::Sqlite(err))
    }
}

pub struct SqliteTransaction<'a> {
    tx: rusqlite::Transaction<'a>,
}

impl Transaction for SqliteTransaction<'_> {
    fn execute(&mut self, query: &SqlQuery) -> Result<u64, DriverError> {
        debug!(statement = %query.statement, params = query.params.len(), "execute");
        let changed = self
            .tx
            .execute(&query.statement, params_from_iter(query.params.iter()))?;
        Ok(changed as u64)
    }

    fn commit(self) -> Result<(), DriverError> {
        Ok(self.tx.commit()?)
    }

    fn rollback(self) -> Result<(), DriverError> {
        Ok(self.tx.rollback()?)
    }
}

impl Row for rusqlite::Row<'_> {
    fn column(&self, idx: usize) -> Result<Value, DriverError> {
        let raw = match self.get_ref(idx) {
            Err(rusqlite::Error::InvalidColumnIndex(_)) => {
                return Err(DriverError::MissingColumn(idx))
            }
            other => other?,
        };
        let value = match raw {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => Value::Text(text.to_string()),
                Err(_) => Value::Blob(bytes.to_vec()),
            },
            ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
        };
        Ok(value)
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Value::Integer(i) => ToSqlOutput::from(*i),
            Value::Real(f) => ToSqlOutput::from(*f),
            Value::Text(s) => ToSqlOutput::from(s.as_str()),
            Value::Blob(b) => ToSqlOutput::from(b.as_slice()),
            Value::Boolean(b) => ToSqlOutput::from(*b),
        })
    }
}

//! MySQL session driver over the `mysql` client crate.

use std::ops::ControlFlow;

use mysql::prelude::Queryable;
use mysql::{Conn, OptsBuilder, TxOpts};
use secrecy::ExposeSecret;
use tracing::debug;

use crate::config::DbConfig;
use crate::query::{SqlQuery, Value};
use crate::session::{Connect, DriverError, Row, Session, Transaction};

pub struct MySqlSession {
    conn: Conn,
}

impl Connect for MySqlSession {
    fn open(config: &DbConfig) -> Result<Self, DriverError> {
        let opts = OptsBuilder::new()
            .user(Some(config.user()))
            .pass(Some(config.password().expose_secret()))
            .ip_or_hostname(Some(config.host()))
            .tcp_port(config.port())
            .db_name(Some(config.database()));
        Ok(Self {
            conn: Conn::new(opts)?,
        })
    }
}

impl Session for MySqlSession {
    type Tx<'a> = MySqlTransaction<'a>;

    fn ping(&mut self) -> Result<(), DriverError> {
        self.conn.query_drop("SELECT 1")?;
        Ok(())
    }

    fn begin(&mut self) -> Result<Self::Tx<'_>, DriverError> {
        Ok(MySqlTransaction {
            tx: self.conn.start_transaction(TxOpts::default())?,
        })
    }

    fn scan(
        &mut self,
        sql: &str,
        visit: &mut dyn FnMut(&dyn Row) -> ControlFlow<()>,
    ) -> Result<(), DriverError> {
        // Dropping the result drains whatever rows are left, which frees
        // the connection for the next command.
        let mut result = self.conn.query_iter(sql)?;
        for row in result.by_ref() {
            let row = row?;
            if visit(&row).is_break() {
                break;
            }
        }
        Ok(())
    }

    fn close(self) -> Result<(), DriverError> {
        drop(self.conn);
        Ok(())
    }
}

pub struct MySqlTransaction<'a> {
    tx: mysql::Transaction<'a>,
}

impl Transaction for MySqlTransaction<'_> {
    fn execute(&mut self, query: &SqlQuery) -> Result<u64, DriverError> {
        debug!(statement = %query.statement, params = query.params.len(), "execute");
        let params: Vec<mysql::Value> = query.params.iter().map(to_mysql).collect();
        self.tx
            .exec_drop(query.statement.as_str(), mysql::Params::Positional(params))?;
        Ok(self.tx.affected_rows())
    }

    fn commit(self) -> Result<(), DriverError> {
        Ok(self.tx.commit()?)
    }

    fn rollback(self) -> Result<(), DriverError> {
        Ok(self.tx.rollback()?)
    }
}

impl Row for mysql::Row {
    fn column(&self, idx: usize) -> Result<Value, DriverError> {
        let raw = self.as_ref(idx).ok_or(DriverError::MissingColumn(idx))?;
        Ok(from_mysql(raw))
    }
}

fn to_mysql(value: &Value) -> mysql::Value {
    match value {
        Value::Null => mysql::Value::NULL,
        Value::Integer(i) => mysql::Value::Int(*i),
        Value::Real(f) => mysql::Value::Double(*f),
        Value::Text(s) => mysql::Value::Bytes(s.as_bytes().to_vec()),
        Value::Blob(b) => mysql::Value::Bytes(b.clone()),
        Value::Boolean(b) => mysql::Value::Int(i64::from(*b)),
    }
}

/// Text-protocol rows carry strings as raw bytes; they stay blobs here and
/// are decoded by whoever knows the expected column type.
fn from_mysql(value: &mysql::Value) -> Value {
    match value {
        mysql::Value::NULL => Value::Null,
        mysql::Value::Bytes(bytes) => Value::Blob(bytes.clone()),
        mysql::Value::Int(i) => Value::Integer(*i),
        mysql::Value::UInt(u) => match i64::try_from(*u) {
            Ok(i) => Value::Integer(i),
            Err(_) => Value::Text(u.to_string()),
        },
        mysql::Value::Float(f) => Value::Real(f64::from(*f)),
        mysql::Value::Double(f) => Value::Real(*f),
        mysql::Value::Date(year, month, day, hour, minute, second, micros) => Value::Text(format!(
            "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}.{micros:06}"
        )),
        mysql::Value::Time(negative, days, hours, minutes, seconds, micros) => {
            let sign = if *negative { "-" } else { "" };
            let hours = *days * 24 + u32::from(*hours);
            Value::Text(format!(
                "{sign}{hours:02}:{minutes:02}:{seconds:02}.{micros:06}"
            ))
        }
    }
}

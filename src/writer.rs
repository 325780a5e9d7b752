//! Atomic insert of a single user record.

use tracing::{info, warn};

use crate::error::Error;
use crate::query::SqlQuery;
use crate::session::{ConnectionHandle, Session, Transaction};

pub const INSERT_USER: &str = "INSERT INTO users (name, email, age) VALUES (?, ?, ?)";

/// One row for the `users` relation.
///
/// Only the name is checked here. Email uniqueness and any age range are
/// left to the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    name: String,
    email: String,
    age: i32,
}

impl UserRecord {
    pub fn new(name: impl Into<String>, email: impl Into<String>, age: i32) -> Result<Self, Error> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::InvalidRecord("name must not be blank"));
        }
        Ok(Self {
            name,
            email: email.into(),
            age,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn age(&self) -> i32 {
        self.age
    }

    fn insert_query(&self) -> SqlQuery {
        SqlQuery::new(INSERT_USER)
            .bind(self.name.as_str())
            .bind(self.email.as_str())
            .bind(self.age)
    }
}

/// Insert `record` inside its own transaction.
///
/// Exactly one of commit or rollback happens before this returns. A failed
/// insert is rolled back and reported as [`Error::Write`]; if the rollback
/// fails as well it is logged and attached to that error, never reported in
/// its place. A failed commit is [`Error::Commit`].
pub fn insert_user_transactional<S: Session>(
    handle: &mut ConnectionHandle<S>,
    record: UserRecord,
) -> Result<(), Error> {
    let query = record.insert_query();
    let mut tx = handle
        .session_mut()
        .begin()
        .map_err(Error::TransactionStart)?;

    if let Err(source) = tx.execute(&query) {
        let rollback = match tx.rollback() {
            Ok(()) => None,
            Err(err) => {
                warn!(error = %err, write_error = %source, "rollback after failed insert also failed");
                Some(err)
            }
        };
        return Err(Error::Write { source, rollback });
    }

    tx.commit().map_err(Error::Commit)?;
    info!(name = %record.name, "inserted user in transaction");
    Ok(())
}

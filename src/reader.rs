//! Read-back of user names.

use std::ops::ControlFlow;

use tracing::debug;

use crate::error::{Error, ScanError};
use crate::query::Value;
use crate::session::{ConnectionHandle, Row, Session};

pub const SELECT_USER_NAMES: &str = "SELECT name FROM users";

/// All user names, in whatever order the store's cursor yields them.
///
/// The first row that cannot be read as text stops the scan with
/// [`Error::RowScan`]; the cursor is closed either way.
pub fn list_user_names<S: Session>(handle: &mut ConnectionHandle<S>) -> Result<Vec<String>, Error> {
    let mut names = Vec::new();
    let mut failure = None;

    handle
        .session_mut()
        .scan(SELECT_USER_NAMES, &mut |row: &dyn Row| match read_name(row) {
            Ok(name) => {
                names.push(name);
                ControlFlow::Continue(())
            }
            Err(reason) => {
                failure = Some(Error::RowScan {
                    row: names.len(),
                    reason,
                });
                ControlFlow::Break(())
            }
        })
        .map_err(Error::Query)?;

    if let Some(err) = failure {
        return Err(err);
    }
    debug!(count = names.len(), "listed user names");
    Ok(names)
}

/// Numbers and booleans are rendered as text; NULL and non-UTF-8 bytes are
/// not names.
fn read_name(row: &dyn Row) -> Result<String, ScanError> {
    match row.column(0)? {
        Value::Text(text) => Ok(text),
        Value::Blob(bytes) => String::from_utf8(bytes).map_err(|_| ScanError::UnexpectedType {
            expected: "text",
            found: "non-utf8 blob",
        }),
        Value::Integer(i) => Ok(i.to_string()),
        Value::Real(f) => Ok(f.to_string()),
        Value::Boolean(b) => Ok(b.to_string()),
        other @ Value::Null => Err(ScanError::UnexpectedType {
            expected: "text",
            found: other.type_name(),
        }),
    }
}

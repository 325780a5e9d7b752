use rusqlite::{Connection, Result};
use tempfile::NamedTempFile;

use rust_userstore::{
    connect, insert_user_transactional, list_user_names, ConnectError, ConnectionHandle, DbConfig,
    Error, SqliteSession, UserRecord,
};

// Helper function to create a temporary file-based database with the users table
fn create_temp_db() -> Result<NamedTempFile> {
    let temp_file = NamedTempFile::new().unwrap();
    let conn = Connection::open(temp_file.path())?;
    initialize_schema(&conn)?;
    Ok(temp_file)
}

// Initialize the database schema
fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE users (
            id INTEGER PRIMARY KEY,
            name TEXT,
            email TEXT UNIQUE NOT NULL,
            age INTEGER
        );
        CREATE INDEX idx_users_email ON users(email);
        "#,
    )
}

fn config_for(database: &str) -> DbConfig {
    DbConfig::new("app", "secret", "localhost", 3306, database).unwrap()
}

fn open(db: &NamedTempFile) -> ConnectionHandle<SqliteSession> {
    connect::<SqliteSession>(&config_for(db.path().to_str().unwrap())).unwrap()
}

fn taro() -> UserRecord {
    UserRecord::new("Taro Yamada", "taro@example.com", 30).unwrap()
}

fn count_rows(db: &NamedTempFile, email: &str) -> i64 {
    let conn = Connection::open(db.path()).unwrap();
    conn.query_row("SELECT count(*) FROM users WHERE email = ?1", [email], |row| row.get(0))
        .unwrap()
}

#[test]
fn test_insert_then_list() {
    let db = create_temp_db().unwrap();
    let mut handle = open(&db);

    insert_user_transactional(&mut handle, taro()).unwrap();
    let names = list_user_names(&mut handle).unwrap();
    assert!(names.contains(&"Taro Yamada".to_string()));

    handle.close().unwrap();
}

#[test]
fn test_committed_row_is_visible_to_other_connections() {
    let db = create_temp_db().unwrap();
    let mut handle = open(&db);

    insert_user_transactional(&mut handle, taro()).unwrap();
    handle.close().unwrap();

    let conn = Connection::open(db.path()).unwrap();
    let (name, age): (String, i64) = conn
        .query_row(
            "SELECT name, age FROM users WHERE email = ?1",
            ["taro@example.com"],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(name, "Taro Yamada");
    assert_eq!(age, 30);
}

#[test]
fn test_duplicate_email_rolls_back() {
    let db = create_temp_db().unwrap();
    let mut handle = open(&db);

    insert_user_transactional(&mut handle, taro()).unwrap();
    let err = insert_user_transactional(&mut handle, taro()).unwrap_err();
    assert!(matches!(err, Error::Write { rollback: None, .. }), "{err:?}");

    let names = list_user_names(&mut handle).unwrap();
    assert_eq!(names.iter().filter(|n| *n == "Taro Yamada").count(), 1);
    handle.close().unwrap();

    assert_eq!(count_rows(&db, "taro@example.com"), 1);
}

#[test]
fn test_failed_insert_leaves_handle_usable() {
    let db = create_temp_db().unwrap();
    let mut handle = open(&db);

    insert_user_transactional(&mut handle, taro()).unwrap();
    insert_user_transactional(&mut handle, taro()).unwrap_err();

    let hanako = UserRecord::new("Hanako Sato", "hanako@example.com", 28).unwrap();
    insert_user_transactional(&mut handle, hanako).unwrap();

    let mut names = list_user_names(&mut handle).unwrap();
    names.sort();
    assert_eq!(names, vec!["Hanako Sato", "Taro Yamada"]);
}

#[test]
fn test_empty_relation_lists_nothing() {
    let db = create_temp_db().unwrap();
    let mut handle = open(&db);
    assert_eq!(list_user_names(&mut handle).unwrap(), Vec::<String>::new());
}

#[test]
fn test_null_name_aborts_scan_and_releases_cursor() {
    let db = create_temp_db().unwrap();
    {
        let conn = Connection::open(db.path()).unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO users (id, name, email, age) VALUES (1, 'Ann', 'ann@example.com', 40);
            INSERT INTO users (id, name, email, age) VALUES (2, NULL, 'ghost@example.com', 0);
            INSERT INTO users (id, name, email, age) VALUES (3, 'Bo', 'bo@example.com', 22);
            "#,
        )
        .unwrap();
    }
    let mut handle = open(&db);

    let err = list_user_names(&mut handle).unwrap_err();
    assert!(matches!(err, Error::RowScan { row: 1, .. }), "{err:?}");

    // An unfinalized statement would make the close fail.
    handle.close().unwrap();
}

#[test]
fn test_missing_table_is_a_query_error() {
    let db = NamedTempFile::new().unwrap();
    Connection::open(db.path())
        .unwrap()
        .execute_batch("CREATE TABLE other (x INTEGER);")
        .unwrap();
    let mut handle = open(&db);

    let err = list_user_names(&mut handle).unwrap_err();
    assert!(matches!(err, Error::Query(_)), "{err:?}");

    let err = insert_user_transactional(&mut handle, taro()).unwrap_err();
    assert!(matches!(err, Error::Write { rollback: None, .. }), "{err:?}");
}

#[test]
fn test_unknown_database_is_a_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.db");

    let err = connect::<SqliteSession>(&config_for(missing.to_str().unwrap())).unwrap_err();
    assert!(
        matches!(err, Error::Connection(ConnectError::Open(_))),
        "{err:?}"
    );
    assert!(!missing.exists());
}

#[test]
fn test_non_database_file_fails_health_check() {
    let file = NamedTempFile::new().unwrap();
    std::fs::write(file.path(), vec![b'x'; 4096]).unwrap();

    let err = connect::<SqliteSession>(&config_for(file.path().to_str().unwrap())).unwrap_err();
    assert!(
        matches!(err, Error::Connection(ConnectError::Ping(_))),
        "{err:?}"
    );
}

#[test]
fn test_missing_parameter_is_a_connection_error() {
    let err: Error = DbConfig::new("app", "", "localhost", 3306, ":memory:")
        .unwrap_err()
        .into();
    assert!(matches!(err, Error::Connection(ConnectError::Config(_))));
}

#[test]
fn test_in_memory_database() {
    let mut handle = connect::<SqliteSession>(&config_for(":memory:")).unwrap();
    let err = insert_user_transactional(&mut handle, taro()).unwrap_err();
    assert!(matches!(err, Error::Write { .. }));
    assert!(matches!(list_user_names(&mut handle), Err(Error::Query(_))));
}

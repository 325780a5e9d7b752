use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use rust_userstore::{
    connect, insert_user_transactional, list_user_names, DbConfig, Error, UserRecord,
};

#[cfg(feature = "mysql")]
type Driver = rust_userstore::MySqlSession;
#[cfg(not(feature = "mysql"))]
type Driver = rust_userstore::SqliteSession;

/// Insert one user in a transaction, then list every user name.
///
/// Connection parameters come from DB_USER, DB_PASSWORD, DB_HOST, DB_PORT
/// and DB_NAME, optionally layered over a TOML file.
#[derive(Debug, Parser)]
#[command(name = "rust_userstore", version)]
struct Cli {
    /// TOML file with user, password, host, port and database keys
    #[arg(long, default_value = "userstore.toml")]
    config: PathBuf,

    #[arg(long, default_value = "Taro Yamada")]
    name: String,

    #[arg(long, default_value = "taro@example.com")]
    email: String,

    #[arg(long, default_value_t = 30)]
    age: i32,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = DbConfig::load(&cli.config)
        .map_err(Error::from)
        .context("failed to read connection parameters")?;
    let record = UserRecord::new(cli.name, cli.email, cli.age)?;

    let mut handle = connect::<Driver>(&config).context("failed to connect to the database")?;
    insert_user_transactional(&mut handle, record).context("failed to add user")?;
    let users = list_user_names(&mut handle).context("failed to list users")?;
    println!("users: {users:?}");
    handle.close()?;
    Ok(())
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("rust_userstore={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

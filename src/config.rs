//! Connection parameters, validated once at construction.
//!
//! Sources are layered with Figment: an optional TOML file first, then
//! `DB_*` environment variables on top.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::fmt;
use std::path::Path;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Environment variable prefix for every connection parameter.
pub const ENV_PREFIX: &str = "DB_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required parameter {key}")]
    Missing { key: &'static str },

    #[error("parameter {key} must not be empty")]
    Empty { key: &'static str },

    #[error("port must be between 1 and 65535, got {0}")]
    InvalidPort(i64),

    #[error("could not load configuration: {0}")]
    Load(#[from] figment::Error),
}

/// Validated connection parameters.
///
/// Every field is present and non-empty and the port is non-zero; the only
/// way to obtain a value is through a validating constructor.
pub struct DbConfig {
    user: String,
    password: SecretString,
    host: String,
    port: u16,
    database: String,
}

/// Parameters as they arrive from Figment, before validation.
#[derive(Debug, Deserialize)]
struct RawDbConfig {
    #[serde(default, deserialize_with = "scalar_text")]
    user: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    password: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    host: Option<String>,
    port: Option<i64>,
    #[serde(default, deserialize_with = "scalar_text")]
    database: Option<String>,
}

/// Figment parses environment values, so `DB_PASSWORD=12345` arrives as a
/// number and `DB_PASSWORD=true` as a bool. Both are still text parameters.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl Scalar {
    fn into_text(self) -> String {
        match self {
            Scalar::Text(s) => s,
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int(i) => i.to_string(),
            Scalar::UInt(u) => u.to_string(),
            Scalar::Float(f) => f.to_string(),
        }
    }
}

fn scalar_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(Scalar::into_text))
}

impl DbConfig {
    /// Build a config from explicit values.
    pub fn new(
        user: impl Into<String>,
        password: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        RawDbConfig {
            user: Some(user.into()),
            password: Some(password.into()),
            host: Some(host.into()),
            port: Some(i64::from(port)),
            database: Some(database.into()),
        }
        .validate()
    }

    /// Read `DB_USER`, `DB_PASSWORD`, `DB_HOST`, `DB_PORT` and `DB_NAME`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_figment(Figment::new().merge(env_provider()))
    }

    /// Load from a TOML file with `DB_*` environment overrides.
    ///
    /// A missing file is not an error; the environment alone may supply
    /// every parameter.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_figment(
            Figment::new()
                .merge(Toml::file(path))
                .merge(env_provider()),
        )
    }

    fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let raw: RawDbConfig = figment.extract()?;
        raw.validate()
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &SecretString {
        &self.password
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Connection target with the password masked, safe for logs.
    pub fn redacted_target(&self) -> String {
        format!(
            "{}:***@tcp({}:{})/{}",
            self.user, self.host, self.port, self.database
        )
    }
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("user", &self.user)
            .field("password", &"***")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .finish()
    }
}

impl RawDbConfig {
    fn validate(self) -> Result<DbConfig, ConfigError> {
        let user = required(self.user, "DB_USER")?;
        let password = required(self.password, "DB_PASSWORD")?;
        let host = required(self.host, "DB_HOST")?;
        let port = self.port.ok_or(ConfigError::Missing { key: "DB_PORT" })?;
        let port = u16::try_from(port)
            .ok()
            .filter(|p| *p != 0)
            .ok_or(ConfigError::InvalidPort(port))?;
        let database = required(self.database, "DB_NAME")?;

        Ok(DbConfig {
            user,
            password: SecretString::from(password),
            host,
            port,
            database,
        })
    }
}

fn required(value: Option<String>, key: &'static str) -> Result<String, ConfigError> {
    match value {
        None => Err(ConfigError::Missing { key }),
        Some(v) if v.trim().is_empty() => Err(ConfigError::Empty { key }),
        Some(v) => Ok(v),
    }
}

/// `DB_NAME` names the database, everything else maps one-to-one.
fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX).map(|key| {
        // Keys reach this closure in their original case.
        let mapped = if key.as_str().eq_ignore_ascii_case("name") {
            "database".to_string()
        } else {
            key.as_str().to_string()
        };
        mapped.into()
    })
}

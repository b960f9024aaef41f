//! Provider kinds and connection configuration.
//!
//! This module contains:
//! - `ProviderKind` - Enum of supported engines
//! - `ConnectionOptions` - Limits and read-only policy shared by every engine
//! - `ConnectionParams` - Engine-specific connection target
//! - `ConnectionConfig` - Everything the factory needs to build a connection

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{ConnectorError, Result};

/// Free-form credential/configuration mapping as supplied by callers.
pub type Credentials = serde_json::Map<String, serde_json::Value>;

/// Supported providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Postgres,
    MySql,
    Sqlite,
    DuckDb,
    /// Managed PostgreSQL reached through a connection string
    Supabase,
}

impl ProviderKind {
    /// Get the display name for this provider
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Postgres => "PostgreSQL",
            Self::MySql => "MySQL",
            Self::Sqlite => "SQLite",
            Self::DuckDb => "DuckDB",
            Self::Supabase => "Supabase",
        }
    }

    /// The factory key for this provider
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite",
            Self::DuckDb => "duckdb",
            Self::Supabase => "supabase",
        }
    }

    /// Get the default port for server-based providers
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Self::Postgres | Self::Supabase => Some(5432),
            Self::MySql => Some(3306),
            Self::Sqlite | Self::DuckDb => None,
        }
    }

    /// Check if this provider opens a local file (SQLite, DuckDB)
    pub fn is_file_based(&self) -> bool {
        matches!(self, Self::Sqlite | Self::DuckDb)
    }

    /// Get all providers
    pub fn all() -> Vec<ProviderKind> {
        vec![
            Self::Postgres,
            Self::MySql,
            Self::Sqlite,
            Self::DuckDb,
            Self::Supabase,
        ]
    }
}

impl FromStr for ProviderKind {
    type Err = ConnectorError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        Self::all()
            .into_iter()
            .find(|kind| kind.as_str() == key)
            .ok_or_else(|| ConnectorError::UnsupportedProvider(s.to_string()))
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// SSL mode options for server providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SslMode {
    /// No SSL connection
    Disable,
    /// Try SSL first, fall back to non-SSL
    #[default]
    Prefer,
    /// Require SSL, don't verify certificates
    Require,
    /// Require SSL and verify server certificate
    VerifyCa,
    /// Require SSL, verify certificate and hostname
    VerifyFull,
}

pub const DEFAULT_QUERY_TIMEOUT_S: u64 = 30;
pub const DEFAULT_MAX_ROWS: usize = 500;

fn default_read_only() -> bool {
    true
}

fn default_query_timeout_s() -> u64 {
    DEFAULT_QUERY_TIMEOUT_S
}

fn default_max_rows() -> usize {
    DEFAULT_MAX_ROWS
}

/// Limits and safety policy shared by every provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionOptions {
    /// Reject destructive statements and open the engine read-only
    #[serde(default = "default_read_only")]
    pub read_only: bool,
    /// Engine-level statement/session timeout in seconds
    #[serde(default = "default_query_timeout_s")]
    pub query_timeout_s: u64,
    /// Maximum number of rows fetched by `execute`
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
    /// Sample values collected per column during schema extraction.
    /// Falls back to `max_rows` when unset.
    #[serde(default)]
    pub sample_limit: Option<usize>,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            read_only: true,
            query_timeout_s: DEFAULT_QUERY_TIMEOUT_S,
            max_rows: DEFAULT_MAX_ROWS,
            sample_limit: None,
        }
    }
}

impl ConnectionOptions {
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    pub fn with_sample_limit(mut self, sample_limit: usize) -> Self {
        self.sample_limit = Some(sample_limit);
        self
    }

    pub fn effective_sample_limit(&self) -> usize {
        self.sample_limit.unwrap_or(self.max_rows)
    }

    pub fn query_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.query_timeout_s)
    }

    pub fn query_timeout_ms(&self) -> u64 {
        self.query_timeout_s.saturating_mul(1000)
    }
}

/// Connection target for each provider family
#[derive(Clone, PartialEq, Eq)]
pub enum ConnectionParams {
    /// Discrete server fields (PostgreSQL, MySQL)
    Server {
        host: String,
        port: u16,
        user: String,
        password: String,
        database: String,
        ssl_mode: SslMode,
    },
    /// A full connection string (PostgreSQL, MySQL, Supabase)
    Dsn { dsn: String },
    /// Path to a database file (SQLite, DuckDB)
    File { path: PathBuf },
}

// Passwords and connection strings never reach logs.
impl std::fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Server {
                host,
                port,
                user,
                database,
                ssl_mode,
                ..
            } => f
                .debug_struct("Server")
                .field("host", host)
                .field("port", port)
                .field("user", user)
                .field("password", &"<redacted>")
                .field("database", database)
                .field("ssl_mode", ssl_mode)
                .finish(),
            Self::Dsn { .. } => f.debug_struct("Dsn").field("dsn", &"<redacted>").finish(),
            Self::File { path } => f.debug_struct("File").field("path", path).finish(),
        }
    }
}

impl ConnectionParams {
    /// Create new server connection parameters
    pub fn server(host: &str, port: u16, user: &str, password: &str, database: &str) -> Self {
        Self::Server {
            host: host.to_string(),
            port,
            user: user.to_string(),
            password: password.to_string(),
            database: database.to_string(),
            ssl_mode: SslMode::default(),
        }
    }

    /// Create new connection-string parameters
    pub fn dsn(dsn: &str) -> Self {
        Self::Dsn {
            dsn: dsn.to_string(),
        }
    }

    /// Create new file connection parameters
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File { path: path.into() }
    }

    /// Get the file path if this is a file connection
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::File { path } => Some(path),
            _ => None,
        }
    }
}

/// Everything a driver needs to open a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Logical name (registry key)
    pub name: String,
    pub provider: ProviderKind,
    pub params: ConnectionParams,
    pub options: ConnectionOptions,
}

/// Shape of the caller-supplied configuration map.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default, alias = "connection_string")]
    dsn: Option<String>,
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    port: Option<u16>,
    #[serde(default, alias = "username")]
    user: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    database: Option<String>,
    #[serde(default)]
    ssl_mode: Option<SslMode>,
    #[serde(default)]
    path: Option<PathBuf>,
    #[serde(flatten)]
    options: ConnectionOptions,
}

impl ConnectionConfig {
    /// Create a new connection configuration
    pub fn new(
        name: &str,
        provider: ProviderKind,
        params: ConnectionParams,
        options: ConnectionOptions,
    ) -> Self {
        Self {
            name: name.to_string(),
            provider,
            params,
            options,
        }
    }

    /// Build a configuration from a caller-supplied key/value map.
    pub fn from_map(provider: ProviderKind, name: &str, map: &Credentials) -> Result<Self> {
        let raw: RawConfig = serde_json::from_value(serde_json::Value::Object(map.clone()))
            .map_err(|e| ConnectorError::invalid_config(provider, e.to_string()))?;

        let params = match provider {
            ProviderKind::Sqlite | ProviderKind::DuckDb => match raw.path {
                Some(path) => ConnectionParams::File { path },
                None => return Err(ConnectorError::invalid_config(provider, "missing `path`")),
            },
            ProviderKind::Supabase => match raw.dsn {
                Some(dsn) => ConnectionParams::Dsn { dsn },
                None => return Err(ConnectorError::invalid_config(provider, "missing `dsn`")),
            },
            ProviderKind::Postgres | ProviderKind::MySql => {
                if let Some(dsn) = raw.dsn {
                    ConnectionParams::Dsn { dsn }
                } else {
                    let require = |value: Option<String>, key: &str| {
                        value.ok_or_else(|| {
                            ConnectorError::invalid_config(
                                provider,
                                format!("missing `{}` (or provide `dsn`)", key),
                            )
                        })
                    };
                    ConnectionParams::Server {
                        host: require(raw.host, "host")?,
                        port: raw
                            .port
                            .or(provider.default_port())
                            .unwrap_or_default(),
                        user: require(raw.user, "user")?,
                        password: raw.password.unwrap_or_default(),
                        database: require(raw.database, "database")?,
                        ssl_mode: raw.ssl_mode.unwrap_or_default(),
                    }
                }
            }
        };

        let config = Self::new(name, provider, params, raw.options);
        config.validate()?;
        Ok(config)
    }

    /// Validate that the params match the provider
    pub fn validate(&self) -> Result<()> {
        if self.options.max_rows == 0 {
            return Err(ConnectorError::invalid_config(
                self.provider,
                "`max_rows` must be at least 1",
            ));
        }
        match (&self.provider, &self.params) {
            (ProviderKind::Sqlite | ProviderKind::DuckDb, ConnectionParams::File { .. }) => Ok(()),
            (ProviderKind::Sqlite | ProviderKind::DuckDb, _) => Err(ConnectorError::invalid_config(
                self.provider,
                "requires file connection parameters",
            )),
            (ProviderKind::Supabase, ConnectionParams::Dsn { .. }) => Ok(()),
            (ProviderKind::Supabase, _) => Err(ConnectorError::invalid_config(
                self.provider,
                "requires a connection string",
            )),
            (ProviderKind::Postgres | ProviderKind::MySql, ConnectionParams::File { .. }) => Err(
                ConnectorError::invalid_config(self.provider, "requires server connection parameters"),
            ),
            (ProviderKind::Postgres | ProviderKind::MySql, _) => Ok(()),
        }
    }
}

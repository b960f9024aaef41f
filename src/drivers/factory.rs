//! Connection factory for creating backend connections.
//!
//! The factory pattern allows creating the appropriate backend connection
//! based on the connection configuration's provider.

use super::duckdb::DuckDbConnection;
use super::mysql::MySqlConnection;
use super::postgres::PostgresConnection;
use super::sqlite::SqliteConnection;
use super::supabase::SupabaseConnection;
use crate::error::Result;
use crate::traits::{BoxedConnection, ConnectionConfig, Credentials, ProviderKind};

/// Factory for creating backend connections based on configuration.
///
/// Creating a connection never contacts the engine.
///
/// # Example
///
/// ```ignore
/// use querybridge::drivers::ConnectionFactory;
/// use querybridge::traits::{ConnectionConfig, ConnectionOptions, ConnectionParams, ProviderKind};
///
/// let config = ConnectionConfig::new(
///     "local",
///     ProviderKind::Sqlite,
///     ConnectionParams::file("/var/data/app.db"),
///     ConnectionOptions::default(),
/// );
///
/// let connection = ConnectionFactory::create(config)?;
/// ```
pub struct ConnectionFactory;

impl ConnectionFactory {
    /// Create a new backend connection based on the configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the parameters do not fit the provider.
    pub fn create(config: ConnectionConfig) -> Result<BoxedConnection> {
        config.validate()?;

        Ok(match config.provider {
            ProviderKind::Postgres => PostgresConnection::boxed(config),
            ProviderKind::MySql => MySqlConnection::boxed(config),
            ProviderKind::Sqlite => SqliteConnection::boxed(config),
            ProviderKind::DuckDb => DuckDbConnection::boxed(config),
            ProviderKind::Supabase => SupabaseConnection::boxed(config),
        })
    }

    /// Create a connection from a provider key and a caller-supplied map.
    ///
    /// The provider key is matched case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedProvider` for an unknown key and `InvalidConfig`
    /// for missing or ill-typed parameters.
    pub fn from_map(provider: &str, name: &str, map: &Credentials) -> Result<BoxedConnection> {
        let provider: ProviderKind = provider.parse()?;
        let config = ConnectionConfig::from_map(provider, name, map)?;
        tracing::debug!(connection = %name, provider = %provider, "created connection");
        Self::create(config)
    }

    /// Get a list of all supported providers.
    pub fn supported_providers() -> Vec<ProviderKind> {
        ProviderKind::all()
    }
}

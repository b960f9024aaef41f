//! Named, credential-encrypted connections to heterogeneous SQL engines.
//!
//! `querybridge` puts PostgreSQL, MySQL, SQLite, DuckDB and Supabase behind
//! one `BackendConnection` trait that returns engine-agnostic results and a
//! normalized schema. A `ConnectionManager` keeps connections by name,
//! decrypts Fernet-encrypted credentials and caches extracted schemas.
//!
//! # Example
//!
//! ```ignore
//! use querybridge::{ConnectionManager, ConnectorSettings};
//!
//! let manager = ConnectionManager::new(ConnectorSettings::from_env()?)?;
//! let token = manager.encrypt_credentials(&credentials)?;
//! manager.open_encrypted("sqlite", "local", &token).await?;
//!
//! let result = manager.execute("local", "SELECT * FROM items", &[]).await?;
//! let schema = manager.schema_for("local").await?;
//! ```

pub mod cipher;
pub mod config;
pub mod drivers;
pub mod error;
pub mod extractor;
pub mod manager;
pub mod traits;

pub use cipher::CredentialCipher;
pub use config::ConnectorSettings;
pub use drivers::ConnectionFactory;
pub use error::{ConnectorError, Result};
pub use extractor::SchemaDialect;
pub use manager::ConnectionManager;
pub use traits::{
    BackendConnection, ConnectionConfig, ConnectionInfo, ConnectionOptions, ConnectionParams,
    Credentials, NormalizedSchema, ProviderKind, QueryResult, Value,
};

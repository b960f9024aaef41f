//! Connection abstraction traits and types.
//!
//! This module provides a unified interface over every supported engine.
//! It defines:
//!
//! - **Types** (`types`): Provider enum, connection configuration, SSL modes
//! - **Row/Value** (`row`): Engine-agnostic value representation
//! - **Connection** (`connection`): Core connection trait and query results
//! - **Schema** (`schema`): Normalized schema metadata and the catalog seam
//!
//! # Example
//!
//! ```ignore
//! use querybridge::traits::{ConnectionConfig, ConnectionOptions, ConnectionParams, ProviderKind};
//!
//! let config = ConnectionConfig::new(
//!     "analytics",
//!     ProviderKind::Postgres,
//!     ConnectionParams::server("localhost", 5432, "reader", "secret", "analytics"),
//!     ConnectionOptions::default(),
//! );
//! ```

pub mod connection;
pub mod row;
pub mod schema;
pub mod types;

pub use connection::{
    BackendConnection, BoxedConnection, ConnectionInfo, PoolStatus, QueryResult,
    SharedConnection,
};

pub use row::Value;

pub use schema::{CatalogHandle, ColumnEntry, NormalizedSchema, TableEntry};

pub use types::{
    ConnectionConfig, ConnectionOptions, ConnectionParams, Credentials, ProviderKind, SslMode,
};

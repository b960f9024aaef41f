//! SQLite driver implementation.
//!
//! This module provides a SQLite driver that implements the
//! `BackendConnection` trait using SQLx.
//!
//! # Example
//!
//! ```ignore
//! use querybridge::drivers::sqlite::SqliteConnection;
//! use querybridge::traits::{ConnectionConfig, ConnectionOptions, ConnectionParams, ProviderKind};
//!
//! let config = ConnectionConfig::new(
//!     "local",
//!     ProviderKind::Sqlite,
//!     ConnectionParams::file("/path/to/database.db"),
//!     ConnectionOptions::default(),
//! );
//!
//! let conn = SqliteConnection::new(config);
//! conn.connect().await?;
//! ```

mod connection;
mod schema;
mod types;

pub use connection::SqliteConnection;
pub use schema::SqliteCatalog;

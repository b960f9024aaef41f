//! MySQL driver implementation.
//!
//! This module provides a MySQL/MariaDB driver that implements the
//! `BackendConnection` trait using SQLx.
//!
//! Every pooled session gets `MAX_EXECUTION_TIME` set from the configured
//! query timeout, and read-only connections switch each session to
//! `TRANSACTION READ ONLY` before running a statement.

mod connection;
mod schema;
mod types;

pub use connection::MySqlConnection;
pub use schema::MySqlCatalog;

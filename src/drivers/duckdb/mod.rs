//! DuckDB driver implementation.
//!
//! DuckDB is an embedded analytical database. Its API is blocking, so the
//! connection keeps a single handle and runs every call on the blocking pool.
//! DuckDB has no statement timeout; the configured one is ignored.

mod connection;
mod schema;
mod types;

pub use connection::DuckDbConnection;
pub use schema::DuckDbCatalog;

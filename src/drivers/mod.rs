//! Engine driver implementations.
//!
//! This module contains one driver per supported engine. Each driver
//! implements the `BackendConnection` trait and contributes its catalog
//! strategy to the schema extractor.
//!
//! # Supported Engines
//!
//! - **PostgreSQL**: via SQLx
//! - **MySQL/MariaDB**: via SQLx
//! - **SQLite**: via SQLx
//! - **DuckDB**: via duckdb-rs
//! - **Supabase**: PostgreSQL behind a connection string

pub mod duckdb;
pub mod factory;
pub mod mysql;
pub mod postgres;
pub mod sqlite;
pub mod supabase;

mod read_only;

pub use factory::ConnectionFactory;
pub use supabase::SupabaseConnection;

//! SQLite connection implementation.
//!
//! This module implements the `BackendConnection` trait for SQLite
//! using SQLx's SqlitePool.

use async_lock::RwLock;
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Executor, SqlitePool, Statement};

use super::types::SqliteValueConverter;
use crate::drivers::read_only::guard_statement;
use crate::error::{ConnectorError, Result};
use crate::extractor::SchemaDialect;
use crate::traits::{
    BackendConnection, BoxedConnection, ConnectionConfig, ConnectionOptions, ConnectionParams,
    NormalizedSchema, PoolStatus, ProviderKind, QueryResult, Value,
};

// SQLite pools stay small due to the single-writer limitation
const MAX_CONNECTIONS: u32 = 3;

/// SQLite connection.
///
/// This struct wraps a SQLx SqlitePool and implements the `BackendConnection` trait.
/// Read-only connections open the file with `SQLITE_OPEN_READONLY`.
pub struct SqliteConnection {
    config: ConnectionConfig,
    pool: RwLock<Option<SqlitePool>>,
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("config", &self.config)
            .field("pool", &"<SqlitePool>")
            .finish()
    }
}

impl SqliteConnection {
    /// Create a new SQLite connection from configuration.
    ///
    /// This does not connect immediately - call `connect()` to establish the connection.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            pool: RwLock::new(None),
        }
    }

    /// Create a boxed connection (for factory use).
    pub fn boxed(config: ConnectionConfig) -> BoxedConnection {
        Box::new(Self::new(config))
    }

    /// Build SqliteConnectOptions from the configuration.
    fn build_connect_options(&self) -> Result<SqliteConnectOptions> {
        let options = &self.config.options;
        match &self.config.params {
            ConnectionParams::File { path } => Ok(SqliteConnectOptions::new()
                .filename(path)
                .read_only(options.read_only)
                .create_if_missing(!options.read_only)
                .busy_timeout(options.query_timeout())
                .foreign_keys(true)),
            _ => Err(ConnectorError::invalid_config(
                ProviderKind::Sqlite,
                "requires a file path",
            )),
        }
    }

    /// Get a handle on the connection pool.
    ///
    /// Returns `NotInitialized` if not connected.
    async fn get_pool(&self) -> Result<SqlitePool> {
        let guard = self.pool.read().await;
        guard
            .as_ref()
            .cloned()
            .ok_or_else(|| ConnectorError::NotInitialized(self.config.name.clone()))
    }

    /// Column names from the prepared statement, for results with no rows.
    ///
    /// DDL that already ran may no longer prepare; it has no columns anyway.
    async fn statement_columns(&self, pool: &SqlitePool, sql: &str) -> Vec<String> {
        match pool.prepare(sql).await {
            Ok(statement) => statement
                .columns()
                .iter()
                .map(|col| col.name().to_string())
                .collect(),
            Err(e) => {
                tracing::debug!(connection = %self.config.name, error = %e, "no statement columns");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl BackendConnection for SqliteConnection {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn provider(&self) -> ProviderKind {
        ProviderKind::Sqlite
    }

    fn options(&self) -> &ConnectionOptions {
        &self.config.options
    }

    async fn connect(&self) -> Result<()> {
        if self.pool.read().await.is_some() {
            return Ok(());
        }

        let options = self.build_connect_options()?;
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(self.config.options.query_timeout())
            .connect_with(options)
            .await
            .map_err(|e| ConnectorError::connect_failed(ProviderKind::Sqlite, e))?;

        let mut guard = self.pool.write().await;
        if guard.is_some() {
            // Another caller connected first
            drop(guard);
            pool.close().await;
            return Ok(());
        }
        *guard = Some(pool);
        drop(guard);

        tracing::info!(
            connection = %self.config.name,
            provider = %ProviderKind::Sqlite,
            read_only = self.config.options.read_only,
            "connected"
        );
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        let pool = self.pool.write().await.take();
        if let Some(pool) = pool {
            pool.close().await;
            tracing::info!(
                connection = %self.config.name,
                provider = %ProviderKind::Sqlite,
                "disconnected"
            );
        }
        Ok(())
    }

    async fn execute(&self, sql: &str, args: &[Value]) -> Result<QueryResult> {
        let options = &self.config.options;
        guard_statement(&self.config.name, options.read_only, sql)?;

        let pool = self.get_pool().await?;
        let query = args
            .iter()
            .fold(sqlx::query(sql), SqliteValueConverter::bind);

        let sqlite_rows: Vec<SqliteRow> = query
            .fetch(&pool)
            .take(options.max_rows)
            .try_collect()
            .await
            .map_err(|e| ConnectorError::query_failed(ProviderKind::Sqlite, e))?;

        let columns = match sqlite_rows.first() {
            Some(row) => SqliteValueConverter::column_names(row),
            None => self.statement_columns(&pool, sql).await,
        };
        let rows = sqlite_rows
            .iter()
            .map(SqliteValueConverter::convert_row)
            .collect();

        Ok(QueryResult::new(columns, rows))
    }

    async fn get_schema(&self) -> Result<NormalizedSchema> {
        let pool = self.get_pool().await?;
        SchemaDialect::Sqlite
            .extract(&pool, self.config.options.effective_sample_limit())
            .await
            .map_err(|e| ConnectorError::schema_failed(ProviderKind::Sqlite, &e))
    }

    async fn is_connected(&self) -> bool {
        let guard = self.pool.read().await;
        guard.as_ref().is_some_and(|pool| !pool.is_closed())
    }

    async fn pool_status(&self) -> PoolStatus {
        let guard = self.pool.read().await;
        match guard.as_ref() {
            Some(pool) => PoolStatus::pooled(pool.size(), pool.num_idle()),
            None => PoolStatus::disconnected(),
        }
    }
}

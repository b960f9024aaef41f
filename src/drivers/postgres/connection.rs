//! PostgreSQL connection implementation.
//!
//! This module implements the `BackendConnection` trait for PostgreSQL
//! using SQLx's PgPool.

use async_lock::RwLock;
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::{Column, Executor, PgPool, Statement};
use std::str::FromStr;

use super::types::PgValueConverter;
use crate::drivers::read_only::guard_statement;
use crate::error::{ConnectorError, Result};
use crate::extractor::SchemaDialect;
use crate::traits::{
    BackendConnection, BoxedConnection, ConnectionConfig, ConnectionOptions, ConnectionParams,
    NormalizedSchema, PoolStatus, ProviderKind, QueryResult, Value,
};

const MAX_CONNECTIONS: u32 = 5;
const APPLICATION_NAME: &str = "querybridge";

/// PostgreSQL connection.
///
/// This struct wraps a SQLx PgPool and implements the `BackendConnection` trait.
pub struct PostgresConnection {
    config: ConnectionConfig,
    pool: RwLock<Option<PgPool>>,
}

impl std::fmt::Debug for PostgresConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresConnection")
            .field("config", &self.config)
            .field("pool", &"<PgPool>")
            .finish()
    }
}

impl PostgresConnection {
    /// Create a new PostgreSQL connection from configuration.
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

    /// Build PgConnectOptions from the configuration.
    fn build_connect_options(&self) -> Result<PgConnectOptions> {
        let provider = self.config.provider;
        let options = match &self.config.params {
            ConnectionParams::Server {
                host,
                port,
                user,
                password,
                database,
                ssl_mode,
            } => PgConnectOptions::new()
                .host(host)
                .port(*port)
                .username(user)
                .password(password)
                .database(database)
                .ssl_mode(PgValueConverter::map_ssl_mode(ssl_mode)),
            ConnectionParams::Dsn { dsn } => PgConnectOptions::from_str(dsn)
                .map_err(|e| ConnectorError::invalid_config(provider, e.to_string()))?,
            ConnectionParams::File { .. } => {
                return Err(ConnectorError::invalid_config(
                    provider,
                    "does not support file-based connections",
                ));
            }
        };

        let mut settings = vec![(
            "statement_timeout",
            self.config.options.query_timeout_ms().to_string(),
        )];
        if self.config.options.read_only {
            settings.push(("default_transaction_read_only", "on".to_string()));
        }

        Ok(options
            .application_name(APPLICATION_NAME)
            .options(settings))
    }

    /// Get a handle on the connection pool.
    ///
    /// Returns `NotInitialized` if not connected.
    async fn get_pool(&self) -> Result<PgPool> {
        let guard = self.pool.read().await;
        guard
            .as_ref()
            .cloned()
            .ok_or_else(|| ConnectorError::NotInitialized(self.config.name.clone()))
    }

    /// Column names from the prepared statement, for results with no rows.
    async fn statement_columns(&self, pool: &PgPool, sql: &str) -> Vec<String> {
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
impl BackendConnection for PostgresConnection {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn provider(&self) -> ProviderKind {
        ProviderKind::Postgres
    }

    fn options(&self) -> &ConnectionOptions {
        &self.config.options
    }

    async fn connect(&self) -> Result<()> {
        if self.pool.read().await.is_some() {
            return Ok(());
        }

        let options = self.build_connect_options()?;
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(self.config.options.query_timeout())
            .connect_with(options)
            .await
            .map_err(|e| ConnectorError::connect_failed(self.config.provider, e))?;

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
            provider = %self.config.provider,
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
                provider = %self.config.provider,
                "disconnected"
            );
        }
        Ok(())
    }

    async fn execute(&self, sql: &str, args: &[Value]) -> Result<QueryResult> {
        let options = &self.config.options;
        guard_statement(&self.config.name, options.read_only, sql)?;

        let provider = self.config.provider;
        let pool = self.get_pool().await?;
        let query = args
            .iter()
            .fold(sqlx::query(sql), PgValueConverter::bind);

        // Read-only sessions are set up by the `default_transaction_read_only`
        // startup option, so every pooled connection already carries it.
        let pg_rows: Vec<PgRow> = query
            .fetch(&pool)
            .take(options.max_rows)
            .try_collect()
            .await
            .map_err(|e| ConnectorError::query_failed(provider, e))?;

        let columns = match pg_rows.first() {
            Some(row) => PgValueConverter::column_names(row),
            None => self.statement_columns(&pool, sql).await,
        };
        let rows = pg_rows.iter().map(PgValueConverter::convert_row).collect();

        Ok(QueryResult::new(columns, rows))
    }

    async fn get_schema(&self) -> Result<NormalizedSchema> {
        let pool = self.get_pool().await?;
        SchemaDialect::Postgres
            .extract(&pool, self.config.options.effective_sample_limit())
            .await
            .map_err(|e| ConnectorError::schema_failed(self.config.provider, &e))
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

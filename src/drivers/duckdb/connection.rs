//! DuckDB connection implementation.
//!
//! This module implements the `BackendConnection` trait for DuckDB.
//! DuckDB uses a synchronous API, so every call runs on the blocking pool
//! via `smol::unblock`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use async_trait::async_trait;
use duckdb::{AccessMode, Config, Connection};

use super::schema::DuckDbCatalogHandle;
use super::types::DuckDbValueConverter;
use crate::drivers::read_only::guard_statement;
use crate::error::{ConnectorError, Result};
use crate::extractor::SchemaDialect;
use crate::traits::{
    BackendConnection, BoxedConnection, ConnectionConfig, ConnectionOptions, ConnectionParams,
    NormalizedSchema, PoolStatus, ProviderKind, QueryResult, Value,
};

pub(super) type SharedHandle = Arc<Mutex<Option<Connection>>>;

/// Lock the handle, recovering it if a blocking call panicked while holding it.
pub(super) fn lock_handle(handle: &Mutex<Option<Connection>>) -> MutexGuard<'_, Option<Connection>> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Run one statement on an open handle, keeping at most `max_rows` rows.
pub(super) fn run_query(
    conn: &Connection,
    sql: &str,
    args: &[Value],
    max_rows: usize,
) -> duckdb::Result<QueryResult> {
    let params: Vec<_> = args.iter().map(DuckDbValueConverter::to_param).collect();

    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(duckdb::params_from_iter(params))?;
    let columns: Vec<String> = rows.as_ref().map(|s| s.column_names()).unwrap_or_default();

    let mut out = Vec::new();
    while out.len() < max_rows {
        match rows.next()? {
            Some(row) => out.push(DuckDbValueConverter::convert_row(row, columns.len())),
            None => break,
        }
    }

    Ok(QueryResult::new(columns, out))
}

/// DuckDB database connection.
///
/// This struct wraps a single DuckDB Connection and implements the `BackendConnection` trait.
/// DuckDB is an in-process analytical database, similar to SQLite but optimized for OLAP.
pub struct DuckDbConnection {
    config: ConnectionConfig,
    handle: SharedHandle,
}

impl std::fmt::Debug for DuckDbConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDbConnection")
            .field("config", &self.config)
            .field("handle", &"<duckdb::Connection>")
            .finish()
    }
}

impl DuckDbConnection {
    /// Create a new DuckDB connection with the given configuration.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Create a boxed DuckDB connection.
    pub fn boxed(config: ConnectionConfig) -> BoxedConnection {
        Box::new(Self::new(config))
    }

    /// Open a DuckDB file from the configuration.
    fn build_connection(config: &ConnectionConfig) -> Result<Connection> {
        let path = match &config.params {
            ConnectionParams::File { path } => path,
            _ => {
                return Err(ConnectorError::invalid_config(
                    ProviderKind::DuckDb,
                    "requires a file path",
                ));
            }
        };

        let opened = if config.options.read_only {
            Config::default()
                .access_mode(AccessMode::ReadOnly)
                .and_then(|cfg| Connection::open_with_flags(path, cfg))
        } else {
            Connection::open(path)
        };
        opened.map_err(|e| ConnectorError::connect_failed(ProviderKind::DuckDb, e))
    }
}

#[async_trait]
impl BackendConnection for DuckDbConnection {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn provider(&self) -> ProviderKind {
        ProviderKind::DuckDb
    }

    fn options(&self) -> &ConnectionOptions {
        &self.config.options
    }

    async fn connect(&self) -> Result<()> {
        if self.is_connected().await {
            return Ok(());
        }

        let config = self.config.clone();
        let handle = self.handle.clone();
        let opened = smol::unblock(move || -> Result<bool> {
            let conn = Self::build_connection(&config)?;
            let mut guard = lock_handle(&handle);
            // A concurrent connect may have won; keep its handle
            if guard.is_some() {
                return Ok(false);
            }
            *guard = Some(conn);
            Ok(true)
        })
        .await?;

        if opened {
            tracing::debug!(
                connection = %self.config.name,
                timeout_ms = self.config.options.query_timeout_ms(),
                "duckdb has no statement timeout, skipping"
            );
            tracing::info!(
                connection = %self.config.name,
                provider = %ProviderKind::DuckDb,
                read_only = self.config.options.read_only,
                "connected"
            );
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        let handle = self.handle.clone();
        let closed = smol::unblock(move || lock_handle(&handle).take().is_some()).await;
        if closed {
            tracing::info!(
                connection = %self.config.name,
                provider = %ProviderKind::DuckDb,
                "disconnected"
            );
        }
        Ok(())
    }

    async fn execute(&self, sql: &str, args: &[Value]) -> Result<QueryResult> {
        let options = &self.config.options;
        guard_statement(&self.config.name, options.read_only, sql)?;

        let handle = self.handle.clone();
        let name = self.config.name.clone();
        let sql = sql.to_string();
        let args = args.to_vec();
        let max_rows = options.max_rows;

        smol::unblock(move || -> Result<QueryResult> {
            let guard = lock_handle(&handle);
            let conn = guard
                .as_ref()
                .ok_or_else(|| ConnectorError::NotInitialized(name))?;
            run_query(conn, &sql, &args, max_rows)
                .map_err(|e| ConnectorError::query_failed(ProviderKind::DuckDb, e))
        })
        .await
    }

    async fn get_schema(&self) -> Result<NormalizedSchema> {
        if !self.is_connected().await {
            return Err(ConnectorError::NotInitialized(self.config.name.clone()));
        }

        let catalog = DuckDbCatalogHandle::new(self.handle.clone());
        SchemaDialect::DuckDb
            .extract(&catalog, self.config.options.effective_sample_limit())
            .await
            .map_err(|e| ConnectorError::schema_failed(ProviderKind::DuckDb, &e))
    }

    async fn is_connected(&self) -> bool {
        match self.handle.try_lock() {
            Ok(guard) => guard.is_some(),
            // Only an in-flight call on an open handle holds the lock
            Err(TryLockError::WouldBlock) => true,
            Err(TryLockError::Poisoned(e)) => e.into_inner().is_some(),
        }
    }

    async fn pool_status(&self) -> PoolStatus {
        PoolStatus::handle(self.is_connected().await)
    }
}

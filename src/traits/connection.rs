//! Core backend connection trait.
//!
//! This module defines the `BackendConnection` trait that every engine driver
//! implements, and the result types it returns.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::row::Value;
use super::schema::NormalizedSchema;
use super::types::{ConnectionOptions, ProviderKind};
use crate::error::Result;

/// Result of executing a statement
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    /// Column names in result order (may repeat)
    pub columns: Vec<String>,
    /// Result rows, each `columns.len()` wide
    pub rows: Vec<Vec<Value>>,
    /// Number of rows fetched
    pub row_count: usize,
}

impl QueryResult {
    /// Create a new query result
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
        }
    }

    /// Check if the result has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Pool/handle statistics. `size` and `idle` are only reported by pooled engines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle: Option<usize>,
}

impl PoolStatus {
    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn handle(connected: bool) -> Self {
        Self {
            connected,
            ..Self::default()
        }
    }

    pub fn pooled(size: u32, idle: usize) -> Self {
        Self {
            connected: true,
            size: Some(size),
            idle: Some(idle),
        }
    }
}

/// Caller-facing metadata for a registered connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionInfo {
    pub name: String,
    pub provider: ProviderKind,
    /// Same map `pool_status` reports
    pub status: PoolStatus,
}

/// Core trait for all backend connections.
///
/// A connection is either fully connected (handle present) or fully
/// disconnected. All methods take `&self` so a registered connection can be
/// shared behind an `Arc` and used concurrently.
///
/// # Example
///
/// ```ignore
/// use querybridge::traits::BackendConnection;
///
/// async fn example(conn: &dyn BackendConnection) -> querybridge::Result<()> {
///     conn.connect().await?;
///     let result = conn.execute("SELECT 1", &[]).await?;
///     assert_eq!(result.row_count, 1);
///     conn.disconnect().await
/// }
/// ```
#[async_trait]
pub trait BackendConnection: Send + Sync {
    /// Logical name of this connection
    fn name(&self) -> &str;

    /// Engine family
    fn provider(&self) -> ProviderKind;

    /// Limits and read-only policy
    fn options(&self) -> &ConnectionOptions;

    /// Open the pool or handle. Calling this on a connected instance is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `ConnectFailed` if the engine refuses the connection.
    async fn connect(&self) -> Result<()>;

    /// Close the pool or handle and release all resources. Idempotent.
    async fn disconnect(&self) -> Result<()>;

    /// Execute a statement with positional arguments.
    ///
    /// Read-only connections reject destructive statements before the engine
    /// is contacted. At most `options().max_rows` rows are returned.
    async fn execute(&self, sql: &str, args: &[Value]) -> Result<QueryResult>;

    /// Introspect the engine catalog into a `NormalizedSchema`.
    async fn get_schema(&self) -> Result<NormalizedSchema>;

    /// Whether a handle is currently held. Performs no I/O.
    async fn is_connected(&self) -> bool;

    /// Pool statistics
    async fn pool_status(&self) -> PoolStatus;

    /// Metadata snapshot for this connection
    async fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            name: self.name().to_string(),
            provider: self.provider(),
            status: self.pool_status().await,
        }
    }
}

/// A boxed backend connection trait object.
pub type BoxedConnection = Box<dyn BackendConnection>;

/// A shared backend connection, as held by the manager.
pub type SharedConnection = Arc<dyn BackendConnection>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_result_counts_rows() {
        let result = QueryResult::new(
            vec!["id".to_string(), "name".to_string()],
            vec![
                vec![Value::Int64(1), Value::Text("a".into())],
                vec![Value::Int64(2), Value::Null],
            ],
        );
        assert_eq!(result.row_count, 2);
        assert!(result.rows.iter().all(|r| r.len() == result.columns.len()));

        let empty = QueryResult::new(vec![], vec![]);
        assert!(empty.is_empty());
        assert_eq!(empty.row_count, 0);
    }

    #[test]
    fn test_result_and_status_serialization() {
        let result = QueryResult::new(vec!["n".to_string()], vec![vec![Value::Int64(1)]]);
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            serde_json::json!({"columns": ["n"], "rows": [[1]], "row_count": 1})
        );

        assert_eq!(
            serde_json::to_value(PoolStatus::handle(true)).unwrap(),
            serde_json::json!({"connected": true})
        );
        assert_eq!(
            serde_json::to_value(PoolStatus::pooled(5, 3)).unwrap(),
            serde_json::json!({"connected": true, "size": 5, "idle": 3})
        );
    }

    #[test]
    fn test_connection_info_serialization() {
        let info = ConnectionInfo {
            name: "warehouse".to_string(),
            provider: ProviderKind::DuckDb,
            status: PoolStatus::handle(true),
        };
        assert_eq!(
            serde_json::to_value(&info).unwrap(),
            serde_json::json!({"name": "warehouse", "provider": "duckdb", "status": {"connected": true}})
        );

        let info = ConnectionInfo {
            name: "analytics".to_string(),
            provider: ProviderKind::Postgres,
            status: PoolStatus::pooled(5, 4),
        };
        assert_eq!(
            serde_json::to_value(&info).unwrap(),
            serde_json::json!({
                "name": "analytics",
                "provider": "postgres",
                "status": {"connected": true, "size": 5, "idle": 4}
            })
        );
    }
}

//! DuckDB catalog strategy.
//!
//! DuckDB exposes an `information_schema` compatible with PostgreSQL's, but
//! does not report foreign keys through it; none are surfaced.

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::connection::{SharedHandle, lock_handle, run_query};
use crate::extractor::{CatalogDialect, RawColumn, TableRef, text_at};
use crate::traits::{CatalogHandle, Value};

const DEFAULT_SCHEMA: &str = "main";

const TABLES_QUERY: &str = r#"
    SELECT table_schema, table_name
    FROM information_schema.tables
    WHERE table_type = 'BASE TABLE'
      AND table_schema NOT IN ('information_schema', 'pg_catalog')
      AND table_catalog = current_database()
    ORDER BY table_schema, table_name
"#;

const COLUMNS_QUERY: &str = r#"
    SELECT column_name, data_type, is_nullable
    FROM information_schema.columns
    WHERE table_schema = ? AND table_name = ?
      AND table_catalog = current_database()
    ORDER BY ordinal_position
"#;

/// DuckDB catalog queries
pub struct DuckDbCatalog;

#[async_trait]
impl CatalogDialect for DuckDbCatalog {
    async fn list_tables(&self, catalog: &dyn CatalogHandle) -> Result<Vec<TableRef>> {
        catalog
            .fetch_all(TABLES_QUERY, &[])
            .await?
            .iter()
            .map(|row| -> Result<TableRef> {
                let schema = text_at(row, 0, "table_schema")?;
                let name = text_at(row, 1, "table_name")?;
                Ok(if schema == DEFAULT_SCHEMA {
                    TableRef::in_schema(schema, name)
                } else {
                    TableRef::qualified(schema, name)
                })
            })
            .collect()
    }

    async fn list_columns(
        &self,
        catalog: &dyn CatalogHandle,
        table: &TableRef,
    ) -> Result<Vec<RawColumn>> {
        let schema = table.schema.as_deref().unwrap_or(DEFAULT_SCHEMA);
        let args = [Value::Text(schema.to_string()), Value::Text(table.name.clone())];
        catalog
            .fetch_all(COLUMNS_QUERY, &args)
            .await?
            .iter()
            .map(|row| -> Result<RawColumn> {
                Ok(RawColumn {
                    name: text_at(row, 0, "column_name")?,
                    data_type: text_at(row, 1, "data_type")?,
                    nullable: text_at(row, 2, "is_nullable")? == "YES",
                })
            })
            .collect()
    }

    async fn list_foreign_keys(
        &self,
        _catalog: &dyn CatalogHandle,
        _table: &TableRef,
    ) -> Result<HashMap<String, String>> {
        Ok(HashMap::new())
    }
}

/// Catalog access over a shared DuckDB handle.
pub(super) struct DuckDbCatalogHandle {
    handle: SharedHandle,
}

impl DuckDbCatalogHandle {
    pub(super) fn new(handle: SharedHandle) -> Self {
        Self { handle }
    }
}

#[async_trait]
impl CatalogHandle for DuckDbCatalogHandle {
    async fn fetch_all(&self, sql: &str, args: &[Value]) -> Result<Vec<Vec<Value>>> {
        let handle = self.handle.clone();
        let sql = sql.to_string();
        let args = args.to_vec();

        smol::unblock(move || -> Result<Vec<Vec<Value>>> {
            let guard = lock_handle(&handle);
            let conn = guard.as_ref().context("duckdb handle is closed")?;
            let result = run_query(conn, &sql, &args, usize::MAX)?;
            Ok(result.rows)
        })
        .await
    }
}

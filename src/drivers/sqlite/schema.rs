//! SQLite catalog strategy.
//!
//! Tables come from `sqlite_master`; columns and foreign keys from the
//! `pragma_table_info` / `pragma_foreign_key_list` table-valued functions.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::SqlitePool;

use super::types::SqliteValueConverter;
use crate::extractor::{CatalogDialect, RawColumn, TableRef, text_at};
use crate::traits::{CatalogHandle, Value};

const TABLES_QUERY: &str = r#"
    SELECT name
    FROM sqlite_master
    WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
    ORDER BY name
"#;

const COLUMNS_QUERY: &str = r#"SELECT name, type, "notnull" FROM pragma_table_info(?1) ORDER BY cid"#;

const FOREIGN_KEYS_QUERY: &str = r#"SELECT "from", "table", "to" FROM pragma_foreign_key_list(?1)"#;

/// SQLite catalog queries
pub struct SqliteCatalog;

#[async_trait]
impl CatalogDialect for SqliteCatalog {
    async fn list_tables(&self, catalog: &dyn CatalogHandle) -> Result<Vec<TableRef>> {
        catalog
            .fetch_all(TABLES_QUERY, &[])
            .await?
            .iter()
            .map(|row| text_at(row, 0, "name").map(TableRef::bare))
            .collect()
    }

    async fn list_columns(
        &self,
        catalog: &dyn CatalogHandle,
        table: &TableRef,
    ) -> Result<Vec<RawColumn>> {
        let args = [Value::Text(table.name.clone())];
        catalog
            .fetch_all(COLUMNS_QUERY, &args)
            .await?
            .iter()
            .map(|row| -> Result<RawColumn> {
                Ok(RawColumn {
                    name: text_at(row, 0, "name")?,
                    // Columns may be declared without a type
                    data_type: row.get(1).and_then(Value::as_text).unwrap_or_default().to_string(),
                    nullable: !row.get(2).and_then(Value::as_bool).unwrap_or(false),
                })
            })
            .collect()
    }

    async fn list_foreign_keys(
        &self,
        catalog: &dyn CatalogHandle,
        table: &TableRef,
    ) -> Result<HashMap<String, String>> {
        let args = [Value::Text(table.name.clone())];
        catalog
            .fetch_all(FOREIGN_KEYS_QUERY, &args)
            .await?
            .iter()
            .map(|row| -> Result<(String, String)> {
                let column = text_at(row, 0, "from")?;
                let target_table = text_at(row, 1, "table")?;
                // `to` is NULL when the key targets the implicit primary key
                let target = match row.get(2).and_then(Value::as_text) {
                    Some(to) => format!("{}.{}", target_table, to),
                    None => target_table,
                };
                Ok((column, target))
            })
            .collect()
    }
}

#[async_trait]
impl CatalogHandle for SqlitePool {
    async fn fetch_all(&self, sql: &str, args: &[Value]) -> Result<Vec<Vec<Value>>> {
        let query = args.iter().fold(sqlx::query(sql), SqliteValueConverter::bind);
        let rows = query.fetch_all(self).await?;
        Ok(rows.iter().map(SqliteValueConverter::convert_row).collect())
    }
}

//! MySQL catalog strategy.
//!
//! Reads `information_schema` for the current database only. Tables are
//! reported by their bare name but probed through `db`.`table`.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::MySqlPool;

use super::types::MySqlValueConverter;
use crate::extractor::{CatalogDialect, RawColumn, TableRef, text_at};
use crate::traits::{CatalogHandle, Value};

const TABLES_QUERY: &str = r#"
    SELECT table_schema, table_name
    FROM information_schema.tables
    WHERE table_type = 'BASE TABLE' AND table_schema = DATABASE()
    ORDER BY table_name
"#;

const COLUMNS_QUERY: &str = r#"
    SELECT column_name, data_type, is_nullable
    FROM information_schema.columns
    WHERE table_schema = ? AND table_name = ?
    ORDER BY ordinal_position
"#;

const FOREIGN_KEYS_QUERY: &str = r#"
    SELECT column_name, referenced_table_name, referenced_column_name
    FROM information_schema.key_column_usage
    WHERE table_schema = ? AND table_name = ? AND referenced_table_name IS NOT NULL
"#;

/// MySQL catalog queries
pub struct MySqlCatalog;

fn table_args(table: &TableRef) -> [Value; 2] {
    [
        table.schema.clone().map(Value::Text).unwrap_or_default(),
        Value::Text(table.name.clone()),
    ]
}

#[async_trait]
impl CatalogDialect for MySqlCatalog {
    async fn list_tables(&self, catalog: &dyn CatalogHandle) -> Result<Vec<TableRef>> {
        catalog
            .fetch_all(TABLES_QUERY, &[])
            .await?
            .iter()
            .map(|row| -> Result<TableRef> {
                Ok(TableRef::in_schema(
                    text_at(row, 0, "table_schema")?,
                    text_at(row, 1, "table_name")?,
                ))
            })
            .collect()
    }

    async fn list_columns(
        &self,
        catalog: &dyn CatalogHandle,
        table: &TableRef,
    ) -> Result<Vec<RawColumn>> {
        catalog
            .fetch_all(COLUMNS_QUERY, &table_args(table))
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
        catalog: &dyn CatalogHandle,
        table: &TableRef,
    ) -> Result<HashMap<String, String>> {
        catalog
            .fetch_all(FOREIGN_KEYS_QUERY, &table_args(table))
            .await?
            .iter()
            .map(|row| -> Result<(String, String)> {
                let column = text_at(row, 0, "column_name")?;
                let target = format!(
                    "{}.{}",
                    text_at(row, 1, "referenced_table_name")?,
                    text_at(row, 2, "referenced_column_name")?
                );
                Ok((column, target))
            })
            .collect()
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }
}

#[async_trait]
impl CatalogHandle for MySqlPool {
    async fn fetch_all(&self, sql: &str, args: &[Value]) -> Result<Vec<Vec<Value>>> {
        let query = args.iter().fold(sqlx::query(sql), MySqlValueConverter::bind);
        let rows = query.fetch_all(self).await?;
        Ok(rows.iter().map(MySqlValueConverter::convert_row).collect())
    }
}

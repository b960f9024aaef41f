//! PostgreSQL catalog strategy.
//!
//! Reads `information_schema`; every table is reported as `schema.table`.
//! Identifier-typed catalog columns are cast to `text` so they decode as
//! plain strings.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;

use super::types::PgValueConverter;
use crate::extractor::{CatalogDialect, RawColumn, TableRef, text_at};
use crate::traits::{CatalogHandle, Value};

const TABLES_QUERY: &str = r#"
    SELECT table_schema::text, table_name::text
    FROM information_schema.tables
    WHERE table_type = 'BASE TABLE'
        AND table_schema NOT IN ('pg_catalog', 'information_schema')
    ORDER BY table_schema, table_name
"#;

const COLUMNS_QUERY: &str = r#"
    SELECT column_name::text, data_type::text, is_nullable::text
    FROM information_schema.columns
    WHERE table_schema::text = $1 AND table_name::text = $2
    ORDER BY ordinal_position
"#;

// Constraints are matched by their own schema; `ccu.table_schema` names the
// referenced table, which may live elsewhere.
const FOREIGN_KEYS_QUERY: &str = r#"
    SELECT kcu.column_name::text, ccu.table_name::text, ccu.column_name::text
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
        ON kcu.constraint_name = tc.constraint_name
        AND kcu.constraint_schema = tc.constraint_schema
    JOIN information_schema.constraint_column_usage ccu
        ON ccu.constraint_name = tc.constraint_name
        AND ccu.constraint_schema = tc.constraint_schema
    WHERE tc.constraint_type = 'FOREIGN KEY'
        AND tc.table_schema::text = $1
        AND tc.table_name::text = $2
"#;

/// PostgreSQL (and Supabase) catalog queries
pub struct PostgresCatalog;

fn table_args(table: &TableRef) -> [Value; 2] {
    [
        Value::Text(table.schema.clone().unwrap_or_else(|| "public".to_string())),
        Value::Text(table.name.clone()),
    ]
}

#[async_trait]
impl CatalogDialect for PostgresCatalog {
    async fn list_tables(&self, catalog: &dyn CatalogHandle) -> Result<Vec<TableRef>> {
        catalog
            .fetch_all(TABLES_QUERY, &[])
            .await?
            .iter()
            .map(|row| -> Result<TableRef> {
                Ok(TableRef::qualified(
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
                    text_at(row, 1, "foreign_table")?,
                    text_at(row, 2, "foreign_column")?
                );
                Ok((column, target))
            })
            .collect()
    }
}

#[async_trait]
impl CatalogHandle for PgPool {
    async fn fetch_all(&self, sql: &str, args: &[Value]) -> Result<Vec<Vec<Value>>> {
        let query = args.iter().fold(sqlx::query(sql), PgValueConverter::bind);
        let rows = query.fetch_all(self).await?;
        Ok(rows.iter().map(PgValueConverter::convert_row).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::SchemaDialect;
    use crate::extractor::tests::ScriptedCatalog;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn test_tables_are_schema_qualified_with_relationships() {
        let catalog = ScriptedCatalog::new()
            .answer(
                "information_schema.tables",
                vec![
                    vec![text("public"), text("orders")],
                    vec![text("sales"), text("users")],
                ],
            )
            .answer("FOREIGN KEY", vec![vec![text("user_id"), text("users"), text("id")]])
            .answer(
                "information_schema.columns",
                vec![
                    vec![text("id"), text("integer"), text("NO")],
                    vec![text("user_id"), text("integer"), text("YES")],
                ],
            )
            .answer("DISTINCT", vec![vec![Value::Int64(7)]]);

        let schema = smol::block_on(SchemaDialect::Postgres.extract(&catalog, 3)).unwrap();

        assert_eq!(schema.table_names(), vec!["public.orders", "sales.users"]);
        let orders = schema.table("public.orders").unwrap();
        let user_id = orders.column("user_id").unwrap();
        assert!(user_id.foreign_key);
        assert!(user_id.nullable);
        assert_eq!(user_id.references.as_deref(), Some("users.id"));
        assert_eq!(user_id.sample_values, vec!["7"]);
        assert!(orders.relationships.contains("users.id"));
        assert!(!orders.column("id").unwrap().nullable);

        let seen = catalog.seen.lock().unwrap();
        assert!(seen.iter().any(|sql| sql.contains("FROM \"sales\".\"users\"")));
    }

    #[test]
    fn test_cross_schema_reference_is_kept() {
        let catalog = ScriptedCatalog::new()
            .answer(
                "information_schema.tables",
                vec![vec![text("sales"), text("orders")]],
            )
            .answer("FOREIGN KEY", vec![vec![text("user_id"), text("users"), text("id")]])
            .answer(
                "information_schema.columns",
                vec![vec![text("user_id"), text("integer"), text("YES")]],
            );

        let schema = smol::block_on(SchemaDialect::Postgres.extract(&catalog, 0)).unwrap();
        let orders = schema.table("sales.orders").unwrap();
        assert!(orders.column("user_id").unwrap().foreign_key);
        assert!(orders.relationships.contains("users.id"));

        let seen = catalog.seen.lock().unwrap();
        let fk_query = seen
            .iter()
            .find(|sql| sql.contains("FOREIGN KEY"))
            .unwrap();
        assert!(fk_query.contains("ccu.constraint_schema = tc.constraint_schema"));
        assert!(fk_query.contains("kcu.constraint_schema = tc.constraint_schema"));
        assert!(!fk_query.contains("ccu.table_schema"));
    }
}

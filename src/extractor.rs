//! Catalog-to-`NormalizedSchema` extraction.
//!
//! Each engine family contributes a `CatalogDialect` (in its driver's
//! `schema` module) that knows how to list tables, columns and foreign keys.
//! The shared algorithm here walks those listings, probes sample values and
//! assembles the normalized entries.

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::drivers::duckdb::DuckDbCatalog;
use crate::drivers::mysql::MySqlCatalog;
use crate::drivers::postgres::PostgresCatalog;
use crate::drivers::sqlite::SqliteCatalog;
use crate::traits::{CatalogHandle, ColumnEntry, NormalizedSchema, ProviderKind, TableEntry, Value};

/// A table as listed by a catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    /// Schema/namespace, when the engine has one
    pub schema: Option<String>,
    pub name: String,
    /// Name used in the normalized output
    pub display_name: String,
}

impl TableRef {
    /// A table reported under its bare name
    pub fn bare(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            schema: None,
            display_name: name.clone(),
            name,
        }
    }

    /// A table reported as `schema.name`
    pub fn qualified(schema: impl Into<String>, name: impl Into<String>) -> Self {
        let schema = schema.into();
        let name = name.into();
        Self {
            display_name: format!("{}.{}", schema, name),
            schema: Some(schema),
            name,
        }
    }

    /// A table in `schema`, addressed by schema but reported by its bare name
    pub fn in_schema(schema: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            schema: Some(schema.into()),
            display_name: name.clone(),
            name,
        }
    }
}

/// A column as listed by a catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawColumn {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
}

/// Per-engine catalog queries.
#[async_trait]
pub trait CatalogDialect: Send + Sync {
    /// Base tables, excluding system schemas, in output order
    async fn list_tables(&self, catalog: &dyn CatalogHandle) -> Result<Vec<TableRef>>;

    /// Columns of `table` in ordinal order
    async fn list_columns(&self, catalog: &dyn CatalogHandle, table: &TableRef)
    -> Result<Vec<RawColumn>>;

    /// `column -> "target_table.target_column"` for `table`
    async fn list_foreign_keys(
        &self,
        catalog: &dyn CatalogHandle,
        table: &TableRef,
    ) -> Result<HashMap<String, String>>;

    /// Quote one identifier
    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }
}

/// Catalog strategy per engine family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaDialect {
    Postgres,
    MySql,
    Sqlite,
    DuckDb,
}

impl SchemaDialect {
    /// Supabase shares the PostgreSQL catalog
    pub fn for_provider(provider: ProviderKind) -> Self {
        match provider {
            ProviderKind::Postgres | ProviderKind::Supabase => Self::Postgres,
            ProviderKind::MySql => Self::MySql,
            ProviderKind::Sqlite => Self::Sqlite,
            ProviderKind::DuckDb => Self::DuckDb,
        }
    }

    fn strategy(&self) -> &'static dyn CatalogDialect {
        match self {
            Self::Postgres => &PostgresCatalog,
            Self::MySql => &MySqlCatalog,
            Self::Sqlite => &SqliteCatalog,
            Self::DuckDb => &DuckDbCatalog,
        }
    }

    /// Quote one identifier in this dialect
    pub fn quote_ident(&self, ident: &str) -> String {
        self.strategy().quote_ident(ident)
    }

    /// Quote a (possibly schema-qualified) table reference
    pub fn quote_table(&self, table: &TableRef) -> String {
        match &table.schema {
            Some(schema) => format!("{}.{}", self.quote_ident(schema), self.quote_ident(&table.name)),
            None => self.quote_ident(&table.name),
        }
    }

    /// The sample-value probe for one column
    pub fn sample_query(&self, table: &TableRef, column: &str, limit: usize) -> String {
        let column = self.quote_ident(column);
        format!(
            "SELECT DISTINCT {col} FROM {table} WHERE {col} IS NOT NULL LIMIT {limit}",
            col = column,
            table = self.quote_table(table),
            limit = limit,
        )
    }

    /// Extract the full normalized schema through `catalog`.
    pub async fn extract(
        &self,
        catalog: &dyn CatalogHandle,
        sample_limit: usize,
    ) -> Result<NormalizedSchema> {
        let strategy = self.strategy();
        let tables = strategy
            .list_tables(catalog)
            .await
            .context("listing tables")?;

        let mut entries = Vec::with_capacity(tables.len());
        for table in &tables {
            let columns = strategy
                .list_columns(catalog, table)
                .await
                .with_context(|| format!("listing columns of {}", table.display_name))?;
            let foreign_keys = strategy
                .list_foreign_keys(catalog, table)
                .await
                .with_context(|| format!("listing foreign keys of {}", table.display_name))?;

            let mut column_entries = Vec::with_capacity(columns.len());
            for column in columns {
                let samples = self
                    .sample_values(catalog, table, &column.name, sample_limit)
                    .await;
                let mut entry = ColumnEntry::new(column.name, column.data_type, column.nullable)
                    .with_samples(samples);
                if let Some(target) = foreign_keys.get(&entry.name) {
                    entry = entry.with_reference(target.clone());
                }
                column_entries.push(entry);
            }

            entries.push(TableEntry::new(table.display_name.clone(), column_entries));
        }

        Ok(NormalizedSchema::new(entries))
    }

    /// Best-effort distinct sample values. Any failure yields an empty list.
    async fn sample_values(
        &self,
        catalog: &dyn CatalogHandle,
        table: &TableRef,
        column: &str,
        limit: usize,
    ) -> Vec<String> {
        if limit == 0 {
            return Vec::new();
        }
        let sql = self.sample_query(table, column, limit);
        match catalog.fetch_column(&sql, &[]).await {
            Ok(values) => values
                .into_iter()
                .filter(|v| !v.is_null())
                .map(|v| v.to_display_string())
                .collect(),
            Err(e) => {
                tracing::debug!(
                    table = %table.display_name,
                    column,
                    error = %e,
                    "sample probe failed"
                );
                Vec::new()
            }
        }
    }
}

/// Read a text cell from a catalog row
pub(crate) fn text_at(row: &[Value], index: usize, what: &str) -> Result<String> {
    row.get(index)
        .and_then(Value::as_text)
        .map(str::to_string)
        .with_context(|| format!("catalog row is missing {}", what))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Catalog double answering by SQL substring.
    pub(crate) struct ScriptedCatalog {
        answers: Vec<(&'static str, Result<Vec<Vec<Value>>, &'static str>)>,
        pub calls: AtomicUsize,
        pub seen: Mutex<Vec<String>>,
    }

    impl ScriptedCatalog {
        pub(crate) fn new() -> Self {
            Self {
                answers: Vec::new(),
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn answer(mut self, needle: &'static str, rows: Vec<Vec<Value>>) -> Self {
            self.answers.push((needle, Ok(rows)));
            self
        }

        pub(crate) fn fail(mut self, needle: &'static str, message: &'static str) -> Self {
            self.answers.push((needle, Err(message)));
            self
        }
    }

    #[async_trait]
    impl CatalogHandle for ScriptedCatalog {
        async fn fetch_all(&self, sql: &str, _args: &[Value]) -> Result<Vec<Vec<Value>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(sql.to_string());
            for (needle, answer) in &self.answers {
                if sql.contains(needle) {
                    return match answer {
                        Ok(rows) => Ok(rows.clone()),
                        Err(message) => Err(anyhow::anyhow!(*message)),
                    };
                }
            }
            Ok(Vec::new())
        }
    }

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn test_quoting_per_dialect() {
        assert_eq!(SchemaDialect::Postgres.quote_ident("order"), "\"order\"");
        assert_eq!(SchemaDialect::Sqlite.quote_ident("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(SchemaDialect::MySql.quote_ident("order"), "`order`");
        assert_eq!(SchemaDialect::MySql.quote_ident("a`b"), "`a``b`");

        let table = TableRef::qualified("public", "orders");
        assert_eq!(
            SchemaDialect::Postgres.sample_query(&table, "status", 5),
            "SELECT DISTINCT \"status\" FROM \"public\".\"orders\" WHERE \"status\" IS NOT NULL LIMIT 5"
        );
    }

    #[test]
    fn test_supabase_uses_postgres_catalog() {
        assert_eq!(
            SchemaDialect::for_provider(ProviderKind::Supabase),
            SchemaDialect::Postgres
        );
        assert_eq!(SchemaDialect::for_provider(ProviderKind::DuckDb), SchemaDialect::DuckDb);
    }

    #[test]
    fn test_failed_probe_only_empties_that_column() {
        let catalog = ScriptedCatalog::new()
            .answer("sqlite_master", vec![vec![text("items")]])
            .answer(
                "pragma_table_info",
                vec![
                    vec![text("id"), text("INTEGER"), Value::Int64(1)],
                    vec![text("blob_col"), text("BLOB"), Value::Int64(0)],
                ],
            )
            .fail("DISTINCT \"blob_col\"", "unqueryable column")
            .answer("DISTINCT \"id\"", vec![vec![Value::Int64(1)], vec![Value::Int64(2)]]);

        let schema = smol::block_on(SchemaDialect::Sqlite.extract(&catalog, 10)).unwrap();
        let items = schema.table("items").unwrap();

        assert_eq!(items.column("id").unwrap().sample_values, vec!["1", "2"]);
        assert!(items.column("blob_col").unwrap().sample_values.is_empty());
        assert!(items.column("blob_col").unwrap().nullable);
        assert!(!items.column("id").unwrap().nullable);
    }

    #[test]
    fn test_catalog_failure_is_reported_with_context() {
        let catalog = ScriptedCatalog::new().fail("information_schema.tables", "permission denied");
        let err = smol::block_on(SchemaDialect::MySql.extract(&catalog, 10)).unwrap_err();
        assert_eq!(format!("{:#}", err), "listing tables: permission denied");
    }

    #[test]
    fn test_zero_sample_limit_skips_probes() {
        let catalog = ScriptedCatalog::new()
            .answer("sqlite_master", vec![vec![text("items")]])
            .answer("pragma_table_info", vec![vec![text("id"), text("INTEGER"), Value::Int64(0)]]);

        let schema = smol::block_on(SchemaDialect::Sqlite.extract(&catalog, 0)).unwrap();
        assert!(schema.tables[0].columns[0].sample_values.is_empty());
        assert!(
            catalog
                .seen
                .lock()
                .unwrap()
                .iter()
                .all(|sql| !sql.contains("DISTINCT"))
        );
    }
}

//! Normalized schema metadata and the catalog access seam.
//!
//! Every engine's catalog is flattened into the same shape: an ordered list of
//! tables, each with ordered columns, foreign-key flags, sample values and a
//! set of relationship targets.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::row::Value;

/// A single column of a normalized table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnEntry {
    /// Column name
    pub name: String,
    /// Engine type string, verbatim
    #[serde(rename = "type")]
    pub data_type: String,
    /// Whether NULL values are allowed
    pub nullable: bool,
    /// Whether this column references another table
    pub foreign_key: bool,
    /// `table.column` target when `foreign_key` is set
    #[serde(default)]
    pub references: Option<String>,
    /// Distinct non-null values, best effort
    #[serde(default)]
    pub sample_values: Vec<String>,
}

impl ColumnEntry {
    /// Create a column with no foreign key and no samples
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
            foreign_key: false,
            references: None,
            sample_values: Vec::new(),
        }
    }

    /// Mark this column as a foreign key to `target`
    pub fn with_reference(mut self, target: impl Into<String>) -> Self {
        self.foreign_key = true;
        self.references = Some(target.into());
        self
    }

    pub fn with_samples(mut self, samples: Vec<String>) -> Self {
        self.sample_values = samples;
        self
    }
}

/// A single normalized table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntry {
    /// Qualified where the engine has schemas, bare otherwise
    pub name: String,
    /// Never populated by automatic extraction
    #[serde(default)]
    pub description: Option<String>,
    pub columns: Vec<ColumnEntry>,
    /// Foreign-key targets (`table.column`), deduplicated and sorted
    #[serde(default)]
    pub relationships: BTreeSet<String>,
}

impl TableEntry {
    /// Build a table, deriving relationships from the columns' references
    pub fn new(name: impl Into<String>, columns: Vec<ColumnEntry>) -> Self {
        let relationships = columns
            .iter()
            .filter_map(|c| c.references.clone())
            .collect();
        Self {
            name: name.into(),
            description: None,
            columns,
            relationships,
        }
    }

    /// Find a column by name
    pub fn column(&self, name: &str) -> Option<&ColumnEntry> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Ordered list of tables; serializes as a JSON list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedSchema {
    pub tables: Vec<TableEntry>,
}

impl NormalizedSchema {
    pub fn new(tables: Vec<TableEntry>) -> Self {
        Self { tables }
    }

    /// Find a table by its (possibly qualified) name
    pub fn table(&self, name: &str) -> Option<&TableEntry> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }
}

/// Read access to an engine catalog.
///
/// Drivers implement this over their own pool or handle so the extraction
/// strategies never see engine types.
#[async_trait]
pub trait CatalogHandle: Send + Sync {
    /// Run a catalog query and return every row
    async fn fetch_all(&self, sql: &str, args: &[Value]) -> anyhow::Result<Vec<Vec<Value>>>;

    /// Run a query and return the first column of every row
    async fn fetch_column(&self, sql: &str, args: &[Value]) -> anyhow::Result<Vec<Value>> {
        let rows = self.fetch_all(sql, args).await?;
        Ok(rows
            .into_iter()
            .map(|row| row.into_iter().next().unwrap_or_default())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_relationships_are_deduplicated_and_sorted() {
        let table = TableEntry::new(
            "public.orders",
            vec![
                ColumnEntry::new("id", "integer", false),
                ColumnEntry::new("user_id", "integer", false).with_reference("users.id"),
                ColumnEntry::new("buyer_id", "integer", true).with_reference("users.id"),
                ColumnEntry::new("sku", "text", true).with_reference("products.sku"),
            ],
        );
        assert_eq!(
            table.relationships.iter().cloned().collect::<Vec<_>>(),
            vec!["products.sku".to_string(), "users.id".to_string()]
        );
        assert!(table.column("user_id").unwrap().foreign_key);
        assert!(!table.column("id").unwrap().foreign_key);
    }

    #[test]
    fn test_schema_serializes_as_list() {
        let schema = NormalizedSchema::new(vec![TableEntry::new(
            "items",
            vec![ColumnEntry::new("id", "INTEGER", false).with_samples(vec!["1".into()])],
        )]);

        assert_eq!(
            serde_json::to_value(&schema).unwrap(),
            json!([{
                "name": "items",
                "description": null,
                "columns": [{
                    "name": "id",
                    "type": "INTEGER",
                    "nullable": false,
                    "foreign_key": false,
                    "references": null,
                    "sample_values": ["1"]
                }],
                "relationships": []
            }])
        );
        assert_eq!(schema.table_names(), vec!["items"]);
    }
}

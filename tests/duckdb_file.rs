//! End-to-end tests against a real DuckDB file.

use querybridge::{
    BackendConnection, ConnectionConfig, ConnectionFactory, ConnectionOptions, ConnectionParams,
    ConnectorError, ProviderKind, Value,
};

fn config(path: &std::path::Path, read_only: bool) -> ConnectionConfig {
    ConnectionConfig::new(
        "warehouse",
        ProviderKind::DuckDb,
        ConnectionParams::file(path),
        ConnectionOptions::default().with_read_only(read_only),
    )
}

#[test]
fn read_only_file_with_schemas() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("warehouse.duckdb");

    smol::block_on(async {
        let writer = ConnectionFactory::create(config(&path, false)).unwrap();
        writer.connect().await.unwrap();
        for sql in [
            "CREATE TABLE items (id INTEGER NOT NULL, name VARCHAR)",
            "INSERT INTO items VALUES (1, 'apple'), (2, 'pear')",
            "CREATE SCHEMA analytics",
            "CREATE TABLE analytics.events (item_id INTEGER, at TIMESTAMP)",
            "CREATE VIEW item_names AS SELECT name FROM items",
        ] {
            writer.execute(sql, &[]).await.unwrap();
        }
        writer.disconnect().await.unwrap();

        let reader = ConnectionFactory::create(config(&path, true)).unwrap();
        reader.connect().await.unwrap();

        let result = reader
            .execute("SELECT id, name FROM items WHERE id = ?", &[Value::Int64(2)])
            .await
            .unwrap();
        assert_eq!(result.columns, vec!["id", "name"]);
        assert_eq!(
            result.rows,
            vec![vec![Value::Int64(2), Value::Text("pear".into())]]
        );

        let err = reader.execute("drop table items", &[]).await.unwrap_err();
        assert!(matches!(err, ConnectorError::PermissionDenied { ref keyword, .. } if keyword == "DROP"));

        let schema = reader.get_schema().await.unwrap();
        assert_eq!(schema.table_names(), vec!["analytics.events", "items"]);

        let items = schema.table("items").unwrap();
        assert_eq!(items.column("id").unwrap().data_type, "INTEGER");
        assert!(!items.column("id").unwrap().nullable);
        assert!(items.column("name").unwrap().nullable);
        assert_eq!(items.column("name").unwrap().sample_values.len(), 2);
        assert!(items.columns.iter().all(|c| !c.foreign_key));

        reader.disconnect().await.unwrap();
        assert!(!reader.is_connected().await);
    });
}

#[test]
fn read_only_open_of_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let conn = ConnectionFactory::create(config(&dir.path().join("absent.duckdb"), true)).unwrap();

    let err = smol::block_on(conn.connect()).unwrap_err();
    assert!(matches!(
        err,
        ConnectorError::ConnectFailed { provider: ProviderKind::DuckDb, .. }
    ));
}

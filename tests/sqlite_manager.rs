//! End-to-end tests against real SQLite files.

use std::path::Path;
use std::time::Duration;

use querybridge::{
    BackendConnection, ConnectionManager, ConnectorError, ConnectorSettings, CredentialCipher,
    Credentials, ProviderKind, Value,
};
use serde_json::json;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn manager() -> ConnectionManager {
    let settings = ConnectorSettings::new(CredentialCipher::generate_key())
        .with_schema_ttl(Duration::from_secs(60));
    ConnectionManager::new(settings).unwrap()
}

fn credentials(path: &Path, read_only: bool) -> Credentials {
    json!({"path": path, "read_only": read_only})
        .as_object()
        .cloned()
        .unwrap()
}

/// Create `items(id, name)` with two rows through a writable connection.
fn seed_items(manager: &ConnectionManager, path: &Path) {
    smol::block_on(async {
        let writer = manager
            .create_connection("sqlite", "seed", &credentials(path, false))
            .unwrap();
        writer.connect().await.unwrap();
        writer
            .execute(
                "CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
                &[],
            )
            .await
            .unwrap();
        writer
            .execute(
                "INSERT INTO items (id, name) VALUES (?, ?), (?, ?)",
                &[
                    Value::Int64(1),
                    Value::Text("apple".into()),
                    Value::Int64(2),
                    Value::Text("pear".into()),
                ],
            )
            .await
            .unwrap();
        writer.disconnect().await.unwrap();
    });
}

#[test]
fn read_only_items_scenario() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("items.db");
    let manager = manager();
    seed_items(&manager, &path);

    smol::block_on(async {
        let token = manager
            .encrypt_credentials(&credentials(&path, true))
            .unwrap();
        let conn = manager
            .open_encrypted("sqlite", "items-db", &token)
            .await
            .unwrap();
        assert_eq!(conn.provider(), ProviderKind::Sqlite);
        assert!(manager.health_check("items-db").await);

        let result = manager
            .execute("items-db", "select * from items", &[])
            .await
            .unwrap();
        assert_eq!(result.row_count, 2);
        assert_eq!(result.columns, vec!["id", "name"]);
        assert!(result.rows.iter().all(|row| row.len() == 2));

        let err = manager
            .execute("items-db", "insert into items values (3,'x')", &[])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ConnectorError::PermissionDenied { ref name, ref keyword }
                if name == "items-db" && keyword == "INSERT"
        ));

        // Leading whitespace does not bypass the guard
        let err = manager
            .execute("items-db", "   DELETE FROM items", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::PermissionDenied { .. }));

        let result = manager
            .execute("items-db", "SELECT count(*) AS n FROM items", &[])
            .await
            .unwrap();
        assert_eq!(result.rows, vec![vec![Value::Int64(2)]]);

        let result = manager
            .execute("items-db", "SELECT id, name FROM items WHERE id > ?", &[Value::Int64(10)])
            .await
            .unwrap();
        assert_eq!(result.columns, vec!["id", "name"]);
        assert_eq!(result.row_count, 0);

        let info = manager.connection_info("items-db").await.unwrap();
        assert_eq!(info.provider, ProviderKind::Sqlite);
        assert!(info.status.connected);
        assert!(info.status.size.is_some());
        assert!(info.status.idle.is_some());

        manager.shutdown().await.unwrap();
        assert!(!manager.health_check("items-db").await);
    });
}

#[test]
fn schema_is_extracted_and_cached() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("items.db");
    let manager = manager();
    seed_items(&manager, &path);

    smol::block_on(async {
        let conn = manager
            .create_connection("sqlite", "items-db", &credentials(&path, true))
            .unwrap();
        conn.connect().await.unwrap();
        manager.register("items-db", conn).await;

        let schema = manager.schema_for("items-db").await.unwrap();
        assert_eq!(schema.table_names(), vec!["items"]);

        let items = schema.table("items").unwrap();
        let name = items.column("name").unwrap();
        assert_eq!(name.data_type, "TEXT");
        assert!(!name.nullable);
        assert_eq!(name.sample_values.len(), 2);
        assert!(items.relationships.is_empty());

        let json = serde_json::to_value(&schema).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["name"], "items");

        // Served from cache even once the connection is closed
        manager.get("items-db").await.unwrap().disconnect().await.unwrap();
        assert_eq!(manager.schema_for("items-db").await.unwrap(), schema);

        manager.invalidate_schema("items-db").await;
        let err = manager.schema_for("items-db").await.unwrap_err();
        assert!(matches!(err, ConnectorError::NotInitialized(_)));
    });
}

#[test]
fn huge_schema_ttl_is_served_from_cache() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("items.db");
    let settings = ConnectorSettings::new(CredentialCipher::generate_key())
        .with_schema_ttl(Duration::from_secs(u64::MAX));
    let manager = ConnectionManager::new(settings).unwrap();
    seed_items(&manager, &path);

    smol::block_on(async {
        let conn = manager
            .create_connection("sqlite", "x", &credentials(&path, true))
            .unwrap();
        conn.connect().await.unwrap();
        manager.register("x", conn).await;

        let schema = manager.schema_for("x").await.unwrap();
        manager.get("x").await.unwrap().disconnect().await.unwrap();
        assert_eq!(manager.schema_for("x").await.unwrap(), schema);
    });
}

#[test]
fn wrong_key_cannot_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("items.db");
    let token = manager()
        .encrypt_credentials(&credentials(&path, true))
        .unwrap();

    let err = smol::block_on(manager().open_encrypted("sqlite", "x", &token)).unwrap_err();
    assert!(matches!(err, ConnectorError::DecryptionFailed(_)));
}

#[test]
fn unknown_engine_is_unsupported() {
    let err = manager()
        .create_connection("unknown-engine", "x", &Credentials::new())
        .unwrap_err();
    assert!(matches!(err, ConnectorError::UnsupportedProvider(_)));
}

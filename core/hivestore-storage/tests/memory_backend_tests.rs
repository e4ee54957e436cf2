mod common;

use common::{commands_table, schema_set};
use hivestore_model::{ClusteringOrder, SchemaSet, TableGroup};
use hivestore_storage::{MemoryBackend, StorageBackend, StorageError};
use hivestore_types::{CommandPayload, NotificationPayload};
use pretty_assertions::assert_eq;
use serde_json::json;

fn tables(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

async fn provisioned_backend() -> MemoryBackend {
    let schemas = schema_set();
    let backend = MemoryBackend::new();
    backend.create_schemas(&schemas).await;
    backend.set_table_schemas(schemas.tables()).await.unwrap();
    backend.set_udt_schemas(schemas.udts()).await.unwrap();
    backend
}

// ── Schema probe ─────────────────────────────────────────────────

#[tokio::test]
async fn probe_absent_before_creation() {
    let backend = MemoryBackend::new();
    assert!(!backend.check_schemas_exist(&schema_set()).await.unwrap());
}

#[tokio::test]
async fn probe_present_after_creation() {
    let backend = MemoryBackend::new();
    backend.create_schemas(&schema_set()).await;
    assert!(backend.check_schemas_exist(&schema_set()).await.unwrap());
}

#[tokio::test]
async fn probe_requires_every_object() {
    let backend = MemoryBackend::new();
    backend.create_table("commands").await;
    backend.create_table("notifications").await;
    // UDT "params" still missing
    assert!(!backend.check_schemas_exist(&schema_set()).await.unwrap());
}

// ── Provisioning ─────────────────────────────────────────────────

#[tokio::test]
async fn registers_udts() {
    let backend = provisioned_backend().await;
    assert!(backend.has_udt_schema("params").await);
    assert!(!backend.has_udt_schema("other").await);
}

#[tokio::test]
async fn assign_tables_records_group() {
    let backend = provisioned_backend().await;
    backend
        .assign_tables(TableGroup::Commands, &tables(&["commands"]))
        .await
        .unwrap();
    assert_eq!(
        backend.assigned_tables(TableGroup::Commands).await,
        Some(tables(&["commands"]))
    );
    assert_eq!(backend.assigned_tables(TableGroup::Notifications).await, None);
}

#[tokio::test]
async fn assign_unregistered_table_fails() {
    let backend = MemoryBackend::new();
    let result = backend
        .assign_tables(TableGroup::Commands, &tables(&["commands"]))
        .await;
    assert!(matches!(result, Err(StorageError::NotProvisioned(t)) if t == "commands"));
}

// ── Inserts ──────────────────────────────────────────────────────

#[tokio::test]
async fn insert_command_writes_row() {
    let backend = provisioned_backend().await;
    let cmd = CommandPayload::new("dev-1", "reboot")
        .with_id(1)
        .with_timestamp("2024-03-01T10:00:00Z")
        .with_parameters(json!({"delay": 5}));

    backend.insert_command(&cmd, &tables(&["commands"])).await.unwrap();

    let rows = backend.rows("commands").await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["device_id"], json!("dev-1"));
    assert_eq!(rows[0]["command"], json!("reboot"));
    assert_eq!(rows[0]["timestamp"], json!("2024-03-01T10:00:00.000Z"));
    assert_eq!(rows[0]["parameters"], json!({"delay": 5}));
}

#[tokio::test]
async fn command_update_upserts_existing_row() {
    let backend = provisioned_backend().await;
    let cmd = CommandPayload::new("dev-1", "reboot").with_id(1);
    backend.insert_command(&cmd, &tables(&["commands"])).await.unwrap();

    let update = CommandPayload::new("dev-1", "reboot")
        .with_id(1)
        .with_status("completed")
        .updated();
    backend
        .insert_command_update(&update, &tables(&["commands"]))
        .await
        .unwrap();

    let rows = backend.rows("commands").await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["status"], json!("completed"));
    assert_eq!(rows[0]["command"], json!("reboot"));
}

#[tokio::test]
async fn distinct_keys_produce_distinct_rows() {
    let backend = provisioned_backend().await;
    for id in 1..=3 {
        let n = NotificationPayload::new("dev-1", "temperature").with_id(id);
        backend
            .insert_notification(&n, &tables(&["notifications"]))
            .await
            .unwrap();
    }
    assert_eq!(backend.rows("notifications").await.len(), 3);
}

#[tokio::test]
async fn insert_into_multiple_tables() {
    let backend = provisioned_backend().await;
    // Both tables are keyed by (device_id, id); unmatched fields are dropped.
    let n = NotificationPayload::new("dev-1", "temperature").with_id(9);
    backend
        .insert_notification(&n, &tables(&["notifications", "commands"]))
        .await
        .unwrap();

    assert_eq!(backend.rows("notifications").await.len(), 1);
    assert_eq!(backend.rows("commands").await.len(), 1);
}

#[tokio::test]
async fn insert_with_missing_key_writes_nothing() {
    let backend = provisioned_backend().await;
    let cmd = CommandPayload::new("dev-1", "reboot"); // no id
    let result = backend.insert_command(&cmd, &tables(&["commands"])).await;

    assert!(matches!(result, Err(StorageError::MissingKey { .. })));
    assert!(backend.rows("commands").await.is_empty());
}

#[tokio::test]
async fn insert_into_unknown_table_fails() {
    let backend = provisioned_backend().await;
    let cmd = CommandPayload::new("dev-1", "reboot").with_id(1);
    let result = backend.insert_command(&cmd, &tables(&["ghost"])).await;
    assert!(matches!(result, Err(StorageError::UnknownTable(t)) if t == "ghost"));
}

#[tokio::test]
async fn insert_into_unregistered_table_fails() {
    let backend = MemoryBackend::new();
    backend.create_table("commands").await;
    let cmd = CommandPayload::new("dev-1", "reboot").with_id(1);
    let result = backend.insert_command(&cmd, &tables(&["commands"])).await;
    assert!(matches!(result, Err(StorageError::NotProvisioned(_))));
}

#[tokio::test]
async fn insert_with_no_tables_is_noop() {
    let backend = provisioned_backend().await;
    let cmd = CommandPayload::new("dev-1", "reboot").with_id(1);
    backend.insert_command(&cmd, &[]).await.unwrap();
    assert!(backend.rows("commands").await.is_empty());
}

// ── Read order ───────────────────────────────────────────────────

fn ids(rows: Vec<hivestore_storage::Row>) -> Vec<serde_json::Value> {
    rows.into_iter().map(|r| r["id"].clone()).collect()
}

#[tokio::test]
async fn numeric_keys_sort_numerically() {
    let backend = provisioned_backend().await;
    for id in [10, 2] {
        let cmd = CommandPayload::new("dev-1", "reboot").with_id(id);
        backend.insert_command(&cmd, &tables(&["commands"])).await.unwrap();
    }

    assert_eq!(ids(backend.rows("commands").await), vec![json!(2), json!(10)]);
}

#[tokio::test]
async fn descending_clustering_order_respected() {
    let descending = commands_table().with_order("id", ClusteringOrder::Desc);
    let schemas = SchemaSet::new(vec![descending], vec![]).unwrap();
    let backend = MemoryBackend::new();
    backend.create_schemas(&schemas).await;
    backend.set_table_schemas(schemas.tables()).await.unwrap();

    for id in [1, 2, 3] {
        let cmd = CommandPayload::new("dev-1", "reboot").with_id(id);
        backend.insert_command(&cmd, &tables(&["commands"])).await.unwrap();
    }

    assert_eq!(ids(backend.rows("commands").await), vec![json!(3), json!(2), json!(1)]);
}

#[tokio::test]
async fn partition_key_sorts_before_clustering_key() {
    let descending = commands_table().with_order("id", ClusteringOrder::Desc);
    let schemas = SchemaSet::new(vec![descending], vec![]).unwrap();
    let backend = MemoryBackend::new();
    backend.create_schemas(&schemas).await;
    backend.set_table_schemas(schemas.tables()).await.unwrap();

    for (device, id) in [("dev-b", 1), ("dev-a", 1), ("dev-a", 2)] {
        let cmd = CommandPayload::new(device, "reboot").with_id(id);
        backend.insert_command(&cmd, &tables(&["commands"])).await.unwrap();
    }

    let keys: Vec<_> = backend
        .rows("commands")
        .await
        .into_iter()
        .map(|r| (r["device_id"].clone(), r["id"].clone()))
        .collect();
    assert_eq!(
        keys,
        vec![
            (json!("dev-a"), json!(2)),
            (json!("dev-a"), json!(1)),
            (json!("dev-b"), json!(1)),
        ]
    );
}

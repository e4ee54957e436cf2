//! In-process column-family backend.
//!
//! Models a cluster with a schema catalog (objects created by an external
//! schema-creation step) and tables holding rows keyed by primary key.
//! Writes are upserts: a row with an existing key has the written columns
//! replaced and the remaining columns kept.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use crate::row::{Row, build_row};
use async_trait::async_trait;
use hivestore_model::{ClusteringOrder, SchemaSet, TableGroup, TableSchema, UdtSchema};
use hivestore_types::{CommandPayload, NotificationPayload};
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::debug;

/// One primary-key component, ordered by value rather than by its text form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum KeyPart {
    Bool(bool),
    Int(i64),
    Text(String),
    Other(String),
}

impl From<&Value> for KeyPart {
    fn from(value: &Value) -> Self {
        match value {
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Other(n.to_string()),
            },
            Value::String(s) => Self::Text(s.clone()),
            other => Self::Other(other.to_string()),
        }
    }
}

type RowKey = Vec<KeyPart>;

/// Per-key-column direction: partition columns ascending, clustering
/// columns as declared.
fn key_directions(schema: &TableSchema) -> Vec<ClusteringOrder> {
    schema
        .partition_key
        .iter()
        .map(|_| ClusteringOrder::Asc)
        .chain(
            schema
                .clustering_key
                .iter()
                .map(|column| schema.clustering_order(column)),
        )
        .collect()
}

fn compare_keys(a: &RowKey, b: &RowKey, directions: &[ClusteringOrder]) -> Ordering {
    for (i, (x, y)) in a.iter().zip(b).enumerate() {
        let ord = match directions.get(i) {
            Some(ClusteringOrder::Desc) => y.cmp(x),
            _ => x.cmp(y),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

#[derive(Default)]
struct MemoryState {
    /// Schema objects that exist in the store.
    created_tables: HashSet<String>,
    created_udts: HashSet<String>,
    /// Definitions registered through provisioning.
    table_schemas: HashMap<String, TableSchema>,
    udt_schemas: HashMap<String, UdtSchema>,
    assignments: HashMap<TableGroup, Vec<String>>,
    /// Rows per table, keyed by primary-key values.
    rows: HashMap<String, BTreeMap<RowKey, Row>>,
}

/// In-memory storage backend.
#[derive(Default)]
pub struct MemoryBackend {
    state: RwLock<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates every table and UDT in `schemas` (the external schema-creation step).
    pub async fn create_schemas(&self, schemas: &SchemaSet) {
        let mut state = self.state.write().await;
        for name in schemas.table_names() {
            state.created_tables.insert(name.to_string());
            state.rows.entry(name.to_string()).or_default();
        }
        for name in schemas.udt_names() {
            state.created_udts.insert(name.to_string());
        }
    }

    /// Creates a single table, leaving the rest of the catalog unchanged.
    pub async fn create_table(&self, name: &str) {
        let mut state = self.state.write().await;
        state.created_tables.insert(name.to_string());
        state.rows.entry(name.to_string()).or_default();
    }

    /// Rows currently stored in a table, in primary-key order.
    ///
    /// Clustering columns declared `DESC` sort descending within a partition.
    pub async fn rows(&self, table: &str) -> Vec<Row> {
        let state = self.state.read().await;
        let Some(rows) = state.rows.get(table) else {
            return Vec::new();
        };
        let mut entries: Vec<(&RowKey, &Row)> = rows.iter().collect();
        if let Some(schema) = state.table_schemas.get(table) {
            let directions = key_directions(schema);
            entries.sort_by(|(a, _), (b, _)| compare_keys(a, b, &directions));
        }
        entries.into_iter().map(|(_, row)| row.clone()).collect()
    }

    /// Tables bound to a group, if the group was assigned.
    pub async fn assigned_tables(&self, group: TableGroup) -> Option<Vec<String>> {
        self.state.read().await.assignments.get(&group).cloned()
    }

    /// Whether the UDT definition was registered.
    pub async fn has_udt_schema(&self, name: &str) -> bool {
        self.state.read().await.udt_schemas.contains_key(name)
    }

    async fn upsert<T: Serialize + Sync>(&self, payload: &T, tables: &[String]) -> StorageResult<()> {
        let mut state = self.state.write().await;

        // Build every row before writing so a bad payload writes nothing.
        let mut pending = Vec::with_capacity(tables.len());
        for table in tables {
            if !state.created_tables.contains(table) {
                return Err(StorageError::UnknownTable(table.clone()));
            }
            let schema = state
                .table_schemas
                .get(table)
                .ok_or_else(|| StorageError::NotProvisioned(table.clone()))?;
            let row = build_row(payload, schema)?;
            let key: RowKey = schema
                .primary_key()
                .map(|column| row.get(column).map_or(KeyPart::Other(String::new()), KeyPart::from))
                .collect();
            pending.push((table.clone(), key, row));
        }

        for (table, key, row) in pending {
            let rows = state.rows.entry(table).or_default();
            rows.entry(key).or_default().extend(row);
        }
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn check_schemas_exist(&self, schemas: &SchemaSet) -> StorageResult<bool> {
        let state = self.state.read().await;
        let tables = schemas
            .table_names()
            .all(|name| state.created_tables.contains(name));
        let udts = schemas
            .udt_names()
            .all(|name| state.created_udts.contains(name));
        Ok(tables && udts)
    }

    async fn set_table_schemas(&self, tables: &[TableSchema]) -> StorageResult<()> {
        let mut state = self.state.write().await;
        for table in tables {
            state.table_schemas.insert(table.name.clone(), table.clone());
        }
        debug!(count = tables.len(), "Registered table schemas");
        Ok(())
    }

    async fn set_udt_schemas(&self, udts: &[UdtSchema]) -> StorageResult<()> {
        let mut state = self.state.write().await;
        for udt in udts {
            state.udt_schemas.insert(udt.name.clone(), udt.clone());
        }
        debug!(count = udts.len(), "Registered UDT schemas");
        Ok(())
    }

    async fn assign_tables(&self, group: TableGroup, tables: &[String]) -> StorageResult<()> {
        let mut state = self.state.write().await;
        for table in tables {
            if !state.table_schemas.contains_key(table) {
                return Err(StorageError::NotProvisioned(table.clone()));
            }
        }
        state.assignments.insert(group, tables.to_vec());
        Ok(())
    }

    async fn insert_command(&self, command: &CommandPayload, tables: &[String]) -> StorageResult<()> {
        self.upsert(command, tables).await
    }

    async fn insert_command_update(
        &self,
        command: &CommandPayload,
        tables: &[String],
    ) -> StorageResult<()> {
        self.upsert(command, tables).await
    }

    async fn insert_notification(
        &self,
        notification: &NotificationPayload,
        tables: &[String],
    ) -> StorageResult<()> {
        self.upsert(notification, tables).await
    }
}

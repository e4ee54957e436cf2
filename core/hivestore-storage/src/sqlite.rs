//! SQLite-backed column-family store.
//!
//! Each table schema maps to one SQLite table whose primary key is the
//! partition key followed by the clustering key. User-defined types have no
//! SQLite counterpart and are recorded in the `hivestore_udts` catalog so the
//! schema probe can see them. Writes are upserts on the primary key.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use crate::row::{Row, build_row};
use async_trait::async_trait;
use hivestore_model::{ClusteringOrder, SchemaSet, TableGroup, TableSchema, UdtSchema};
use hivestore_types::{CommandPayload, NotificationPayload};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tracing::{debug, info};

const UDT_CATALOG: &str = "hivestore_udts";

/// Persistent storage backend on a single SQLite database.
pub struct SqliteBackend {
    conn: Arc<Mutex<Connection>>,
    tables: RwLock<HashMap<String, TableSchema>>,
    assignments: RwLock<HashMap<TableGroup, Vec<String>>>,
}

impl SqliteBackend {
    /// Opens (or creates) a database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    /// Opens an in-memory database.
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StorageResult<Self> {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {UDT_CATALOG} (
                name TEXT PRIMARY KEY,
                definition TEXT NOT NULL
            );"
        ))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            tables: RwLock::new(HashMap::new()),
            assignments: RwLock::new(HashMap::new()),
        })
    }

    /// Creates every table and UDT in `schemas` that does not exist yet.
    ///
    /// This is the schema-creation step run ahead of the plugin; the plugin
    /// itself only probes for the objects.
    pub async fn create_schemas(&self, schemas: &SchemaSet) -> StorageResult<()> {
        let tables: Vec<String> = schemas.tables().iter().map(create_table_sql).collect();
        let udts = schemas
            .udts()
            .iter()
            .map(|udt| -> StorageResult<(String, String)> {
                Ok((udt.name.clone(), serde_json::to_string(udt)?))
            })
            .collect::<StorageResult<Vec<_>>>()?;
        let (table_count, udt_count) = (tables.len(), udts.len());
        let conn = Arc::clone(&self.conn);

        run_blocking(move || {
            let mut conn = lock(&conn)?;
            let tx = conn.transaction()?;
            for (name, definition) in &udts {
                tx.execute(
                    &format!("INSERT OR REPLACE INTO {UDT_CATALOG} (name, definition) VALUES (?1, ?2)"),
                    params![name, definition],
                )?;
            }
            for sql in &tables {
                tx.execute_batch(sql)?;
            }
            tx.commit()?;
            Ok(())
        })
        .await?;

        info!(tables = table_count, udts = udt_count, "Created schemas");
        Ok(())
    }

    /// Reads back all rows of a table as JSON objects.
    ///
    /// Rows come back partition by partition, with clustering columns in
    /// their declared order.
    pub async fn rows(&self, table: &str) -> StorageResult<Vec<Row>> {
        let schema = self
            .tables
            .read()
            .map_err(|_| poisoned())?
            .get(table)
            .cloned()
            .ok_or_else(|| StorageError::NotProvisioned(table.to_string()))?;
        let conn = Arc::clone(&self.conn);

        run_blocking(move || {
            let conn = lock(&conn)?;
            let columns: Vec<String> = schema.columns.iter().map(|c| quote(&c.name)).collect();
            let sql = format!(
                "SELECT {} FROM {} ORDER BY {}",
                columns.join(", "),
                quote(&schema.name),
                order_by_clause(&schema)
            );

            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query([])?;
            let mut out = Vec::new();
            while let Some(sql_row) = rows.next()? {
                let mut row = Row::new();
                for (i, column) in schema.columns.iter().enumerate() {
                    let value: SqlValue = sql_row.get(i)?;
                    if let Some(value) = from_sql_value(value) {
                        row.insert(column.name.clone(), value);
                    }
                }
                out.push(row);
            }
            Ok(out)
        })
        .await
    }

    /// Tables bound to a group, if the group was assigned.
    pub fn assigned_tables(&self, group: TableGroup) -> Option<Vec<String>> {
        self.assignments.read().ok()?.get(&group).cloned()
    }

    async fn upsert<T: Serialize + Sync>(&self, payload: &T, tables: &[String]) -> StorageResult<()> {
        if tables.is_empty() {
            return Ok(());
        }

        let mut statements = Vec::with_capacity(tables.len());
        {
            let registered = self.tables.read().map_err(|_| poisoned())?;
            for table in tables {
                let schema = registered
                    .get(table)
                    .ok_or_else(|| StorageError::NotProvisioned(table.clone()))?;
                let row = build_row(payload, schema)?;
                statements.push(upsert_statement(schema, &row));
            }
        }

        let conn = Arc::clone(&self.conn);
        run_blocking(move || {
            let mut conn = lock(&conn)?;
            let tx = conn.transaction()?;
            for (sql, values) in &statements {
                tx.execute(sql, params_from_iter(values.iter()))?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    async fn check_schemas_exist(&self, schemas: &SchemaSet) -> StorageResult<bool> {
        let tables: Vec<String> = schemas.table_names().map(str::to_string).collect();
        let udts: Vec<String> = schemas.udt_names().map(str::to_string).collect();
        let conn = Arc::clone(&self.conn);

        run_blocking(move || {
            let conn = lock(&conn)?;
            for table in &tables {
                let found: Option<String> = conn
                    .query_row(
                        "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                        params![table],
                        |row| row.get(0),
                    )
                    .optional()?;
                if found.is_none() {
                    debug!(table = %table, "Table missing");
                    return Ok(false);
                }
            }
            for udt in &udts {
                let found: Option<String> = conn
                    .query_row(
                        &format!("SELECT name FROM {UDT_CATALOG} WHERE name = ?1"),
                        params![udt],
                        |row| row.get(0),
                    )
                    .optional()?;
                if found.is_none() {
                    debug!(udt = %udt, "UDT missing");
                    return Ok(false);
                }
            }
            Ok(true)
        })
        .await
    }

    async fn set_table_schemas(&self, tables: &[TableSchema]) -> StorageResult<()> {
        let owned = tables.to_vec();
        let conn = Arc::clone(&self.conn);
        // Every defined column must exist in the physical table.
        let checked = run_blocking(move || {
            let conn = lock(&conn)?;
            for table in &owned {
                let mut stmt =
                    conn.prepare(&format!("SELECT name FROM pragma_table_info({})", literal(&table.name)))?;
                let existing: HashSet<String> = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<_, _>>()?;
                if existing.is_empty() {
                    return Err(StorageError::UnknownTable(table.name.clone()));
                }
                if let Some(missing) = table.columns.iter().find(|c| !existing.contains(&c.name)) {
                    return Err(StorageError::InvalidData(format!(
                        "table '{}' has no column '{}'",
                        table.name, missing.name
                    )));
                }
            }
            Ok(owned)
        })
        .await?;

        let mut registered = self.tables.write().map_err(|_| poisoned())?;
        for table in checked {
            registered.insert(table.name.clone(), table);
        }
        Ok(())
    }

    async fn set_udt_schemas(&self, udts: &[UdtSchema]) -> StorageResult<()> {
        let owned = udts.to_vec();
        let conn = Arc::clone(&self.conn);
        // Stored definitions must match what the plugin expects to write.
        run_blocking(move || {
            let conn = lock(&conn)?;
            for udt in &owned {
                let definition: Option<String> = conn
                    .query_row(
                        &format!("SELECT definition FROM {UDT_CATALOG} WHERE name = ?1"),
                        params![udt.name],
                        |row| row.get(0),
                    )
                    .optional()?;
                let Some(definition) = definition else {
                    return Err(StorageError::UnknownType(udt.name.clone()));
                };
                let stored: UdtSchema = serde_json::from_str(&definition)?;
                if stored.fields != udt.fields {
                    return Err(StorageError::InvalidData(format!(
                        "type '{}' differs from its stored definition",
                        udt.name
                    )));
                }
            }
            Ok(())
        })
        .await
    }

    async fn assign_tables(&self, group: TableGroup, tables: &[String]) -> StorageResult<()> {
        {
            let registered = self.tables.read().map_err(|_| poisoned())?;
            if let Some(missing) = tables.iter().find(|t| !registered.contains_key(*t)) {
                return Err(StorageError::NotProvisioned(missing.clone()));
            }
        }
        self.assignments
            .write()
            .map_err(|_| poisoned())?
            .insert(group, tables.to_vec());
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

// ── SQL helpers ──────────────────────────────────────────────────

fn lock(conn: &Mutex<Connection>) -> StorageResult<MutexGuard<'_, Connection>> {
    conn.lock().map_err(|_| poisoned())
}

fn poisoned() -> StorageError {
    StorageError::Backend("lock poisoned".into())
}

async fn run_blocking<T, F>(f: F) -> StorageResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> StorageResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StorageError::Backend(format!("blocking task failed: {e}")))?
}

/// Quotes an identifier.
fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quotes a string literal.
fn literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// SQLite column affinity for a backend type name.
fn affinity(data_type: &str) -> &'static str {
    let ty = data_type.trim().to_ascii_lowercase();
    match ty.as_str() {
        "int" | "bigint" | "smallint" | "tinyint" | "varint" | "counter" | "boolean" => "INTEGER",
        "float" | "double" | "decimal" => "REAL",
        "blob" => "BLOB",
        _ => "TEXT",
    }
}

fn create_table_sql(table: &TableSchema) -> String {
    let mut defs: Vec<String> = table
        .columns
        .iter()
        .map(|c| format!("{} {}", quote(&c.name), affinity(&c.data_type)))
        .collect();
    let key: Vec<String> = table.primary_key().map(quote).collect();
    defs.push(format!("PRIMARY KEY ({})", key.join(", ")));
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({});",
        quote(&table.name),
        defs.join(", ")
    )
}

/// Partition columns ascending, then clustering columns in declared order.
fn order_by_clause(table: &TableSchema) -> String {
    let partition = table.partition_key.iter().map(|c| quote(c));
    let clustering = table
        .clustering_key
        .iter()
        .map(|c| match table.clustering_order(c) {
            ClusteringOrder::Asc => quote(c),
            ClusteringOrder::Desc => format!("{} DESC", quote(c)),
        });
    partition.chain(clustering).collect::<Vec<_>>().join(", ")
}

fn upsert_statement(table: &TableSchema, row: &Row) -> (String, Vec<SqlValue>) {
    let columns: Vec<&String> = row.keys().collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    let key: Vec<&str> = table.primary_key().collect();
    let updates: Vec<String> = columns
        .iter()
        .filter(|c| !key.contains(&c.as_str()))
        .map(|c| format!("{0} = excluded.{0}", quote(c)))
        .collect();

    let conflict = if updates.is_empty() {
        "DO NOTHING".to_string()
    } else {
        format!("DO UPDATE SET {}", updates.join(", "))
    };
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) {}",
        quote(&table.name),
        columns.iter().map(|c| quote(c)).collect::<Vec<_>>().join(", "),
        placeholders.join(", "),
        key.iter().map(|c| quote(c)).collect::<Vec<_>>().join(", "),
        conflict
    );
    let values = row.values().map(to_sql_value).collect();
    (sql, values)
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn from_sql_value(value: SqlValue) -> Option<Value> {
    match value {
        SqlValue::Null => None,
        SqlValue::Integer(i) => Some(Value::from(i)),
        SqlValue::Real(f) => Some(Value::from(f)),
        SqlValue::Text(s) => Some(Value::String(s)),
        SqlValue::Blob(b) => Some(Value::from(b)),
    }
}

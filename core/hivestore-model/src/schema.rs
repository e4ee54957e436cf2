use crate::error::{ModelError, ModelResult};
use crate::group::TableGroups;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::Path;

/// A named, typed column (or UDT field).
///
/// `data_type` is the backend type name as written in the schema file
/// (e.g. `"text"`, `"timestamp"`, `"map<text, text>"`, `"frozen<params>"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: String,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }

    /// Shorthand for a `text` column.
    pub fn text(name: &str) -> Self {
        Self::new(name, "text")
    }

    /// Shorthand for a `bigint` column.
    pub fn bigint(name: &str) -> Self {
        Self::new(name, "bigint")
    }

    /// Shorthand for a `timestamp` column.
    pub fn timestamp(name: &str) -> Self {
        Self::new(name, "timestamp")
    }

    /// Shorthand for a `boolean` column.
    pub fn boolean(name: &str) -> Self {
        Self::new(name, "boolean")
    }

    /// Whether values of this column are points in time.
    pub fn is_timestamp(&self) -> bool {
        self.data_type.trim().eq_ignore_ascii_case("timestamp")
    }
}

/// Clustering order of a clustering-key column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ClusteringOrder {
    #[default]
    #[serde(alias = "asc")]
    Asc,
    #[serde(alias = "desc")]
    Desc,
}

/// Definition of one storage table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<Column>,
    /// Partition key columns, in order. Must not be empty.
    pub partition_key: Vec<String>,
    /// Clustering key columns, in order.
    pub clustering_key: Vec<String>,
    /// Explicit clustering orders; unlisted clustering columns are ascending.
    pub order: Vec<(String, ClusteringOrder)>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            partition_key: Vec::new(),
            clustering_key: Vec::new(),
            order: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_partition_key(mut self, columns: &[&str]) -> Self {
        self.partition_key = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_clustering_key(mut self, columns: &[&str]) -> Self {
        self.clustering_key = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_order(mut self, column: &str, order: ClusteringOrder) -> Self {
        self.order.push((column.to_string(), order));
        self
    }

    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Partition key followed by clustering key.
    pub fn primary_key(&self) -> impl Iterator<Item = &str> {
        self.partition_key
            .iter()
            .chain(self.clustering_key.iter())
            .map(String::as_str)
    }

    /// Clustering order for a clustering column.
    pub fn clustering_order(&self, column: &str) -> ClusteringOrder {
        self.order
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, o)| *o)
            .unwrap_or_default()
    }

    /// Checks that keys reference defined columns and the partition key is present.
    pub fn validate(&self) -> ModelResult<()> {
        let invalid = |reason: String| ModelError::InvalidSchema {
            name: self.name.clone(),
            reason,
        };

        if self.columns.is_empty() {
            return Err(invalid("table has no columns".into()));
        }
        if self.partition_key.is_empty() {
            return Err(invalid("partition key is empty".into()));
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(invalid(format!("column '{}' defined twice", column.name)));
            }
        }
        for key in self.primary_key() {
            if self.column(key).is_none() {
                return Err(invalid(format!("key column '{key}' is not defined")));
            }
        }
        for (column, _) in &self.order {
            if !self.clustering_key.contains(column) {
                return Err(invalid(format!(
                    "order given for '{column}', which is not a clustering column"
                )));
            }
        }
        Ok(())
    }
}

/// Definition of a user-defined type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UdtSchema {
    pub name: String,
    pub fields: Vec<Column>,
}

impl UdtSchema {
    pub fn new(name: impl Into<String>, fields: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }
}

/// All schema objects required by the plugin. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaSet {
    tables: Vec<TableSchema>,
    udts: Vec<UdtSchema>,
}

impl SchemaSet {
    /// Builds a schema set, validating every table and rejecting duplicate names.
    pub fn new(tables: Vec<TableSchema>, udts: Vec<UdtSchema>) -> ModelResult<Self> {
        let mut names = HashSet::new();
        for table in &tables {
            table.validate()?;
            if !names.insert(table.name.as_str()) {
                return Err(ModelError::DuplicateName(table.name.clone()));
            }
        }
        let mut udt_names = HashSet::new();
        for udt in &udts {
            if udt.fields.is_empty() {
                return Err(ModelError::InvalidSchema {
                    name: udt.name.clone(),
                    reason: "type has no fields".into(),
                });
            }
            if !udt_names.insert(udt.name.as_str()) {
                return Err(ModelError::DuplicateName(udt.name.clone()));
            }
        }
        Ok(Self { tables, udts })
    }

    pub fn tables(&self) -> &[TableSchema] {
        &self.tables
    }

    pub fn udts(&self) -> &[UdtSchema] {
        &self.udts
    }

    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.table(name).is_some()
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name.as_str())
    }

    pub fn udt_names(&self) -> impl Iterator<Item = &str> {
        self.udts.iter().map(|u| u.name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.udts.is_empty()
    }
}

// ── Schema file ──────────────────────────────────────────────────

/// Parsed contents of a schema file: the schema set plus the table groups.
///
/// ```json
/// {
///   "tables": {
///     "commands": {
///       "fields": { "device_id": "text", "id": "bigint", "command": "text" },
///       "primaryKey": ["device_id"],
///       "clusteredKey": ["id"],
///       "order": { "id": "DESC" }
///     }
///   },
///   "udts": { "params": { "key": "text", "value": "text" } },
///   "commandTables": ["commands"],
///   "notificationTables": [],
///   "commandUpdatesTables": []
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaFile {
    pub schemas: SchemaSet,
    pub groups: TableGroups,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSchemaFile {
    #[serde(default)]
    tables: Map<String, Value>,
    #[serde(default)]
    udts: Map<String, Value>,
    #[serde(flatten)]
    groups: TableGroups,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTable {
    fields: Map<String, Value>,
    #[serde(alias = "partitionKey")]
    primary_key: Vec<String>,
    #[serde(default, alias = "clusteringKey")]
    clustered_key: Vec<String>,
    #[serde(default)]
    order: Map<String, Value>,
}

impl SchemaFile {
    /// Parses a schema file from JSON text.
    pub fn from_json(text: &str) -> ModelResult<Self> {
        let raw: RawSchemaFile = serde_json::from_str(text)?;

        let mut tables = Vec::with_capacity(raw.tables.len());
        for (name, value) in raw.tables {
            let table: RawTable = serde_json::from_value(value)?;
            let columns = parse_columns(&name, table.fields)?;
            let mut order = Vec::with_capacity(table.order.len());
            for (column, value) in table.order {
                order.push((column, serde_json::from_value(value)?));
            }
            tables.push(TableSchema {
                name,
                columns,
                partition_key: table.primary_key,
                clustering_key: table.clustered_key,
                order,
            });
        }

        let mut udts = Vec::with_capacity(raw.udts.len());
        for (name, value) in raw.udts {
            let fields = match value {
                Value::Object(fields) => parse_columns(&name, fields)?,
                _ => {
                    return Err(ModelError::InvalidSchema {
                        name,
                        reason: "type definition must be an object".into(),
                    })
                }
            };
            udts.push(UdtSchema { name, fields });
        }

        Ok(Self {
            schemas: SchemaSet::new(tables, udts)?,
            groups: raw.groups,
        })
    }

    /// Reads and parses a schema file.
    pub fn load(path: &Path) -> ModelResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

fn parse_columns(owner: &str, fields: Map<String, Value>) -> ModelResult<Vec<Column>> {
    fields
        .into_iter()
        .map(|(name, ty)| match ty {
            Value::String(data_type) => Ok(Column { name, data_type }),
            other => Err(ModelError::InvalidSchema {
                name: owner.to_string(),
                reason: format!("type of '{name}' must be a string, got {other}"),
            }),
        })
        .collect()
}

//! Payload-to-row mapping shared by all backends.

use crate::error::{StorageError, StorageResult};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use hivestore_model::TableSchema;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// A row to be written: column name to value. Null values are never present.
pub type Row = BTreeMap<String, Value>;

/// Builds the row a payload produces for one table.
///
/// Payload keys are converted to snake_case and matched against the table's
/// columns; fields without a matching column are dropped. Timestamp columns
/// are normalized to RFC 3339 UTC. Every primary-key column must end up with
/// a value.
pub fn build_row<T: Serialize>(payload: &T, table: &TableSchema) -> StorageResult<Row> {
    let fields = match serde_json::to_value(payload)? {
        Value::Object(fields) => fields,
        other => {
            return Err(StorageError::InvalidData(format!(
                "payload for table '{}' is not an object: {other}",
                table.name
            )))
        }
    };

    let mut row = Row::new();
    for (key, value) in fields {
        if value.is_null() {
            continue;
        }
        let name = to_snake_case(&key);
        let Some(column) = table.column(&name) else {
            continue;
        };
        let value = if column.is_timestamp() {
            normalize_timestamp(&value)?
        } else {
            value
        };
        row.insert(name, value);
    }

    for key in table.primary_key() {
        if !row.contains_key(key) {
            return Err(StorageError::MissingKey {
                table: table.name.clone(),
                column: key.to_string(),
            });
        }
    }

    Ok(row)
}

/// Converts a camelCase field name to a snake_case column name.
/// Names that are already snake_case are returned unchanged.
pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 && !out.ends_with('_') {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Normalizes a timestamp value to an RFC 3339 UTC string with millisecond precision.
///
/// Accepts RFC 3339 strings, zone-less `YYYY-MM-DDTHH:MM:SS[.fff]` strings
/// (interpreted as UTC) and integer epoch milliseconds.
pub fn normalize_timestamp(value: &Value) -> StorageResult<Value> {
    let parsed: DateTime<Utc> = match value {
        Value::String(s) => parse_timestamp_str(s)
            .ok_or_else(|| StorageError::InvalidData(format!("invalid timestamp: {s}")))?,
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .ok_or_else(|| StorageError::InvalidData(format!("invalid timestamp: {n}")))?,
        other => {
            return Err(StorageError::InvalidData(format!(
                "invalid timestamp: {other}"
            )))
        }
    };
    Ok(Value::String(
        parsed.to_rfc3339_opts(SecondsFormat::Millis, true),
    ))
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hivestore_model::Column;
    use hivestore_types::{CommandPayload, NotificationPayload};
    use serde_json::json;

    fn commands_table() -> TableSchema {
        TableSchema::new("commands")
            .with_column(Column::text("device_id"))
            .with_column(Column::bigint("id"))
            .with_column(Column::text("command"))
            .with_column(Column::timestamp("timestamp"))
            .with_column(Column::text("parameters"))
            .with_partition_key(&["device_id"])
            .with_clustering_key(&["id"])
    }

    #[test]
    fn snake_case_conversion() {
        assert_eq!(to_snake_case("deviceId"), "device_id");
        assert_eq!(to_snake_case("deviceTypeId"), "device_type_id");
        assert_eq!(to_snake_case("command"), "command");
        assert_eq!(to_snake_case("device_id"), "device_id");
        assert_eq!(to_snake_case("isUpdated"), "is_updated");
    }

    #[test]
    fn row_keeps_only_schema_columns() {
        let cmd = CommandPayload::new("dev-1", "reboot")
            .with_id(5)
            .with_status("done")
            .with_parameters(json!({"delay": 3}));
        let row = build_row(&cmd, &commands_table()).unwrap();

        assert_eq!(row.get("device_id"), Some(&json!("dev-1")));
        assert_eq!(row.get("id"), Some(&json!(5)));
        assert_eq!(row.get("command"), Some(&json!("reboot")));
        assert_eq!(row.get("parameters"), Some(&json!({"delay": 3})));
        assert!(!row.contains_key("status"));
        assert!(!row.contains_key("is_updated"));
    }

    #[test]
    fn row_requires_primary_key() {
        // `id` is a clustering column and the command has none
        let cmd = CommandPayload::new("dev-1", "reboot");
        match build_row(&cmd, &commands_table()) {
            Err(StorageError::MissingKey { table, column }) => {
                assert_eq!(table, "commands");
                assert_eq!(column, "id");
            }
            other => panic!("Expected MissingKey, got {other:?}"),
        }
    }

    #[test]
    fn row_normalizes_timestamps() {
        let cmd = CommandPayload::new("dev-1", "reboot")
            .with_id(1)
            .with_timestamp("2024-03-01T10:00:00.5");
        let row = build_row(&cmd, &commands_table()).unwrap();
        assert_eq!(row.get("timestamp"), Some(&json!("2024-03-01T10:00:00.500Z")));
    }

    #[test]
    fn row_rejects_bad_timestamp() {
        let cmd = CommandPayload::new("dev-1", "reboot")
            .with_id(1)
            .with_timestamp("yesterday");
        assert!(matches!(
            build_row(&cmd, &commands_table()),
            Err(StorageError::InvalidData(_))
        ));
    }

    #[test]
    fn row_includes_extra_fields_with_matching_column() {
        let table = TableSchema::new("notifications")
            .with_column(Column::text("device_id"))
            .with_column(Column::text("notification"))
            .with_column(Column::text("source_ip"))
            .with_partition_key(&["device_id"]);
        let mut n = NotificationPayload::new("dev-1", "temperature");
        n.extra.insert("sourceIp".into(), json!("10.0.0.1"));

        let row = build_row(&n, &table).unwrap();
        assert_eq!(row.get("source_ip"), Some(&json!("10.0.0.1")));
    }

    #[test]
    fn timestamp_formats() {
        assert_eq!(
            normalize_timestamp(&json!("2024-03-01T12:00:00+02:00")).unwrap(),
            json!("2024-03-01T10:00:00.000Z")
        );
        assert_eq!(
            normalize_timestamp(&json!(0)).unwrap(),
            json!("1970-01-01T00:00:00.000Z")
        );
        assert!(normalize_timestamp(&json!(true)).is_err());
    }
}

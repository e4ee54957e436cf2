use hivestore_model::{Column, SchemaSet, TableSchema, UdtSchema};

pub fn commands_table() -> TableSchema {
    TableSchema::new("commands")
        .with_column(Column::text("device_id"))
        .with_column(Column::bigint("id"))
        .with_column(Column::text("command"))
        .with_column(Column::timestamp("timestamp"))
        .with_column(Column::text("status"))
        .with_column(Column::text("parameters"))
        .with_partition_key(&["device_id"])
        .with_clustering_key(&["id"])
}

pub fn notifications_table() -> TableSchema {
    TableSchema::new("notifications")
        .with_column(Column::text("device_id"))
        .with_column(Column::bigint("id"))
        .with_column(Column::text("notification"))
        .with_column(Column::timestamp("timestamp"))
        .with_partition_key(&["device_id"])
        .with_clustering_key(&["id"])
}

pub fn params_udt() -> UdtSchema {
    UdtSchema::new("params", vec![Column::text("key"), Column::text("value")])
}

pub fn schema_set() -> SchemaSet {
    SchemaSet::new(
        vec![commands_table(), notifications_table()],
        vec![params_udt()],
    )
    .unwrap()
}

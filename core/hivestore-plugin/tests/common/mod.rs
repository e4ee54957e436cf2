#![allow(dead_code)]

use async_trait::async_trait;
use hivestore_model::{Column, SchemaSet, TableGroups, TableSchema, UdtSchema};
use hivestore_plugin::{PluginConfig, StoragePlugin, Terminator, Timer};
use hivestore_storage::StorageBackend;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records requested sleeps without waiting.
#[derive(Default)]
pub struct RecordingTimer {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingTimer {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Timer for RecordingTimer {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

/// Records termination requests instead of exiting.
#[derive(Default)]
pub struct RecordingTerminator {
    codes: Mutex<Vec<i32>>,
}

impl RecordingTerminator {
    pub fn codes(&self) -> Vec<i32> {
        self.codes.lock().unwrap().clone()
    }
}

impl Terminator for RecordingTerminator {
    fn terminate(&self, code: i32) {
        self.codes.lock().unwrap().push(code);
    }
}

pub fn commands_table(name: &str) -> TableSchema {
    TableSchema::new(name)
        .with_column(Column::text("device_id"))
        .with_column(Column::bigint("id"))
        .with_column(Column::text("command"))
        .with_column(Column::timestamp("timestamp"))
        .with_column(Column::text("status"))
        .with_column(Column::text("result"))
        .with_partition_key(&["device_id"])
        .with_clustering_key(&["id"])
}

pub fn notifications_table() -> TableSchema {
    TableSchema::new("notifications")
        .with_column(Column::text("device_id"))
        .with_column(Column::bigint("id"))
        .with_column(Column::text("notification"))
        .with_column(Column::timestamp("timestamp"))
        .with_column(Column::text("parameters"))
        .with_partition_key(&["device_id"])
        .with_clustering_key(&["id"])
}

pub fn schema_set() -> SchemaSet {
    SchemaSet::new(
        vec![
            commands_table("commands"),
            commands_table("commands_by_user"),
            notifications_table(),
            commands_table("command_updates"),
        ],
        vec![UdtSchema::new(
            "params",
            vec![Column::text("key"), Column::text("value")],
        )],
    )
    .unwrap()
}

pub fn table_groups() -> TableGroups {
    TableGroups {
        commands: vec!["commands".into(), "commands_by_user".into()],
        notifications: vec!["notifications".into()],
        command_updates: vec!["command_updates".into()],
    }
}

pub fn fast_config(checks: u32) -> PluginConfig {
    PluginConfig::default().with_schema_checks(checks, Duration::from_millis(50))
}

pub struct Harness<B: ?Sized> {
    pub plugin: StoragePlugin<B>,
    pub backend: Arc<B>,
    pub timer: Arc<RecordingTimer>,
    pub terminator: Arc<RecordingTerminator>,
}

pub fn harness<B: StorageBackend + 'static>(backend: B, config: PluginConfig) -> Harness<B> {
    let backend = Arc::new(backend);
    let timer = Arc::new(RecordingTimer::default());
    let terminator = Arc::new(RecordingTerminator::default());
    let plugin = StoragePlugin::new(Arc::clone(&backend), schema_set(), table_groups(), config)
        .unwrap()
        .with_timer(timer.clone())
        .with_terminator(terminator.clone());
    Harness {
        plugin,
        backend,
        timer,
        terminator,
    }
}

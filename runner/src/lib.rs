//! Process glue for the hivestore storage plugin: configuration loading,
//! backend setup and the line-delimited JSON message transport.

use anyhow::{Context, Result};
use hivestore_model::SchemaFile;
use hivestore_plugin::{HivestoreConfig, StoragePlugin};
use hivestore_storage::{SqliteBackend, StorageBackend};
use hivestore_types::PluginMessage;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

/// Counters for one transport run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineStats {
    /// Lines that decoded and were stored.
    pub stored: u64,
    /// Lines that could not be decoded, classified or stored.
    pub failed: u64,
    /// Blank lines.
    pub skipped: u64,
}

/// Loads the config file, applies environment overrides and validates it.
pub fn load_config(path: &Path) -> Result<HivestoreConfig> {
    let config = HivestoreConfig::load(path)
        .with_context(|| format!("Failed to load config {}", path.display()))?
        .with_env_overrides(|key| std::env::var(key).ok())
        .context("Invalid environment override")?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

pub fn load_schema_file(config: &HivestoreConfig) -> Result<SchemaFile> {
    let path = &config.storage.schema_file;
    SchemaFile::load(path).with_context(|| format!("Failed to load schema file {}", path.display()))
}

/// Opens the SQLite database named in the config.
pub fn open_backend(config: &HivestoreConfig) -> Result<SqliteBackend> {
    let backend = if config.storage.is_in_memory() {
        SqliteBackend::open_in_memory()
    } else {
        SqliteBackend::open(Path::new(&config.storage.path))
    };
    backend.with_context(|| format!("Failed to open storage at {}", config.storage.path))
}

/// Creates every table and UDT of the schema file.
pub async fn create_schema(backend: &SqliteBackend, schema: &SchemaFile) -> Result<()> {
    backend
        .create_schemas(&schema.schemas)
        .await
        .context("Failed to create schemas")
}

/// Builds a plugin over `backend` from a loaded config and schema file.
pub fn build_plugin<B: StorageBackend + ?Sized>(
    backend: Arc<B>,
    config: &HivestoreConfig,
    schema: SchemaFile,
) -> Result<StoragePlugin<B>> {
    StoragePlugin::new(backend, schema.schemas, schema.groups, config.plugin.clone())
        .context("Failed to create storage plugin")
}

/// Reads one JSON envelope per line and hands each to the plugin.
///
/// Per-message failures are logged and counted; only a read error on the
/// underlying stream aborts the run.
pub async fn process_lines<R, B>(plugin: &StoragePlugin<B>, reader: R) -> Result<LineStats>
where
    R: AsyncBufRead + Unpin,
    B: StorageBackend + ?Sized,
{
    let mut stats = LineStats::default();
    let mut lines = reader.lines();
    let mut line_no: u64 = 0;

    while let Some(line) = lines.next_line().await.context("Failed to read message stream")? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            stats.skipped += 1;
            continue;
        }

        let message = match PluginMessage::from_json(line) {
            Ok(message) => message,
            Err(e) => {
                warn!(line = line_no, error = %e, "Malformed message");
                stats.failed += 1;
                continue;
            }
        };

        match plugin.handle_message(&message).await {
            Ok(outcome) => {
                debug!(line = line_no, writes = ?outcome.writes, "Message handled");
                stats.stored += 1;
            }
            Err(e) => {
                warn!(line = line_no, error = %e, "Failed to handle message");
                stats.failed += 1;
            }
        }
    }

    info!(
        stored = stats.stored,
        failed = stats.failed,
        skipped = stats.skipped,
        "Message stream closed"
    );
    Ok(stats)
}

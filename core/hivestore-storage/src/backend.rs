//! Storage backend abstraction.
//!
//! Defines the capability the plugin needs from a column-family store,
//! allowing the readiness and dispatch logic to work with any backend.

use crate::error::StorageResult;
use async_trait::async_trait;
use hivestore_model::{SchemaSet, TableGroup, TableSchema, UdtSchema};
use hivestore_types::{CommandPayload, NotificationPayload};

/// A column-family store the plugin persists device traffic into.
///
/// Provisioning calls (`set_*`, `assign_tables`) happen once, after the
/// schema probe succeeds. Insert calls each perform one write per target
/// table; backends do not batch, retry or deduplicate across calls.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Returns whether every table and UDT in `schemas` exists.
    async fn check_schemas_exist(&self, schemas: &SchemaSet) -> StorageResult<bool>;

    /// Registers table definitions used to map payloads to rows.
    async fn set_table_schemas(&self, tables: &[TableSchema]) -> StorageResult<()>;

    /// Registers user-defined type definitions.
    async fn set_udt_schemas(&self, udts: &[UdtSchema]) -> StorageResult<()>;

    /// Binds a message group to its physical tables.
    async fn assign_tables(&self, group: TableGroup, tables: &[String]) -> StorageResult<()>;

    /// Writes a command into each of `tables`.
    async fn insert_command(&self, command: &CommandPayload, tables: &[String])
        -> StorageResult<()>;

    /// Writes a command update into each of `tables`.
    async fn insert_command_update(
        &self,
        command: &CommandPayload,
        tables: &[String],
    ) -> StorageResult<()>;

    /// Writes a notification into each of `tables`.
    async fn insert_notification(
        &self,
        notification: &NotificationPayload,
        tables: &[String],
    ) -> StorageResult<()>;
}

//! A recording backend for testing.
//!
//! Every trait call is appended to a call log. Schema probes answer from a
//! script (falling back to a default answer once the script runs out) and
//! inserts can be made to fail.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use hivestore_model::{SchemaSet, TableGroup, TableSchema, UdtSchema};
use hivestore_types::{CommandPayload, NotificationPayload};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// A single recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    CheckSchemas,
    SetTableSchemas(Vec<String>),
    SetUdtSchemas(Vec<String>),
    AssignTables(TableGroup, Vec<String>),
    InsertCommand { device_id: String, tables: Vec<String> },
    InsertCommandUpdate { device_id: String, tables: Vec<String> },
    InsertNotification { device_id: String, tables: Vec<String> },
}

/// Backend that records calls instead of storing anything.
#[derive(Debug)]
pub struct RecordingBackend {
    probe_script: Mutex<VecDeque<bool>>,
    probe_default: bool,
    insert_failure: Option<String>,
    calls: Mutex<Vec<BackendCall>>,
}

impl RecordingBackend {
    /// A backend whose schemas always exist.
    pub fn ready() -> Self {
        Self::with_probe_answers([], true)
    }

    /// A backend whose schemas never appear.
    pub fn never_ready() -> Self {
        Self::with_probe_answers([], false)
    }

    /// A backend whose schemas appear on the `n`-th probe (1-based).
    pub fn ready_after(n: usize) -> Self {
        Self::with_probe_answers(std::iter::repeat_n(false, n.saturating_sub(1)), true)
    }

    /// A backend answering probes from `answers`, then with `default`.
    pub fn with_probe_answers(answers: impl IntoIterator<Item = bool>, default: bool) -> Self {
        Self {
            probe_script: Mutex::new(answers.into_iter().collect()),
            probe_default: default,
            insert_failure: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Makes every insert call fail with `StorageError::Backend(message)`.
    pub fn failing_inserts(mut self, message: impl Into<String>) -> Self {
        self.insert_failure = Some(message.into());
        self
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<BackendCall> {
        guard(&self.calls).clone()
    }

    /// Number of recorded calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&BackendCall) -> bool) -> usize {
        guard(&self.calls).iter().filter(|c| pred(c)).count()
    }

    pub fn probe_count(&self) -> usize {
        self.count(|c| matches!(c, BackendCall::CheckSchemas))
    }

    pub fn set_table_schemas_count(&self) -> usize {
        self.count(|c| matches!(c, BackendCall::SetTableSchemas(_)))
    }

    pub fn set_udt_schemas_count(&self) -> usize {
        self.count(|c| matches!(c, BackendCall::SetUdtSchemas(_)))
    }

    pub fn assign_count(&self, group: TableGroup) -> usize {
        self.count(|c| matches!(c, BackendCall::AssignTables(g, _) if *g == group))
    }

    pub fn insert_command_count(&self) -> usize {
        self.count(|c| matches!(c, BackendCall::InsertCommand { .. }))
    }

    pub fn insert_command_update_count(&self) -> usize {
        self.count(|c| matches!(c, BackendCall::InsertCommandUpdate { .. }))
    }

    pub fn insert_notification_count(&self) -> usize {
        self.count(|c| matches!(c, BackendCall::InsertNotification { .. }))
    }

    fn record(&self, call: BackendCall) {
        guard(&self.calls).push(call);
    }

    fn insert_result(&self) -> StorageResult<()> {
        match &self.insert_failure {
            Some(message) => Err(StorageError::Backend(message.clone())),
            None => Ok(()),
        }
    }
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl StorageBackend for RecordingBackend {
    async fn check_schemas_exist(&self, _schemas: &SchemaSet) -> StorageResult<bool> {
        self.record(BackendCall::CheckSchemas);
        Ok(guard(&self.probe_script)
            .pop_front()
            .unwrap_or(self.probe_default))
    }

    async fn set_table_schemas(&self, tables: &[TableSchema]) -> StorageResult<()> {
        self.record(BackendCall::SetTableSchemas(
            tables.iter().map(|t| t.name.clone()).collect(),
        ));
        Ok(())
    }

    async fn set_udt_schemas(&self, udts: &[UdtSchema]) -> StorageResult<()> {
        self.record(BackendCall::SetUdtSchemas(
            udts.iter().map(|u| u.name.clone()).collect(),
        ));
        Ok(())
    }

    async fn assign_tables(&self, group: TableGroup, tables: &[String]) -> StorageResult<()> {
        self.record(BackendCall::AssignTables(group, tables.to_vec()));
        Ok(())
    }

    async fn insert_command(&self, command: &CommandPayload, tables: &[String]) -> StorageResult<()> {
        self.record(BackendCall::InsertCommand {
            device_id: command.device_id.clone(),
            tables: tables.to_vec(),
        });
        self.insert_result()
    }

    async fn insert_command_update(
        &self,
        command: &CommandPayload,
        tables: &[String],
    ) -> StorageResult<()> {
        self.record(BackendCall::InsertCommandUpdate {
            device_id: command.device_id.clone(),
            tables: tables.to_vec(),
        });
        self.insert_result()
    }

    async fn insert_notification(
        &self,
        notification: &NotificationPayload,
        tables: &[String],
    ) -> StorageResult<()> {
        self.record(BackendCall::InsertNotification {
            device_id: notification.device_id.clone(),
            tables: tables.to_vec(),
        });
        self.insert_result()
    }
}

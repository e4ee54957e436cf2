//! Routes classified messages to backend writes.

use crate::config::PluginConfig;
use crate::error::PluginResult;
use hivestore_model::{TableAssignment, TableGroup};
use hivestore_storage::StorageBackend;
use hivestore_types::{Message, PluginMessage};
use std::sync::Arc;
use tracing::debug;

/// Table groups written for one message, in write order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub writes: Vec<TableGroup>,
}

impl DispatchOutcome {
    pub fn wrote(&self, group: TableGroup) -> bool {
        self.writes.contains(&group)
    }
}

/// Stateless message router. Safe to share across tasks.
pub struct Dispatcher<B: ?Sized> {
    backend: Arc<B>,
    assignment: Arc<TableAssignment>,
    command_updates_storing: bool,
}

impl<B: StorageBackend + ?Sized> Dispatcher<B> {
    pub fn new(backend: Arc<B>, assignment: Arc<TableAssignment>, config: &PluginConfig) -> Self {
        Self {
            backend,
            assignment,
            command_updates_storing: config.command_updates_storing,
        }
    }

    pub fn assignment(&self) -> &TableAssignment {
        &self.assignment
    }

    /// Classifies a raw message and dispatches it.
    pub async fn dispatch_raw(&self, message: &PluginMessage) -> PluginResult<DispatchOutcome> {
        let message = message.classify()?;
        self.dispatch(&message).await
    }

    /// Writes a message to the tables of its group.
    ///
    /// A command is always written to the commands tables. When it is marked
    /// updated and command-update storing is enabled, it is then written to
    /// the commandUpdates tables as well. The second write is skipped if the
    /// first one fails.
    pub async fn dispatch(&self, message: &Message) -> PluginResult<DispatchOutcome> {
        let mut outcome = DispatchOutcome::default();
        match message {
            Message::Command(command) => {
                self.backend
                    .insert_command(command, self.assignment.commands())
                    .await?;
                outcome.writes.push(TableGroup::Commands);

                if command.is_updated {
                    if self.command_updates_storing {
                        self.backend
                            .insert_command_update(command, self.assignment.command_updates())
                            .await?;
                        outcome.writes.push(TableGroup::CommandUpdates);
                    } else {
                        debug!(
                            device_id = %command.device_id,
                            "Command update storing disabled, skipping update tables"
                        );
                    }
                }
            }
            Message::Notification(notification) => {
                self.backend
                    .insert_notification(notification, self.assignment.notifications())
                    .await?;
                outcome.writes.push(TableGroup::Notifications);
            }
        }
        debug!(
            kind = %message.kind(),
            device_id = message.device_id(),
            writes = outcome.writes.len(),
            "Message stored"
        );
        Ok(outcome)
    }
}

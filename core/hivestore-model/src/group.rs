use crate::error::{ModelError, ModelResult};
use crate::schema::SchemaSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical message category that maps to one or more physical tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableGroup {
    Commands,
    Notifications,
    CommandUpdates,
}

impl TableGroup {
    /// All groups, in provisioning order.
    pub const ALL: [TableGroup; 3] = [
        TableGroup::Commands,
        TableGroup::Notifications,
        TableGroup::CommandUpdates,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Commands => "commands",
            Self::Notifications => "notifications",
            Self::CommandUpdates => "commandUpdates",
        }
    }
}

impl fmt::Display for TableGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configured table names per group, as written in the schema file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableGroups {
    #[serde(rename = "commandTables", default)]
    pub commands: Vec<String>,
    #[serde(rename = "notificationTables", default)]
    pub notifications: Vec<String>,
    #[serde(rename = "commandUpdatesTables", default)]
    pub command_updates: Vec<String>,
}

impl TableGroups {
    pub fn tables(&self, group: TableGroup) -> &[String] {
        match group {
            TableGroup::Commands => &self.commands,
            TableGroup::Notifications => &self.notifications,
            TableGroup::CommandUpdates => &self.command_updates,
        }
    }
}

/// Group-to-table routing built once during provisioning.
///
/// Every table named here is defined in the [`SchemaSet`] it was resolved
/// against. Read-only after construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableAssignment {
    commands: Vec<String>,
    notifications: Vec<String>,
    command_updates: Vec<String>,
}

impl TableAssignment {
    /// Resolves configured groups against the schema set.
    ///
    /// Fails if a group names a table the schema set does not define.
    /// Duplicate names within a group are collapsed (first occurrence wins).
    pub fn resolve(groups: &TableGroups, schemas: &SchemaSet) -> ModelResult<Self> {
        let resolve_group = |group: TableGroup| -> ModelResult<Vec<String>> {
            let mut resolved: Vec<String> = Vec::new();
            for table in groups.tables(group) {
                if !schemas.contains_table(table) {
                    return Err(ModelError::UnknownTable {
                        group: group.to_string(),
                        table: table.clone(),
                    });
                }
                if !resolved.contains(table) {
                    resolved.push(table.clone());
                }
            }
            Ok(resolved)
        };

        Ok(Self {
            commands: resolve_group(TableGroup::Commands)?,
            notifications: resolve_group(TableGroup::Notifications)?,
            command_updates: resolve_group(TableGroup::CommandUpdates)?,
        })
    }

    /// Physical tables assigned to a group.
    pub fn tables(&self, group: TableGroup) -> &[String] {
        match group {
            TableGroup::Commands => &self.commands,
            TableGroup::Notifications => &self.notifications,
            TableGroup::CommandUpdates => &self.command_updates,
        }
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn notifications(&self) -> &[String] {
        &self.notifications
    }

    pub fn command_updates(&self) -> &[String] {
        &self.command_updates
    }
}

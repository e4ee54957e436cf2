//! Device command and notification payloads.
//!
//! Field names follow the wire format (camelCase). Fields the plugin does not
//! know about are kept in `extra` so they can still reach storage columns.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A command sent to a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandPayload {
    /// Server-assigned command identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Command name.
    pub command: String,

    /// Target device.
    pub device_id: String,

    /// Creation time (RFC 3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    /// Time of the last status/result update (RFC 3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_id: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type_id: Option<i64>,

    /// Free-form command parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,

    /// Command lifetime in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifetime: Option<i64>,

    /// Execution status reported by the device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Execution result reported by the device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Whether this message updates a previously issued command.
    /// Absent on the wire means `false`.
    #[serde(default)]
    pub is_updated: bool,

    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CommandPayload {
    /// Creates a command for a device.
    pub fn new(device_id: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            id: None,
            command: command.into(),
            device_id: device_id.into(),
            timestamp: None,
            last_updated: None,
            user_id: None,
            network_id: None,
            device_type_id: None,
            parameters: None,
            lifetime: None,
            status: None,
            result: None,
            is_updated: false,
            extra: Map::new(),
        }
    }

    /// Marks the command as an update of an earlier command.
    pub fn updated(mut self) -> Self {
        self.is_updated = true;
        self
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }
}

/// A notification emitted by a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Notification name.
    pub notification: String,

    /// Source device.
    pub device_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_id: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type_id: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NotificationPayload {
    /// Creates a notification from a device.
    pub fn new(device_id: impl Into<String>, notification: impl Into<String>) -> Self {
        Self {
            id: None,
            notification: notification.into(),
            device_id: device_id.into(),
            timestamp: None,
            network_id: None,
            device_type_id: None,
            parameters: None,
            extra: Map::new(),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = Some(parameters);
        self
    }
}

//! Message envelope and classification.

use crate::payload::{CommandPayload, NotificationPayload};
use crate::{ClassificationError, ClassificationResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

const COMMAND_KEY: &str = "command";
const NOTIFICATION_KEY: &str = "notification";

/// Raw envelope as delivered by the message transport.
///
/// `a` is the transport action (e.g. `"command/insert"`), `b` the body.
/// The body is kept untyped until [`PluginMessage::classify`] is called.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginMessage {
    #[serde(rename = "a", default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    #[serde(rename = "b", default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl PluginMessage {
    /// Wraps an arbitrary body.
    pub fn new(body: Value) -> Self {
        Self {
            action: None,
            body: Some(body),
        }
    }

    /// Builds an envelope carrying a command.
    pub fn command(payload: CommandPayload) -> ClassificationResult<Self> {
        let action = if payload.is_updated {
            "command/update"
        } else {
            "command/insert"
        };
        let mut body = serde_json::Map::new();
        body.insert(COMMAND_KEY.to_string(), serde_json::to_value(&payload)?);
        Ok(Self {
            action: Some(action.to_string()),
            body: Some(Value::Object(body)),
        })
    }

    /// Builds an envelope carrying a notification.
    pub fn notification(payload: NotificationPayload) -> ClassificationResult<Self> {
        let mut body = serde_json::Map::new();
        body.insert(NOTIFICATION_KEY.to_string(), serde_json::to_value(&payload)?);
        Ok(Self {
            action: Some("notification/insert".to_string()),
            body: Some(Value::Object(body)),
        })
    }

    /// Sets the transport action.
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Decodes an envelope from JSON text.
    pub fn from_json(text: &str) -> ClassificationResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Determines which message this envelope carries.
    ///
    /// Exactly one of `command` / `notification` must be present (and
    /// non-null) in the body.
    pub fn classify(&self) -> ClassificationResult<Message> {
        let body = match &self.body {
            Some(Value::Object(map)) => map,
            _ => return Err(ClassificationError::MissingBody),
        };

        let command = body.get(COMMAND_KEY).filter(|v| !v.is_null());
        let notification = body.get(NOTIFICATION_KEY).filter(|v| !v.is_null());

        match (command, notification) {
            (Some(_), Some(_)) => Err(ClassificationError::Ambiguous),
            (Some(cmd), None) => Ok(Message::Command(CommandPayload::deserialize(cmd)?)),
            (None, Some(n)) => Ok(Message::Notification(NotificationPayload::deserialize(n)?)),
            (None, None) => Err(ClassificationError::Unrecognized {
                keys: body.keys().cloned().collect(),
            }),
        }
    }
}

/// A classified inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Command(CommandPayload),
    Notification(NotificationPayload),
}

impl Message {
    /// The message category.
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Command(cmd) if cmd.is_updated => MessageKind::CommandUpdate,
            Self::Command(_) => MessageKind::Command,
            Self::Notification(_) => MessageKind::Notification,
        }
    }

    /// The device this message concerns.
    pub fn device_id(&self) -> &str {
        match self {
            Self::Command(cmd) => &cmd.device_id,
            Self::Notification(n) => &n.device_id,
        }
    }
}

impl From<CommandPayload> for Message {
    fn from(payload: CommandPayload) -> Self {
        Self::Command(payload)
    }
}

impl From<NotificationPayload> for Message {
    fn from(payload: NotificationPayload) -> Self {
        Self::Notification(payload)
    }
}

/// Category of a classified message, used for logging and routing decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Command,
    CommandUpdate,
    Notification,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Command => "command",
            Self::CommandUpdate => "command-update",
            Self::Notification => "notification",
        };
        f.write_str(name)
    }
}

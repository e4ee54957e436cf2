//! Inbound message types for the hivestore storage plugin.
//!
//! The plugin receives device traffic wrapped in a small envelope
//! (`PluginMessage`). Each envelope carries exactly one of:
//! - a device command (optionally flagged as an update of an earlier command)
//! - a device notification
//!
//! Classification turns an envelope into a typed `Message`. Anything that is
//! not exactly one of the two shapes is reported as a `ClassificationError`.

mod message;
mod payload;

pub use message::{Message, MessageKind, PluginMessage};
pub use payload::{CommandPayload, NotificationPayload};

/// Result type for message classification.
pub type ClassificationResult<T> = std::result::Result<T, ClassificationError>;

/// Errors raised while classifying an inbound envelope.
#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    /// The envelope has no body object.
    #[error("message has no body")]
    MissingBody,

    /// The body carries neither a command nor a notification.
    #[error("message body is neither a command nor a notification (keys: {keys:?})")]
    Unrecognized { keys: Vec<String> },

    /// The body carries both a command and a notification.
    #[error("message body carries both a command and a notification")]
    Ambiguous,

    /// The envelope or its payload could not be decoded.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

//! Error types for the storage plugin.

use crate::config::ConfigError;
use crate::readiness::ReadinessState;
use hivestore_model::ModelError;
use hivestore_storage::StorageError;
use hivestore_types::ClassificationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("storage schemas unavailable after {attempts} checks")]
    SchemaUnavailable { attempts: u32 },

    #[error("unclassifiable message: {0}")]
    Classification(#[from] ClassificationError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("schema model error: {0}")]
    Model(#[from] ModelError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("plugin not ready (state: {0})")]
    NotReady(ReadinessState),

    #[error("plugin already started (state: {0})")]
    AlreadyStarted(ReadinessState),
}

pub type PluginResult<T> = Result<T, PluginError>;

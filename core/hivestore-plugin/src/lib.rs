//! Storage plugin for the hivestore device-message pipeline.
//!
//! On startup the plugin waits for the storage schemas to exist, registers
//! table and UDT definitions with the backend and binds the commands,
//! notifications and commandUpdates table groups. Afterwards every incoming
//! message is classified and written to the tables of its group.

mod config;
mod dispatcher;
mod error;
mod plugin;
mod provision;
mod readiness;

pub use config::{
    ConfigError, ConfigResult, ENV_COMMAND_UPDATES_STORING, ENV_SCHEMA_CHECKS_COUNT,
    ENV_SCHEMA_CHECKS_INTERVAL_MS, ENV_STORAGE_PATH, HivestoreConfig, PluginConfig,
    StorageSettings,
};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use error::{PluginError, PluginResult};
pub use plugin::StoragePlugin;
pub use provision::provision;
pub use readiness::{
    ProcessTerminator, ReadinessState, ReadinessVerifier, SCHEMA_UNAVAILABLE_EXIT_CODE,
    Terminator, Timer, TokioTimer, VerifyOutcome,
};

//! Schema model for hivestore.
//!
//! Defines the storage-side contract the plugin relies on:
//! - [`SchemaSet`]: table and user-defined-type schemas that must exist in the backend
//! - [`TableGroup`] / [`TableGroups`]: which physical tables receive each message category
//! - [`TableAssignment`]: groups resolved against the schema set during provisioning
//!
//! Schemas and groups are loaded together from a single JSON schema file
//! ([`SchemaFile`]).

mod error;
mod group;
mod schema;

pub use error::{ModelError, ModelResult};
pub use group::{TableAssignment, TableGroup, TableGroups};
pub use schema::{ClusteringOrder, Column, SchemaFile, SchemaSet, TableSchema, UdtSchema};

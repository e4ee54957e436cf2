//! Column-family storage layer for hivestore.
//!
//! The plugin talks to storage only through the [`StorageBackend`] trait:
//! a schema-existence probe, schema/table-group provisioning, and one insert
//! operation per message category.
//!
//! # Backends
//!
//! - [`SqliteBackend`]: persistent backend; each table schema becomes a
//!   SQLite table with a composite primary key, UDTs live in a catalog table
//! - [`MemoryBackend`]: in-process backend with upsert-by-primary-key semantics
//! - [`mock::RecordingBackend`]: records every call, for tests
//!
//! Rows are built from message payloads by [`build_row`]: payload fields are
//! matched to columns by their snake_case name and only columns defined by
//! the table schema are written.

mod backend;
mod error;
mod memory;
pub mod mock;
mod row;
mod sqlite;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use memory::MemoryBackend;
pub use row::{Row, build_row, normalize_timestamp, to_snake_case};
pub use sqlite::SqliteBackend;

//! Post-readiness provisioning.

use crate::error::PluginResult;
use hivestore_model::{SchemaSet, TableAssignment, TableGroup, TableGroups};
use hivestore_storage::StorageBackend;
use tracing::{debug, info};

/// Registers schemas with the backend and binds table groups.
///
/// Order is fixed: table schemas, then UDT schemas, then one assignment per
/// group in [`TableGroup::ALL`] order. The first failure stops the sequence.
pub async fn provision<B: StorageBackend + ?Sized>(
    backend: &B,
    schemas: &SchemaSet,
    groups: &TableGroups,
) -> PluginResult<TableAssignment> {
    backend.set_table_schemas(schemas.tables()).await?;
    debug!(count = schemas.tables().len(), "Table schemas set");

    backend.set_udt_schemas(schemas.udts()).await?;
    debug!(count = schemas.udts().len(), "UDT schemas set");

    let assignment = TableAssignment::resolve(groups, schemas)?;
    for group in TableGroup::ALL {
        let tables = assignment.tables(group);
        backend.assign_tables(group, tables).await?;
        info!(group = %group, tables = ?tables, "Assigned tables");
    }

    Ok(assignment)
}

use hivestore_model::{Column, ModelError, SchemaSet, TableAssignment, TableGroup, TableGroups, TableSchema};
use pretty_assertions::assert_eq;

fn table(name: &str) -> TableSchema {
    TableSchema::new(name)
        .with_column(Column::text("device_id"))
        .with_partition_key(&["device_id"])
}

fn schema_set() -> SchemaSet {
    SchemaSet::new(
        vec![table("commands"), table("notifications"), table("command_updates")],
        vec![],
    )
    .unwrap()
}

fn groups() -> TableGroups {
    TableGroups {
        commands: vec!["commands".into()],
        notifications: vec!["notifications".into()],
        command_updates: vec!["command_updates".into(), "commands".into()],
    }
}

#[test]
fn group_names() {
    assert_eq!(TableGroup::Commands.to_string(), "commands");
    assert_eq!(TableGroup::Notifications.to_string(), "notifications");
    assert_eq!(TableGroup::CommandUpdates.to_string(), "commandUpdates");
}

#[test]
fn all_groups_in_provisioning_order() {
    assert_eq!(
        TableGroup::ALL,
        [TableGroup::Commands, TableGroup::Notifications, TableGroup::CommandUpdates]
    );
}

#[test]
fn resolve_assignment() {
    let assignment = TableAssignment::resolve(&groups(), &schema_set()).unwrap();
    assert_eq!(assignment.commands(), ["commands".to_string()]);
    assert_eq!(assignment.notifications(), ["notifications".to_string()]);
    assert_eq!(
        assignment.command_updates(),
        ["command_updates".to_string(), "commands".to_string()]
    );
    assert_eq!(
        assignment.tables(TableGroup::CommandUpdates),
        assignment.command_updates()
    );
}

#[test]
fn resolve_collapses_duplicates() {
    let groups = TableGroups {
        commands: vec!["commands".into(), "commands".into()],
        ..Default::default()
    };
    let assignment = TableAssignment::resolve(&groups, &schema_set()).unwrap();
    assert_eq!(assignment.commands().len(), 1);
    assert!(assignment.notifications().is_empty());
}

#[test]
fn resolve_rejects_unknown_table() {
    let groups = TableGroups {
        notifications: vec!["ghost".into()],
        ..Default::default()
    };
    match TableAssignment::resolve(&groups, &schema_set()) {
        Err(ModelError::UnknownTable { group, table }) => {
            assert_eq!(group, "notifications");
            assert_eq!(table, "ghost");
        }
        other => panic!("Expected UnknownTable, got {other:?}"),
    }
}

#[test]
fn table_groups_serde_uses_file_keys() {
    let json = serde_json::to_value(groups()).unwrap();
    assert!(json.get("commandTables").is_some());
    assert!(json.get("notificationTables").is_some());
    assert!(json.get("commandUpdatesTables").is_some());
}

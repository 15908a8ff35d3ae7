//! Wire batches through the processor

use crate::common::{init_tracing, sales_registry, SalesService};
use openria::server::CustomErrorsMode;
use openria::{ChangeSetEntry, ChangeSetProcessor, Error, Principal, ServiceConfig};

fn processor() -> ChangeSetProcessor {
    init_tracing();
    ChangeSetProcessor::new(sales_registry(), ServiceConfig::default())
}

fn from_wire(json: &str) -> Vec<ChangeSetEntry> {
    serde_json::from_str(json).unwrap()
}

fn user() -> SalesService {
    SalesService::new(Principal::authenticated("clerk"))
}

#[test]
fn basic_update_with_association() {
    let entries = from_wire(
        r#"[
            {"Id": 1, "Operation": "Update",
             "Entity": {"$type": "Customer", "Id": {"Int": 7}, "Name": {"String": "Ann"}},
             "Associations": {"Orders": [2]}},
            {"Id": 2, "Operation": "None",
             "Entity": {"$type": "Order", "Id": {"Int": 70}, "CustomerId": {"Int": 7}, "Version": {"Int": 1}}}
        ]"#,
    );
    let mut service = user();
    let out = processor().process(&mut service, entries).unwrap();

    let orders = out[0].entity.get("Orders").unwrap().as_entities().unwrap();
    assert_eq!(orders.len(), 1);
    assert!(orders[0].same_instance(&out[1].entity));
    assert_eq!(service.calls, vec!["update Customer 7", "persist 2"]);
}

#[test]
fn singleton_association_points_back() {
    let entries = from_wire(
        r#"[
            {"Id": 1, "Operation": "Insert",
             "Entity": {"$type": "Order", "Id": {"Int": 71}, "CustomerId": {"Int": 7}, "Version": {"Int": 1}},
             "Associations": {"Customer": [2]}},
            {"Id": 2, "Operation": "None",
             "Entity": {"$type": "Customer", "Id": {"Int": 7}, "Name": {"String": "Ann"}}}
        ]"#,
    );
    let out = processor().process(&mut user(), entries).unwrap();
    let customer = out[0].entity.get("Customer").unwrap().as_entity().unwrap();
    assert!(customer.same_instance(&out[1].entity));
}

#[test]
fn delete_with_tombstone() {
    let entries = from_wire(
        r#"[
            {"Id": 1, "Operation": "Delete",
             "Entity": {"$type": "Customer", "Id": {"Int": 7}, "Name": {"String": "stale"}},
             "OriginalEntity": {"$type": "Customer", "Id": {"Int": 7}, "Name": {"String": "server"}},
             "Associations": {"Orders": []},
             "OriginalAssociations": {"Orders": []}}
        ]"#,
    );
    let mut service = user();
    let out = processor().process(&mut service, entries).unwrap();

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].entity.get("Name").unwrap().as_str(), Some("server"));
    assert!(out[0].original_entity.is_none());
    assert!(out[0].associations.is_none());
    assert!(out[0].original_associations.is_none());
    assert_eq!(service.calls, vec!["delete Customer 7", "persist 1"]);
}

#[test]
fn validation_failure_does_not_abort_batch() {
    let entries = from_wire(
        r#"[
            {"Id": 1, "Operation": "Insert", "Entity": {"$type": "OrderLine", "Id": {"Int": 1}, "OrderId": {"Int": 9}, "Quantity": {"Int": 3}}},
            {"Id": 2, "Operation": "Insert", "Entity": {"$type": "OrderLine", "Id": {"Int": 2}, "OrderId": {"Int": 9}, "Quantity": {"Int": 500}}},
            {"Id": 3, "Operation": "Insert", "Entity": {"$type": "OrderLine", "Id": {"Int": 3}, "OrderId": {"Int": 9}, "Quantity": {"Int": 4}}}
        ]"#,
    );
    let out = processor().process(&mut user(), entries).unwrap();

    assert_eq!(out.len(), 3);
    let flags: Vec<bool> = out.iter().map(|e| e.has_error()).collect();
    assert_eq!(flags, vec![false, true, false]);
    assert_eq!(out[1].validation_errors.as_ref().unwrap()[0].source_member_names, vec!["Quantity"]);

    let wire = serde_json::to_value(&out[1]).unwrap();
    assert_eq!(wire["HasError"], serde_json::Value::Bool(true));
}

#[test]
fn composition_children_link_to_parent() {
    let entries = from_wire(
        r#"[
            {"Id": 1, "Operation": "Update",
             "Entity": {"$type": "Order", "Id": {"Int": 70}, "CustomerId": {"Int": 7}, "Version": {"Int": 2}},
             "OriginalEntity": {"$type": "Order", "Id": {"Int": 70}, "CustomerId": {"Int": 7}, "Version": {"Int": 1}},
             "Associations": {"Lines": [2, 3, 3]}},
            {"Id": 2, "Operation": "Insert", "Entity": {"$type": "OrderLine", "Id": {"Int": 1}, "OrderId": {"Int": 70}, "Quantity": {"Int": 1}}},
            {"Id": 3, "Operation": "Update", "Entity": {"$type": "OrderLine", "Id": {"Int": 2}, "OrderId": {"Int": 70}, "Quantity": {"Int": 2}}}
        ]"#,
    );
    let mut service = user();
    let out = processor().process(&mut service, entries).unwrap();

    let lines = out[0].entity.get("Lines").unwrap().as_entities().unwrap();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].same_instance(&out[1].entity));
    assert!(lines[1].same_instance(&out[2].entity));
    assert_eq!(service.calls.len(), 4);
}

#[test]
fn anonymous_submit_is_refused() {
    let entries = from_wire(r#"[{"Id": 1, "Operation": "Insert", "Entity": {"$type": "Customer", "Id": {"Int": 1}, "Name": {"String": "x"}}}]"#);
    let mut service = SalesService::new(Principal::anonymous());
    let err = processor().process(&mut service, entries).unwrap_err();
    assert!(matches!(err, Error::Unauthorized { .. }));
    assert!(service.calls.is_empty());
}

#[test]
fn unknown_association_id_is_structural() {
    let entries = from_wire(
        r#"[{"Id": 1, "Operation": "Update",
             "Entity": {"$type": "Customer", "Id": {"Int": 7}, "Name": {"String": "Ann"}},
             "Associations": {"Orders": [99]}}]"#,
    );
    let err = processor().process(&mut user(), entries).unwrap_err();
    assert!(matches!(err, Error::InvalidChangeSet { .. }));
}

#[test]
fn config_file_drives_stack_trace_policy() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(openria::server::CONFIG_FILE_NAME), "custom_errors = \"off\"\n").unwrap();
    let config = ServiceConfig::load_or_create(dir.path()).unwrap();
    assert_eq!(config.custom_errors, CustomErrorsMode::Off);
    assert!(!config.suppress_stack_traces(false));

    let fresh = tempfile::tempdir().unwrap();
    let created = ServiceConfig::load_or_create(fresh.path()).unwrap();
    assert_eq!(created, ServiceConfig::default());
    assert!(fresh.path().join(openria::server::CONFIG_FILE_NAME).exists());
}

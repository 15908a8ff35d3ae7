//! Reconciliation tests for ria-changeset
//!
//! These tests run the reconciliation stages over batches read from their
//! wire form, where every entry is deserialized on its own:
//!
//! 1. **Identity unification** - every reference to an id resolves to one instance
//! 2. **Association idempotence** - repeated ids and repeated passes add nothing
//! 3. **Delete substitution** - deletes carry the original entity forward
//!
//! ```bash
//! cargo test --test reconciliation_tests
//! ```

use proptest::prelude::*;
use ria_changeset::{normalize_delete, reestablish_associations, shape_for_transport, ChangeSet, ChangeSetEntry};
use ria_core::{DomainOperation, Entity};
use ria_metadata::{AssociationDescriptor, MemberDescriptor, MetaTypeRegistry, SchemaRegistry, TypeDescriptor};
use std::sync::Arc;

// ============================================================================
// Test Helpers
// ============================================================================

fn registry() -> MetaTypeRegistry {
    let schema = SchemaRegistry::build([
        TypeDescriptor::entity("Customer")
            .member(MemberDescriptor::int("Id").key())
            .member(MemberDescriptor::string("Name"))
            .member(MemberDescriptor::entity_collection(
                "Orders",
                "Order",
                AssociationDescriptor::new("Customer_Orders", &["Id"], &["CustomerId"]),
            )),
        TypeDescriptor::entity("Order")
            .member(MemberDescriptor::int("Id").key())
            .member(MemberDescriptor::int("CustomerId"))
            .member(MemberDescriptor::entity_ref(
                "Customer",
                "Customer",
                AssociationDescriptor::new("Customer_Orders", &["CustomerId"], &["Id"]).foreign_key(),
            )),
    ])
    .unwrap();
    MetaTypeRegistry::new(Arc::new(schema))
}

fn reconcile(entries: Vec<ChangeSetEntry>) -> ChangeSet {
    let entries = entries.into_iter().map(normalize_delete).collect();
    let cs = ChangeSet::new(entries).unwrap();
    reestablish_associations(cs, &registry()).unwrap()
}

fn from_wire(json: &str) -> Vec<ChangeSetEntry> {
    serde_json::from_str(json).unwrap()
}

// ============================================================================
// Wire Scenarios
// ============================================================================

#[test]
fn test_update_with_association_from_wire() {
    let entries = from_wire(
        r#"[
            {
                "Id": 1,
                "Operation": "Update",
                "Entity": { "$type": "Customer", "Id": { "Int": 1 }, "Name": { "String": "Contoso" } },
                "Associations": { "Orders": [2] }
            },
            {
                "Id": 2,
                "Operation": "None",
                "Entity": { "$type": "Order", "Id": { "Int": 2 }, "CustomerId": { "Int": 1 } },
                "Associations": { "Customer": [1] }
            }
        ]"#,
    );

    let cs = reconcile(entries);
    let customer = &cs.entries()[0].entity;
    let order = &cs.entries()[1].entity;

    let orders = customer.get("Orders").unwrap().as_entities().unwrap();
    assert_eq!(orders.len(), 1);
    assert!(orders[0].same_instance(order));

    let back = order.get("Customer").unwrap().as_entity().unwrap();
    assert!(back.same_instance(customer));
}

#[test]
fn test_delete_tombstone_from_wire() {
    let entries = from_wire(
        r#"[{
            "Id": 1,
            "Operation": "Delete",
            "Entity": { "$type": "Customer", "Id": { "Int": 1 }, "Name": { "String": "stale" } },
            "OriginalEntity": { "$type": "Customer", "Id": { "Int": 1 }, "Name": { "String": "server" } }
        }]"#,
    );

    let cs = reconcile(entries);
    let out: Vec<_> = cs.into_entries().into_iter().map(|e| shape_for_transport(e, true)).collect();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].entity.get("Name").unwrap().as_str(), Some("server"));
    assert!(out[0].original_entity.is_none());
    assert!(out[0].associations.is_none());
    assert!(out[0].original_associations.is_none());
    assert!(out[0].entity_actions.is_none());
}

#[test]
fn test_shaped_entries_serialize_without_payload() {
    let customer = Entity::new("Customer").with("Id", 1);
    let cs = reconcile(vec![
        ChangeSetEntry::new(1, DomainOperation::Update, customer).with_association("Orders", &[2]),
        ChangeSetEntry::new(2, DomainOperation::None, Entity::new("Order").with("Id", 2)),
    ]);
    for entry in cs.into_entries() {
        let json = serde_json::to_value(shape_for_transport(entry, false)).unwrap();
        assert!(json["Associations"].is_null());
        assert!(json["OriginalEntity"].is_null());
        assert_eq!(json["HasError"], false);
        // Association members never reach the wire
        assert!(json["Entity"].get("Orders").is_none());
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Every id referenced from any number of customers resolves to the entry's instance
    #[test]
    fn identity_unification(
        order_count in 1usize..6,
        links in prop::collection::vec(prop::collection::vec(0usize..6, 0..8), 1..5),
    ) {
        let mut entries = Vec::new();
        let customer_count = links.len() as i32;
        for (i, refs) in links.iter().enumerate() {
            let ids: Vec<i32> = refs
                .iter()
                .map(|r| customer_count + 1 + (*r % order_count) as i32)
                .collect();
            entries.push(
                ChangeSetEntry::new(i as i32 + 1, DomainOperation::Update, Entity::new("Customer").with("Id", i as i64))
                    .with_association("Orders", &ids),
            );
        }
        for o in 0..order_count {
            let id = customer_count + 1 + o as i32;
            entries.push(ChangeSetEntry::new(id, DomainOperation::None, Entity::new("Order").with("Id", id)));
        }

        // Serialize and read back so each entry is deserialized independently
        let wire = serde_json::to_string(&entries).unwrap();
        let cs = reconcile(serde_json::from_str(&wire).unwrap());

        for (i, refs) in links.iter().enumerate() {
            let customer = &cs.entries()[i].entity;
            let linked = customer.get("Orders").unwrap().as_entities().unwrap();

            let mut distinct: Vec<usize> = refs.iter().map(|r| r % order_count).collect();
            distinct.sort_unstable();
            distinct.dedup();
            prop_assert_eq!(linked.len(), distinct.len());

            for target in &linked {
                let entry = cs.entry_for(target);
                prop_assert!(entry.is_some());
                prop_assert_eq!(entry.unwrap().operation, DomainOperation::None);
            }
        }
    }

    /// A second reconciliation pass adds nothing
    #[test]
    fn association_idempotence(ids in prop::collection::vec(2i32..5, 0..10)) {
        let mut entries = vec![
            ChangeSetEntry::new(1, DomainOperation::Update, Entity::new("Customer").with("Id", 1))
                .with_association("Orders", &ids),
        ];
        for id in 2..5 {
            entries.push(ChangeSetEntry::new(id, DomainOperation::None, Entity::new("Order").with("Id", id)));
        }

        let reg = registry();
        let cs = reestablish_associations(ChangeSet::new(entries).unwrap(), &reg).unwrap();
        let first = cs.entries()[0].entity.get("Orders").unwrap().as_entities().unwrap().len();
        let cs = reestablish_associations(cs, &reg).unwrap();
        let second = cs.entries()[0].entity.get("Orders").unwrap().as_entities().unwrap().len();

        let mut distinct = ids.clone();
        distinct.sort_unstable();
        distinct.dedup();
        prop_assert_eq!(first, distinct.len());
        prop_assert_eq!(first, second);
    }
}

//! Processor properties over generated batches

use crate::common::{sales_registry, SalesService};
use openria::{ChangeSetEntry, ChangeSetProcessor, DomainOperation, Entity, Principal, ServiceConfig};
use proptest::prelude::*;

/// One customer entry followed by `orders` order entries referenced from it,
/// `repeats` times each, and an optional delete with a tombstone.
fn batch(orders: usize, repeats: usize, with_delete: bool) -> Vec<ChangeSetEntry> {
    let order_ids: Vec<i32> = (0..orders).map(|i| i as i32 + 2).collect();
    let mut referenced = Vec::new();
    for _ in 0..repeats {
        referenced.extend_from_slice(&order_ids);
    }

    let mut entries = vec![ChangeSetEntry::new(
        1,
        DomainOperation::Update,
        Entity::new("Customer").with("Id", 1).with("Name", "Ann"),
    )
    .with_association("Orders", &referenced)];
    for &id in &order_ids {
        entries.push(
            ChangeSetEntry::new(id, DomainOperation::None, Entity::new("Order").with("Id", id).with("CustomerId", 1))
                .with_association("Customer", &[1]),
        );
    }
    if with_delete {
        let stale = Entity::new("Customer").with("Id", 99).with("Name", "stale");
        let server = Entity::new("Customer").with("Id", 99).with("Name", "server");
        entries.push(ChangeSetEntry::new(1000, DomainOperation::Delete, stale).with_original(server));
    }
    entries
}

proptest! {
    #[test]
    fn every_reference_resolves_to_the_entry_instance(orders in 1usize..6, repeats in 1usize..4) {
        let processor = ChangeSetProcessor::new(sales_registry(), ServiceConfig::default());
        let mut service = SalesService::new(Principal::authenticated("clerk"));
        let out = processor.process(&mut service, batch(orders, repeats, false)).unwrap();

        let customer = &out[0].entity;
        let linked = customer.get("Orders").unwrap().as_entities().unwrap();
        prop_assert_eq!(linked.len(), orders);
        for (order, entry) in linked.iter().zip(&out[1..]) {
            prop_assert!(order.same_instance(&entry.entity));
            let back = entry.entity.get("Customer").unwrap().as_entity().unwrap();
            prop_assert!(back.same_instance(customer));
        }
    }

    #[test]
    fn output_never_carries_submission_payload(orders in 0usize..4, with_delete in any::<bool>()) {
        let processor = ChangeSetProcessor::new(sales_registry(), ServiceConfig::default());
        let mut service = SalesService::new(Principal::authenticated("clerk"));
        let out = processor.process(&mut service, batch(orders, 1, with_delete)).unwrap();

        for entry in &out {
            prop_assert!(entry.associations.is_none());
            prop_assert!(entry.original_associations.is_none());
            prop_assert!(entry.entity_actions.is_none());
            prop_assert!(entry.original_entity.is_none());
        }
        if with_delete {
            let deleted = out.last().unwrap();
            let name = deleted.entity.get("Name").unwrap();
            prop_assert_eq!(name.as_str(), Some("server"));
        }
    }
}

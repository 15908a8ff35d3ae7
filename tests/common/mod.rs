//! Shared test utilities for the scenario suites.
//!
//! Import via `mod common;` from a suite's main.rs.

#![allow(dead_code)]

use openria::metadata::{AssociationDescriptor, MemberDescriptor, TypeDescriptor};
use openria::server::{RequestKind, RequiresAuthentication};
use openria::{
    ChangeSet, DomainError, DomainService, DomainServiceContext, DomainServiceDescription, Entity, MetaTypeRegistry,
    Principal, SchemaRegistry,
};
use std::sync::{Arc, Once};

// ============================================================================
// Initialization
// ============================================================================

static INIT_TRACING: Once = Once::new();

/// Route `tracing` output to the test harness.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

// ============================================================================
// Schema
// ============================================================================

/// Customer / Order / OrderLine schema.
///
/// Customer 1-n Order (Orders / Customer), Order 1-n OrderLine composition.
pub fn sales_schema() -> SchemaRegistry {
    SchemaRegistry::build([
        TypeDescriptor::entity("Customer")
            .member(MemberDescriptor::int("Id").key())
            .member(MemberDescriptor::string("Name").required().string_length(1, 40))
            .member(MemberDescriptor::entity_collection(
                "Orders",
                "Order",
                AssociationDescriptor::new("Customer_Orders", &["Id"], &["CustomerId"]),
            )),
        TypeDescriptor::entity("Order")
            .member(MemberDescriptor::int("Id").key())
            .member(MemberDescriptor::int("CustomerId"))
            .member(MemberDescriptor::int("Version").version())
            .member(MemberDescriptor::entity_ref(
                "Customer",
                "Customer",
                AssociationDescriptor::new("Customer_Orders", &["CustomerId"], &["Id"]).foreign_key(),
            ))
            .member(
                MemberDescriptor::entity_collection(
                    "Lines",
                    "OrderLine",
                    AssociationDescriptor::new("Order_Lines", &["Id"], &["OrderId"]),
                )
                .composition(),
            ),
        TypeDescriptor::entity("OrderLine")
            .member(MemberDescriptor::int("Id").key())
            .member(MemberDescriptor::int("OrderId"))
            .member(MemberDescriptor::int("Quantity").range(1.0, 100.0)),
    ])
    .expect("sales schema")
}

pub fn sales_registry() -> Arc<MetaTypeRegistry> {
    Arc::new(MetaTypeRegistry::new(Arc::new(sales_schema())))
}

// ============================================================================
// Domain Service
// ============================================================================

/// In-memory sales service recording every call.
pub struct SalesService {
    context: DomainServiceContext,
    description: Arc<DomainServiceDescription<SalesService>>,
    pub calls: Vec<String>,
}

impl SalesService {
    pub fn new(principal: Principal) -> Self {
        Self {
            context: DomainServiceContext::new(principal, RequestKind::Submit),
            description: Arc::new(sales_description()),
            calls: Vec::new(),
        }
    }
}

impl DomainService for SalesService {
    fn context(&self) -> &DomainServiceContext {
        &self.context
    }

    fn description(&self) -> Arc<DomainServiceDescription<Self>> {
        Arc::clone(&self.description)
    }

    fn persist_change_set(&mut self, change_set: &mut ChangeSet) -> Result<bool, DomainError> {
        self.calls.push(format!("persist {}", change_set.len()));
        Ok(true)
    }
}

fn record(kind: &'static str) -> impl Fn(&mut SalesService, &Entity) -> Result<(), DomainError> + Send + Sync {
    move |s, e| {
        let id = e.get("Id").and_then(|v| v.as_int()).unwrap_or_default();
        s.calls.push(format!("{} {} {}", kind, e.type_name(), id));
        Ok(())
    }
}

fn sales_description() -> DomainServiceDescription<SalesService> {
    let mut d = DomainServiceDescription::new("SalesService");
    d.require(RequiresAuthentication);
    for type_name in ["Customer", "Order", "OrderLine"] {
        d.add_insert(type_name, record("insert")).expect("insert");
        d.add_update(type_name, record("update")).expect("update");
        d.add_delete(type_name, record("delete")).expect("delete");
    }
    d
}

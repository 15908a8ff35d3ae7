//! Scenario Tests
//!
//! End-to-end tests through the `openria` facade, organized by area:
//! - Reconciliation: batches from the wire through `ChangeSetProcessor`
//! - Properties: identity, delete substitution and output shape over random batches
//! - Client: authentication round trips on the tokio runtime

#[path = "../common/mod.rs"]
mod common;

mod client;
mod properties;
mod reconciliation;

//! Client side of OpenRIA
//!
//! Asynchronous round trips are modelled as [`Operation`]s: small state
//! machines that turn completion, failure, and cancellation into observable
//! property changes. Completions are delivered through an explicit
//! [`ContinuationExecutor`].
//!
//! The authentication operations and [`AuthenticationClient`] are built on
//! top of them.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod authentication;
pub mod cancellation;
pub mod error;
pub mod executor;
pub mod notify;
pub mod operation;

pub use authentication::{
    AuthenticationClient, AuthenticationService, LoadUserOperation, LoginOperation, LoginParameters, LoginResult,
    LogoutOperation, SaveUserOperation,
};
pub use cancellation::CancellationToken;
pub use error::{OperationError, OperationErrorKind};
pub use executor::{ContinuationExecutor, InlineExecutor, Job, QueueExecutor, RuntimeExecutor};
pub use notify::{PropertyListener, PropertyNotifier};
pub use operation::{AsyncResult, BoxFuture, Operation, OperationResult, OperationState, Producer};

//! Asynchronous operations
//!
//! An [`Operation`] wraps one round trip. It moves through
//!
//! ```text
//! Created -> Started -> Succeeded
//!                    -> Failed
//!                    -> Faulted
//!        \-----------\-> Cancelled
//! ```
//!
//! and never leaves a terminal state. [`Operation::start`] calls the
//! producer: a [`AsyncResult::Ready`] answer completes inline, an
//! [`AsyncResult::Pending`] future runs on the current tokio runtime and its
//! completion is posted to the operation's [`ContinuationExecutor`].
//!
//! # Failures
//!
//! A producer error ends in `Failed` and is reported through
//! [`Operation::error`]. A panic is not an operation failure: a panicking
//! synchronous producer unwinds through `start`. A panic inside a pending
//! future ends the operation in `Faulted`, runs the completion handlers, and
//! is then resumed on the continuation executor. Awaiting
//! [`Operation::completion`] on a faulted operation panics as well, so the
//! fault reaches whoever owns the operation even when the executor is a
//! detached task.
//!
//! # Notifications
//!
//! On completion listeners are told, in order:
//!
//! | Outcome | Properties |
//! |---------|------------|
//! | Succeeded | operation-specific properties, `IsComplete` |
//! | Failed | `Error`, `HasError`, `IsComplete` |
//! | Cancelled | `IsCanceled`, `IsComplete` |
//! | Faulted | `IsComplete` |

use crate::cancellation::CancellationToken;
use crate::error::OperationError;
use crate::executor::ContinuationExecutor;
use crate::notify::PropertyNotifier;
use parking_lot::Mutex;
use ria_core::{Error, Result};
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, error};

/// `IsComplete` property name
pub const IS_COMPLETE: &str = "IsComplete";
/// `IsCanceled` property name
pub const IS_CANCELED: &str = "IsCanceled";
/// `Error` property name
pub const ERROR: &str = "Error";
/// `HasError` property name
pub const HAS_ERROR: &str = "HasError";

/// Outcome of a producer
pub type OperationResult<T> = std::result::Result<T, OperationError>;

/// Boxed future produced by a pending producer
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = OperationResult<T>> + Send + 'static>>;

/// Producer answer: done already, or still running
pub enum AsyncResult<T> {
    /// Completed synchronously
    Ready(OperationResult<T>),
    /// Completes when the future resolves
    Pending(BoxFuture<T>),
}

impl<T> AsyncResult<T> {
    /// Synchronous success
    pub fn ok(value: T) -> Self {
        AsyncResult::Ready(Ok(value))
    }

    /// Synchronous failure
    pub fn err(error: OperationError) -> Self {
        AsyncResult::Ready(Err(error))
    }

    /// Pending future
    pub fn pending(future: impl Future<Output = OperationResult<T>> + Send + 'static) -> Self {
        AsyncResult::Pending(Box::pin(future))
    }
}

impl<T> fmt::Debug for AsyncResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsyncResult::Ready(r) => write!(f, "Ready(ok={})", r.is_ok()),
            AsyncResult::Pending(_) => f.write_str("Pending"),
        }
    }
}

/// Starts the work of an operation
pub type Producer<T> = Box<dyn FnOnce(CancellationToken) -> AsyncResult<T> + Send + 'static>;

type CompletionHandler<T> = Box<dyn FnOnce(&Operation<T>) + Send + 'static>;

/// Lifecycle state of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationState {
    /// Not started
    Created,
    /// Running
    Started,
    /// Completed with a result
    Succeeded,
    /// Completed with an error
    Failed,
    /// Cancelled before completing
    Cancelled,
    /// Aborted by a panic in the producer's future
    Faulted,
}

impl OperationState {
    /// Whether the state is final
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OperationState::Succeeded
                | OperationState::Failed
                | OperationState::Cancelled
                | OperationState::Faulted
        )
    }
}

enum Outcome<T> {
    Finished(OperationResult<T>),
    Cancelled,
    Panicked(Box<dyn Any + Send + 'static>),
}

struct Slot<T> {
    state: OperationState,
    producer: Option<Producer<T>>,
    result: Option<T>,
    error: Option<OperationError>,
    on_completed: Vec<CompletionHandler<T>>,
}

struct Shared<T> {
    name: &'static str,
    slot: Mutex<Slot<T>>,
    token: CancellationToken,
    executor: Arc<dyn ContinuationExecutor>,
    notifier: PropertyNotifier,
    success_properties: &'static [&'static str],
    status: watch::Sender<OperationState>,
}

/// Handle to an asynchronous operation
///
/// Clones share the same operation.
pub struct Operation<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Operation<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> Operation<T> {
    /// Operation named `name` that will run `producer`
    pub fn new(
        name: &'static str,
        producer: impl FnOnce(CancellationToken) -> AsyncResult<T> + Send + 'static,
        executor: Arc<dyn ContinuationExecutor>,
    ) -> Self {
        Self::with_properties(name, producer, executor, &[])
    }

    /// Operation that also reports `success_properties` when it succeeds
    pub fn with_properties(
        name: &'static str,
        producer: impl FnOnce(CancellationToken) -> AsyncResult<T> + Send + 'static,
        executor: Arc<dyn ContinuationExecutor>,
        success_properties: &'static [&'static str],
    ) -> Self {
        let (status, _) = watch::channel(OperationState::Created);
        Self {
            shared: Arc::new(Shared {
                name,
                slot: Mutex::new(Slot {
                    state: OperationState::Created,
                    producer: Some(Box::new(producer)),
                    result: None,
                    error: None,
                    on_completed: Vec::new(),
                }),
                token: CancellationToken::new(),
                executor,
                notifier: PropertyNotifier::new(),
                success_properties,
                status,
            }),
        }
    }

    /// Run the producer
    ///
    /// # Errors
    ///
    /// [`Error::InvalidOperation`] if the operation was already started or
    /// cancelled.
    pub fn start(&self) -> Result<()> {
        let producer = {
            let mut slot = self.shared.slot.lock();
            if slot.state != OperationState::Created {
                return Err(Error::invalid_operation(format!(
                    "{} cannot start in state {:?}",
                    self.shared.name, slot.state
                )));
            }
            slot.state = OperationState::Started;
            slot.producer.take()
        };
        self.shared.status.send_replace(OperationState::Started);

        let Some(producer) = producer else {
            return Err(Error::invalid_operation(format!("{} has no producer", self.shared.name)));
        };
        debug!(target: "ria::client", operation = self.shared.name, "Operation started");

        match producer(self.shared.token.clone()) {
            AsyncResult::Ready(result) => {
                self.finish(Outcome::Finished(result));
            }
            AsyncResult::Pending(future) => match Handle::try_current() {
                Ok(runtime) => self.spawn(&runtime, future),
                Err(_) => {
                    let error = OperationError::runtime("pending operations need a tokio runtime");
                    self.finish(Outcome::Finished(Err(error)));
                }
            },
        }
        Ok(())
    }

    fn spawn(&self, runtime: &Handle, future: BoxFuture<T>) {
        let mut work = runtime.spawn(future);
        let token = self.shared.token.clone();
        let operation = self.clone();
        runtime.spawn(async move {
            let joined = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                joined = &mut work => Some(joined),
            };
            let outcome = match joined {
                None => {
                    work.abort();
                    Outcome::Cancelled
                }
                Some(Ok(result)) => Outcome::Finished(result),
                Some(Err(e)) if e.is_panic() => Outcome::Panicked(e.into_panic()),
                Some(Err(_)) => Outcome::Cancelled,
            };
            let executor = Arc::clone(&operation.shared.executor);
            executor.execute(Box::new(move || {
                operation.finish(outcome);
            }));
        });
    }

    /// Request cancellation
    ///
    /// Returns `false` if the operation had already completed. Otherwise the
    /// operation ends in [`OperationState::Cancelled`] and any result still
    /// in flight is discarded.
    pub fn cancel(&self) -> bool {
        if self.state().is_terminal() {
            return false;
        }
        self.shared.token.cancel();
        self.finish(Outcome::Cancelled)
    }

    fn finish(&self, outcome: Outcome<T>) -> bool {
        let (state, fault, handlers) = {
            let mut slot = self.shared.slot.lock();
            if slot.state.is_terminal() {
                drop(slot);
                if let Outcome::Panicked(payload) = outcome {
                    std::panic::resume_unwind(payload);
                }
                return false;
            }
            let mut fault = None;
            let state = match outcome {
                Outcome::Panicked(payload) => {
                    fault = Some(payload);
                    OperationState::Faulted
                }
                _ if self.shared.token.is_cancelled() => OperationState::Cancelled,
                Outcome::Finished(Ok(value)) => {
                    slot.result = Some(value);
                    OperationState::Succeeded
                }
                Outcome::Finished(Err(error)) => {
                    slot.error = Some(error);
                    OperationState::Failed
                }
                Outcome::Cancelled => OperationState::Cancelled,
            };
            slot.state = state;
            slot.producer = None;
            (state, fault, std::mem::take(&mut slot.on_completed))
        };

        if fault.is_some() {
            error!(target: "ria::client", operation = self.shared.name, "Operation aborted by a panic");
        } else {
            debug!(target: "ria::client", operation = self.shared.name, ?state, "Operation completed");
        }
        self.shared.status.send_replace(state);
        match state {
            OperationState::Succeeded => {
                self.shared.notifier.notify_all(self.shared.success_properties);
            }
            OperationState::Failed => self.shared.notifier.notify_all(&[ERROR, HAS_ERROR]),
            OperationState::Cancelled => self.shared.notifier.notify(IS_CANCELED),
            _ => {}
        }
        self.shared.notifier.notify(IS_COMPLETE);

        for handler in handlers {
            handler(self);
        }
        if let Some(payload) = fault {
            std::panic::resume_unwind(payload);
        }
        true
    }

    /// Run `handler` once the operation reaches a terminal state
    ///
    /// Runs immediately if it already has.
    pub fn on_completed(&self, handler: impl FnOnce(&Operation<T>) + Send + 'static) {
        {
            let mut slot = self.shared.slot.lock();
            if !slot.state.is_terminal() {
                slot.on_completed.push(Box::new(handler));
                return;
            }
        }
        handler(self);
    }

    /// Subscribe to property-changed notifications
    pub fn subscribe(&self, listener: impl Fn(&str) + Send + Sync + 'static) {
        self.shared.notifier.subscribe(listener);
    }

    /// Wait for a terminal state
    ///
    /// With a [`crate::QueueExecutor`] the owning thread must keep draining
    /// the queue for this to resolve.
    ///
    /// # Panics
    ///
    /// If the operation ended in [`OperationState::Faulted`].
    pub async fn completion(&self) -> OperationState {
        let mut rx = self.shared.status.subscribe();
        let state = match rx.wait_for(|s| s.is_terminal()).await {
            Ok(state) => *state,
            Err(_) => self.state(),
        };
        if state == OperationState::Faulted {
            panic!("operation {} was aborted by a panic", self.shared.name);
        }
        state
    }
}

impl<T> Operation<T> {
    /// Operation name
    pub fn name(&self) -> &'static str {
        self.shared.name
    }

    /// Current state
    pub fn state(&self) -> OperationState {
        self.shared.slot.lock().state
    }

    /// Whether the operation reached a terminal state
    pub fn is_complete(&self) -> bool {
        self.state().is_terminal()
    }

    /// Whether the operation was cancelled
    pub fn is_canceled(&self) -> bool {
        self.state() == OperationState::Cancelled
    }

    /// Whether a panic aborted the operation
    pub fn is_faulted(&self) -> bool {
        self.state() == OperationState::Faulted
    }

    /// Whether cancelling would have an effect
    pub fn can_cancel(&self) -> bool {
        !self.is_complete()
    }

    /// Failure, if the operation failed
    pub fn error(&self) -> Option<OperationError> {
        self.shared.slot.lock().error.clone()
    }

    /// Whether the operation failed
    pub fn has_error(&self) -> bool {
        self.shared.slot.lock().error.is_some()
    }

    /// Token shared with the producer
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.shared.token
    }

    /// Read the result in place
    pub fn with_result<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        f(self.shared.slot.lock().result.as_ref())
    }
}

impl<T: Clone> Operation<T> {
    /// Result, if the operation succeeded
    pub fn result(&self) -> Option<T> {
        self.shared.slot.lock().result.clone()
    }
}

impl<T> fmt::Debug for Operation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.shared.name)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

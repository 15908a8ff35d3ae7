//! Continuation executors
//!
//! An operation whose producer completes asynchronously hands its completion
//! to a [`ContinuationExecutor`]. The executor decides on which thread the
//! state change and its notifications happen:
//!
//! - [`InlineExecutor`]: on whichever task finished the work
//! - [`RuntimeExecutor`]: on a fresh task of a tokio runtime
//! - [`QueueExecutor`]: queued until the owning thread calls
//!   [`QueueExecutor::drain`], for callers that need thread affinity

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use tokio::runtime::Handle;

/// Unit of work posted to an executor
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Where completions run
pub trait ContinuationExecutor: Send + Sync {
    /// Run or schedule `job`
    fn execute(&self, job: Job);
}

/// Runs jobs immediately on the calling thread
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl ContinuationExecutor for InlineExecutor {
    fn execute(&self, job: Job) {
        job();
    }
}

/// Runs jobs as tasks on a tokio runtime
#[derive(Debug, Clone)]
pub struct RuntimeExecutor {
    handle: Handle,
}

impl RuntimeExecutor {
    /// Executor spawning onto `handle`
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Executor for the runtime the caller is running in, if any
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl ContinuationExecutor for RuntimeExecutor {
    fn execute(&self, job: Job) {
        self.handle.spawn(async move { job() });
    }
}

/// Queues jobs for the owning thread
#[derive(Default)]
pub struct QueueExecutor {
    jobs: Mutex<VecDeque<Job>>,
}

impl QueueExecutor {
    /// Empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued jobs
    pub fn pending(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Run every queued job on the calling thread, returning how many ran
    ///
    /// Jobs queued while draining run in the same call. A panicking job
    /// unwinds through `drain`; the jobs behind it stay queued.
    pub fn drain(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = self.jobs.lock().pop_front();
            match next {
                Some(job) => {
                    job();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }
}

impl ContinuationExecutor for QueueExecutor {
    fn execute(&self, job: Job) {
        self.jobs.lock().push_back(job);
    }
}

impl fmt::Debug for QueueExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueExecutor")
            .field("pending", &self.pending())
            .finish()
    }
}

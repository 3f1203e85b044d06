//! Executor owning one worker thread that runs tasks serially
//!
//! The executor hands submitted tasks to its worker through the shared
//! [`TaskQueue`]. The queue is created before the worker thread is
//! spawned, so submitters and `stop` always have a live handle to
//! signal through; there is no bootstrap window to synchronize against.

use crate::error::SpawnError;
use crate::executor::queue::{Task, TaskQueue};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const STATE_CREATED: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_STOPPED: u8 = 2;

/// How long Drop waits for the worker thread to wind down
const DROP_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// State of a [`ThreadExecutor`]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExecutorState {
    /// Allocated, worker thread not yet launched
    Created,
    /// Worker thread launched and serving tasks
    Running,
    /// Stopped; no further task will run
    Stopped,
}

impl ExecutorState {
    fn from_u8(value: u8) -> Self {
        match value {
            STATE_CREATED => ExecutorState::Created,
            STATE_RUNNING => ExecutorState::Running,
            _ => ExecutorState::Stopped,
        }
    }
}

/// Executor statistics
#[derive(Debug, Clone, Default)]
pub struct ExecutorStats {
    /// Total tasks accepted by submit
    pub tasks_submitted: u64,

    /// Total tasks that finished executing (including panicked ones)
    pub tasks_executed: u64,

    /// Total tasks dropped (submitted after stop, or still queued at stop)
    pub tasks_dropped: u64,

    /// Total tasks that panicked while executing
    pub tasks_panicked: u64,
}

/// State shared between the executor handle and its worker thread
struct Shared {
    /// Executor name (also the worker thread name)
    name: String,

    /// Task handoff queue
    queue: TaskQueue,

    /// Current state (ExecutorState as u8)
    state: AtomicU8,

    /// Tasks accepted by submit
    submitted: AtomicU64,

    /// Tasks that finished executing
    executed: AtomicU64,

    /// Tasks dropped after or at stop
    dropped: AtomicU64,

    /// Tasks that panicked while executing
    panicked: AtomicU64,
}

/// A dedicated, named, long-lived worker thread
///
/// Tasks submitted from any thread run on the worker thread, one at a
/// time, strictly in submission order. The executor owns its thread for
/// the executor's entire lifetime; once stopped it can never be
/// restarted, a fresh instance must be constructed.
pub struct ThreadExecutor {
    /// State shared with the worker thread
    shared: Arc<Shared>,

    /// Worker thread handle
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ThreadExecutor {
    /// Create a new executor and launch its worker thread
    ///
    /// Panics if the OS cannot create the thread; use [`try_new`] for
    /// the fallible variant.
    ///
    /// [`try_new`]: ThreadExecutor::try_new
    pub fn new(name: impl Into<String>) -> Self {
        Self::try_new(name).expect("Failed to spawn worker thread")
    }

    /// Create a new executor and launch its worker thread
    ///
    /// The name must be non-empty; it becomes the OS thread name and is
    /// used in diagnostics. Construction returns as soon as the thread
    /// is launched; it does not wait for the worker loop to begin
    /// serving tasks. Tasks submitted in the meantime are queued.
    pub fn try_new(name: impl Into<String>) -> Result<Self, SpawnError> {
        let name = name.into();
        if name.is_empty() {
            return Err(SpawnError::EmptyName);
        }

        let shared = Arc::new(Shared {
            name: name.clone(),
            queue: TaskQueue::new(),
            state: AtomicU8::new(STATE_CREATED),
            submitted: AtomicU64::new(0),
            executed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            panicked: AtomicU64::new(0),
        });

        let worker_shared = shared.clone();
        let handle = thread::Builder::new()
            .name(name)
            .spawn(move || Self::run_loop(worker_shared))?;

        shared.state.store(STATE_RUNNING, Ordering::Release);

        Ok(Self {
            shared,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Worker thread main loop
    fn run_loop(shared: Arc<Shared>) {
        while let Some(task) = shared.queue.pop() {
            // Isolate each task so a panicking task cannot kill the worker
            let result = panic::catch_unwind(AssertUnwindSafe(task));
            shared.executed.fetch_add(1, Ordering::Relaxed);

            if let Err(payload) = result {
                shared.panicked.fetch_add(1, Ordering::Relaxed);
                eprintln!(
                    "Executor {}: task panicked: {}",
                    shared.name,
                    panic_message(payload.as_ref())
                );
            }
        }

        #[cfg(debug_assertions)]
        eprintln!("Executor {} shutting down", shared.name);
    }

    /// Submit a task to run on the worker thread
    ///
    /// May be called from any thread, including the worker itself.
    /// Accepted tasks run exactly once, in submission order relative to
    /// other tasks submitted by the same caller, and never concurrently
    /// with another task from this executor. If the executor has been
    /// stopped the task is silently dropped. Never waits for the task
    /// to start or finish.
    pub fn submit<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.shared.queue.push(Box::new(task)) {
            self.shared.submitted.fetch_add(1, Ordering::Relaxed);
        } else {
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Stop the executor
    ///
    /// Idempotent. Marks the executor stopped, discards tasks still
    /// queued and wakes the worker so it can wind down after the task
    /// currently running (if any) completes. Does not wait for the
    /// worker thread to terminate; see [`join`].
    ///
    /// [`join`]: ThreadExecutor::join
    pub fn stop(&self) {
        if self.shared.state.swap(STATE_STOPPED, Ordering::AcqRel) == STATE_STOPPED {
            return;
        }

        let discarded = self.shared.queue.close();
        self.shared
            .dropped
            .fetch_add(discarded as u64, Ordering::Relaxed);
    }

    /// Wait up to `timeout` for the worker thread to terminate
    ///
    /// Only meaningful after [`stop`]: returns false while the executor
    /// is still running, when the timeout elapses first, or when called
    /// from the worker thread itself (which cannot join its own
    /// termination). Returns true once the worker has terminated.
    ///
    /// [`stop`]: ThreadExecutor::stop
    pub fn join(&self, timeout: Duration) -> bool {
        if self.state() != ExecutorState::Stopped {
            return false;
        }

        let mut slot = self.handle.lock();
        let Some(handle) = slot.take() else {
            // Already joined
            return true;
        };

        if thread::current().id() == handle.thread().id() {
            *slot = Some(handle);
            return false;
        }

        let start = Instant::now();
        loop {
            if handle.is_finished() {
                let _ = handle.join();
                return true;
            }
            if start.elapsed() > timeout {
                *slot = Some(handle);
                return false;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    /// Executor name
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Current state
    pub fn state(&self) -> ExecutorState {
        ExecutorState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    /// Whether the executor is accepting and running tasks
    pub fn is_running(&self) -> bool {
        self.state() == ExecutorState::Running
    }

    /// Number of tasks waiting to run (for debugging/stats)
    pub fn pending_count(&self) -> usize {
        self.shared.queue.len()
    }

    /// Snapshot of the executor's counters
    pub fn stats(&self) -> ExecutorStats {
        ExecutorStats {
            tasks_submitted: self.shared.submitted.load(Ordering::Relaxed),
            tasks_executed: self.shared.executed.load(Ordering::Relaxed),
            tasks_dropped: self.shared.dropped.load(Ordering::Relaxed),
            tasks_panicked: self.shared.panicked.load(Ordering::Relaxed),
        }
    }
}

impl Drop for ThreadExecutor {
    fn drop(&mut self) {
        self.stop();
        // No join when dropped from one of our own tasks: the worker
        // cannot wait for itself.
        self.join(DROP_JOIN_TIMEOUT);
    }
}

/// Extract a printable message from a panic payload
fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "<non-string panic payload>"
    }
}

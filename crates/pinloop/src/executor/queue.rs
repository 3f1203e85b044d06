//! FIFO task queue with a blocking consumer
//!
//! The queue is the handoff point between submitting threads and the
//! worker thread: producers push under the mutex and notify, the single
//! consumer parks on the condvar while the queue is open and empty.
//! Closing the queue discards pending tasks and wakes the consumer, so
//! the close doubles as the worker's shutdown signal.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

/// A unit of work submitted to an executor
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Queue state protected by the mutex
struct QueueState {
    /// Pending tasks in submission order
    tasks: VecDeque<Task>,

    /// Whether the queue has been closed
    closed: bool,
}

/// FIFO task queue connecting submitters to a single consumer
pub struct TaskQueue {
    /// Internal state protected by mutex
    state: Mutex<QueueState>,

    /// Condvar to wake the consumer when a task arrives or the queue closes
    notify: Condvar,
}

impl TaskQueue {
    /// Create a new open, empty queue
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                tasks: VecDeque::new(),
                closed: false,
            }),
            notify: Condvar::new(),
        }
    }

    /// Push a task onto the back of the queue
    ///
    /// Returns false if the queue has been closed; the task is not queued.
    pub fn push(&self, task: Task) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            return false;
        }
        state.tasks.push_back(task);
        self.notify.notify_one();
        true
    }

    /// Pop the next task, blocking while the queue is open and empty
    ///
    /// Returns None once the queue has been closed.
    pub fn pop(&self) -> Option<Task> {
        let mut state = self.state.lock();
        loop {
            // Closed wins over anything still queued: nothing runs after close.
            if state.closed {
                return None;
            }
            if let Some(task) = state.tasks.pop_front() {
                return Some(task);
            }
            // Re-check closed on every wake: close() may set the flag and
            // notify while we were waiting.
            self.notify.wait(&mut state);
        }
    }

    /// Close the queue, discarding pending tasks and waking the consumer
    ///
    /// Idempotent. Returns the number of pending tasks discarded.
    pub fn close(&self) -> usize {
        let mut state = self.state.lock();
        if state.closed {
            return 0;
        }
        state.closed = true;
        let discarded = state.tasks.len();
        state.tasks.clear();
        self.notify.notify_one();
        discarded
    }

    /// Number of tasks waiting to run
    pub fn len(&self) -> usize {
        self.state.lock().tasks.len()
    }

    /// Whether no tasks are waiting to run
    pub fn is_empty(&self) -> bool {
        self.state.lock().tasks.is_empty()
    }

    /// Whether the queue has been closed
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_queue_starts_open_and_empty() {
        let queue = TaskQueue::new();
        assert!(queue.is_empty());
        assert!(!queue.is_closed());
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_queue_push_pop_fifo() {
        let queue = TaskQueue::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let order = order.clone();
            assert!(queue.push(Box::new(move || order.lock().push(i))));
        }
        assert_eq!(queue.len(), 3);

        for _ in 0..3 {
            let task = queue.pop().expect("queue should have a task");
            task();
        }

        assert!(queue.is_empty());
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_queue_pop_blocks_until_push() {
        let queue = Arc::new(TaskQueue::new());
        let popped = Arc::new(AtomicUsize::new(0));

        let consumer = {
            let queue = queue.clone();
            let popped = popped.clone();
            thread::spawn(move || {
                let task = queue.pop().expect("queue closed before push");
                task();
                popped.store(1, Ordering::Release);
            })
        };

        // Consumer should be parked on the empty queue
        thread::sleep(Duration::from_millis(50));
        assert_eq!(popped.load(Ordering::Acquire), 0);

        queue.push(Box::new(|| {}));
        consumer.join().unwrap();
        assert_eq!(popped.load(Ordering::Acquire), 1);
    }

    #[test]
    fn test_queue_push_after_close() {
        let queue = TaskQueue::new();
        queue.close();

        assert!(!queue.push(Box::new(|| {})));
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_queue_close_discards_pending() {
        let queue = TaskQueue::new();
        queue.push(Box::new(|| {}));
        queue.push(Box::new(|| {}));
        queue.push(Box::new(|| {}));

        assert_eq!(queue.close(), 3);
        assert!(queue.is_closed());
        assert_eq!(queue.len(), 0);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_queue_close_idempotent() {
        let queue = TaskQueue::new();
        queue.push(Box::new(|| {}));

        assert_eq!(queue.close(), 1);
        assert_eq!(queue.close(), 0);
    }

    #[test]
    fn test_queue_close_wakes_blocked_pop() {
        let queue = Arc::new(TaskQueue::new());

        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || queue.pop())
        };

        // Let the consumer park before closing
        thread::sleep(Duration::from_millis(50));
        queue.close();

        assert!(consumer.join().unwrap().is_none());
    }
}

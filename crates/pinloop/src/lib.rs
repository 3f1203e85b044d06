//! Pinloop - a dedicated worker thread with serial task execution
//!
//! One [`ThreadExecutor`] owns one long-lived OS thread. Closures submitted
//! from any thread run on that thread, one at a time, in submission order.
//! This gives callers a stable, named execution context to pin stateful
//! resources (streams, sockets, connection handlers) to for their entire
//! lifetime, instead of hopping between pool threads.
//!
//! Not a thread pool (exactly one thread per executor), not a priority
//! scheduler (strict FIFO, single consumer), and not a message-passing
//! runtime (no back-pressure, no result futures).
//!
//! # Example
//!
//! ```ignore
//! use pinloop::ThreadExecutor;
//!
//! let executor = ThreadExecutor::new("io-worker");
//! executor.submit(|| {
//!     // runs on the "io-worker" thread
//! });
//! executor.stop();
//! ```

#![warn(missing_docs)]

mod error;
mod executor;

pub use error::SpawnError;
pub use executor::{ExecutorState, ExecutorStats, Task, TaskQueue, ThreadExecutor};

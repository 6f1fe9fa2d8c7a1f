//! Coordination primitives for Cadence.
//!
//! This crate provides the asynchronous signaling building blocks used to
//! sequence producer/consumer work across suspension points:
//!
//! - **Auto-Reset Event**: releases exactly one waiter per signal, FIFO,
//!   with signal coalescing
//! - **Sequence Queue**: runs queued async jobs strictly one at a time, in
//!   order, with explicit per-job completion handles
//! - **Throttler**: collapses bursts of occurrences into rate-limited
//!   action invocations
//!
//! All three are explicitly constructed objects with explicit lifetimes:
//! there are no global instances, and teardown resolves pending work with an
//! error instead of leaving it dangling.
//!
//! # Auto-Reset Event Example
//!
//! ```
//! use cadence_sync::AutoResetEvent;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! // A pre-signaled event hands its one signal to the first wait.
//! let event = AutoResetEvent::new_signaled();
//! event.wait().await.unwrap();
//! assert!(!event.is_signaled());
//!
//! // Signals coalesce: two signals with no waiter arm the event once.
//! event.signal();
//! event.signal();
//! event.wait().await.unwrap();
//! assert!(!event.is_signaled());
//! # }
//! ```
//!
//! # Sequence Queue Example
//!
//! ```
//! use cadence_sync::SequenceQueue;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let queue = SequenceQueue::new();
//!
//! // The second job starts only after the first completes.
//! let first = queue.enqueue(async { 1 }).unwrap();
//! let second = queue.enqueue(async { 2 }).unwrap();
//!
//! assert_eq!(first.join().await.unwrap(), 1);
//! assert_eq!(second.join().await.unwrap(), 2);
//! queue.shutdown().await;
//! # }
//! ```
//!
//! # Logging
//!
//! The crate instruments with `tracing`; see [`logging`] for the target
//! names usable in filter directives.

mod error;
mod event;
pub mod logging;
mod queue;
mod throttle;

pub use error::{EventError, QueueError};
pub use event::AutoResetEvent;
pub use queue::{JobHandle, JobId, SequenceQueue};
pub use throttle::Throttler;

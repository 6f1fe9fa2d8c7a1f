//! Asynchronous auto-reset event.
//!
//! An auto-reset event releases exactly one waiter per signal and then
//! returns to the unsignaled state. It is the building block the rest of
//! this crate coordinates with: the sequencing queue and the throttler both
//! park their driver task on one.
//!
//! # Semantics
//!
//! - [`AutoResetEvent::wait`] suspends the calling task until a signal is
//!   available for it. If a signal is already pending, the wait claims it and
//!   resumes immediately.
//! - [`AutoResetEvent::signal`] wakes the oldest waiter. With no waiters, the
//!   signal is recorded in a binary flag; repeated signals coalesce instead
//!   of accumulating.
//! - Waiters are released in the order their waits began (FIFO fairness).
//!
//! Cancellation is composed externally: race the wait against a timeout or a
//! `select!` arm. A signal aimed at an abandoned waiter moves on to the next
//! one in line, so composing cancellation this way never swallows a signal.
//!
//! # Example
//!
//! ```
//! use cadence_sync::AutoResetEvent;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let gate = Arc::new(AutoResetEvent::new());
//!
//! let consumer = tokio::spawn({
//!     let gate = gate.clone();
//!     async move {
//!         let mut passes = 0;
//!         while gate.wait().await.is_ok() {
//!             passes += 1;
//!         }
//!         passes
//!     }
//! });
//!
//! gate.signal();
//!
//! // Let the consumer claim the pass before tearing down; close() discards
//! // an unclaimed signal.
//! while gate.waiter_count() == 0 {
//!     tokio::task::yield_now().await;
//! }
//! gate.close();
//! assert_eq!(consumer.await.unwrap(), 1);
//! # }
//! ```

use std::collections::VecDeque;
use std::fmt;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::EventError;
use crate::logging::targets;

/// Internal state guarded by a single lock.
///
/// The flag and the waiter queue are only ever mutated together, so one mutex
/// covers both: `wait`'s check-then-enqueue and `signal`'s check-then-resolve
/// can never observe a torn intermediate state.
struct EventState {
    /// Whether a pending signal exists that no waiter has claimed yet.
    /// Never `true` while `waiters` is non-empty.
    signaled: bool,
    /// Whether [`AutoResetEvent::close`] has been called.
    closed: bool,
    /// Pending waiters, oldest first. Each entry is the resolution channel
    /// for one suspended `wait` call.
    waiters: VecDeque<oneshot::Sender<()>>,
}

/// A cooperative synchronization primitive that releases exactly one waiter
/// per signal.
///
/// Unlike a broadcast notification, an auto-reset event pairs each signal
/// with a single wait: signaling with waiters queued wakes the oldest one;
/// signaling with none queued arms the event so the next wait resumes
/// immediately. The armed state is a flag, not a counter; signals never
/// accumulate past one.
///
/// # Thread Safety
///
/// `AutoResetEvent` is `Send + Sync`. Any number of tasks may wait and signal
/// concurrently; `wait` suspends the calling task, never the underlying
/// worker thread.
///
/// # Lifetime
///
/// The event is an explicitly constructed object owned by whatever
/// coordinator uses it; there is no global instance. [`close`](Self::close)
/// tears it down: pending waiters resolve with [`EventError::Closed`], and
/// later waits return the same error so consumer loops terminate cleanly.
///
/// # Related
///
/// - [`SequenceQueue`](crate::SequenceQueue) - drains a job queue one wake at a time
/// - [`Throttler`](crate::Throttler) - collapses bursts into rate-limited wakes
pub struct AutoResetEvent {
    state: Mutex<EventState>,
}

impl AutoResetEvent {
    /// Create a new event in the unsignaled state.
    pub fn new() -> Self {
        Self::with_initial(false)
    }

    /// Create a new event that is already signaled.
    ///
    /// The first `wait` claims the initial signal and resumes immediately.
    pub fn new_signaled() -> Self {
        Self::with_initial(true)
    }

    fn with_initial(signaled: bool) -> Self {
        Self {
            state: Mutex::new(EventState {
                signaled,
                closed: false,
                waiters: VecDeque::new(),
            }),
        }
    }

    /// Wait until a signal is available for this waiter.
    ///
    /// If the event is signaled, the signal is claimed and the call returns
    /// without suspending. Otherwise the caller is enqueued behind any
    /// earlier waiters and suspends until a [`signal`](Self::signal) reaches
    /// it. Every concurrent `wait` gets its own queue slot; one signal
    /// releases exactly one of them.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::Closed`] if the event is closed, or becomes
    /// closed while this caller is waiting.
    pub async fn wait(&self) -> Result<(), EventError> {
        let receiver = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(EventError::Closed);
            }
            if state.signaled {
                state.signaled = false;
                tracing::trace!(target: targets::EVENT, "wait claimed pending signal");
                return Ok(());
            }
            let (sender, receiver) = oneshot::channel();
            state.waiters.push_back(sender);
            tracing::trace!(
                target: targets::EVENT,
                waiters = state.waiters.len(),
                "wait enqueued"
            );
            receiver
        };

        // The lock is released while suspended; a signal arriving from here
        // on resolves the channel directly.
        receiver.await.map_err(|_| EventError::Closed)
    }

    /// Release exactly one waiter, or arm the event if none are waiting.
    ///
    /// The oldest waiter is woken first. A waiter that abandoned its wait
    /// (dropped the future mid-suspend) is skipped and the signal moves to
    /// the next one in line. If no live waiter exists the event becomes
    /// signaled; signaling an already-signaled event is a no-op.
    ///
    /// # Panics
    ///
    /// Panics if called after [`close`](Self::close). Signaling a torn-down
    /// event is a programming error, not a recoverable condition.
    pub fn signal(&self) {
        let mut state = self.state.lock();
        assert!(!state.closed, "AutoResetEvent::signal called after close");

        while let Some(waiter) = state.waiters.pop_front() {
            if waiter.send(()).is_ok() {
                tracing::trace!(target: targets::EVENT, "signal delivered to waiter");
                return;
            }
            // Receiver dropped: the waiter raced its wait against something
            // else and lost. The signal belongs to the next in line.
        }

        state.signaled = true;
        tracing::trace!(target: targets::EVENT, "signal recorded, no waiters");
    }

    /// Clear a pending signal.
    ///
    /// Has no effect on waits that already resumed, and is not a
    /// cancellation mechanism for in-flight waits: it only discards a
    /// signal that no waiter has claimed yet.
    ///
    /// # Panics
    ///
    /// Panics if called after [`close`](Self::close).
    pub fn reset(&self) {
        let mut state = self.state.lock();
        assert!(!state.closed, "AutoResetEvent::reset called after close");
        state.signaled = false;
    }

    /// Close the event, resolving every pending waiter with
    /// [`EventError::Closed`].
    ///
    /// Subsequent `wait` calls return the same error. Closing an already
    /// closed event is a no-op.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        state.signaled = false;
        let pending = state.waiters.len();
        // Dropping the senders resolves each receiver with an error.
        state.waiters.clear();
        if pending > 0 {
            tracing::debug!(
                target: targets::EVENT,
                pending,
                "event closed with waiters pending"
            );
        }
    }

    /// Whether an unclaimed signal is pending.
    pub fn is_signaled(&self) -> bool {
        self.state.lock().signaled
    }

    /// Whether the event has been closed.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// The number of waiters currently suspended in [`wait`](Self::wait).
    ///
    /// Includes abandoned waiters whose entries have not been reaped by a
    /// signal yet.
    pub fn waiter_count(&self) -> usize {
        self.state.lock().waiters.len()
    }
}

impl Default for AutoResetEvent {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AutoResetEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("AutoResetEvent")
            .field("signaled", &state.signaled)
            .field("closed", &state.closed)
            .field("waiters", &state.waiters.len())
            .finish()
    }
}

static_assertions::assert_impl_all!(AutoResetEvent: Send, Sync);

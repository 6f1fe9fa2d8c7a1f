//! Burst-coalescing throttler.
//!
//! A [`Throttler`] collapses rapid bursts of occurrences into rate-limited
//! invocations of an action, the controller pattern for turning a storm of
//! change notifications into an occasional refresh.
//!
//! [`fire`](Throttler::fire) is cheap and callable from anywhere: it bumps an
//! atomic counter and signals the driver. The driver invokes the action with
//! the number of occurrences drained since the last invocation, then sleeps
//! the quiet window; occurrences arriving during the window accumulate and
//! produce a single follow-up invocation. Counts are conserved: coalescing
//! merges occurrences without dropping them.
//!
//! # Example
//!
//! ```no_run
//! use cadence_sync::Throttler;
//! use std::time::Duration;
//!
//! # async fn demo() {
//! let throttler = Throttler::spawn(Duration::from_millis(250), |count| {
//!     println!("refreshing after {count} change(s)");
//! });
//!
//! // A burst of 100 fires produces at most a handful of refreshes.
//! for _ in 0..100 {
//!     throttler.fire();
//! }
//! # throttler.shutdown().await;
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::event::AutoResetEvent;
use crate::logging::targets;

struct ThrottleShared {
    /// Wakes the driver when occurrences arrive; closed at shutdown.
    wakeup: AutoResetEvent,
    /// Occurrences recorded since the driver last drained.
    pending: AtomicU64,
}

/// Collapses bursts of occurrences into rate-limited action invocations.
///
/// The throttler owns a driver task parked on an internal
/// [`AutoResetEvent`]. The first occurrence after an idle period invokes the
/// action immediately (leading edge); once saturated, the action runs at most
/// once per quiet window, each time receiving the coalesced occurrence count.
///
/// Like the other coordinators in this crate, a `Throttler` is an explicitly
/// constructed object: dropping it stops the driver, and
/// [`shutdown`](Self::shutdown) additionally awaits its exit. Occurrences
/// recorded but never drained are discarded at teardown.
pub struct Throttler {
    shared: Arc<ThrottleShared>,
    window: Duration,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl Throttler {
    /// Start a throttler with the given quiet window.
    ///
    /// The action receives the number of occurrences coalesced into each
    /// invocation.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime context.
    pub fn spawn<F>(window: Duration, action: F) -> Self
    where
        F: FnMut(u64) + Send + 'static,
    {
        let shared = Arc::new(ThrottleShared {
            wakeup: AutoResetEvent::new(),
            pending: AtomicU64::new(0),
        });
        let driver = tokio::spawn(drive(shared.clone(), window, action));
        Self {
            shared,
            window,
            driver: Mutex::new(Some(driver)),
        }
    }

    /// Record one occurrence and wake the driver.
    ///
    /// Never blocks and never suspends; safe to call from any task or
    /// thread, at any rate.
    pub fn fire(&self) {
        self.shared.pending.fetch_add(1, Ordering::Release);
        self.shared.wakeup.signal();
    }

    /// Occurrences recorded but not yet drained by the driver.
    pub fn pending(&self) -> u64 {
        self.shared.pending.load(Ordering::Acquire)
    }

    /// The quiet window between action invocations.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Stop the driver and wait for it to exit.
    ///
    /// Occurrences that never got an invocation are discarded.
    pub async fn shutdown(self) {
        self.shared.wakeup.close();
        let driver = self.driver.lock().take();
        drop(self);
        if let Some(driver) = driver {
            let _ = driver.await;
        }
    }
}

impl Drop for Throttler {
    fn drop(&mut self) {
        self.shared.wakeup.close();
    }
}

/// Driver loop: drain the pending count, invoke, then hold the quiet window.
async fn drive<F>(shared: Arc<ThrottleShared>, window: Duration, mut action: F)
where
    F: FnMut(u64) + Send + 'static,
{
    loop {
        if shared.wakeup.wait().await.is_err() {
            break;
        }
        let count = shared.pending.swap(0, Ordering::AcqRel);
        if count == 0 {
            // A fire between a previous drain and its signal; nothing left.
            continue;
        }
        tracing::trace!(target: targets::THROTTLE, count, "invoking throttled action");
        action(count);
        // Occurrences arriving during the window leave the event signaled,
        // so the next iteration drains them right after it.
        tokio::time::sleep(window).await;
    }
    let undrained = shared.pending.load(Ordering::Acquire);
    if undrained > 0 {
        tracing::debug!(
            target: targets::THROTTLE,
            undrained,
            "throttler stopped with occurrences pending"
        );
    }
}

static_assertions::assert_impl_all!(Throttler: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    /// Sleep-poll until `cond` holds; panics if it never does.
    async fn poll_until(cond: impl Fn() -> bool) {
        for _ in 0..500 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("condition not reached within budget");
    }

    #[tokio::test]
    async fn test_burst_coalesces_into_single_invocation() {
        let invocations = Arc::new(Mutex::new(Vec::new()));
        let throttler = Throttler::spawn(Duration::from_millis(10), {
            let invocations = invocations.clone();
            move |count| invocations.lock().push(count)
        });

        // No awaits between fires: the driver cannot run in between on a
        // current-thread scheduler, so the burst must coalesce.
        for _ in 0..5 {
            throttler.fire();
        }

        poll_until(|| !invocations.lock().is_empty()).await;
        assert_eq!(*invocations.lock(), vec![5]);
        assert_eq!(throttler.pending(), 0);
        throttler.shutdown().await;
    }

    #[tokio::test]
    async fn test_counts_conserved_across_windows() {
        let invocations = Arc::new(Mutex::new(Vec::new()));
        let throttler = Throttler::spawn(Duration::from_millis(5), {
            let invocations = invocations.clone();
            move |count| invocations.lock().push(count)
        });

        throttler.fire();
        throttler.fire();
        throttler.fire();
        poll_until(|| !invocations.lock().is_empty()).await;

        throttler.fire();
        throttler.fire();
        poll_until(|| invocations.lock().iter().sum::<u64>() == 5).await;

        throttler.shutdown().await;
    }

    #[tokio::test]
    async fn test_fires_during_window_produce_one_follow_up() {
        let invocations = Arc::new(Mutex::new(Vec::new()));
        let throttler = Throttler::spawn(Duration::from_millis(100), {
            let invocations = invocations.clone();
            move |count| invocations.lock().push(count)
        });

        throttler.fire();
        poll_until(|| invocations.lock().len() == 1).await;

        // The driver is now holding the quiet window; these coalesce.
        throttler.fire();
        throttler.fire();
        throttler.fire();

        poll_until(|| invocations.lock().len() == 2).await;
        assert_eq!(*invocations.lock(), vec![1, 3]);
        throttler.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_driver() {
        let throttler = Throttler::spawn(Duration::from_millis(1), |_| {});
        throttler.fire();
        throttler.shutdown().await;
    }

    #[tokio::test]
    async fn test_idle_throttler_invokes_nothing() {
        let invocations = Arc::new(Mutex::new(Vec::new()));
        let throttler = Throttler::spawn(Duration::from_millis(1), {
            let invocations = invocations.clone();
            move |count: u64| invocations.lock().push(count)
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(invocations.lock().is_empty());
        throttler.shutdown().await;
    }
}

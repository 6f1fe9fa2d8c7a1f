//! FIFO sequencing queue for async jobs.
//!
//! A [`SequenceQueue`] runs queued jobs strictly one at a time, in enqueue
//! order. It is the coordinator pattern this crate's event was built for:
//! the next job begins only when the previous one has completed, the way an
//! animation queue plays storyboards back to back.
//!
//! Completion is an explicit channel threaded through the queue, not an
//! ambient "completed" callback: every [`enqueue`](SequenceQueue::enqueue)
//! returns a [`JobHandle`] that resolves with the job's output, or with
//! [`QueueError::Cancelled`] if the job was removed before it ran.
//!
//! # Example
//!
//! ```
//! use cadence_sync::SequenceQueue;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let queue = SequenceQueue::new();
//!
//! let first = queue.enqueue(async { "fade-in" }).unwrap();
//! let second = queue.enqueue(async { "slide" }).unwrap();
//!
//! // Jobs complete in enqueue order, one at a time.
//! assert_eq!(first.join().await.unwrap(), "fade-in");
//! assert_eq!(second.join().await.unwrap(), "slide");
//!
//! queue.shutdown().await;
//! # }
//! ```

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::QueueError;
use crate::event::AutoResetEvent;
use crate::logging::targets;

/// A unique identifier for an enqueued job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(u64);

impl JobId {
    /// Get the raw u64 value of this job ID.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Global counter for generating unique job IDs.
static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

fn next_job_id() -> JobId {
    JobId(NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed))
}

/// A queued job with its completion send baked into the future.
struct QueuedJob {
    id: JobId,
    future: BoxFuture<'static, ()>,
}

/// Jobs pending execution plus the accepting/closed state, under one lock.
struct JobsState {
    closed: bool,
    queue: VecDeque<QueuedJob>,
}

struct QueueShared {
    /// Wakes the driver when work arrives; closed at teardown.
    wakeup: AutoResetEvent,
    jobs: Mutex<JobsState>,
}

/// A handle to an enqueued job.
///
/// Resolves with the job's output once the job has run, or with
/// [`QueueError::Cancelled`] if the job was removed from the queue first.
#[derive(Debug)]
pub struct JobHandle<T> {
    id: JobId,
    receiver: oneshot::Receiver<T>,
}

impl<T> JobHandle<T> {
    /// Get the unique job ID.
    ///
    /// Use with [`SequenceQueue::cancel`] to remove the job before it runs.
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Wait for the job to complete and return its output.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Cancelled`] if the job was cancelled or the
    /// queue was closed before the job started running.
    pub async fn join(self) -> Result<T, QueueError> {
        self.receiver.await.map_err(|_| QueueError::Cancelled)
    }
}

/// Runs async jobs strictly one at a time, in enqueue order.
///
/// The queue owns a driver task that parks on an internal
/// [`AutoResetEvent`] and drains pending jobs whenever it is woken. Signal
/// coalescing does the bookkeeping: any number of rapid enqueues may
/// collapse into a single wake, and the drain loop picks up every job
/// regardless.
///
/// The queue is an explicitly constructed object with an explicit lifetime:
/// [`close`](Self::close) (or dropping the queue) stops the driver after the
/// in-flight job finishes, and [`shutdown`](Self::shutdown) additionally
/// awaits its exit.
pub struct SequenceQueue {
    shared: Arc<QueueShared>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl SequenceQueue {
    /// Create a new queue and spawn its driver task.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime context.
    pub fn new() -> Self {
        let shared = Arc::new(QueueShared {
            wakeup: AutoResetEvent::new(),
            jobs: Mutex::new(JobsState {
                closed: false,
                queue: VecDeque::new(),
            }),
        });
        let driver = tokio::spawn(drive(shared.clone()));
        Self {
            shared,
            driver: Mutex::new(Some(driver)),
        }
    }

    /// Append a job to the back of the queue.
    ///
    /// The job starts once every job ahead of it has completed. The returned
    /// handle resolves with the job's output; dropping the handle does not
    /// cancel the job.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Closed`] if the queue has been closed.
    pub fn enqueue<F, T>(&self, job: F) -> Result<JobHandle<T>, QueueError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let id = next_job_id();
        let (sender, receiver) = oneshot::channel();
        let future: BoxFuture<'static, ()> = Box::pin(async move {
            let output = job.await;
            // The handle may have been dropped; the output is discarded then.
            let _ = sender.send(output);
        });

        let mut jobs = self.shared.jobs.lock();
        if jobs.closed {
            return Err(QueueError::Closed);
        }
        jobs.queue.push_back(QueuedJob { id, future });
        tracing::trace!(
            target: targets::QUEUE,
            id = id.as_u64(),
            pending = jobs.queue.len(),
            "job enqueued"
        );
        // Signaled under the jobs lock so a concurrent close cannot slip in
        // between the push and the wake.
        self.shared.wakeup.signal();
        Ok(JobHandle { id, receiver })
    }

    /// Remove a job that has not started running.
    ///
    /// Returns `true` if the job was found and removed; its handle then
    /// resolves with [`QueueError::Cancelled`]. The running job cannot be
    /// cancelled.
    pub fn cancel(&self, id: JobId) -> bool {
        let mut jobs = self.shared.jobs.lock();
        if let Some(pos) = jobs.queue.iter().position(|job| job.id == id) {
            jobs.queue.remove(pos);
            tracing::trace!(target: targets::QUEUE, id = id.as_u64(), "job cancelled");
            true
        } else {
            false
        }
    }

    /// The number of jobs waiting to run.
    ///
    /// Does not include the job currently running, if any.
    pub fn pending_count(&self) -> usize {
        self.shared.jobs.lock().queue.len()
    }

    /// Whether the queue has been closed.
    pub fn is_closed(&self) -> bool {
        self.shared.jobs.lock().closed
    }

    /// Close the queue.
    ///
    /// Jobs that have not started are dropped and their handles resolve with
    /// [`QueueError::Cancelled`]; the in-flight job, if any, runs to
    /// completion, after which the driver exits. Closing an already closed
    /// queue is a no-op.
    pub fn close(&self) {
        let mut jobs = self.shared.jobs.lock();
        if jobs.closed {
            return;
        }
        jobs.closed = true;
        let dropped = jobs.queue.len();
        // Dropping the queued jobs drops their completion senders, which
        // resolves the handles with `Cancelled`.
        jobs.queue.clear();
        // Closed under the jobs lock for the same reason enqueue signals
        // under it.
        self.shared.wakeup.close();
        if dropped > 0 {
            tracing::debug!(
                target: targets::QUEUE,
                dropped,
                "queue closed with jobs pending"
            );
        }
    }

    /// Close the queue and wait for the driver task to exit.
    pub async fn shutdown(self) {
        self.close();
        let driver = self.driver.lock().take();
        drop(self);
        if let Some(driver) = driver {
            let _ = driver.await;
        }
    }
}

impl Default for SequenceQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SequenceQueue {
    fn drop(&mut self) {
        self.close();
    }
}

/// Driver loop: park on the wakeup event, then drain jobs one at a time.
async fn drive(shared: Arc<QueueShared>) {
    loop {
        if shared.wakeup.wait().await.is_err() {
            break;
        }
        loop {
            let job = shared.jobs.lock().queue.pop_front();
            let Some(job) = job else { break };
            tracing::trace!(target: targets::QUEUE, id = job.id.as_u64(), "job running");
            job.future.await;
            tracing::trace!(target: targets::QUEUE, id = job.id.as_u64(), "job finished");
        }
    }
    tracing::trace!(target: targets::QUEUE, "queue driver exited");
}

static_assertions::assert_impl_all!(SequenceQueue: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    /// Yield to the scheduler until `cond` holds.
    async fn spin_until(cond: impl Fn() -> bool) {
        for _ in 0..1000 {
            if cond() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("condition not reached after 1000 yields");
    }

    #[tokio::test]
    async fn test_jobs_run_in_order_one_at_a_time() {
        let queue = SequenceQueue::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for tag in ["a", "b", "c"] {
            let log = log.clone();
            let handle = queue
                .enqueue(async move {
                    log.lock().push(format!("{tag}:start"));
                    // Yielding mid-job must not let the next job begin.
                    tokio::task::yield_now().await;
                    log.lock().push(format!("{tag}:end"));
                })
                .unwrap();
            handles.push(handle);
        }

        for handle in handles {
            handle.join().await.unwrap();
        }
        assert_eq!(
            *log.lock(),
            vec!["a:start", "a:end", "b:start", "b:end", "c:start", "c:end"]
        );
    }

    #[tokio::test]
    async fn test_handles_resolve_with_job_outputs() {
        let queue = SequenceQueue::new();

        let answer = queue.enqueue(async { 40 + 2 }).unwrap();
        let text = queue.enqueue(async { "done".to_string() }).unwrap();

        assert_eq!(answer.join().await.unwrap(), 42);
        assert_eq!(text.join().await.unwrap(), "done");
        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_cancel_pending_job() {
        let queue = SequenceQueue::new();
        let gate = Arc::new(AutoResetEvent::new());

        // The first job blocks the driver until the gate opens.
        let first = queue
            .enqueue({
                let gate = gate.clone();
                async move { gate.wait().await.unwrap() }
            })
            .unwrap();
        spin_until(|| gate.waiter_count() == 1).await;

        let second = queue.enqueue(async { 7 }).unwrap();
        assert_eq!(queue.pending_count(), 1);

        assert!(queue.cancel(second.id()));
        assert!(!queue.cancel(second.id()));
        assert_eq!(second.join().await, Err(QueueError::Cancelled));

        gate.signal();
        first.join().await.unwrap();
        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_enqueue_after_close_errors() {
        let queue = SequenceQueue::new();
        queue.close();
        assert!(queue.is_closed());

        let result = queue.enqueue(async {});
        assert!(matches!(result, Err(QueueError::Closed)));
        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_close_cancels_pending_jobs() {
        let queue = SequenceQueue::new();
        let gate = Arc::new(AutoResetEvent::new());

        let first = queue
            .enqueue({
                let gate = gate.clone();
                async move { gate.wait().await.unwrap() }
            })
            .unwrap();
        spin_until(|| gate.waiter_count() == 1).await;

        let second = queue.enqueue(async { 7 }).unwrap();
        queue.close();

        // The queued job was cancelled; the in-flight job runs to completion.
        assert_eq!(second.join().await, Err(QueueError::Cancelled));
        gate.signal();
        first.join().await.unwrap();
        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_with_idle_driver() {
        let queue = SequenceQueue::new();
        let done = queue.enqueue(async { 1 }).unwrap();
        assert_eq!(done.join().await.unwrap(), 1);
        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_job_ids_are_unique() {
        let queue = SequenceQueue::new();
        let a = queue.enqueue(async {}).unwrap();
        let b = queue.enqueue(async {}).unwrap();
        assert_ne!(a.id(), b.id());
        queue.shutdown().await;
    }
}

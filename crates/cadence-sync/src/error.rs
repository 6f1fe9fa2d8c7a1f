//! Error types for the coordination primitives.

/// Errors produced by [`AutoResetEvent`](crate::AutoResetEvent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    /// The event was closed before or during the wait. Pending waiters are
    /// resolved with this error at close time so consumer loops can
    /// terminate cleanly.
    #[error("event closed while waiting")]
    Closed,
}

/// Errors produced by [`SequenceQueue`](crate::SequenceQueue) and its job
/// handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// The job was removed from the queue before it started running, either
    /// by [`cancel`](crate::SequenceQueue::cancel) or because the queue was
    /// closed.
    #[error("job cancelled before it ran")]
    Cancelled,

    /// The queue is closed and no longer accepts jobs.
    #[error("queue is closed")]
    Closed,
}

//! Logging facilities.
//!
//! cadence-sync instruments with the `tracing` crate. To see logs, install a
//! tracing subscriber in your application:
//!
//! ```ignore
//! use tracing_subscriber;
//!
//! fn main() {
//!     // Initialize tracing (you can customize this)
//!     tracing_subscriber::fmt::init();
//!
//!     // Your application code...
//! }
//! ```
//!
//! Signal delivery and job lifecycle are logged at `trace` level; teardown
//! with work still pending is logged at `debug`.

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem, e.g.
/// `RUST_LOG=cadence_sync::queue=trace`.
pub mod targets {
    /// Auto-reset event target.
    pub const EVENT: &str = "cadence_sync::event";
    /// Sequencing queue target.
    pub const QUEUE: &str = "cadence_sync::queue";
    /// Throttler target.
    pub const THROTTLE: &str = "cadence_sync::throttle";
}

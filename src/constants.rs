//! System-wide tuning constants.

/// Completed tasks retained for introspection before FIFO eviction.
/// The per-task latch outlives eviction, so late awaiters are unaffected.
pub const COMPLETED_TASKS_RETAINED: usize = 1000;

/// Default number of polling worker executors.
pub const DEFAULT_WORKERS_NUM: usize = 10;

/// Default delay between scheduler sweeps, in seconds.
pub const DEFAULT_SCHEDULER_DELAY_SECS: u64 = 10;

/// Default freshness window for paginated polling: 48 hours, in seconds.
/// Pages whose last review is older than this window are not followed.
pub const DEFAULT_REVIEWS_DEPTH_SECS: i64 = 48 * 60 * 60;

/// Default per-request timeout for the upstream feed, in seconds.
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 59;

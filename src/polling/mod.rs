//! The asynchronous work-coordination subsystem: a deduplicating task queue,
//! a pool of worker executors and a periodic refresh scheduler.

pub mod queue;
pub mod scheduler;
pub mod worker;

pub use queue::{PollQueue, PollTask};
pub use scheduler::SchedulerService;
pub use worker::PollWorker;

pub mod scheduler;

pub use scheduler::{HeartbeatScheduler, MAX_FAILURES_REASON, TickOutcome};

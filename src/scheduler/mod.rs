//! Adaptive pacing of live scans
//!
//! - [`history`]: bounded rolling window of cycle durations
//! - [`policy`]: pluggable interval adjustment
//! - [`state`]: the Idle/Running state machine, driven by explicit timestamps
//! - [`runner`]: a worker thread that runs the state machine against a live
//!   frame source

/// Rolling duration window
pub mod history;
/// Interval adjustment policies
pub mod policy;
/// Worker thread driver
pub mod runner;
/// Pure schedule state machine
pub mod state;

pub use history::PerformanceHistory;
pub use policy::{AdjustmentPolicy, Backoff, MonitorOnly};
pub use runner::{CycleReport, FrameSource, LoopExit, ScanLoop};
pub use state::{CycleOutcome, MAX_INTERVAL, MIN_INTERVAL, SchedulePhase, ScanScheduleState};

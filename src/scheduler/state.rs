/// Scan scheduling as a pure state machine over explicit timestamps
///
/// Nothing here reads a clock or sleeps. Callers pass `now` in and get the
/// next wake time back, so the whole lifecycle can be driven by a simulated
/// clock in tests and by a worker thread in [`super::runner`].
use super::history::PerformanceHistory;
use super::policy::AdjustmentPolicy;
use crate::config::ScanConfig;
use crate::error::ScanError;
use std::time::{Duration, Instant};

/// Shortest interval a policy may choose
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);
/// Longest interval a policy may choose
pub const MAX_INTERVAL: Duration = Duration::from_secs(3600);

/// Scheduler lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulePhase {
    /// Not scanning
    #[default]
    Idle,
    /// Cycles are being scheduled
    Running,
}

/// What the scheduler decided after a completed cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleOutcome {
    /// When the next cycle should start
    pub next_wake: Instant,
    /// Interval used to compute `next_wake`
    pub interval: Duration,
    /// Rolling mean, once enough samples are held
    pub mean: Option<Duration>,
    /// True when the rolling mean exceeds the latency budget
    pub overrun: bool,
}

/// Interval, running flag and rolling history of a live scan
#[derive(Debug, Clone)]
pub struct ScanScheduleState {
    phase: SchedulePhase,
    interval: Duration,
    default_interval: Duration,
    latency_budget: Duration,
    min_samples: usize,
    history: PerformanceHistory,
}

impl ScanScheduleState {
    /// Idle state using the pacing fields of `config`
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            phase: SchedulePhase::Idle,
            interval: config.default_interval,
            default_interval: config.default_interval,
            latency_budget: config.latency_budget,
            min_samples: config.min_samples,
            history: PerformanceHistory::new(config.history_window),
        }
    }

    /// Current phase
    pub fn phase(&self) -> SchedulePhase {
        self.phase
    }

    /// True while running
    pub fn is_running(&self) -> bool {
        self.phase == SchedulePhase::Running
    }

    /// Interval until the next cycle
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Latency budget the rolling mean is judged against
    pub fn latency_budget(&self) -> Duration {
        self.latency_budget
    }

    /// Recorded cycle durations
    pub fn history(&self) -> &PerformanceHistory {
        &self.history
    }

    /// Begin scanning; returns when the first cycle is due
    ///
    /// Starting an already running schedule is an error and leaves the state
    /// untouched.
    pub fn start(&mut self, now: Instant) -> Result<Instant, ScanError> {
        if self.is_running() {
            return Err(ScanError::AlreadyRunning);
        }
        self.phase = SchedulePhase::Running;
        self.interval = self.default_interval.clamp(MIN_INTERVAL, MAX_INTERVAL);
        self.history.clear();
        Ok(now + self.interval)
    }

    /// Record a finished cycle that took `elapsed`, ending at `now`
    ///
    /// Returns `None` when idle: a cycle finishing after `stop` is dropped.
    /// Whatever the policy returns is clamped to
    /// [`MIN_INTERVAL`]..=[`MAX_INTERVAL`].
    pub fn complete_cycle<P>(
        &mut self,
        now: Instant,
        elapsed: Duration,
        policy: &P,
    ) -> Option<CycleOutcome>
    where
        P: AdjustmentPolicy + ?Sized,
    {
        if !self.is_running() {
            return None;
        }

        self.history.push(elapsed);
        let mean = self.history.mean_over(self.min_samples);
        let overrun = mean.is_some_and(|m| m > self.latency_budget);

        if let Some(m) = mean {
            self.interval = policy
                .adjust(self.interval, m, self.latency_budget)
                .clamp(MIN_INTERVAL, MAX_INTERVAL);
        }

        Some(CycleOutcome {
            next_wake: now + self.interval,
            interval: self.interval,
            mean,
            overrun,
        })
    }

    /// The frame source died; stop without waiting for a caller
    pub fn fail(&mut self) {
        self.stop();
    }

    /// Go idle, clear history and reset the interval
    pub fn stop(&mut self) {
        self.phase = SchedulePhase::Idle;
        self.history.clear();
        self.interval = self.default_interval;
    }
}

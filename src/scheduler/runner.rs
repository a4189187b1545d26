/// Threaded driver for live scanning
///
/// One worker thread owns the frame source, the scanner and the schedule
/// state. Between cycles it blocks on a stop channel with a timeout equal to
/// the time left until the next wake, so cycles never overlap and `stop`
/// interrupts the wait immediately. `stop` joins the worker; once it returns
/// no further cycle can run.
use super::policy::AdjustmentPolicy;
use super::state::ScanScheduleState;
use crate::config::ScanConfig;
use crate::decode::Decoder;
use crate::error::{ScanError, SourceError};
use crate::models::LumaImage;
use crate::pipeline::{ScanReport, Scanner};
use crossbeam_channel::{RecvTimeoutError, Sender, bounded};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Supplier of live frames
///
/// `Ok(None)` means the source is exhausted; the loop goes idle.
pub trait FrameSource: Send {
    /// Next frame to scan
    fn next_frame(&mut self) -> Result<Option<LumaImage>, SourceError>;
}

impl<F> FrameSource for F
where
    F: FnMut() -> Result<Option<LumaImage>, SourceError> + Send,
{
    fn next_frame(&mut self) -> Result<Option<LumaImage>, SourceError> {
        self()
    }
}

/// Per-cycle summary handed to the callback
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Cycle number, starting at 1
    pub cycle: u64,
    /// Result of scanning the frame
    pub scan: ScanReport,
    /// Time to fetch and scan the frame
    pub elapsed: Duration,
    /// Rolling mean, once enough samples are held
    pub mean: Option<Duration>,
    /// Rolling mean is over the latency budget
    pub overrun: bool,
    /// Interval before the next cycle
    pub next_interval: Duration,
}

/// Why the worker ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopExit {
    /// `stop` was called
    Stopped,
    /// The source returned no frame
    SourceExhausted,
    /// The source reported an error
    SourceFailed(SourceError),
    /// The worker panicked (usually inside the callback)
    Panicked,
}

struct Worker {
    stop_tx: Sender<()>,
    handle: JoinHandle<LoopExit>,
}

/// Start/stop handle around the scan worker
pub struct ScanLoop {
    config: ScanConfig,
    worker: Option<Worker>,
}

impl ScanLoop {
    /// Idle loop with the given pacing
    pub fn new(config: ScanConfig) -> Self {
        Self { config, worker: None }
    }

    /// True while the worker is alive
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.handle.is_finished())
    }

    /// Spawn the worker
    ///
    /// Fails with [`ScanError::AlreadyRunning`] if a worker is still alive. A
    /// worker that already ended on its own is reaped first.
    pub fn start<S, D, P, F>(
        &mut self,
        source: S,
        scanner: Scanner<D>,
        policy: P,
        on_cycle: F,
    ) -> Result<(), ScanError>
    where
        S: FrameSource + 'static,
        D: Decoder + Send + 'static,
        P: AdjustmentPolicy + 'static,
        F: FnMut(CycleReport) + Send + 'static,
    {
        if self.is_running() {
            return Err(ScanError::AlreadyRunning);
        }
        self.stop();

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let config = self.config.clone();

        let handle = std::thread::Builder::new()
            .name("qr-scan".into())
            .spawn(move || {
                let mut source = source;
                let mut on_cycle = on_cycle;
                let mut state = ScanScheduleState::new(&config);
                let mut wake = match state.start(Instant::now()) {
                    Ok(at) => at,
                    Err(_) => return LoopExit::Stopped,
                };
                let mut cycle = 0u64;

                loop {
                    let timeout = wake.saturating_duration_since(Instant::now());
                    match stop_rx.recv_timeout(timeout) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                            state.stop();
                            return LoopExit::Stopped;
                        }
                    }

                    let started = Instant::now();
                    let frame = match source.next_frame() {
                        Ok(Some(frame)) => frame,
                        Ok(None) => {
                            state.fail();
                            info!(cycles = cycle, "frame source exhausted, scan loop idle");
                            return LoopExit::SourceExhausted;
                        }
                        Err(e) => {
                            state.fail();
                            warn!(
                                error = %e,
                                cycles = cycle,
                                "frame source failed, scan loop idle"
                            );
                            return LoopExit::SourceFailed(e);
                        }
                    };

                    let scan = scanner.scan(&frame);
                    let now = Instant::now();
                    let elapsed = now.duration_since(started);
                    let Some(outcome) = state.complete_cycle(now, elapsed, &policy) else {
                        return LoopExit::Stopped;
                    };
                    cycle += 1;

                    if outcome.overrun {
                        warn!(
                            cycle,
                            mean_ms = outcome.mean.map(|m| m.as_secs_f64() * 1000.0),
                            budget_ms = state.latency_budget().as_secs_f64() * 1000.0,
                            interval_ms = outcome.interval.as_millis() as u64,
                            "scan cycles over latency budget"
                        );
                    }
                    debug!(
                        cycle,
                        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                        codes = scan.codes.len(),
                        interval_ms = outcome.interval.as_millis() as u64,
                        "scan cycle"
                    );

                    on_cycle(CycleReport {
                        cycle,
                        scan,
                        elapsed,
                        mean: outcome.mean,
                        overrun: outcome.overrun,
                        next_interval: outcome.interval,
                    });
                    wake = outcome.next_wake;
                }
            })?;

        info!(
            interval_ms = self.config.default_interval.as_millis() as u64,
            budget_ms = self.config.latency_budget.as_millis() as u64,
            "scan loop started"
        );
        self.worker = Some(Worker { stop_tx, handle });
        Ok(())
    }

    /// Stop the worker and wait for it; `None` if nothing was started
    ///
    /// An in-flight cycle finishes (including its callback) before this
    /// returns.
    pub fn stop(&mut self) -> Option<LoopExit> {
        let worker = self.worker.take()?;
        let _ = worker.stop_tx.try_send(());
        let exit = worker.handle.join().unwrap_or(LoopExit::Panicked);
        info!(exit = ?exit, "scan loop stopped");
        Some(exit)
    }

    /// Block until the worker ends by itself (source exhausted or failed)
    pub fn wait(&mut self) -> Option<LoopExit> {
        let worker = self.worker.take()?;
        let exit = worker.handle.join().unwrap_or(LoopExit::Panicked);
        drop(worker.stop_tx);
        Some(exit)
    }
}

impl Drop for ScanLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::RawCode;
    use crate::error::DecodeError;
    use crate::scheduler::policy::MonitorOnly;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn null_scanner() -> Scanner<fn(&[u8], usize, usize) -> Result<Option<RawCode>, DecodeError>> {
        fn none(_: &[u8], _: usize, _: usize) -> Result<Option<RawCode>, DecodeError> {
            Ok(None)
        }
        Scanner::new(
            ScanConfig::live(),
            none as fn(&[u8], usize, usize) -> Result<Option<RawCode>, DecodeError>,
        )
        .unwrap()
    }

    fn fast_config() -> ScanConfig {
        ScanConfig::default().with_interval(Duration::from_millis(10))
    }

    #[test]
    fn test_exhausted_source_goes_idle() {
        let mut frames = 3;
        let source = move || -> Result<Option<LumaImage>, SourceError> {
            if frames == 0 {
                return Ok(None);
            }
            frames -= 1;
            Ok(Some(LumaImage::filled(30, 30, 128)))
        };
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();

        let mut scan_loop = ScanLoop::new(fast_config());
        scan_loop
            .start(source, null_scanner(), MonitorOnly, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        assert_eq!(scan_loop.wait(), Some(LoopExit::SourceExhausted));
        assert_eq!(seen.load(Ordering::SeqCst), 3);
        assert!(!scan_loop.is_running());
    }

    #[test]
    fn test_failing_source_reports_error() {
        let source = || -> Result<Option<LumaImage>, SourceError> {
            Err(SourceError::Unavailable("unplugged".into()))
        };
        let mut scan_loop = ScanLoop::new(fast_config());
        scan_loop.start(source, null_scanner(), MonitorOnly, |_| {}).unwrap();
        assert_eq!(
            scan_loop.wait(),
            Some(LoopExit::SourceFailed(SourceError::Unavailable("unplugged".into())))
        );
    }

    #[test]
    fn test_double_start_rejected() {
        let source = || -> Result<Option<LumaImage>, SourceError> {
            Ok(Some(LumaImage::filled(30, 30, 0)))
        };
        let mut scan_loop = ScanLoop::new(fast_config());
        scan_loop.start(source, null_scanner(), MonitorOnly, |_| {}).unwrap();
        let again = scan_loop.start(source, null_scanner(), MonitorOnly, |_| {});
        assert!(matches!(again, Err(ScanError::AlreadyRunning)));
        assert_eq!(scan_loop.stop(), Some(LoopExit::Stopped));
        assert_eq!(scan_loop.stop(), None);
    }
}

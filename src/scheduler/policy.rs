/// Interval adjustment policies
///
/// A policy only sees the current interval, the rolling mean and the budget,
/// and returns the interval for the next cycle. Overrun detection happens in
/// the state machine regardless of what the policy does with it.
use std::time::Duration;

/// Decides the next scan interval from measured cost
pub trait AdjustmentPolicy: Send {
    /// Interval to use after a cycle whose rolling mean is `mean`
    fn adjust(&self, interval: Duration, mean: Duration, budget: Duration) -> Duration;
}

impl<F> AdjustmentPolicy for F
where
    F: Fn(Duration, Duration, Duration) -> Duration + Send,
{
    fn adjust(&self, interval: Duration, mean: Duration, budget: Duration) -> Duration {
        self(interval, mean, budget)
    }
}

/// Never changes the interval
#[derive(Debug, Clone, Copy, Default)]
pub struct MonitorOnly;

impl AdjustmentPolicy for MonitorOnly {
    fn adjust(&self, interval: Duration, _mean: Duration, _budget: Duration) -> Duration {
        interval
    }
}

/// Multiplicative backoff while over budget, relaxing when well under it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    /// Growth factor per overrunning cycle (> 1)
    pub factor: f32,
    /// Upper bound on the interval
    pub max_interval: Duration,
    /// Lower bound when relaxing
    pub floor: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            factor: 1.5,
            max_interval: Duration::from_millis(1000),
            floor: Duration::from_millis(200),
        }
    }
}

impl AdjustmentPolicy for Backoff {
    fn adjust(&self, interval: Duration, mean: Duration, budget: Duration) -> Duration {
        let factor = if self.factor.is_finite() && self.factor > 1.0 {
            self.factor
        } else {
            return interval;
        };

        if mean > budget {
            scale(interval, factor as f64).min(self.max_interval)
        } else if mean < budget / 2 {
            scale(interval, 1.0 / factor as f64).max(self.floor)
        } else {
            interval
        }
    }
}

fn scale(d: Duration, by: f64) -> Duration {
    Duration::from_nanos((d.as_nanos() as f64 * by).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_monitor_only() {
        assert_eq!(MonitorOnly.adjust(ms(200), ms(500), ms(100)), ms(200));
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let p = Backoff::default();
        assert_eq!(p.adjust(ms(200), ms(150), ms(100)), ms(300));
        assert_eq!(p.adjust(ms(800), ms(150), ms(100)), ms(1000));
        assert_eq!(p.adjust(ms(1000), ms(150), ms(100)), ms(1000));
    }

    #[test]
    fn test_backoff_relaxes_to_floor() {
        let p = Backoff::default();
        assert_eq!(p.adjust(ms(600), ms(20), ms(100)), ms(400));
        assert_eq!(p.adjust(ms(250), ms(20), ms(100)), ms(200));
        // in the dead band nothing moves
        assert_eq!(p.adjust(ms(600), ms(70), ms(100)), ms(600));
    }

    #[test]
    fn test_closure_policy() {
        let double = |i: Duration, m: Duration, b: Duration| if m > b { i * 2 } else { i };
        assert_eq!(double.adjust(ms(200), ms(150), ms(100)), ms(400));
    }
}

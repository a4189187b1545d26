/// Bounded rolling window of cycle durations
use std::collections::VecDeque;
use std::time::Duration;

/// Most recent cycle durations, oldest evicted first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerformanceHistory {
    samples: VecDeque<Duration>,
    capacity: usize,
}

impl PerformanceHistory {
    /// Empty history holding at most `capacity` samples (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a sample, dropping the oldest when full
    pub fn push(&mut self, sample: Duration) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Number of samples held
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when no samples are held
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Maximum number of samples held
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent sample
    pub fn latest(&self) -> Option<Duration> {
        self.samples.back().copied()
    }

    /// Samples, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Duration> {
        self.samples.iter()
    }

    /// Mean of every held sample
    pub fn mean(&self) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        let total: Duration = self.samples.iter().sum();
        Some(total / self.samples.len() as u32)
    }

    /// Mean, but only once at least `min_samples` are held
    pub fn mean_over(&self, min_samples: usize) -> Option<Duration> {
        if self.samples.len() < min_samples {
            return None;
        }
        self.mean()
    }

    /// Drop every sample
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

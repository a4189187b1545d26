//! Detector and scan configuration
//!
//! Every knob that shapes the search (grid, scales, step, thresholds) or the
//! live-scan pacing is a plain field with a documented default. `from_env`
//! layers `QR_*` environment overrides on top of the defaults; values that do
//! not parse are ignored.

use crate::error::ConfigError;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

/// Default grid cells per axis
pub const DEFAULT_GRID_SIZE: usize = 7;
/// Default relative window sizes, as fractions of a cell's shorter side
pub const DEFAULT_SCALES: [f32; 6] = [0.1, 0.2, 0.3, 0.5, 0.7, 1.0];
/// Smallest plausible pattern side in pixels (21 modules at one pixel each)
pub const MIN_PATTERN_SIZE: usize = 21;

fn parse_env<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    lookup(name).and_then(|v| v.trim().parse::<T>().ok())
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn check_unit(name: &'static str, value: f32) -> Result<(), ConfigError> {
    check_range(name, value, 0.0, 1.0)
}

fn check_range(name: &'static str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    if !(min..=max).contains(&value) {
        return Err(ConfigError::OutOfRange {
            name,
            value: value as f64,
            min: min as f64,
            max: max as f64,
        });
    }
    Ok(())
}

/// Parameters of the candidate-region search
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    /// Cells per axis of the search grid
    pub grid_size: usize,
    /// Window sides as fractions of a cell's shorter side
    pub scales: Vec<f32>,
    /// Window step as a fraction of the window side (minimum step 1px)
    pub step_fraction: f32,
    /// Windows smaller than this are never scored
    pub min_pattern_size: usize,
    /// Windows must score strictly above this to be kept
    pub confidence_threshold: f32,
    /// Suppression drops candidates whose IoU with a kept one exceeds this
    pub iou_threshold: f32,
    /// Padding per side as a fraction of the region's shorter side
    pub expansion_fraction: f32,
    /// Overlap between neighbouring fallback tiles
    pub fallback_overlap: f32,
    /// Confidence assigned to every fallback tile
    pub fallback_confidence: f32,
    /// Run the grid search; when false only fallback tiles are produced
    pub heuristic_enabled: bool,
    /// Score grid cells on the rayon pool
    pub parallel: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            scales: DEFAULT_SCALES.to_vec(),
            step_fraction: 0.1,
            min_pattern_size: MIN_PATTERN_SIZE,
            confidence_threshold: 0.3,
            iou_threshold: 0.4,
            expansion_fraction: 0.1,
            fallback_overlap: 0.2,
            fallback_confidence: 0.5,
            heuristic_enabled: true,
            parallel: true,
        }
    }
}

impl DetectorConfig {
    /// Defaults with `QR_*` environment overrides applied
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    /// Defaults overridden by whatever `lookup` returns for each `QR_*` key
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        if let Some(v) = parse_env::<usize>(&lookup, "QR_GRID_SIZE") {
            cfg.grid_size = v.max(1);
        }
        if let Some(v) = parse_env::<f32>(&lookup, "QR_CONFIDENCE_THRESHOLD") {
            cfg.confidence_threshold = v.clamp(0.0, 1.0);
        }
        if let Some(v) = parse_env::<f32>(&lookup, "QR_IOU_THRESHOLD") {
            cfg.iou_threshold = v.clamp(0.0, 1.0);
        }
        if let Some(v) = parse_env::<u8>(&lookup, "QR_HEURISTIC") {
            cfg.heuristic_enabled = v != 0;
        }
        cfg
    }

    /// Set the grid size
    pub fn with_grid_size(mut self, grid_size: usize) -> Self {
        self.grid_size = grid_size;
        self
    }

    /// Replace the scale list
    pub fn with_scales(mut self, scales: impl Into<Vec<f32>>) -> Self {
        self.scales = scales.into();
        self
    }

    /// Set the window step fraction
    pub fn with_step_fraction(mut self, step_fraction: f32) -> Self {
        self.step_fraction = step_fraction;
        self
    }

    /// Set the confidence threshold
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Set the suppression IoU threshold
    pub fn with_iou_threshold(mut self, threshold: f32) -> Self {
        self.iou_threshold = threshold;
        self
    }

    /// Enable or disable the grid search
    pub fn with_heuristic(mut self, enabled: bool) -> Self {
        self.heuristic_enabled = enabled;
        self
    }

    /// Enable or disable parallel cell scoring
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Check every field against its allowed range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_size == 0 {
            return Err(ConfigError::GridSize(self.grid_size));
        }
        if self.scales.is_empty() || self.scales.iter().any(|s| !(*s > 0.0 && *s <= 1.0)) {
            return Err(ConfigError::Scales(self.scales.clone()));
        }
        if self.min_pattern_size == 0 {
            return Err(ConfigError::Zero("min_pattern_size"));
        }
        check_unit("step_fraction", self.step_fraction)?;
        check_unit("confidence_threshold", self.confidence_threshold)?;
        check_unit("iou_threshold", self.iou_threshold)?;
        check_range("expansion_fraction", self.expansion_fraction, 0.0, 0.5)?;
        check_range("fallback_overlap", self.fallback_overlap, 0.0, 0.9)?;
        check_unit("fallback_confidence", self.fallback_confidence)?;
        Ok(())
    }
}

/// Whether a scan tries the whole frame before searching for regions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanStrategy {
    /// Region search only (whole frame is tried last, if enabled)
    #[default]
    HeuristicOnly,
    /// One whole-frame decode first; region search only if it misses
    DirectThenHeuristic,
}

impl FromStr for ScanStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "heuristic" | "heuristic-only" => Ok(ScanStrategy::HeuristicOnly),
            "direct" | "direct-then-heuristic" => Ok(ScanStrategy::DirectThenHeuristic),
            other => Err(ConfigError::Strategy(other.to_string())),
        }
    }
}

/// Fixed sub-frames decoded alongside the whole-frame attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubframeSet {
    /// Whole frame only
    Off,
    /// The four half-size quadrants
    #[default]
    Quadrants,
    /// The centered half-size window and the top half; cheaper, for live use
    CenterTop,
}

impl FromStr for SubframeSet {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" => Ok(SubframeSet::Off),
            "quadrants" => Ok(SubframeSet::Quadrants),
            "center-top" | "center" => Ok(SubframeSet::CenterTop),
            other => Err(ConfigError::Subframes(other.to_string())),
        }
    }
}

/// Full scan configuration: detection plus decode and live pacing
#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    /// Region search parameters
    pub detector: DetectorConfig,
    /// Direct-first or region-only
    pub strategy: ScanStrategy,
    /// Decode at most this many regions per scan (highest confidence first)
    pub max_regions: Option<usize>,
    /// Contrast factor applied to each crop before decoding
    pub contrast_factor: f32,
    /// Also try the whole frame when it was not tried up front, then the
    /// sub-frames in `subframes`
    pub full_image_fallback: bool,
    /// Sub-frames tried after the whole frame
    pub subframes: SubframeSet,
    /// Interval between live cycles until a policy changes it
    pub default_interval: Duration,
    /// Number of recent cycle durations kept
    pub history_window: usize,
    /// Samples needed before the rolling mean is judged
    pub min_samples: usize,
    /// Rolling mean above this counts as an overrun
    pub latency_budget: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            strategy: ScanStrategy::default(),
            max_regions: None,
            contrast_factor: 1.3,
            full_image_fallback: true,
            subframes: SubframeSet::Quadrants,
            default_interval: Duration::from_millis(200),
            history_window: 10,
            min_samples: 5,
            latency_budget: Duration::from_millis(100),
        }
    }
}

impl ScanConfig {
    /// Settings for a live source: three regions per cycle, center and top
    /// half instead of quadrants
    pub fn live() -> Self {
        Self {
            max_regions: Some(3),
            subframes: SubframeSet::CenterTop,
            ..Self::default()
        }
    }

    /// Defaults with `QR_*` environment overrides applied
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    /// Environment configuration read once per process
    pub fn global() -> &'static ScanConfig {
        static GLOBAL: OnceLock<ScanConfig> = OnceLock::new();
        GLOBAL.get_or_init(Self::from_env)
    }

    /// Defaults overridden by whatever `lookup` returns for each `QR_*` key
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self {
            detector: DetectorConfig::from_lookup(&lookup),
            ..Self::default()
        };
        if let Some(v) = parse_env::<u64>(&lookup, "QR_SCAN_INTERVAL_MS") {
            cfg.default_interval = Duration::from_millis(v.max(1));
        }
        if let Some(v) = parse_env::<u64>(&lookup, "QR_LATENCY_BUDGET_MS") {
            cfg.latency_budget = Duration::from_millis(v);
        }
        if let Some(v) = parse_env::<ScanStrategy>(&lookup, "QR_SCAN_STRATEGY") {
            cfg.strategy = v;
        }
        if let Some(v) = parse_env::<usize>(&lookup, "QR_MAX_REGIONS") {
            cfg.max_regions = if v == 0 { None } else { Some(v) };
        }
        if let Some(v) = parse_env::<SubframeSet>(&lookup, "QR_SUBFRAMES") {
            cfg.subframes = v;
        }
        cfg
    }

    /// Replace the detector settings
    pub fn with_detector(mut self, detector: DetectorConfig) -> Self {
        self.detector = detector;
        self
    }

    /// Set the strategy
    pub fn with_strategy(mut self, strategy: ScanStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Cap the number of regions decoded per scan
    pub fn with_max_regions(mut self, max_regions: Option<usize>) -> Self {
        self.max_regions = max_regions;
        self
    }

    /// Set the live-scan interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.default_interval = interval;
        self
    }

    /// Set the latency budget
    pub fn with_latency_budget(mut self, budget: Duration) -> Self {
        self.latency_budget = budget;
        self
    }

    /// Enable or disable the whole-frame attempt
    pub fn with_full_image_fallback(mut self, enabled: bool) -> Self {
        self.full_image_fallback = enabled;
        self
    }

    /// Choose the sub-frames tried after the whole frame
    pub fn with_subframes(mut self, subframes: SubframeSet) -> Self {
        self.subframes = subframes;
        self
    }

    /// Set how many recent cycles are kept and how many are needed for a mean
    pub fn with_history(mut self, window: usize, min_samples: usize) -> Self {
        self.history_window = window;
        self.min_samples = min_samples;
        self
    }

    /// Check every field against its allowed range
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.detector.validate()?;
        if self.default_interval.is_zero() {
            return Err(ConfigError::Zero("default_interval"));
        }
        if self.history_window == 0 {
            return Err(ConfigError::Zero("history_window"));
        }
        if self.min_samples == 0 {
            return Err(ConfigError::Zero("min_samples"));
        }
        // a mean needing more samples than the window holds would never exist
        if self.min_samples > self.history_window {
            return Err(ConfigError::OutOfRange {
                name: "min_samples",
                value: self.min_samples as f64,
                min: 1.0,
                max: self.history_window as f64,
            });
        }
        check_range("contrast_factor", self.contrast_factor, 0.0, 4.0)?;
        Ok(())
    }
}

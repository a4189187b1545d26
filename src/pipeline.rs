//! Detection and scan pipeline
//!
//! [`RegionDetector`] runs the candidate stages on one luminance frame:
//! grid search (or fallback tiling), suppression, expansion. [`Scanner`]
//! adds the decode half: crop each region, stretch its contrast, hand it to a
//! [`Decoder`], and translate hits back to full-frame coordinates. A decoder
//! that errors or panics on one region costs that region only.

use crate::config::{DetectorConfig, ScanConfig, ScanStrategy};
use crate::decode::{Decoder, RawCode};
use crate::detector::{expand, fallback, grid, nms};
use crate::error::{ConfigError, DecodeError};
use crate::models::{CodeSource, ColorImage, DecodedCode, LumaImage, Region};
use crate::utils::contrast::enhance_contrast_in_place;
use crate::utils::crop::crop;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Output of one detection pass
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Detection {
    /// Expanded regions, highest confidence first
    pub regions: Vec<Region>,
    /// Heuristic windows above threshold before suppression
    pub raw_candidates: usize,
    /// True when the regions are fallback tiles
    pub used_fallback: bool,
}

/// Candidate-region detector
#[derive(Debug, Clone, Default)]
pub struct RegionDetector {
    config: DetectorConfig,
}

impl RegionDetector {
    /// Create a detector with the given settings
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// Settings in use
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Detect candidate regions in a luminance frame
    ///
    /// Fallback tiles skip suppression: they are distinct by construction,
    /// and suppressing the edge-pinned tiles would reopen coverage gaps.
    pub fn detect(&self, image: &LumaImage) -> Detection {
        let (w, h) = (image.width(), image.height());
        let cfg = &self.config;

        let raw = if cfg.heuristic_enabled {
            grid::search(image, cfg)
        } else {
            Vec::new()
        };
        let raw_candidates = raw.len();

        let (kept, used_fallback) = if raw.is_empty() {
            let tiles =
                fallback::fallback_regions(w, h, cfg.fallback_overlap, cfg.fallback_confidence);
            debug!(
                width = w,
                height = h,
                tiles = tiles.len(),
                heuristic = cfg.heuristic_enabled,
                "no heuristic candidates, using fallback tiling"
            );
            (tiles, true)
        } else {
            let kept = nms::suppress(raw, cfg.iou_threshold);
            trace!(raw = raw_candidates, kept = kept.len(), "suppression complete");
            (kept, false)
        };

        Detection {
            regions: expand::expand_regions(&kept, cfg.expansion_fraction, w, h),
            raw_candidates,
            used_fallback,
        }
    }

    /// Reduce a color frame to luminance once, then detect
    pub fn detect_color(&self, image: &ColorImage) -> Detection {
        self.detect(&LumaImage::from_color(image))
    }
}

/// Everything one scan produced
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScanReport {
    /// Decoded codes, one per distinct payload
    pub codes: Vec<DecodedCode>,
    /// Regions the detector handed over (empty after a direct hit)
    pub regions: Vec<Region>,
    /// True when the regions came from fallback tiling
    pub used_fallback: bool,
    /// Wall time of the whole scan
    pub elapsed: Duration,
}

impl ScanReport {
    /// True when nothing decoded
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Detector plus decoder
///
/// With `max_regions` set and a frame that fell back to tiling, successive
/// scans walk through the tiles `max_regions` at a time, so a live source
/// reaches every tile within a few cycles.
#[derive(Debug)]
pub struct Scanner<D> {
    detector: RegionDetector,
    decoder: D,
    config: ScanConfig,
    tile_cursor: AtomicUsize,
}

impl<D: Clone> Clone for Scanner<D> {
    fn clone(&self) -> Self {
        Self {
            detector: self.detector.clone(),
            decoder: self.decoder.clone(),
            config: self.config.clone(),
            tile_cursor: AtomicUsize::new(self.tile_cursor.load(Ordering::Relaxed)),
        }
    }
}

impl<D: Decoder> Scanner<D> {
    /// Validate `config` and build a scanner around `decoder`
    pub fn new(config: ScanConfig, decoder: D) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            detector: RegionDetector::new(config.detector.clone()),
            decoder,
            config,
            tile_cursor: AtomicUsize::new(0),
        })
    }

    /// Settings in use
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// The detection half on its own
    pub fn detector(&self) -> &RegionDetector {
        &self.detector
    }

    /// Scan one luminance frame
    pub fn scan(&self, image: &LumaImage) -> ScanReport {
        let start = Instant::now();
        let mut direct_tried = false;

        if self.config.strategy == ScanStrategy::DirectThenHeuristic {
            direct_tried = true;
            if let Some(code) = self.decode_direct(image) {
                debug!(payload_len = code.payload.len(), "direct decode hit");
                return ScanReport {
                    codes: vec![code],
                    regions: Vec::new(),
                    used_fallback: false,
                    elapsed: start.elapsed(),
                };
            }
        }

        let detection = self.detector.detect(image);
        let mut codes = self.decode_regions(image, self.pick_regions(&detection));

        if self.config.full_image_fallback {
            if !direct_tried {
                codes.extend(self.decode_direct(image));
            }
            let subframes = fallback::subframe_regions(
                self.config.subframes,
                image.width(),
                image.height(),
                self.config.detector.fallback_confidence,
            );
            codes.extend(self.decode_regions(image, &subframes));
        }
        dedup_by_payload(&mut codes);

        let elapsed = start.elapsed();
        debug!(
            regions = detection.regions.len(),
            fallback = detection.used_fallback,
            codes = codes.len(),
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "scan complete"
        );

        ScanReport {
            codes,
            regions: detection.regions,
            used_fallback: detection.used_fallback,
            elapsed,
        }
    }

    /// Regions to decode this scan, honoring `max_regions`
    fn pick_regions<'a>(&self, detection: &'a Detection) -> Vec<&'a Region> {
        let regions = &detection.regions;
        let limit = self.config.max_regions.unwrap_or(usize::MAX);
        if !detection.used_fallback || limit >= regions.len() {
            return regions.iter().take(limit).collect();
        }
        let n = regions.len();
        let start = self.tile_cursor.fetch_add(limit, Ordering::Relaxed) % n;
        trace!(start, limit, tiles = n, "rotating fallback tiles");
        (0..limit).map(|i| &regions[(start + i) % n]).collect()
    }

    /// Crop, enhance and decode each region in turn
    ///
    /// A region whose decode fails is logged and skipped.
    pub fn decode_regions<'a>(
        &self,
        image: &LumaImage,
        regions: impl IntoIterator<Item = &'a Region>,
    ) -> Vec<DecodedCode> {
        regions
            .into_iter()
            .filter_map(|region| self.decode_region(image, region))
            .collect()
    }

    fn decode_region(&self, image: &LumaImage, region: &Region) -> Option<DecodedCode> {
        let mut patch = crop(image, &region.rect);
        if patch.width() == 0 || patch.height() == 0 {
            return None;
        }
        enhance_contrast_in_place(patch.data_mut(), self.config.contrast_factor);

        match self.guarded_decode(patch.data(), patch.width(), patch.height()) {
            Ok(Some(raw)) => Some(DecodedCode {
                payload: raw.payload,
                corners: raw.corners.offset(region.rect.x as f32, region.rect.y as f32),
                source: CodeSource::Region(*region),
                confidence: region.confidence,
            }),
            Ok(None) => None,
            Err(e) => {
                warn!(
                    error = %e,
                    x = region.rect.x,
                    y = region.rect.y,
                    width = region.rect.width,
                    height = region.rect.height,
                    kind = region.kind.as_str(),
                    "region decode failed"
                );
                None
            }
        }
    }

    fn decode_direct(&self, image: &LumaImage) -> Option<DecodedCode> {
        match self.guarded_decode(image.data(), image.width(), image.height()) {
            Ok(Some(raw)) => Some(DecodedCode {
                payload: raw.payload,
                corners: raw.corners,
                source: CodeSource::Direct,
                confidence: 1.0,
            }),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "full-frame decode failed");
                None
            }
        }
    }

    /// Run the decoder, turning a panic into a [`DecodeError`]
    fn guarded_decode(
        &self,
        luma: &[u8],
        width: usize,
        height: usize,
    ) -> Result<Option<RawCode>, DecodeError> {
        panic::catch_unwind(AssertUnwindSafe(|| self.decoder.decode(luma, width, height)))
            .unwrap_or_else(|payload| {
                let msg = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(DecodeError(format!("decoder panicked: {msg}")))
            })
    }
}

#[cfg(feature = "rqrr")]
impl Scanner<crate::decode::RqrrDecoder> {
    /// Scanner backed by rqrr
    pub fn with_rqrr(config: ScanConfig) -> Result<Self, ConfigError> {
        Self::new(config, crate::decode::RqrrDecoder::new())
    }
}

/// Keep the first code of each payload
fn dedup_by_payload(codes: &mut Vec<DecodedCode>) {
    let mut seen = HashSet::new();
    codes.retain(|c| seen.insert(c.payload.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SubframeSet;
    use crate::models::{Corners, Point, Rect, RegionKind};
    use std::cell::Cell;

    fn unit_corners() -> Corners {
        Corners::from_clockwise([
            Point::new(1.0, 1.0),
            Point::new(5.0, 1.0),
            Point::new(5.0, 5.0),
            Point::new(1.0, 5.0),
        ])
    }

    #[test]
    fn test_detect_uniform_uses_fallback() {
        let img = LumaImage::filled(90, 60, 128);
        let det = RegionDetector::default().detect(&img);
        assert!(det.used_fallback);
        assert_eq!(det.raw_candidates, 0);
        assert!(!det.regions.is_empty());
        for r in &det.regions {
            assert_eq!(r.kind, RegionKind::Fallback);
            assert!(r.rect.fits_within(90, 60));
        }
    }

    #[test]
    fn test_detect_heuristic_disabled() {
        let data: Vec<u8> = (0..140 * 140).map(|i: usize| (i * 97 % 256) as u8).collect();
        let img = LumaImage::new(140, 140, data).unwrap();
        let cfg = DetectorConfig::default()
            .with_heuristic(false)
            .with_confidence_threshold(0.0);
        let det = RegionDetector::new(cfg).detect(&img);
        assert!(det.used_fallback);
        assert!(det.regions.iter().all(|r| r.kind == RegionKind::Fallback));
    }

    #[test]
    fn test_scan_offsets_corners_and_dedups() {
        let img = LumaImage::filled(90, 90, 128);
        let decoder = |_: &[u8], _: usize, _: usize| -> Result<Option<RawCode>, DecodeError> {
            Ok(Some(RawCode::new("same", unit_corners())))
        };
        let scanner = Scanner::new(ScanConfig::default(), decoder).unwrap();
        let report = scanner.scan(&img);

        assert!(report.used_fallback);
        assert_eq!(report.codes.len(), 1);
        let code = &report.codes[0];
        let region = code.source_region().copied().unwrap();
        assert_eq!(code.confidence, region.confidence);
        assert_eq!(
            code.corners.top_left,
            Point::new(1.0 + region.rect.x as f32, 1.0 + region.rect.y as f32)
        );
    }

    #[test]
    fn test_scan_survives_decoder_errors() {
        let img = LumaImage::filled(90, 90, 128);
        let calls = Cell::new(0usize);
        let decoder = |_: &[u8], w: usize, h: usize| -> Result<Option<RawCode>, DecodeError> {
            calls.set(calls.get() + 1);
            if w == 90 && h == 90 {
                Ok(Some(RawCode::new("whole", unit_corners())))
            } else {
                Err(DecodeError("corrupt symbol".into()))
            }
        };
        let scanner = Scanner::new(ScanConfig::default(), &decoder).unwrap();
        let report = scanner.scan(&img);
        assert_eq!(report.codes.len(), 1);
        assert_eq!(report.codes[0].source, CodeSource::Direct);
        // every region, the whole frame and the four quadrants
        assert_eq!(calls.get(), report.regions.len() + 1 + 4);
    }

    #[test]
    fn test_direct_first_short_circuits() {
        let img = LumaImage::filled(60, 60, 128);
        let decoder = |_: &[u8], w: usize, _: usize| -> Result<Option<RawCode>, DecodeError> {
            Ok((w == 60).then(|| RawCode::new("direct", unit_corners())))
        };
        let cfg = ScanConfig::default().with_strategy(ScanStrategy::DirectThenHeuristic);
        let report = Scanner::new(cfg, decoder).unwrap().scan(&img);
        assert_eq!(report.codes.len(), 1);
        assert_eq!(report.codes[0].confidence, 1.0);
        assert!(report.regions.is_empty());
    }

    #[test]
    fn test_max_regions_limits_decodes() {
        let img = LumaImage::filled(300, 300, 128);
        let calls = Cell::new(0usize);
        let decoder = |_: &[u8], _: usize, _: usize| -> Result<Option<RawCode>, DecodeError> {
            calls.set(calls.get() + 1);
            Ok(None)
        };
        let cfg = ScanConfig::live().with_full_image_fallback(false);
        let report = Scanner::new(cfg, &decoder).unwrap().scan(&img);
        assert!(report.regions.len() > 3);
        assert_eq!(calls.get(), 3);
        assert!(report.is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let decoder =
            |_: &[u8], _: usize, _: usize| -> Result<Option<RawCode>, DecodeError> { Ok(None) };
        let cfg = ScanConfig::default().with_detector(DetectorConfig::default().with_grid_size(0));
        assert!(Scanner::new(cfg, decoder).is_err());
    }

    #[test]
    fn test_scan_survives_decoder_panics() {
        let img = LumaImage::filled(90, 90, 128);
        let decoder = |_: &[u8], w: usize, _: usize| -> Result<Option<RawCode>, DecodeError> {
            if w < 90 {
                panic!("crop too small");
            }
            Ok(Some(RawCode::new("whole", unit_corners())))
        };
        let report = Scanner::new(ScanConfig::default(), decoder).unwrap().scan(&img);
        assert_eq!(report.codes.len(), 1);
        assert_eq!(report.codes[0].source, CodeSource::Direct);

        let all_panic = |_: &[u8], _: usize, _: usize| -> Result<Option<RawCode>, DecodeError> {
            panic!("broken decoder")
        };
        let cfg = ScanConfig::default().with_strategy(ScanStrategy::DirectThenHeuristic);
        assert!(Scanner::new(cfg, all_panic).unwrap().scan(&img).is_empty());
    }

    #[test]
    fn test_quadrant_pass_finds_code() {
        let img = LumaImage::filled(90, 90, 128);
        // only a quadrant-sized crop holds the code
        let decoder = |_: &[u8], w: usize, h: usize| -> Result<Option<RawCode>, DecodeError> {
            Ok((w == 45 && h == 45).then(|| RawCode::new("quad", unit_corners())))
        };
        let report = Scanner::new(ScanConfig::default(), decoder).unwrap().scan(&img);
        assert_eq!(report.codes.len(), 1);
        let region = report.codes[0].source_region().copied().unwrap();
        assert_eq!(region.kind, RegionKind::Subframe);
        assert_eq!(region.rect, Rect::new(0, 0, 45, 45));

        let off = ScanConfig::default().with_subframes(SubframeSet::Off);
        assert!(Scanner::new(off, decoder).unwrap().scan(&img).is_empty());
    }

    #[test]
    fn test_live_fallback_reaches_bottom_tiles() {
        // bright patch near the bottom-right corner; it survives the contrast
        // stretch above 215 while the 128 background lands at 204
        let mut img = LumaImage::filled(300, 300, 128);
        for y in 270..280 {
            for x in 270..280 {
                img.set(x, y, 140);
            }
        }
        let decoder = |luma: &[u8], _: usize, _: usize| -> Result<Option<RawCode>, DecodeError> {
            Ok(luma
                .iter()
                .any(|&v| v >= 215)
                .then(|| RawCode::new("corner", unit_corners())))
        };
        let cfg = ScanConfig::live()
            .with_detector(DetectorConfig::default().with_heuristic(false))
            .with_full_image_fallback(false);
        let scanner = Scanner::new(cfg, decoder).unwrap();

        let first = scanner.scan(&img);
        assert_eq!(first.regions.len(), 16);
        assert!(first.is_empty());

        let found = (0..6).find_map(|_| scanner.scan(&img).codes.into_iter().next());
        let code = found.expect("bottom tile never decoded");
        let rect = code.source_region().unwrap().rect;
        assert!(rect.bottom() > 280 && rect.right() > 280);
    }
}

use qr_scout::detector::scorer::PatternScorer;
use qr_scout::detector::{expand, fallback, grid, nms};
use qr_scout::{DetectorConfig, LumaImage, Rect, RegionDetector, RegionKind};

const MODULE: usize = 4;
const MODULES: usize = 50;
const ORIGIN: usize = 5;
const FINDERS: [(usize, usize); 3] = [(0, 0), (MODULES - 7, 0), (0, MODULES - 7)];

struct XorShift(u32);

impl XorShift {
    fn next(&mut self) -> u32 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 17;
        self.0 ^= self.0 << 5;
        self.0
    }
}

/// Dark/light for a module inside a finder marker, `None` elsewhere
fn finder_module(mx: usize, my: usize) -> Option<bool> {
    for (fx, fy) in FINDERS {
        if (fx..fx + 7).contains(&mx) && (fy..fy + 7).contains(&my) {
            let (lx, ly) = (mx - fx, my - fy);
            let ring = lx == 0 || lx == 6 || ly == 0 || ly == 6;
            let core = (2..=4).contains(&lx) && (2..=4).contains(&ly);
            return Some(ring || core);
        }
    }
    None
}

fn in_separator(mx: usize, my: usize) -> bool {
    FINDERS.iter().any(|&(fx, fy)| {
        let x0 = fx.saturating_sub(1);
        let y0 = fy.saturating_sub(1);
        (x0..=fx + 7).contains(&mx) && (y0..=fy + 7).contains(&my)
    })
}

/// 210x210 white frame holding a 50x50-module code (4 px modules) at (5, 5):
/// finder markers in three corners, pseudo-random data elsewhere
fn synthetic_code() -> LumaImage {
    let side = ORIGIN * 2 + MODULE * MODULES;
    let mut img = LumaImage::filled(side, side, 255);
    let mut rng = XorShift(0x9e37_79b9);

    for my in 0..MODULES {
        for mx in 0..MODULES {
            let dark = match finder_module(mx, my) {
                Some(dark) => dark,
                None if in_separator(mx, my) => false,
                None => rng.next() & 1 == 1,
            };
            if !dark {
                continue;
            }
            for py in 0..MODULE {
                for px in 0..MODULE {
                    img.set(ORIGIN + mx * MODULE + px, ORIGIN + my * MODULE + py, 0);
                }
            }
        }
    }
    img
}

fn noise_frame(width: usize, height: usize, seed: u32) -> LumaImage {
    let mut rng = XorShift(seed);
    let data = (0..width * height).map(|_| (rng.next() >> 8) as u8).collect();
    LumaImage::new(width, height, data).unwrap()
}

/// One cell, one 200px window size, 5px steps
fn single_window_config() -> DetectorConfig {
    DetectorConfig::default()
        .with_grid_size(1)
        .with_scales(vec![0.9525])
        .with_step_fraction(0.0251)
}

#[test]
fn uniform_gray_falls_back() {
    let img = LumaImage::filled(700, 700, 128);

    for rect in [
        Rect::square(0, 0, 100),
        Rect::square(300, 300, 70),
        Rect::square(650, 10, 50),
        Rect::new(20, 400, 300, 200),
    ] {
        let b = PatternScorer::breakdown(&img, &rect);
        assert_eq!(b.quiet_zone, 0.0);
        assert_eq!(b.variation, 0.0);
        assert!(PatternScorer::score(&img, &rect) < 0.3);
    }

    let cfg = DetectorConfig::default();
    assert!(grid::search(&img, &cfg).is_empty());

    let detection = RegionDetector::new(cfg).detect(&img);
    assert_eq!(detection.raw_candidates, 0);
    assert!(detection.used_fallback);
    assert!(!detection.regions.is_empty());
    assert!(detection.regions.iter().all(|r| r.kind == RegionKind::Fallback));
    assert!(detection.regions.iter().all(|r| r.confidence == 0.5));
}

#[test]
fn synthetic_code_window_scores_high() {
    let img = synthetic_code();
    let target = Rect::square(ORIGIN, ORIGIN, MODULE * MODULES);

    let b = PatternScorer::breakdown(&img, &target);
    assert!(b.top_left > 0.99, "{b:?}");
    assert!(b.top_right > 0.99, "{b:?}");
    assert!(b.bottom_left > 0.99, "{b:?}");
    assert_eq!(b.quiet_zone, 1.0);
    assert!(b.variation > 0.8, "{b:?}");
    assert!(b.confidence() > 0.9);
}

#[test]
fn synthetic_code_is_found() {
    let img = synthetic_code();
    let target = Rect::square(ORIGIN, ORIGIN, MODULE * MODULES);
    let cfg = single_window_config();

    let raw = grid::search(&img, &cfg);
    assert!(raw.iter().all(|r| r.rect.width == 200));
    let kept = nms::suppress(raw, cfg.iou_threshold);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].rect, target);
    assert!(kept[0].confidence >= 0.3);

    let detection = RegionDetector::new(cfg).detect(&img);
    assert!(!detection.used_fallback);
    let best = &detection.regions[0];
    assert_eq!(best.kind, RegionKind::Heuristic);
    assert_eq!(best.rect, Rect::new(0, 0, 210, 210));
    assert!(best.rect.overlaps(&target));

    // Default settings still hand over something covering the code
    let default = RegionDetector::default().detect(&img);
    assert!(
        default
            .regions
            .iter()
            .any(|r| r.rect.overlaps(&target) && r.confidence >= 0.3)
    );
}

#[test]
fn scoring_is_deterministic() {
    let img = noise_frame(160, 120, 7);
    let rect = Rect::square(13, 9, 90);
    let first = PatternScorer::breakdown(&img, &rect);
    for _ in 0..5 {
        assert_eq!(PatternScorer::breakdown(&img, &rect), first);
    }
    let copy = LumaImage::new(160, 120, img.data().to_vec()).unwrap();
    assert_eq!(PatternScorer::score(&copy, &rect), first.confidence());
}

#[test]
fn search_respects_minimum_pattern_size() {
    let img = noise_frame(300, 220, 11);
    let cfg = DetectorConfig::default().with_confidence_threshold(0.0);
    let raw = grid::search(&img, &cfg);
    assert!(!raw.is_empty());
    for region in &raw {
        assert!(region.rect.width >= 21 && region.rect.height >= 21);
        assert!(region.rect.fits_within(300, 220));
        assert!((0.0..=1.0).contains(&region.confidence));
    }
}

#[test]
fn suppression_leaves_no_overlapping_pair() {
    let img = noise_frame(280, 280, 23);
    let raw = grid::search(&img, &DetectorConfig::default().with_confidence_threshold(0.0));
    for threshold in [0.1, 0.4, 0.8] {
        let kept = nms::suppress(raw.clone(), threshold);
        for (i, a) in kept.iter().enumerate() {
            for b in &kept[i + 1..] {
                assert!(nms::iou(&a.rect, &b.rect) <= threshold);
            }
        }
    }
}

#[test]
fn expansion_stays_in_bounds() {
    let img = noise_frame(233, 151, 31);
    let raw = grid::search(&img, &DetectorConfig::default().with_confidence_threshold(0.0));
    for fraction in [0.0, 0.1, 0.5] {
        for region in expand::expand_regions(&raw, fraction, 233, 151) {
            assert!(region.rect.fits_within(233, 151));
        }
    }
}

#[test]
fn fallback_covers_every_pixel() {
    for (w, h) in [(3, 3), (5, 40), (64, 48), (333, 101), (700, 700)] {
        let mut covered = vec![false; w * h];
        for region in fallback::fallback_regions(w, h, 0.2, 0.5) {
            let r = region.rect;
            assert!(r.fits_within(w, h));
            for y in r.y..r.bottom() {
                for x in r.x..r.right() {
                    covered[y * w + x] = true;
                }
            }
        }
        assert!(covered.iter().all(|&c| c), "gap in {w}x{h}");
    }
}

#[test]
fn parallel_and_serial_agree() {
    let img = noise_frame(210, 180, 5);
    let cfg = DetectorConfig::default().with_confidence_threshold(0.2);
    let par = RegionDetector::new(cfg.clone().with_parallel(true)).detect(&img);
    let seq = RegionDetector::new(cfg.with_parallel(false)).detect(&img);
    assert_eq!(par, seq);
}

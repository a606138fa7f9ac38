// End-to-end properties of the diff engine, exercised through the public API.
use proptest::prelude::*;
use regression_vision::config::ComparisonConfig;
use regression_vision::core_modules::difference_reducer::{luma, mask_from_fn, reduce};
use regression_vision::core_modules::history::{ComparisonHistory, HistoryEntry};
use regression_vision::core_modules::region_extractor::region_extractor::extract;
use regression_vision::core_modules::severity::classify;
use regression_vision::{RgbFrame, Verdict, compare};

fn frame_from(width: u32, height: u32, bytes: &[u8]) -> RgbFrame {
    RgbFrame::new(width, height, bytes.to_vec()).unwrap()
}

fn arb_pair() -> impl Strategy<Value = (u32, u32, Vec<u8>, Vec<u8>)> {
    (1u32..12, 1u32..12).prop_flat_map(|(w, h)| {
        let len = (w * h * 3) as usize;
        (
            Just(w),
            Just(h),
            prop::collection::vec(any::<u8>(), len),
            prop::collection::vec(any::<u8>(), len),
        )
    })
}

proptest! {
    #[test]
    fn diff_percent_never_increases_with_tolerance((w, h, a, b) in arb_pair()) {
        let a = frame_from(w, h, &a);
        let b = frame_from(w, h, &b);
        let mut previous = f64::INFINITY;
        for tolerance in 0..=255u8 {
            let percent = reduce(&a, &b, tolerance).unwrap().diff_percent;
            prop_assert!(percent <= previous);
            previous = percent;
        }
    }

    #[test]
    fn tolerance_255_never_flags_anything((w, h, a, b) in arb_pair()) {
        let a = frame_from(w, h, &a);
        let b = frame_from(w, h, &b);
        prop_assert_eq!(reduce(&a, &b, 255).unwrap().diff_percent, 0.0);
    }

    #[test]
    fn luma_never_exceeds_255(r in any::<u8>(), g in any::<u8>(), b in any::<u8>()) {
        let value = luma([r, g, b]) as u32;
        prop_assert!(value <= r.max(g).max(b) as u32);
    }

    #[test]
    fn self_comparison_is_clean((w, h, a, _b) in arb_pair(), tolerance in any::<u8>()) {
        let a = frame_from(w, h, &a);
        let config = ComparisonConfig { tolerance, ..ComparisonConfig::default() };
        let result = compare(a.clone(), a, config).unwrap();
        prop_assert_eq!(result.diff_percent(), 0.0);
        prop_assert!(result.regions().is_empty());
    }

    #[test]
    fn any_size_pair_is_resized_to_the_baseline(
        bw in 1u32..40, bh in 1u32..40, cw in 1u32..40, ch in 1u32..40,
    ) {
        let baseline = RgbFrame::filled(bw, bh, [10, 20, 30]).unwrap();
        let candidate = RgbFrame::filled(cw, ch, [200, 100, 0]).unwrap();
        let result = compare(baseline, candidate, ComparisonConfig::default()).unwrap();
        prop_assert_eq!(result.highlighted().dimensions(), (bw, bh));
        prop_assert_eq!(result.heatmap().dimensions(), (bw, bh));
        prop_assert_eq!(result.warnings().is_empty(), (bw, bh) == (cw, ch));
    }

    #[test]
    fn regions_never_overlap_and_cover_every_changed_pixel(
        cells in prop::collection::vec(any::<bool>(), 400),
    ) {
        let mask = mask_from_fn(20, 20, |x, y| cells[(y * 20 + x) as usize]);
        let regions = extract(&mask);
        let total: u64 = regions.iter().map(|r| r.pixel_count).sum();
        let changed = cells.iter().filter(|&&c| c).count() as u64;
        prop_assert_eq!(total, changed);
        for r in &regions {
            prop_assert!(r.width > 0 && r.height > 0);
            prop_assert!(r.pixel_count <= r.area());
        }
    }
}

#[test]
fn classifier_boundaries_from_the_threshold_policy() {
    let config = ComparisonConfig::with_thresholds(10.0, 70.0).unwrap();
    assert_eq!(classify(10.0, &config), Verdict::Pass);
    assert_eq!(classify(70.0, &config), Verdict::Fail);
    assert_eq!(classify(30.0, &config), Verdict::ModerateDeviation);
}

#[test]
fn two_squares_on_a_canvas_end_to_end() {
    let baseline = RgbFrame::filled(100, 100, [240, 240, 240]).unwrap();
    let mut candidate = baseline.clone();
    for (x0, y0) in [(5u32, 5u32), (70, 60)] {
        for y in y0..y0 + 10 {
            for x in x0..x0 + 10 {
                candidate.put(x, y, [20, 20, 20]);
            }
        }
    }
    let result = compare(baseline, candidate, ComparisonConfig::default()).unwrap();
    assert_eq!(result.regions().len(), 2);
    assert!(result.regions().iter().all(|r| r.width == 10 && r.height == 10));
    assert!(!result.regions()[0].overlaps(&result.regions()[1]));
    assert_eq!(result.diff_percent(), 2.0);
}

#[test]
fn history_keeps_ten_most_recent_results() {
    let baseline = RgbFrame::filled(4, 4, [0, 0, 0]).unwrap();
    let mut history = ComparisonHistory::new();
    for n in 0..12u8 {
        let mut candidate = baseline.clone();
        candidate.put(0, 0, [n * 20, n * 20, n * 20]);
        let config = ComparisonConfig { tolerance: 0, ..ComparisonConfig::default() };
        let result = compare(baseline.clone(), candidate.clone(), config).unwrap();
        let mut entry = HistoryEntry::from_result(&baseline, &candidate, &result, Vec::new()).unwrap();
        entry.timestamp = format!("run-{n}");
        history.push(entry);
    }
    let stamps: Vec<&str> = history.entries().map(|e| e.timestamp.as_str()).collect();
    let expected: Vec<String> = (2..12).rev().map(|n| format!("run-{n}")).collect();
    assert_eq!(stamps, expected);
}

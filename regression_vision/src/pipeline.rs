// THEORY:
// The `pipeline` module is the top-level API for the diff engine. It runs the whole
// stack for one comparison and hands back a single, immutable `ComparisonResult`.
//
// Stages, in order:
// 1.  Normalize: bring the candidate to the baseline's size and color model.
// 2.  Reduce: per-pixel difference, scalar magnitude, tolerance mask, diff percent.
// 3.  Extract: connected changed regions as bounding boxes.
// 4.  Render: highlighted copy of the baseline plus the heatmap.
// 5.  Classify: diff percent against the threshold policy.
//
// The result is assembled only after every stage succeeded, so a caller either gets
// a complete result or an error, never something in between. A `CancelFlag` is
// checked between stages for hosts that run large comparisons in the background.

use crate::config::ComparisonConfig;
use crate::core_modules::change_region::ChangeRegion;
use crate::core_modules::diff_renderer::{render, to_heatmap};
use crate::core_modules::difference_reducer::reduce;
use crate::core_modules::frame::RgbFrame;
use crate::core_modules::normalizer::{ComparisonWarning, normalize_with};
use crate::core_modules::region_extractor::{RegionPolicy, region_extractor};
use crate::core_modules::severity::{Verdict, classify};
use crate::error::{DiffError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Shared flag a host can raise to abandon a comparison between stages.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(DiffError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// The outcome of one comparison. Immutable once built.
#[derive(Debug, Clone)]
pub struct ComparisonResult {
    highlighted: RgbFrame,
    heatmap: RgbFrame,
    diff_percent: f64,
    regions: Vec<ChangeRegion>,
    verdict: Verdict,
    warnings: Vec<ComparisonWarning>,
    changed_pixels: u64,
    total_pixels: u64,
    tolerance: u8,
    pass_threshold: f64,
    fail_threshold: f64,
}

impl ComparisonResult {
    /// The baseline with every changed region outlined.
    pub fn highlighted(&self) -> &RgbFrame {
        &self.highlighted
    }

    pub fn heatmap(&self) -> &RgbFrame {
        &self.heatmap
    }

    /// Percentage of changed pixels, rounded to two decimals.
    pub fn diff_percent(&self) -> f64 {
        self.diff_percent
    }

    pub fn regions(&self) -> &[ChangeRegion] {
        &self.regions
    }

    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    pub fn warnings(&self) -> &[ComparisonWarning] {
        &self.warnings
    }

    pub fn changed_pixels(&self) -> u64 {
        self.changed_pixels
    }

    pub fn total_pixels(&self) -> u64 {
        self.total_pixels
    }

    pub fn tolerance(&self) -> u8 {
        self.tolerance
    }

    /// The pass and fail thresholds the verdict was decided with.
    pub fn thresholds(&self) -> (f64, f64) {
        (self.pass_threshold, self.fail_threshold)
    }

    /// Baseline dimensions; both output images have this size.
    pub fn dimensions(&self) -> (u32, u32) {
        self.highlighted.dimensions()
    }

    pub fn is_identical(&self) -> bool {
        self.changed_pixels == 0
    }

    /// Multi-line, human readable summary of the comparison.
    pub fn summary(&self) -> String {
        let (width, height) = self.dimensions();
        let mut lines = vec![format!(
            "Difference: {}% of pixels changed with tolerance {}.",
            self.diff_percent, self.tolerance
        )];
        if self.is_identical() {
            lines.push("No differences found: images match perfectly.".to_string());
        } else {
            lines.push(format!(
                "Out of {} pixels, {} changed in {} region(s).",
                self.total_pixels,
                self.changed_pixels,
                self.regions.len()
            ));
            if self.tolerance == 0 {
                lines.push("Tolerance is 0: every tiny change counts.".to_string());
            } else {
                lines.push(format!(
                    "Tolerance is {}: only changes bigger than {} (out of 255) are counted.",
                    self.tolerance, self.tolerance
                ));
            }
        }
        lines.push(
            self.verdict
                .message(self.diff_percent, self.pass_threshold, self.fail_threshold),
        );
        lines.push(format!("Dimensions: {width}x{height}"));
        for warning in &self.warnings {
            lines.push(format!("Warning: {warning}"));
        }
        lines.join("\n")
    }
}

/// A reusable, validated comparison setup.
#[derive(Debug, Clone)]
pub struct DiffPipeline {
    config: ComparisonConfig,
}

impl DiffPipeline {
    pub fn new(config: ComparisonConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ComparisonConfig {
        &self.config
    }

    pub fn compare(&self, baseline: RgbFrame, candidate: RgbFrame) -> Result<ComparisonResult> {
        compare_with_cancel(baseline, candidate, self.config.clone(), &CancelFlag::new())
    }
}

/// Runs a full comparison.
pub fn compare(
    baseline: RgbFrame,
    candidate: RgbFrame,
    config: ComparisonConfig,
) -> Result<ComparisonResult> {
    compare_with_cancel(baseline, candidate, config, &CancelFlag::new())
}

/// Runs a full comparison, giving up with `DiffError::Cancelled` if `cancel` is
/// raised before any stage starts.
pub fn compare_with_cancel(
    baseline: RgbFrame,
    candidate: RgbFrame,
    config: ComparisonConfig,
    cancel: &CancelFlag,
) -> Result<ComparisonResult> {
    config.validate()?;
    let started = Instant::now();

    // Stage 1: Normalization
    cancel.check()?;
    let normalized = normalize_with(baseline, candidate, config.resize_filter)?;
    log::debug!("normalize: {:?}", started.elapsed());

    // Stage 2: Difference Reduction
    cancel.check()?;
    let reduction = reduce(&normalized.baseline, &normalized.candidate, config.tolerance)?;
    log::debug!("reduce: {:?}", started.elapsed());

    // Stage 3: Region Extraction
    cancel.check()?;
    let policy = RegionPolicy {
        outer_only: config.outer_regions_only,
        min_area: config.min_region_area,
    };
    let regions = region_extractor::extract_with(&reduction.mask, policy);
    log::debug!("extract: {:?}", started.elapsed());

    // Stage 4: Rendering
    cancel.check()?;
    let highlighted = render(&normalized.baseline, &regions);
    let heatmap = to_heatmap(&reduction.magnitude, config.heatmap_style);
    log::debug!("render: {:?}", started.elapsed());

    // Stage 5: Classification
    let verdict = classify(reduction.diff_percent, &config);

    log::info!(
        "compared {}x{}: {}% changed, {} region(s), verdict {}",
        highlighted.width(),
        highlighted.height(),
        reduction.diff_percent,
        regions.len(),
        verdict
    );

    Ok(ComparisonResult {
        highlighted,
        heatmap,
        diff_percent: reduction.diff_percent,
        regions,
        verdict,
        warnings: normalized.warning.into_iter().collect(),
        changed_pixels: reduction.changed_pixels,
        total_pixels: reduction.total_pixels,
        tolerance: config.tolerance,
        pass_threshold: config.pass_threshold,
        fail_threshold: config.fail_threshold,
    })
}

// THEORY:
// `ComparisonConfig` gathers every tunable of a comparison into one small value
// that the caller owns and passes by value into each run. Nothing in the engine
// keeps a copy between runs.
//
// Validation happens when a config is built (`new`, `from_json`, `validate`), so a
// threshold policy that cannot be classified against never reaches the classifier.

use crate::core_modules::diff_renderer::HeatmapStyle;
use crate::error::{DiffError, Result};
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TOLERANCE: u8 = 50;
pub const DEFAULT_PASS_THRESHOLD: f64 = 10.0;
pub const DEFAULT_FAIL_THRESHOLD: f64 = 70.0;

/// Resampling filter used when the candidate has to be brought to the baseline's size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResampleFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    #[default]
    Lanczos3,
}

impl From<ResampleFilter> for FilterType {
    fn from(filter: ResampleFilter) -> Self {
        match filter {
            ResampleFilter::Nearest => FilterType::Nearest,
            ResampleFilter::Triangle => FilterType::Triangle,
            ResampleFilter::CatmullRom => FilterType::CatmullRom,
            ResampleFilter::Gaussian => FilterType::Gaussian,
            ResampleFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Configuration for a single comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonConfig {
    /// Minimum scalar difference a pixel must *exceed* to count as changed.
    /// 0 means any nonzero difference counts.
    pub tolerance: u8,
    /// When false, every result is `Verdict::Unclassified`.
    pub use_thresholds: bool,
    /// Diff percentages at or below this pass.
    pub pass_threshold: f64,
    /// Diff percentages at or above this fail.
    pub fail_threshold: f64,
    pub heatmap_style: HeatmapStyle,
    /// Drop regions that sit entirely inside a hole of another region.
    pub outer_regions_only: bool,
    /// Regions whose bounding box covers fewer pixels than this are discarded.
    pub min_region_area: u64,
    pub resize_filter: ResampleFilter,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            use_thresholds: false,
            pass_threshold: DEFAULT_PASS_THRESHOLD,
            fail_threshold: DEFAULT_FAIL_THRESHOLD,
            heatmap_style: HeatmapStyle::default(),
            outer_regions_only: false,
            min_region_area: 1,
            resize_filter: ResampleFilter::default(),
        }
    }
}

impl ComparisonConfig {
    /// Builds a validated config with the default rendering and extraction settings.
    pub fn new(
        tolerance: u8,
        use_thresholds: bool,
        pass_threshold: f64,
        fail_threshold: f64,
    ) -> Result<Self> {
        let config = Self {
            tolerance,
            use_thresholds,
            pass_threshold,
            fail_threshold,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Same as the default config, but with pass/fail classification switched on.
    pub fn with_thresholds(pass_threshold: f64, fail_threshold: f64) -> Result<Self> {
        Self::new(DEFAULT_TOLERANCE, true, pass_threshold, fail_threshold)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("pass_threshold", self.pass_threshold),
            ("fail_threshold", self.fail_threshold),
        ] {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(DiffError::DegenerateConfig(format!(
                    "{name} must be a percentage in [0, 100], got {value}"
                )));
            }
        }
        if self.pass_threshold > self.fail_threshold {
            return Err(DiffError::DegenerateConfig(format!(
                "pass_threshold ({}) is above fail_threshold ({})",
                self.pass_threshold, self.fail_threshold
            )));
        }
        Ok(())
    }

    /// Parses and validates a JSON config. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// THEORY:
// The `Normalizer` is the first stage of the diff engine. Its only job is to make
// two frames comparable pixel-for-pixel.
//
// Key architectural principles:
// 1.  **Baseline Is The Reference Frame**: The baseline is never touched. If sizes
//     differ, the candidate is resampled to the baseline's size with a high-quality
//     filter (Lanczos3 unless configured otherwise).
// 2.  **Warnings, Not Errors**: A resize is an expected situation (screenshots taken
//     at a different viewport). It produces a `ComparisonWarning` carrying both
//     original sizes so a host can tell the user, and the comparison carries on.
// 3.  **Invariant Check**: After resizing, both shapes must agree. If they somehow
//     don't, the comparison stops with `DiffError::Dimension`.

use crate::config::ResampleFilter;
use crate::core_modules::frame::RgbFrame;
use crate::error::{DiffError, Result};
use image::imageops;
use serde::{Deserialize, Serialize};

/// Non-fatal signals attached to a successful comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonWarning {
    /// The candidate was resampled to the baseline's dimensions.
    CandidateResized {
        baseline: (u32, u32),
        candidate: (u32, u32),
    },
}

impl std::fmt::Display for ComparisonWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComparisonWarning::CandidateResized { baseline, candidate } => write!(
                f,
                "Image sizes differ: baseline {}x{}, candidate {}x{}. Candidate resized to match baseline.",
                baseline.0, baseline.1, candidate.0, candidate.1
            ),
        }
    }
}

/// Two frames of identical size, ready for differencing.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub baseline: RgbFrame,
    pub candidate: RgbFrame,
    pub warning: Option<ComparisonWarning>,
}

/// Aligns the candidate to the baseline using the default Lanczos3 filter.
pub fn normalize(baseline: RgbFrame, candidate: RgbFrame) -> Result<Normalized> {
    normalize_with(baseline, candidate, ResampleFilter::default())
}

pub fn normalize_with(
    baseline: RgbFrame,
    candidate: RgbFrame,
    filter: ResampleFilter,
) -> Result<Normalized> {
    let target = baseline.dimensions();
    let original = candidate.dimensions();

    let (candidate, warning) = if original == target {
        (candidate, None)
    } else {
        let warning = ComparisonWarning::CandidateResized {
            baseline: target,
            candidate: original,
        };
        log::warn!("{warning}");
        let resized = imageops::resize(candidate.as_image(), target.0, target.1, filter.into());
        (RgbFrame::from_rgb_image(resized)?, Some(warning))
    };

    if candidate.dimensions() != baseline.dimensions()
        || candidate.as_raw().len() != baseline.as_raw().len()
    {
        return Err(DiffError::Dimension {
            baseline: baseline.dimensions(),
            candidate: candidate.dimensions(),
        });
    }

    Ok(Normalized {
        baseline,
        candidate,
        warning,
    })
}

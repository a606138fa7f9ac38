// THEORY:
// The `DifferenceReducer` turns two aligned frames into the three things every
// later stage needs: the raw per-channel difference, a single scalar magnitude per
// pixel, and a binary "changed" mask.
//
// Key architectural principles:
// 1.  **Diff First, Then Reduce**: The absolute difference is taken per RGB channel,
//     and only then collapsed to one scalar. A pure hue swap between two colors of
//     equal brightness therefore still registers as a change.
// 2.  **Fixed Luma Weights**: The collapse uses ITU-R BT.601 luma in 14-bit fixed
//     point: `(4899 R + 9617 G + 1868 B + 8192) >> 14`. The weights sum to exactly
//     16384, so the largest possible magnitude is 255 and a tolerance of 255 can
//     never be exceeded.
// 3.  **Strict Threshold**: A pixel is changed when its magnitude is *greater than*
//     the tolerance. Tolerance 0 counts every nonzero difference.
// 4.  **Determinism**: Integer arithmetic only. Same inputs, same outputs.

use crate::core_modules::frame::RgbFrame;
use crate::error::{DiffError, Result};
use image::{GrayImage, Luma};

pub type Magnitude = u8;

pub const MASK_CHANGED: u8 = 255;
pub const MASK_UNCHANGED: u8 = 0;

const LUMA_R: u32 = 4899;
const LUMA_G: u32 = 9617;
const LUMA_B: u32 = 1868;
const LUMA_SHIFT: u32 = 14;
const LUMA_ROUND: u32 = 1 << (LUMA_SHIFT - 1);

/// Collapses an RGB difference triple to a single magnitude.
#[inline]
pub fn luma(rgb: [u8; 3]) -> Magnitude {
    let weighted = LUMA_R * rgb[0] as u32 + LUMA_G * rgb[1] as u32 + LUMA_B * rgb[2] as u32;
    ((weighted + LUMA_ROUND) >> LUMA_SHIFT) as Magnitude
}

/// Rounds a percentage to two decimal places.
pub fn round_percent(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Everything the reducer learned about a pair of frames.
#[derive(Debug, Clone)]
pub struct Reduction {
    /// `|a - b|` per channel.
    pub magnitude: RgbFrame,
    /// Scalar magnitude per pixel (luma of `magnitude`).
    pub luma: GrayImage,
    /// 255 where `luma > tolerance`, else 0.
    pub mask: GrayImage,
    pub changed_pixels: u64,
    pub total_pixels: u64,
    /// Share of changed pixels, in percent, rounded to two decimals.
    pub diff_percent: f64,
}

pub fn reduce(a: &RgbFrame, b: &RgbFrame, tolerance: u8) -> Result<Reduction> {
    if a.dimensions() != b.dimensions() {
        return Err(DiffError::Dimension {
            baseline: a.dimensions(),
            candidate: b.dimensions(),
        });
    }
    let (width, height) = a.dimensions();

    let mut diff = Vec::with_capacity(a.as_raw().len());
    let mut luma_buf = Vec::with_capacity(a.pixel_count());
    let mut mask_buf = Vec::with_capacity(a.pixel_count());
    let mut changed_pixels = 0u64;

    for (pa, pb) in a.as_raw().chunks_exact(3).zip(b.as_raw().chunks_exact(3)) {
        let delta = [
            pa[0].abs_diff(pb[0]),
            pa[1].abs_diff(pb[1]),
            pa[2].abs_diff(pb[2]),
        ];
        let magnitude = luma(delta);
        diff.extend_from_slice(&delta);
        luma_buf.push(magnitude);
        if magnitude > tolerance {
            mask_buf.push(MASK_CHANGED);
            changed_pixels += 1;
        } else {
            mask_buf.push(MASK_UNCHANGED);
        }
    }

    let total_pixels = a.pixel_count() as u64;
    let diff_percent = round_percent(100.0 * changed_pixels as f64 / total_pixels as f64);

    let luma = GrayImage::from_raw(width, height, luma_buf)
        .ok_or_else(|| DiffError::InvalidImage("luma buffer size mismatch".to_string()))?;
    let mask = GrayImage::from_raw(width, height, mask_buf)
        .ok_or_else(|| DiffError::InvalidImage("mask buffer size mismatch".to_string()))?;

    Ok(Reduction {
        magnitude: RgbFrame::new(width, height, diff)?,
        luma,
        mask,
        changed_pixels,
        total_pixels,
        diff_percent,
    })
}

/// Builds a mask image directly from a predicate. Handy for hosts and tests that
/// already know which pixels changed.
pub fn mask_from_fn(width: u32, height: u32, changed: impl Fn(u32, u32) -> bool) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        if changed(x, y) {
            Luma([MASK_CHANGED])
        } else {
            Luma([MASK_UNCHANGED])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn luma_of_full_white_is_255() {
        assert_eq!(luma([255, 255, 255]), 255);
        assert_eq!(luma([0, 0, 0]), 0);
    }

    #[test]
    fn luma_weights_green_heaviest() {
        assert!(luma([0, 100, 0]) > luma([100, 0, 0]));
        assert!(luma([100, 0, 0]) > luma([0, 0, 100]));
    }

    #[test]
    fn identical_frames_have_no_changes() {
        let a = RgbFrame::filled(8, 8, [12, 200, 31]).unwrap();
        let r = reduce(&a, &a.clone(), 0).unwrap();
        assert_eq!(r.changed_pixels, 0);
        assert_eq!(r.diff_percent, 0.0);
        assert!(r.mask.pixels().all(|p| p.0[0] == MASK_UNCHANGED));
    }

    #[test]
    fn threshold_is_strictly_greater_than() {
        // Gray delta of 10 on every channel gives luma 10.
        let a = RgbFrame::filled(2, 2, [0, 0, 0]).unwrap();
        let b = RgbFrame::filled(2, 2, [10, 10, 10]).unwrap();
        assert_eq!(reduce(&a, &b, 10).unwrap().changed_pixels, 0);
        assert_eq!(reduce(&a, &b, 9).unwrap().changed_pixels, 4);
    }

    #[test]
    fn tolerance_zero_counts_any_nonzero_difference() {
        let a = RgbFrame::filled(1, 1, [0, 0, 0]).unwrap();
        let b = RgbFrame::filled(1, 1, [0, 2, 0]).unwrap();
        let r = reduce(&a, &b, 0).unwrap();
        assert_eq!(r.changed_pixels, 1);
        assert_eq!(r.diff_percent, 100.0);
    }

    #[test]
    fn magnitude_is_per_channel_absolute_difference() {
        let a = RgbFrame::new(1, 1, vec![10, 200, 50]).unwrap();
        let b = RgbFrame::new(1, 1, vec![30, 100, 50]).unwrap();
        let r = reduce(&a, &b, 0).unwrap();
        assert_eq!(r.magnitude.get(0, 0), [20, 100, 0]);
        assert_eq!(r.luma.get_pixel(0, 0).0[0], luma([20, 100, 0]));
    }

    #[test]
    fn percent_is_rounded_to_two_decimals() {
        // 1 changed pixel out of 3 => 33.333...
        let a = RgbFrame::filled(3, 1, [0, 0, 0]).unwrap();
        let mut b = a.clone();
        b.put(1, 0, [255, 255, 255]);
        let r = reduce(&a, &b, 50).unwrap();
        assert_eq!(r.diff_percent, 33.33);
        assert_eq!(r.total_pixels, 3);
    }

    #[test]
    fn mismatched_shapes_are_a_dimension_error() {
        let a = RgbFrame::filled(3, 1, [0, 0, 0]).unwrap();
        let b = RgbFrame::filled(1, 3, [0, 0, 0]).unwrap();
        assert!(matches!(
            reduce(&a, &b, 0),
            Err(DiffError::Dimension { .. })
        ));
    }

    #[test]
    fn mask_from_fn_marks_only_predicate_pixels() {
        let mask = mask_from_fn(4, 4, |x, y| x == y);
        assert_eq!(mask.get_pixel(2, 2).0[0], MASK_CHANGED);
        assert_eq!(mask.get_pixel(2, 1).0[0], MASK_UNCHANGED);
    }
}

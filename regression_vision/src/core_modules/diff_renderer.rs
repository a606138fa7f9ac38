// THEORY:
// The `DiffRenderer` produces the two pictures a human looks at after a comparison:
//
// 1.  **Highlighted**: a copy of the baseline with a 2px outline drawn around every
//     `ChangeRegion`. The baseline passed in is borrowed immutably, so the caller
//     still owns the untouched original for side-by-side display.
// 2.  **Heatmap**: a direct projection of the per-channel difference magnitude. It
//     does not depend on the tolerance or on region extraction, so it shows every
//     difference, including the ones below the threshold.

use crate::core_modules::change_region::ChangeRegion;
use crate::core_modules::difference_reducer::luma;
use crate::core_modules::frame::RgbFrame;
use serde::{Deserialize, Serialize};

/// Outline color of highlighted regions.
pub const HIGHLIGHT_COLOR: [u8; 3] = [255, 71, 87];
/// Outline thickness in pixels.
pub const HIGHLIGHT_THICKNESS: u32 = 2;

/// How the difference magnitude is turned into a visible image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeatmapStyle {
    /// The per-channel difference as-is. Bright spots are bigger differences.
    #[default]
    Raw,
    /// Scalar magnitude replicated on all three channels.
    Grayscale,
    /// Scalar magnitude on a black → red → yellow → white ramp.
    Thermal,
}

/// Draws every region onto a copy of the baseline.
pub fn render(baseline: &RgbFrame, regions: &[ChangeRegion]) -> RgbFrame {
    let mut highlighted = baseline.clone();
    for region in regions {
        draw_outline(&mut highlighted, region, HIGHLIGHT_COLOR, HIGHLIGHT_THICKNESS);
    }
    highlighted
}

/// Outlines the rectangle spanning `(x, y)` to `(x + width, y + height)`, growing
/// the stroke inwards one pixel per unit of thickness. Clipped to the frame.
pub fn draw_outline(frame: &mut RgbFrame, region: &ChangeRegion, color: [u8; 3], thickness: u32) {
    let (x0, y0) = (region.x as i64, region.y as i64);
    let (x1, y1) = (region.right() as i64, region.bottom() as i64);

    for inset in 0..thickness as i64 {
        let (left, top) = (x0 + inset, y0 + inset);
        let (right, bottom) = (x1 - inset, y1 - inset);
        if left > right || top > bottom {
            break;
        }
        for x in left..=right {
            put_clipped(frame, x, top, color);
            put_clipped(frame, x, bottom, color);
        }
        for y in top..=bottom {
            put_clipped(frame, left, y, color);
            put_clipped(frame, right, y, color);
        }
    }
}

fn put_clipped(frame: &mut RgbFrame, x: i64, y: i64, color: [u8; 3]) {
    if x >= 0 && y >= 0 && x < frame.width() as i64 && y < frame.height() as i64 {
        frame.put(x as u32, y as u32, color);
    }
}

/// Visualizes the per-channel difference magnitude.
pub fn to_heatmap(magnitude: &RgbFrame, style: HeatmapStyle) -> RgbFrame {
    match style {
        HeatmapStyle::Raw => magnitude.clone(),
        HeatmapStyle::Grayscale => map_pixels(magnitude, |rgb| {
            let v = luma(rgb);
            [v, v, v]
        }),
        HeatmapStyle::Thermal => map_pixels(magnitude, |rgb| thermal(luma(rgb))),
    }
}

fn map_pixels(frame: &RgbFrame, f: impl Fn([u8; 3]) -> [u8; 3]) -> RgbFrame {
    let mut out = frame.clone();
    for y in 0..frame.height() {
        for x in 0..frame.width() {
            out.put(x, y, f(frame.get(x, y)));
        }
    }
    out
}

/// Black → red → yellow → white, in three equal segments.
pub fn thermal(value: u8) -> [u8; 3] {
    let ramp = |start: u32| ((value as u32).saturating_sub(start) * 3).min(255) as u8;
    [ramp(0), ramp(85), ramp(170)]
}

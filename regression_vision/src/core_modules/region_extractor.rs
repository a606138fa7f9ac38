// THEORY:
// The `RegionExtractor` is the engine of the spatial grouping stage. It analyzes the
// binary change mask from the `DifferenceReducer` and identifies spatially coherent
// clusters of changed pixels, reporting each as a `ChangeRegion`.
//
// Key architectural principles & algorithm steps:
// 1.  **Connectivity**: Foreground (changed) pixels are 8-connected, so a diagonal
//     edge of an anti-aliased glyph stays one region instead of fragmenting into a
//     staircase of single pixels. Background is 4-connected, the topological dual.
// 2.  **Raster-Scan Seeding**: The mask is scanned row by row. Every changed pixel
//     not yet claimed by a region becomes the seed of a new one.
// 3.  **Region Growing**: From each seed, an iterative flood fill (explicit stack, no
//     recursion, so huge regions cannot overflow the call stack) claims every
//     8-connected changed neighbor, tracking the bounding box and pixel count.
// 4.  **Filtering**: Boxes with non-positive area or below the configured minimum
//     area are dropped. Optionally, regions that sit entirely inside a hole of another
//     region are dropped as well ("outer regions only").
// 5.  **Deterministic Order**: Regions are sorted by the top-left corner of their box
//     (row first, then column). Ties keep discovery order.
// 6.  **Stateless Utility**: `extract` has no memory between calls and no upper bound
//     on region count. A very noisy mask yields thousands of small regions, which is
//     expected.

use crate::core_modules::change_region::ChangeRegion;
use crate::core_modules::difference_reducer::MASK_CHANGED;
use image::GrayImage;

/// Filtering rules applied after components are found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionPolicy {
    /// Drop regions enclosed by a hole of another region.
    pub outer_only: bool,
    /// Minimum bounding-box area a region must have to be kept.
    pub min_area: u64,
}

impl Default for RegionPolicy {
    fn default() -> Self {
        Self {
            outer_only: false,
            min_area: 1,
        }
    }
}

pub mod region_extractor {
    use super::*; // Make structs from parent module available.

    const UNLABELED: u32 = 0;

    const NEIGHBORS_8: [(i32, i32); 8] = [
        (-1, -1),
        (0, -1),
        (1, -1),
        (-1, 0),
        (1, 0),
        (-1, 1),
        (0, 1),
        (1, 1),
    ];

    const NEIGHBORS_4: [(i32, i32); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];

    /// Row-major offset of `(x, y)`, computed in `usize` so masks past 2^32 pixels
    /// still index correctly.
    pub(crate) fn pixel_index(x: u32, y: u32, width: u32) -> usize {
        y as usize * width as usize + x as usize
    }

    /// The pixel at `(x + dx, y + dy)`, or `None` when it falls off the image.
    pub(crate) fn neighbor(
        (x, y): (u32, u32),
        (dx, dy): (i32, i32),
        width: u32,
        height: u32,
    ) -> Option<(u32, u32)> {
        let nx = x.checked_add_signed(dx).filter(|&nx| nx < width)?;
        let ny = y.checked_add_signed(dy).filter(|&ny| ny < height)?;
        Some((nx, ny))
    }

    /// Finds every region with the default policy.
    pub fn extract(mask: &GrayImage) -> Vec<ChangeRegion> {
        extract_with(mask, RegionPolicy::default())
    }

    /// The main function of the spatial grouping stage.
    pub fn extract_with(mask: &GrayImage, policy: RegionPolicy) -> Vec<ChangeRegion> {
        let (width, height) = mask.dimensions();
        if width == 0 || height == 0 {
            return Vec::new();
        }
        let changed: Vec<bool> = mask.as_raw().iter().map(|&v| v == MASK_CHANGED).collect();

        // --- 1. Outer Background ---
        // Only needed when enclosed regions are to be suppressed.
        let outside = if policy.outer_only {
            Some(outer_background(&changed, width, height))
        } else {
            None
        };

        // --- 2. Seeding & Region Growing ---
        let mut labels = vec![UNLABELED; changed.len()];
        let mut regions: Vec<ChangeRegion> = Vec::new();
        let mut next_label = 1u32;

        for y in 0..height {
            for x in 0..width {
                let index = pixel_index(x, y, width);
                if !changed[index] || labels[index] != UNLABELED {
                    continue;
                }

                let grown = grow_region(
                    (x, y),
                    &changed,
                    &mut labels,
                    next_label,
                    width,
                    height,
                    outside.as_deref(),
                );
                next_label += 1;

                // --- 3. Filtering ---
                if policy.outer_only && !grown.touches_outside {
                    continue;
                }
                let region = grown.region;
                if region.area() == 0 || region.area() < policy.min_area {
                    continue;
                }
                regions.push(region);
            }
        }

        // --- 4. Ordering ---
        // `sort_by_key` is stable, so equal corners keep discovery order.
        regions.sort_by_key(|r| (r.y, r.x));
        log::debug!(
            "region extraction: {} components, {} kept",
            next_label - 1,
            regions.len()
        );
        regions
    }

    struct GrownRegion {
        region: ChangeRegion,
        /// The region borders the image edge or the outer background.
        touches_outside: bool,
    }

    /// Iterative flood fill over 8-connected changed pixels.
    fn grow_region(
        seed: (u32, u32),
        changed: &[bool],
        labels: &mut [u32],
        label: u32,
        width: u32,
        height: u32,
        outside: Option<&[bool]>,
    ) -> GrownRegion {
        let mut stack: Vec<(u32, u32)> = vec![seed];
        labels[pixel_index(seed.0, seed.1, width)] = label;

        let (mut min_x, mut min_y) = seed;
        let (mut max_x, mut max_y) = seed;
        let mut pixel_count = 0u64;
        let mut touches_outside = false;

        while let Some((x, y)) = stack.pop() {
            pixel_count += 1;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);

            if let Some(outside) = outside {
                if !touches_outside {
                    touches_outside = x == 0 || y == 0 || x == width - 1 || y == height - 1;
                }
                if !touches_outside {
                    touches_outside = NEIGHBORS_4.iter().any(|&offset| {
                        neighbor((x, y), offset, width, height)
                            .is_some_and(|(nx, ny)| outside[pixel_index(nx, ny, width)])
                    });
                }
            }

            for &offset in &NEIGHBORS_8 {
                let Some((nx, ny)) = neighbor((x, y), offset, width, height) else {
                    continue;
                };
                let index = pixel_index(nx, ny, width);
                if changed[index] && labels[index] == UNLABELED {
                    labels[index] = label;
                    stack.push((nx, ny));
                }
            }
        }

        GrownRegion {
            region: ChangeRegion::from_corners(min_x, min_y, max_x, max_y, pixel_count),
            touches_outside,
        }
    }

    /// Marks every unchanged pixel that is 4-connected to the image border.
    fn outer_background(changed: &[bool], width: u32, height: u32) -> Vec<bool> {
        let mut outside = vec![false; changed.len()];
        let mut stack: Vec<(u32, u32)> = Vec::new();

        let seed = |x: u32, y: u32, outside: &mut Vec<bool>, stack: &mut Vec<(u32, u32)>| {
            let index = pixel_index(x, y, width);
            if !changed[index] && !outside[index] {
                outside[index] = true;
                stack.push((x, y));
            }
        };
        for x in 0..width {
            seed(x, 0, &mut outside, &mut stack);
            seed(x, height - 1, &mut outside, &mut stack);
        }
        for y in 0..height {
            seed(0, y, &mut outside, &mut stack);
            seed(width - 1, y, &mut outside, &mut stack);
        }

        while let Some((x, y)) = stack.pop() {
            for &offset in &NEIGHBORS_4 {
                let Some((nx, ny)) = neighbor((x, y), offset, width, height) else {
                    continue;
                };
                let index = pixel_index(nx, ny, width);
                if !changed[index] && !outside[index] {
                    outside[index] = true;
                    stack.push((nx, ny));
                }
            }
        }
        outside
    }
}

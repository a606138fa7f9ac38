// THEORY:
// A `ChangeRegion` is the spatial summary of one contiguous cluster of changed
// pixels. Instead of dealing with thousands of individual mask pixels, a host can
// work with a handful of boxes: draw them, list them, count them.
//
// Like `RgbFrame`, it is a "dumb" data container. It knows its own geometry and
// nothing about how it was found.

use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box around one connected cluster of changed pixels,
/// in baseline pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeRegion {
    pub x: u32,
    pub y: u32,
    /// Always > 0.
    pub width: u32,
    /// Always > 0.
    pub height: u32,
    /// How many changed pixels the cluster holds (<= `area()`).
    pub pixel_count: u64,
}

impl ChangeRegion {
    /// Builds a region from inclusive corner coordinates.
    pub fn from_corners(min_x: u32, min_y: u32, max_x: u32, max_y: u32, pixel_count: u64) -> Self {
        Self {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
            pixel_count,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// First column to the right of the box.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// First row below the box.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    pub fn overlaps(&self, other: &ChangeRegion) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_are_inclusive() {
        let r = ChangeRegion::from_corners(10, 20, 19, 29, 100);
        assert_eq!((r.width, r.height), (10, 10));
        assert_eq!(r.area(), 100);
        assert!(r.contains(19, 29));
        assert!(!r.contains(20, 29));
    }

    #[test]
    fn single_pixel_region_has_unit_area() {
        let r = ChangeRegion::from_corners(5, 5, 5, 5, 1);
        assert_eq!(r.area(), 1);
    }

    #[test]
    fn touching_boxes_do_not_overlap() {
        let a = ChangeRegion::from_corners(0, 0, 9, 9, 100);
        let b = ChangeRegion::from_corners(10, 0, 19, 9, 100);
        let c = ChangeRegion::from_corners(9, 9, 12, 12, 16);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
    }
}

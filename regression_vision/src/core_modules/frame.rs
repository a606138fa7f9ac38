// THEORY:
// The `RgbFrame` is the most fundamental unit of the diff engine. It is a "dumb"
// data container: an owned, 8-bit-per-channel RGB raster with an explicit width
// and height. Every stage of the engine consumes and produces frames.
//
// Key architectural principles:
// 1.  **Validated Construction**: A frame can only exist if it is non-empty and its
//     backing storage is exactly `width * height * 3` bytes. Every constructor
//     checks this, so no later stage has to.
// 2.  **One Color Model**: Whatever the source (RGBA screenshots, grayscale PNGs,
//     16-bit TIFFs), a frame is always RGB8. Alpha is dropped on the way in.
// 3.  **Thin Wrapper**: The pixels live in an `image::RgbImage`, so resizing and
//     encoding reuse the `image` crate directly.

use crate::error::{DiffError, Result};
use image::{DynamicImage, RgbImage};

pub const CHANNELS: usize = 3;

/// An owned, non-empty RGB8 image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbFrame {
    image: RgbImage,
}

impl RgbFrame {
    /// Builds a frame from a raw, row-major RGB buffer.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(DiffError::InvalidImage(format!(
                "zero-size image ({width}x{height})"
            )));
        }
        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(DiffError::InvalidImage(format!(
                "buffer holds {} bytes, {width}x{height} RGB needs {expected}",
                data.len()
            )));
        }
        // Length was checked above, so `from_raw` cannot fail here.
        RgbImage::from_raw(width, height, data)
            .map(|image| Self { image })
            .ok_or_else(|| DiffError::InvalidImage("buffer rejected".to_string()))
    }

    /// A frame where every pixel has the same color.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Result<Self> {
        let pixel_count = width as usize * height as usize;
        let data = rgb.repeat(pixel_count);
        Self::new(width, height, data)
    }

    pub fn from_rgb_image(image: RgbImage) -> Result<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(DiffError::InvalidImage(format!(
                "zero-size image ({}x{})",
                image.width(),
                image.height()
            )));
        }
        Ok(Self { image })
    }

    /// Converts any decoded image to RGB8, discarding alpha.
    pub fn from_dynamic(image: DynamicImage) -> Result<Self> {
        Self::from_rgb_image(image.into_rgb8())
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn pixel_count(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    pub fn get(&self, x: u32, y: u32) -> [u8; 3] {
        self.image.get_pixel(x, y).0
    }

    pub fn put(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        self.image.put_pixel(x, y, image::Rgb(rgb));
    }

    /// The raw, row-major RGB bytes.
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn as_image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }
}

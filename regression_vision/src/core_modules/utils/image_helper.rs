// Decoding, PNG export and base64 snapshots for `RgbFrame`s. These are the only
// places in the library that touch encoded bytes or the filesystem.

use crate::core_modules::frame::RgbFrame;
use crate::error::{DiffError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::ImageEncoder;
use std::io::Cursor;
use std::path::Path;

/// Decodes any format the `image` crate understands, dropping alpha.
pub fn decode(bytes: &[u8]) -> Result<RgbFrame> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| DiffError::InvalidImage(format!("undecodable image: {e}")))?;
    RgbFrame::from_dynamic(image)
}

pub fn open(path: impl AsRef<Path>) -> Result<RgbFrame> {
    let path = path.as_ref();
    let image = image::open(path)
        .map_err(|e| DiffError::InvalidImage(format!("{}: {e}", path.display())))?;
    RgbFrame::from_dynamic(image)
}

pub fn encode_png(frame: &RgbFrame) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(Cursor::new(&mut buffer));
    encoder.write_image(
        frame.as_raw(),
        frame.width(),
        frame.height(),
        image::ExtendedColorType::Rgb8,
    )?;
    Ok(buffer)
}

pub fn save_png(frame: &RgbFrame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let bytes = encode_png(frame)?;
    std::fs::write(path, bytes)
        .map_err(|e| DiffError::Encode(format!("{}: {e}", path.display())))?;
    log::debug!("wrote {}", path.display());
    Ok(())
}

pub fn to_base64_png(frame: &RgbFrame) -> Result<String> {
    Ok(STANDARD.encode(encode_png(frame)?))
}

pub fn from_base64_png(encoded: &str) -> Result<RgbFrame> {
    let bytes = STANDARD.decode(encoded.trim())?;
    decode(&bytes)
}

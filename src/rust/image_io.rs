//! Decoding of uploaded bytes and local files into RGB images.

use std::io::Cursor;
use std::path::Path;

use image::{ImageReader, RgbImage};

use crate::classifier::ClassifierError;

/// Decodes any supported image format and converts it to 8-bit RGB.
///
/// Grayscale, palette, alpha and 16-bit sources all come out with three
/// channels so the preprocessing that follows is deterministic.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, ClassifierError> {
    if bytes.is_empty() {
        return Err(ClassifierError::ValidationError("Image data is empty".into()));
    }

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ClassifierError::ValidationError(format!("Error reading image: {}", e)))?;

    let decoded = reader
        .decode()
        .map_err(|e| ClassifierError::ValidationError(format!("Error decoding image: {}", e)))?;

    let rgb = decoded.to_rgb8();
    if rgb.width() == 0 || rgb.height() == 0 {
        return Err(ClassifierError::ValidationError("Image has no pixels".into()));
    }
    Ok(rgb)
}

pub fn open_image(path: impl AsRef<Path>) -> Result<RgbImage, ClassifierError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ClassifierError::MissingFile(path.to_path_buf()));
    }
    let bytes = std::fs::read(path).map_err(|e| {
        ClassifierError::ValidationError(format!("Failed to read {:?}: {}", path, e))
    })?;
    decode_image(&bytes)
}

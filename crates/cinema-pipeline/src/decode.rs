//! Image decoding and scalar unpacking.
//!
//! Cinema value images store one scalar per pixel, packed big-endian
//! into the red, green and blue channels (alpha is ignored):
//!
//! ```text
//! v = (R << 16) | (G << 8) | B
//! v == 0        -> no data
//! v in 1..2^24  -> (v - 1) / (2^24 - 2)   in [0, 1]
//! ```

use image::RgbImage;

use crate::types::PipelineError;

/// Packed value reserved for "no data".
pub const NO_DATA: u32 = 0;

/// Largest packed value (`2^24 - 1`), decoding to exactly `1.0`.
pub const MAX_PACKED: u32 = (1 << 24) - 1;

/// Decode raw image bytes into an 8-bit RGB buffer.
///
/// Supports PNG, JPEG, BMP, and WebP (whatever the `image` crate was
/// built with). Alpha, if present, is dropped.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
#[must_use = "returns the decoded RGB image"]
pub fn decode_rgb(bytes: &[u8]) -> Result<RgbImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    Ok(img.to_rgb8())
}

/// Pack three channel bytes into a 24-bit value.
#[must_use]
pub fn pack_rgb([r, g, b]: [u8; 3]) -> u32 {
    (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
}

/// Decode a packed value into a scalar, or `None` for no data.
#[must_use]
pub fn decode_packed(packed: u32) -> Option<f64> {
    if packed == NO_DATA {
        return None;
    }
    Some(f64::from(packed - 1) / f64::from(MAX_PACKED - 1))
}

/// Decode one pixel's channels into a scalar, or `None` for no data.
#[must_use]
pub fn decode_scalar(rgb: [u8; 3]) -> Option<f64> {
    decode_packed(pack_rgb(rgb))
}

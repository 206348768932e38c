//! cinema-pipeline: Pure parameter-space and histogram pipeline (sans-IO).
//!
//! Turns a Cinema database descriptor into an ordered stream of image
//! and metadata paths, and turns one encoded value image into a
//! fixed-resolution histogram:
//!
//! descriptor -> combinations -> paths | image bytes -> scalars -> histogram
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! text and byte slices and returns structured data. All filesystem
//! interaction lives in `cinema-io`.

pub mod decode;
pub mod descriptor;
pub mod diagnostics;
pub mod enumerate;
pub mod histogram;
pub mod template;
pub mod types;

pub use descriptor::{Descriptor, DescriptorError, IMAGE_EXTENSION_LEN, METADATA_EXTENSION};
pub use enumerate::Combinations;
pub use histogram::{BucketCounts, Histogram};
pub use template::{Template, TemplateError, substitute};
pub use types::{
    Axis, AxisValue, Combination, HistogramConfig, Normalization, PipelineError, PixelFormat,
    ResolvedPaths, RgbImage,
};

/// Decode one value image and reduce it to a histogram.
///
/// Takes raw image bytes (PNG, JPEG, BMP, WebP) and a configuration,
/// then produces a [`Histogram`] of `config.bucket_count` densities.
///
/// # Pipeline steps
///
/// 1. Decode image to 8-bit RGB (alpha dropped)
/// 2. Unpack each pixel to a scalar or no-data
/// 3. Bucket scalars and normalize
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `config` is invalid.
/// Returns [`PipelineError::EmptyInput`] if `image_bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is unrecognized.
/// Returns [`PipelineError::EmptyImage`] if the image has no pixels.
pub fn process(image_bytes: &[u8], config: &HistogramConfig) -> Result<Histogram, PipelineError> {
    config.validate()?;
    let image = decode::decode_rgb(image_bytes)?;
    histogram::compute_histogram(&image, config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    /// Encode a 2x2 value image with packed values `{0, 1, 2^24-1, 2^24-1}`.
    fn reference_png() -> Vec<u8> {
        let pixels = [[0, 0, 0], [0, 0, 1], [255, 255, 255], [255, 255, 255]];
        let img = image::RgbImage::from_fn(2, 2, |x, y| image::Rgb(pixels[(y * 2 + x) as usize]));
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgb8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn process_empty_input() {
        let result = process(&[], &HistogramConfig::default());
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn process_corrupt_input() {
        let result = process(&[0xFF, 0x00], &HistogramConfig::default());
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn process_rejects_zero_buckets_before_decoding() {
        let config = HistogramConfig {
            bucket_count: 0,
            ..HistogramConfig::default()
        };
        let result = process(&[], &config);
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn process_reference_image() {
        let config = HistogramConfig {
            bucket_count: 2,
            ..HistogramConfig::default()
        };
        let histogram = process(&reference_png(), &config).unwrap();
        assert_eq!(histogram.buckets(), &[0.25, 0.5]);
        assert_eq!(histogram.sum(), 0.75);
    }

    #[test]
    fn process_is_idempotent() {
        let png = reference_png();
        let config = HistogramConfig::default();
        assert_eq!(
            process(&png, &config).unwrap(),
            process(&png, &config).unwrap()
        );
    }
}

//! Fixed-resolution histogram of decoded scalar values.
//!
//! Each pixel is decoded (see [`decode`](crate::decode)); data pixels
//! fall into bucket `floor(B * scalar)`, clamped to `B - 1` so that
//! `scalar == 1.0` lands in the top bucket. No-data pixels touch no
//! bucket but still count toward the pixel total, so with the default
//! [`Normalization::TotalPixels`] the histogram sums to
//! `1 - no_data / total`.

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::decode::decode_scalar;
use crate::types::{HistogramConfig, Normalization, PipelineError};

/// Raw per-bucket counts for one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketCounts {
    /// Pixels per bucket.
    pub counts: Vec<u64>,
    /// Pixels holding the no-data sentinel.
    pub no_data: u64,
    /// All pixels, `width * height`.
    pub total: u64,
}

impl BucketCounts {
    /// Pixels that carry data.
    #[must_use]
    pub const fn valid(&self) -> u64 {
        self.total - self.no_data
    }

    /// Turn counts into densities.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn normalize(&self, normalization: Normalization) -> Histogram {
        let denominator = match normalization {
            Normalization::TotalPixels => self.total,
            Normalization::ValidPixels => self.valid(),
        };
        if denominator == 0 {
            return Histogram(vec![0.0; self.counts.len()]);
        }
        let denominator = denominator as f64;
        Histogram(
            self.counts
                .iter()
                .map(|&count| count as f64 / denominator)
                .collect(),
        )
    }
}

/// Normalized bucket densities, lowest scalar first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Histogram(Vec<f64>);

impl Histogram {
    /// Wrap precomputed densities.
    #[must_use]
    pub const fn new(buckets: Vec<f64>) -> Self {
        Self(buckets)
    }

    /// Bucket densities.
    #[must_use]
    pub fn buckets(&self) -> &[f64] {
        &self.0
    }

    /// Number of buckets.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no buckets.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of all densities.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Consumes the histogram and returns the densities.
    #[must_use]
    pub fn into_buckets(self) -> Vec<f64> {
        self.0
    }
}

/// Bucket index for a scalar in `[0, 1]`.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn bucket_index(scalar: f64, bucket_count: usize) -> usize {
    let raw = (bucket_count as f64 * scalar).floor();
    if raw <= 0.0 {
        return 0;
    }
    (raw as usize).min(bucket_count.saturating_sub(1))
}

/// Count every pixel of `image` into `bucket_count` buckets.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `bucket_count` is zero.
/// Returns [`PipelineError::EmptyImage`] if the image has no pixels.
pub fn count_buckets(image: &RgbImage, bucket_count: usize) -> Result<BucketCounts, PipelineError> {
    if bucket_count == 0 {
        return Err(PipelineError::InvalidConfig(
            "bucket count must be at least 1".to_owned(),
        ));
    }
    let total = u64::from(image.width()) * u64::from(image.height());
    if total == 0 {
        return Err(PipelineError::EmptyImage {
            width: image.width(),
            height: image.height(),
        });
    }

    let mut counts = vec![0_u64; bucket_count];
    let mut no_data = 0_u64;
    for pixel in image.pixels() {
        match decode_scalar(pixel.0) {
            Some(scalar) => counts[bucket_index(scalar, bucket_count)] += 1,
            None => no_data += 1,
        }
    }

    Ok(BucketCounts {
        counts,
        no_data,
        total,
    })
}

/// Reduce `image` to a normalized histogram.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] for a zero bucket count and
/// [`PipelineError::EmptyImage`] for an image with no pixels.
pub fn compute_histogram(
    image: &RgbImage,
    config: &HistogramConfig,
) -> Result<Histogram, PipelineError> {
    config.validate()?;
    Ok(count_buckets(image, config.bucket_count)?.normalize(config.normalization))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use image::Rgb;

    use super::*;

    fn packed_pixel(v: u32) -> Rgb<u8> {
        let [_, r, g, b] = v.to_be_bytes();
        Rgb([r, g, b])
    }

    /// 2x2 image with packed values `{0, 1, 2^24-1, 2^24-1}`.
    fn reference_image() -> RgbImage {
        let values = [0, 1, (1 << 24) - 1, (1 << 24) - 1];
        RgbImage::from_fn(2, 2, |x, y| packed_pixel(values[(y * 2 + x) as usize]))
    }

    #[test]
    fn normalizes_by_total_pixel_count() {
        let config = HistogramConfig {
            bucket_count: 2,
            ..HistogramConfig::default()
        };
        let histogram = compute_histogram(&reference_image(), &config).unwrap();
        assert_eq!(histogram.buckets(), &[0.25, 0.5]);
        assert_eq!(histogram.sum(), 0.75);
    }

    #[test]
    fn valid_pixel_normalization_sums_to_one() {
        let config = HistogramConfig {
            bucket_count: 2,
            normalization: Normalization::ValidPixels,
        };
        let histogram = compute_histogram(&reference_image(), &config).unwrap();
        let expected = [1.0 / 3.0, 2.0 / 3.0];
        for (got, want) in histogram.buckets().iter().zip(expected) {
            assert!((got - want).abs() < 1e-12, "got {got}, want {want}");
        }
    }

    #[test]
    fn counts_report_no_data() {
        let counts = count_buckets(&reference_image(), 2).unwrap();
        assert_eq!(counts.counts, vec![1, 2]);
        assert_eq!(counts.no_data, 1);
        assert_eq!(counts.total, 4);
        assert_eq!(counts.valid(), 3);
    }

    #[test]
    fn all_no_data_is_all_zero() {
        let image = RgbImage::new(3, 3);
        for normalization in [Normalization::TotalPixels, Normalization::ValidPixels] {
            let config = HistogramConfig {
                bucket_count: 4,
                normalization,
            };
            let histogram = compute_histogram(&image, &config).unwrap();
            assert_eq!(histogram.buckets(), &[0.0; 4]);
        }
    }

    #[test]
    fn default_has_256_buckets() {
        let image = RgbImage::from_pixel(4, 4, packed_pixel(1 << 23));
        let histogram = compute_histogram(&image, &HistogramConfig::default()).unwrap();
        assert_eq!(histogram.len(), 256);
        assert_eq!(histogram.sum(), 1.0);
        assert_eq!(histogram.buckets()[128], 1.0);
    }

    #[test]
    fn zero_pixel_image_is_rejected() {
        let image = RgbImage::new(0, 5);
        let result = compute_histogram(&image, &HistogramConfig::default());
        assert!(matches!(
            result,
            Err(PipelineError::EmptyImage {
                width: 0,
                height: 5
            })
        ));
    }

    #[test]
    fn zero_buckets_is_rejected() {
        let result = count_buckets(&reference_image(), 0);
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn bucket_index_clamps_top_edge() {
        assert_eq!(bucket_index(0.0, 256), 0);
        assert_eq!(bucket_index(1.0, 256), 255);
        assert_eq!(bucket_index(0.5, 2), 1);
        assert_eq!(bucket_index(0.499, 2), 0);
        assert_eq!(bucket_index(1.0, 1), 0);
    }

    #[test]
    fn bucket_index_with_no_buckets_is_zero() {
        assert_eq!(bucket_index(0.7, 0), 0);
        assert_eq!(bucket_index(1.0, 0), 0);
    }

    #[test]
    fn reduction_is_deterministic() {
        let image = RgbImage::from_fn(16, 16, |x, y| packed_pixel(x * 4099 + y * 65_537));
        let config = HistogramConfig::default();
        let first = compute_histogram(&image, &config).unwrap();
        let second = compute_histogram(&image, &config).unwrap();
        assert_eq!(first, second);
    }
}

//! Shared types for the cinema histogram pipeline.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Re-export `RgbImage` so downstream crates can hand decoded pixel
/// buffers around without depending on `image` directly.
pub use image::RgbImage;

/// One value on a parameter axis.
///
/// Values are opaque tokens: they are only ever rendered to text for
/// path templating, never used in arithmetic.
#[derive(Debug, Clone, PartialEq)]
pub enum AxisValue {
    /// A JSON string, substituted verbatim.
    Text(String),
    /// A JSON number, substituted using its JSON text (`5`, `1.5`).
    Number(serde_json::Number),
    /// A JSON boolean, substituted as `true` / `false`.
    Bool(bool),
}

impl fmt::Display for AxisValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for AxisValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<u64> for AxisValue {
    fn from(value: u64) -> Self {
        Self::Number(value.into())
    }
}

/// A named, ordered, finite dimension of the parameter space.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    name: String,
    values: Vec<AxisValue>,
}

impl Axis {
    /// Create a new axis.
    ///
    /// No validation happens here; [`Descriptor::new`](crate::Descriptor::new)
    /// rejects empty axes and names that would break templating.
    #[must_use]
    pub const fn new(name: String, values: Vec<AxisValue>) -> Self {
        Self { name, values }
    }

    /// The axis name, as used in `{name}` placeholders.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The ordered values of this axis.
    #[must_use]
    pub fn values(&self) -> &[AxisValue] {
        &self.values
    }

    /// Number of values on this axis.
    #[must_use]
    pub const fn cardinality(&self) -> usize {
        self.values.len()
    }
}

/// One point in the parameter space: a value index per axis, in axis
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Combination(Vec<usize>);

impl Combination {
    /// Create a combination from per-axis value indices.
    #[must_use]
    pub const fn new(indices: Vec<usize>) -> Self {
        Self(indices)
    }

    /// Per-axis value indices.
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.0
    }
}

/// Where one combination's image lives and where its metadata goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPaths {
    /// Path of the rendered image.
    pub image_path: PathBuf,
    /// Path of the sidecar metadata document.
    pub metadata_path: PathBuf,
}

/// Encoding of the scalar field stored in each image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 24-bit scalar packed big-endian into the red, green and blue
    /// channels. Packed value 0 is reserved for "no data".
    #[default]
    R8G8B8,
}

impl PixelFormat {
    /// The tag used for this format in descriptor documents.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::R8G8B8 => "R8G8B8",
        }
    }
}

impl FromStr for PixelFormat {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "R8G8B8" => Ok(Self::R8G8B8),
            other => Err(PipelineError::InvalidConfig(format!(
                "unsupported pixel format '{other}' (supported: R8G8B8)"
            ))),
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Denominator used when turning bucket counts into densities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Normalization {
    /// Divide by `width * height`, no-data pixels included. The
    /// histogram then sums to `1 - no_data / total`.
    #[default]
    TotalPixels,
    /// Divide by the number of pixels that carry data. The histogram
    /// sums to 1, or is all zeros when every pixel is no-data.
    ValidPixels,
}

/// Configuration for the histogram reduction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistogramConfig {
    /// Number of equal-width buckets over `[0, 1]`. Must be non-zero.
    pub bucket_count: usize,

    /// How bucket counts are normalized.
    pub normalization: Normalization,
}

impl HistogramConfig {
    /// Default number of histogram buckets.
    pub const DEFAULT_BUCKET_COUNT: usize = 256;

    /// Check the configuration before any image is touched.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if `bucket_count` is zero.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.bucket_count == 0 {
            return Err(PipelineError::InvalidConfig(
                "bucket count must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            bucket_count: Self::DEFAULT_BUCKET_COUNT,
            normalization: Normalization::default(),
        }
    }
}

/// Errors that can occur while reducing one image.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The decoded image has no pixels.
    #[error("image has zero pixels ({width}x{height})")]
    EmptyImage {
        /// Decoded width.
        width: u32,
        /// Decoded height.
        height: u32,
    },

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_value_display_uses_json_text() {
        assert_eq!(AxisValue::from("theta").to_string(), "theta");
        assert_eq!(AxisValue::from(5_u64).to_string(), "5");
        assert_eq!(AxisValue::Bool(true).to_string(), "true");

        let half = serde_json::Number::from_f64(1.5).map(AxisValue::Number);
        assert_eq!(half.map(|v| v.to_string()).as_deref(), Some("1.5"));
    }

    #[test]
    fn pixel_format_parses_known_tag_only() {
        assert_eq!("R8G8B8".parse::<PixelFormat>().ok(), Some(PixelFormat::R8G8B8));
        assert!(matches!(
            "RGBA32F".parse::<PixelFormat>(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn zero_buckets_is_rejected() {
        let config = HistogramConfig {
            bucket_count: 0,
            ..HistogramConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));
        assert!(HistogramConfig::default().validate().is_ok());
    }
}

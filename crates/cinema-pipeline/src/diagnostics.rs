//! Per-image diagnostics: timing and pixel counts for each stage.
//!
//! Every call to [`process_with_diagnostics`] collects these alongside
//! the histogram. Time is read through the [`Clock`] trait so this
//! crate never touches the wall clock itself; callers supply one
//! (`std::time::Instant` natively, a fake in tests).
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::decode::decode_rgb;
use crate::histogram::{Histogram, count_buckets};
use crate::types::{HistogramConfig, PipelineError};

/// Source of timestamps for stage timing.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// Current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
pub mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    ///
    /// # Errors
    ///
    /// Fails for negative, non-finite, or out-of-range values.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected while reducing one image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageDiagnostics {
    /// Stage 0: image decoding.
    pub decode: StageDiagnostics,
    /// Stage 1: histogram reduction.
    pub reduce: StageDiagnostics,
    /// Total wall-clock duration of both stages (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Image decoding metrics.
    Decode {
        /// Size of the encoded image.
        input_bytes: usize,
        /// Decoded width in pixels.
        width: u32,
        /// Decoded height in pixels.
        height: u32,
    },
    /// Histogram reduction metrics.
    Reduce {
        /// Number of buckets.
        bucket_count: usize,
        /// Total pixel count (`width * height`).
        pixel_count: u64,
        /// Pixels holding the no-data sentinel.
        no_data_count: u64,
    },
}

impl ImageDiagnostics {
    /// One-line summary for progress output.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "decode {} ({:.3}ms), reduce {} ({:.3}ms)",
            format_metrics(&self.decode.metrics),
            duration_ms(self.decode.duration),
            format_metrics(&self.reduce.metrics),
            duration_ms(self.reduce.duration),
        )
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
#[must_use]
pub fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
        } => format!("{input_bytes} bytes -> {width}x{height}"),
        StageMetrics::Reduce {
            bucket_count,
            pixel_count,
            no_data_count,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let no_data_pct = if *pixel_count > 0 {
                *no_data_count as f64 / *pixel_count as f64 * 100.0
            } else {
                0.0
            };
            format!("{bucket_count} buckets, no-data {no_data_count}/{pixel_count} ({no_data_pct:.1}%)")
        }
    }
}

/// Decode `image_bytes` and reduce to a histogram, timing each stage.
///
/// # Errors
///
/// Same as [`process`](crate::process).
pub fn process_with_diagnostics<C: Clock>(
    image_bytes: &[u8],
    config: &HistogramConfig,
    clock: &C,
) -> Result<(Histogram, ImageDiagnostics), PipelineError> {
    config.validate()?;
    let start = clock.now();

    let image = decode_rgb(image_bytes)?;
    let decode = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Decode {
            input_bytes: image_bytes.len(),
            width: image.width(),
            height: image.height(),
        },
    };

    let reduce_start = clock.now();
    let counts = count_buckets(&image, config.bucket_count)?;
    let histogram = counts.normalize(config.normalization);
    let reduce = StageDiagnostics {
        duration: clock.elapsed(&reduce_start),
        metrics: StageMetrics::Reduce {
            bucket_count: config.bucket_count,
            pixel_count: counts.total,
            no_data_count: counts.no_data,
        },
    };

    let diagnostics = ImageDiagnostics {
        decode,
        reduce,
        total_duration: clock.elapsed(&start),
    };
    Ok((histogram, diagnostics))
}

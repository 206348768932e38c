//! Outcome of one augmentation pass.

use std::path::PathBuf;
use std::time::Duration;

use cinema_pipeline::diagnostics::{ImageDiagnostics, duration_ms, duration_serde};
use serde::Serialize;

/// One image whose metadata was written.
#[derive(Debug, Clone, Serialize)]
pub struct ImageRecord {
    /// `axis=value` description of the combination.
    pub combination: String,
    /// Image that was read.
    pub image_path: PathBuf,
    /// Metadata document that was written.
    pub metadata_path: PathBuf,
    /// Stage timings and pixel counts.
    pub diagnostics: ImageDiagnostics,
}

/// One combination skipped under the tolerant policy.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedImage {
    /// `axis=value` description of the combination.
    pub combination: String,
    /// Image path resolved for it.
    pub image_path: PathBuf,
    /// Why it was skipped.
    pub error: String,
}

/// Summary of a pass over the database.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// Combinations in the parameter space.
    pub total: usize,
    /// Images processed, in enumeration order.
    pub images: Vec<ImageRecord>,
    /// Combinations skipped after an error.
    pub skipped: Vec<SkippedImage>,
    /// The run was cancelled before every combination was attempted.
    pub interrupted: bool,
    /// Wall-clock duration of the pass (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
}

impl RunReport {
    /// Number of metadata documents written.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.images.len()
    }

    /// Combinations neither processed nor skipped.
    #[must_use]
    pub fn not_attempted(&self) -> usize {
        self.total
            .saturating_sub(self.images.len() + self.skipped.len())
    }

    /// Every combination was processed successfully.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.interrupted && self.skipped.is_empty() && self.images.len() == self.total
    }

    /// Format a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Histogram Augmentation Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Combinations: {}  |  Processed: {}  |  Skipped: {}  |  Not attempted: {}",
            self.total,
            self.processed(),
            self.skipped.len(),
            self.not_attempted(),
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        if self.interrupted {
            lines.push("Run was interrupted".to_owned());
        }

        if !self.images.is_empty() {
            #[allow(clippy::cast_precision_loss)]
            let mean_ms = self
                .images
                .iter()
                .map(|record| duration_ms(record.diagnostics.total_duration))
                .sum::<f64>()
                / self.images.len() as f64;
            lines.push(format!("Mean per image: {mean_ms:.3}ms"));
        }

        if !self.skipped.is_empty() {
            lines.push(String::new());
            lines.push(format!("{:<32}  {}", "Skipped", "Reason"));
            lines.push("-".repeat(80));
            for skipped in &self.skipped {
                lines.push(format!(
                    "{:<32}  {}: {}",
                    skipped.combination,
                    skipped.image_path.display(),
                    skipped.error,
                ));
            }
        }

        lines.join("\n")
    }
}

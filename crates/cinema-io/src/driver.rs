//! The augmentation pass: one histogram per combination, merged into
//! that image's metadata document.
//!
//! Every combination reads one image and writes one metadata file, and
//! no two combinations share a metadata path, so iterations run either
//! sequentially in enumeration order or on a dedicated rayon pool.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use cinema_export::merge_histogram;
use cinema_pipeline::diagnostics::{Clock, ImageDiagnostics, duration_ms, process_with_diagnostics};
use cinema_pipeline::{Combination, HistogramConfig, ResolvedPaths};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::error::{ConfigError, ProcessError, RunError};
use crate::report::{ImageRecord, RunReport, SkippedImage};
use crate::write::write_atomic;

/// What to do when one combination fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorPolicy {
    /// Stop at the first failure and report it.
    #[default]
    FailFast,
    /// Log the failure, record it in the report, and continue.
    Tolerant,
}

/// Options for one pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    /// Histogram reduction settings.
    pub histogram: HistogramConfig,
    /// Failure handling.
    pub policy: ErrorPolicy,
    /// Worker threads. `1` processes combinations in enumeration order.
    pub jobs: usize,
}

impl RunOptions {
    /// Check the options before any file is touched.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Histogram`] for an invalid histogram
    /// configuration and [`ConfigError::NoWorkers`] if `jobs` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.histogram.validate()?;
        if self.jobs == 0 {
            return Err(ConfigError::NoWorkers);
        }
        Ok(())
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            histogram: HistogramConfig::default(),
            policy: ErrorPolicy::default(),
            jobs: 1,
        }
    }
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Runs the augmentation pass over an opened [`Database`].
#[derive(Debug)]
pub struct Driver<'a> {
    database: &'a Database,
    options: RunOptions,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> Driver<'a> {
    /// A driver for `database`. Options are checked when the pass runs.
    #[must_use]
    pub const fn new(database: &'a Database, options: RunOptions) -> Self {
        Self {
            database,
            options,
            cancel: None,
        }
    }

    /// Stop starting new combinations once `flag` is set.
    ///
    /// Writes already in progress finish; the report is marked
    /// interrupted.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// The options this driver runs with.
    #[must_use]
    pub const fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Process every combination.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Config`] before anything is read if the
    /// options are invalid, [`RunError::ThreadPool`] if the worker pool
    /// cannot start, and, under [`ErrorPolicy::FailFast`], the first
    /// [`RunError::Image`].
    pub fn run(&self) -> Result<RunReport, RunError> {
        self.options.validate()?;

        let start = Instant::now();
        let total = self.database.descriptor().combination_count();
        tracing::info!(
            root = %self.database.root().display(),
            total,
            jobs = self.options.jobs,
            "processing images"
        );

        let mut report = if self.options.jobs == 1 {
            self.run_sequential(total)?
        } else {
            self.run_parallel(total)?
        };
        report.total_duration = start.elapsed();

        if report.interrupted {
            tracing::warn!(
                processed = report.processed(),
                not_attempted = report.not_attempted(),
                "run interrupted"
            );
        }
        tracing::info!(
            processed = report.processed(),
            skipped = report.skipped.len(),
            elapsed_ms = duration_ms(report.total_duration),
            "pass complete"
        );
        Ok(report)
    }

    fn run_sequential(&self, total: usize) -> Result<RunReport, RunError> {
        let mut report = RunReport {
            total,
            ..RunReport::default()
        };
        let completed = AtomicUsize::new(0);

        for (combination, paths) in self.database.plan() {
            if self.is_cancelled() {
                report.interrupted = true;
                break;
            }
            let result = self.attempt(&combination, &paths, &completed, total);
            self.record(&mut report, result)?;
        }
        Ok(report)
    }

    fn run_parallel(&self, total: usize) -> Result<RunReport, RunError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.jobs)
            .build()?;

        let plan: Vec<(Combination, ResolvedPaths)> = self.database.plan().collect();
        let completed = AtomicUsize::new(0);
        let failed = AtomicBool::new(false);
        let interrupted = AtomicBool::new(false);
        let fail_fast = self.options.policy == ErrorPolicy::FailFast;

        let results: Vec<Option<Result<ImageRecord, RunError>>> = pool.install(|| {
            plan.par_iter()
                .map(|(combination, paths)| {
                    if self.is_cancelled() {
                        interrupted.store(true, Ordering::Relaxed);
                        return None;
                    }
                    if fail_fast && failed.load(Ordering::Relaxed) {
                        return None;
                    }
                    let result = self.attempt(combination, paths, &completed, total);
                    if result.is_err() {
                        failed.store(true, Ordering::Relaxed);
                    }
                    Some(result)
                })
                .collect()
        });

        let mut report = RunReport {
            total,
            interrupted: interrupted.load(Ordering::Relaxed),
            ..RunReport::default()
        };
        for result in results.into_iter().flatten() {
            self.record(&mut report, result)?;
        }
        Ok(report)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Process one combination, tagging any failure with its
    /// description and image path.
    fn attempt(
        &self,
        combination: &Combination,
        paths: &ResolvedPaths,
        completed: &AtomicUsize,
        total: usize,
    ) -> Result<ImageRecord, RunError> {
        let description = self.database.descriptor().describe(combination);
        match self.process(paths) {
            Ok(diagnostics) => {
                let count = completed.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::debug!(
                    count,
                    total,
                    combination = %description,
                    metadata = %paths.metadata_path.display(),
                    "{}",
                    diagnostics.summary()
                );
                Ok(ImageRecord {
                    combination: description,
                    image_path: paths.image_path.clone(),
                    metadata_path: paths.metadata_path.clone(),
                    diagnostics,
                })
            }
            Err(source) => Err(RunError::Image {
                combination: description,
                image_path: paths.image_path.clone(),
                source,
            }),
        }
    }

    fn process(&self, paths: &ResolvedPaths) -> Result<ImageDiagnostics, ProcessError> {
        let bytes = fs::read(&paths.image_path).map_err(ProcessError::ReadImage)?;
        let (histogram, diagnostics) =
            process_with_diagnostics(&bytes, &self.options.histogram, &StdClock)?;

        let existing = read_existing(&paths.metadata_path)?;
        let text = merge_histogram(existing.as_deref(), &histogram).map_err(|source| {
            ProcessError::Metadata {
                path: paths.metadata_path.clone(),
                source,
            }
        })?;
        write_atomic(&paths.metadata_path, text.as_bytes()).map_err(|source| {
            ProcessError::WriteMetadata {
                path: paths.metadata_path.clone(),
                source,
            }
        })?;
        Ok(diagnostics)
    }

    /// Apply the error policy to one outcome.
    fn record(
        &self,
        report: &mut RunReport,
        result: Result<ImageRecord, RunError>,
    ) -> Result<(), RunError> {
        match result {
            Ok(record) => report.images.push(record),
            Err(RunError::Image {
                combination,
                image_path,
                source,
            }) if self.options.policy == ErrorPolicy::Tolerant => {
                tracing::warn!(
                    combination = %combination,
                    image = %image_path.display(),
                    error = %source,
                    "skipping image"
                );
                report.skipped.push(SkippedImage {
                    combination,
                    image_path,
                    error: source.to_string(),
                });
            }
            Err(err) => return Err(err),
        }
        Ok(())
    }
}

/// Existing metadata text, or `None` if there is no file yet.
fn read_existing(path: &Path) -> Result<Option<String>, ProcessError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ProcessError::ReadMetadata {
            path: path.to_path_buf(),
            source,
        }),
    }
}

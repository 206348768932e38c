//! Error types for database access and the batch driver.

use std::io;
use std::path::PathBuf;

use cinema_export::MetadataError;
use cinema_pipeline::{DescriptorError, PipelineError};

/// The run cannot start: nothing has been read or written yet.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The descriptor file could not be read.
    #[error("failed to read descriptor {}: {source}", .path.display())]
    ReadDescriptor {
        /// Descriptor path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The descriptor is malformed or inconsistent.
    #[error("invalid descriptor {}: {source}", .path.display())]
    Descriptor {
        /// Descriptor path.
        path: PathBuf,
        /// What is wrong with it.
        source: DescriptorError,
    },

    /// The histogram configuration is out of range.
    #[error(transparent)]
    Histogram(#[from] PipelineError),

    /// The worker count is zero.
    #[error("worker count must be at least 1")]
    NoWorkers,
}

/// One combination could not be processed.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// The image file could not be read.
    #[error("failed to read image: {0}")]
    ReadImage(#[source] io::Error),

    /// The image could not be decoded or reduced.
    #[error("failed to reduce image: {0}")]
    Reduce(#[from] PipelineError),

    /// An existing metadata file could not be read.
    #[error("failed to read metadata {}: {source}", .path.display())]
    ReadMetadata {
        /// Metadata path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// An existing metadata document could not be merged.
    #[error("failed to merge metadata {}: {source}", .path.display())]
    Metadata {
        /// Metadata path.
        path: PathBuf,
        /// Parse or shape error.
        source: MetadataError,
    },

    /// The metadata file could not be written.
    #[error("failed to write metadata {}: {source}", .path.display())]
    WriteMetadata {
        /// Metadata path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
}

/// Errors that end a run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The run could not start.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A combination failed under the fail-fast policy.
    #[error("combination [{combination}] ({}): {source}", .image_path.display())]
    Image {
        /// `axis=value` description of the failing combination.
        combination: String,
        /// Image path resolved for it.
        image_path: PathBuf,
        /// What went wrong.
        source: ProcessError,
    },

    /// The worker pool could not be started.
    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

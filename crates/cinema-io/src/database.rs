//! Cinema database layout on disk.
//!
//! ```text
//! <root>/
//!   image/
//!     info.json          descriptor
//!     <name_pattern>     one image per combination
//!     <name>.json        one metadata document per image
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use cinema_pipeline::{Combination, Descriptor, ResolvedPaths};

use crate::error::ConfigError;

/// Directory under the database root holding images and the descriptor.
pub const IMAGE_DIR: &str = "image";

/// Descriptor file name inside [`IMAGE_DIR`].
pub const DESCRIPTOR_FILE: &str = "info.json";

/// An opened database: its location and validated descriptor.
#[derive(Debug, Clone)]
pub struct Database {
    root: PathBuf,
    image_root: PathBuf,
    descriptor: Descriptor,
}

impl Database {
    /// Read and validate `<root>/image/info.json`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadDescriptor`] if the file cannot be
    /// read and [`ConfigError::Descriptor`] if it is invalid.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let root = root.into();
        let image_root = root.join(IMAGE_DIR);
        let path = image_root.join(DESCRIPTOR_FILE);
        tracing::info!(path = %path.display(), "parsing descriptor");

        let text = fs::read_to_string(&path).map_err(|source| ConfigError::ReadDescriptor {
            path: path.clone(),
            source,
        })?;
        let descriptor = Descriptor::from_json(&text)
            .map_err(|source| ConfigError::Descriptor { path, source })?;

        tracing::debug!(
            axes = descriptor.axes().len(),
            combinations = descriptor.combination_count(),
            pattern = descriptor.name_pattern(),
            "descriptor loaded"
        );

        Ok(Self {
            root,
            image_root,
            descriptor,
        })
    }

    /// Wrap an already-validated descriptor rooted at `root`.
    #[must_use]
    pub fn from_descriptor(root: impl Into<PathBuf>, descriptor: Descriptor) -> Self {
        let root = root.into();
        let image_root = root.join(IMAGE_DIR);
        Self {
            root,
            image_root,
            descriptor,
        }
    }

    /// Database root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory that image names are resolved against.
    #[must_use]
    pub fn image_root(&self) -> &Path {
        &self.image_root
    }

    /// The validated descriptor.
    #[must_use]
    pub const fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Image and metadata paths for one combination, or `None` if it
    /// does not belong to this database's parameter space.
    #[must_use]
    pub fn resolve(&self, combination: &Combination) -> Option<ResolvedPaths> {
        self.descriptor.resolve(combination, &self.image_root)
    }

    /// Every combination with its resolved paths, in enumeration order.
    pub fn plan(&self) -> impl Iterator<Item = (Combination, ResolvedPaths)> + '_ {
        self.descriptor.combinations().filter_map(|combination| {
            let paths = self.resolve(&combination)?;
            Some((combination, paths))
        })
    }
}

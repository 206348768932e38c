//! cinema-export: Metadata document serializers (sans-IO)
//!
//! Merges derived values into per-image metadata documents without
//! disturbing anything else in them. Currently writes the histogram
//! under `variables.histogram`.

pub mod metadata;

pub use metadata::{MetadataDocument, MetadataError, merge_histogram};

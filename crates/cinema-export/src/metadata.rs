//! Per-image metadata documents.
//!
//! A metadata document is an open-schema JSON object. This module only
//! ever touches `variables.histogram`; every other key, at any depth,
//! round-trips untouched and in its original order (`serde_json` is
//! built with `preserve_order`).
//!
//! Malformed input is an error, never an excuse to start over from an
//! empty document: that would silently drop whatever was authored
//! there.
//!
//! This is a pure module with no I/O -- it takes and returns `String`s.

use cinema_pipeline::Histogram;
use serde_json::{Map, Value};

/// Top-level key holding per-image variables.
pub const VARIABLES_KEY: &str = "variables";

/// Key under [`VARIABLES_KEY`] holding the histogram.
pub const HISTOGRAM_KEY: &str = "histogram";

/// Errors that can occur while reading or updating a metadata document.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// The existing text is not valid JSON.
    #[error("metadata is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),

    /// The document root is not a JSON object.
    #[error("metadata document must be a JSON object, found {found}")]
    NotAnObject {
        /// JSON type found instead.
        found: &'static str,
    },

    /// `variables` exists but is not a JSON object.
    #[error("'variables' must be a JSON object, found {found}")]
    VariablesNotAnObject {
        /// JSON type found instead.
        found: &'static str,
    },

    /// Serialization failed.
    #[error("failed to serialize metadata: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// An open-schema metadata document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataDocument(Map<String, Value>);

impl MetadataDocument {
    /// An empty document (`{}`).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an existing document.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::Parse`] for invalid JSON and
    /// [`MetadataError::NotAnObject`] if the root is not an object.
    pub fn parse(text: &str) -> Result<Self, MetadataError> {
        let value: Value = serde_json::from_str(text).map_err(MetadataError::Parse)?;
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(MetadataError::NotAnObject {
                found: json_type(&other),
            }),
        }
    }

    /// The top-level key/value map.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Look up a top-level key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The `variables` object, if present and an object.
    #[must_use]
    pub fn variables(&self) -> Option<&Map<String, Value>> {
        self.0.get(VARIABLES_KEY).and_then(Value::as_object)
    }

    /// The stored histogram, if present and entirely numeric.
    #[must_use]
    pub fn histogram(&self) -> Option<Vec<f64>> {
        self.variables()?
            .get(HISTOGRAM_KEY)?
            .as_array()?
            .iter()
            .map(Value::as_f64)
            .collect()
    }

    /// Set `variables.histogram`, creating `variables` if needed.
    ///
    /// Any previous histogram is replaced in place; sibling keys are
    /// left alone.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::VariablesNotAnObject`] if `variables`
    /// already holds something other than an object.
    pub fn set_histogram(&mut self, histogram: &Histogram) -> Result<(), MetadataError> {
        let variables = self
            .0
            .entry(VARIABLES_KEY)
            .or_insert_with(|| Value::Object(Map::new()));
        let found = json_type(variables);
        let Value::Object(variables) = variables else {
            return Err(MetadataError::VariablesNotAnObject { found });
        };

        let buckets = histogram.buckets().iter().copied().map(Value::from).collect();
        variables.insert(HISTOGRAM_KEY.to_owned(), Value::Array(buckets));
        Ok(())
    }

    /// Canonical text: two-space pretty JSON plus a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::Serialize`] if serialization fails.
    pub fn to_json_string(&self) -> Result<String, MetadataError> {
        let mut text = serde_json::to_string_pretty(&self.0).map_err(MetadataError::Serialize)?;
        text.push('\n');
        Ok(text)
    }
}

/// Merge `histogram` into an existing document (or a fresh one) and
/// return the new canonical text.
///
/// # Errors
///
/// Returns a [`MetadataError`] if `existing` cannot be parsed or has a
/// non-object `variables`.
pub fn merge_histogram(existing: Option<&str>, histogram: &Histogram) -> Result<String, MetadataError> {
    let mut document = match existing {
        Some(text) => MetadataDocument::parse(text)?,
        None => MetadataDocument::new(),
    };
    document.set_histogram(histogram)?;
    document.to_json_string()
}

const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

//! Database descriptor: named axes plus the image name pattern.
//!
//! The descriptor is read from the database's `info.json`:
//!
//! ```json
//! {
//!   "name_pattern": "{phi}_{theta}.png",
//!   "pixel_format": "R8G8B8",
//!   "parameter_list": {
//!     "phi":   { "type": "range",  "values": [0, 30, 60] },
//!     "theta": { "type": "option", "values": ["a", "b"] }
//!   }
//! }
//! ```
//!
//! `parameter_list` order is axis order. Only `values` is read from
//! each parameter; everything else is ignored, as are unknown top-level
//! fields. All validation happens up front so that a bad descriptor
//! fails before any image is touched.

use std::path::{Component, Path};

use serde::Deserialize;
use serde_json::Value;

use crate::enumerate::{Combinations, total_combinations};
use crate::template::{Template, TemplateError};
use crate::types::{Axis, AxisValue, Combination, PixelFormat, ResolvedPaths};

/// Width of the image extension the name pattern must end with
/// (`png`, `jpg`, ...), not counting the dot.
pub const IMAGE_EXTENSION_LEN: usize = 3;

/// Extension given to metadata documents.
pub const METADATA_EXTENSION: &str = "json";

/// Errors raised while parsing or validating a descriptor.
#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    /// The document is not valid JSON or lacks a required field.
    #[error("malformed descriptor: {0}")]
    Json(#[from] serde_json::Error),

    /// A `parameter_list` entry could not be read.
    #[error("malformed parameter '{name}': {source}")]
    Parameter {
        /// Axis name.
        name: String,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// An axis has no values, so the parameter space is empty.
    #[error("axis '{name}' has no values")]
    EmptyAxis {
        /// Axis name.
        name: String,
    },

    /// An axis name is empty or contains braces.
    #[error("invalid axis name '{name}': names must be non-empty and brace-free")]
    InvalidAxisName {
        /// Offending name.
        name: String,
    },

    /// An axis value is not a string, number, or boolean.
    #[error("axis '{axis}' value #{index} is not a string, number, or boolean")]
    InvalidAxisValue {
        /// Axis name.
        axis: String,
        /// Position of the value in the axis.
        index: usize,
    },

    /// The name pattern is malformed or does not match the axes.
    #[error("invalid name pattern: {0}")]
    Template(#[from] TemplateError),

    /// The name pattern does not end in a fixed-width image extension.
    #[error("name pattern '{pattern}' must end with '.' and a 3-character extension")]
    Extension {
        /// The offending pattern.
        pattern: String,
    },

    /// The pixel format tag is not supported.
    #[error("unsupported pixel format '{0}' (supported: R8G8B8)")]
    PixelFormat(String),

    /// The number of combinations does not fit in `usize`.
    #[error("parameter space is too large to enumerate")]
    TooManyCombinations,

    /// A resolved image name is absolute or leaves the image directory.
    #[error("image name '{name}' must be a relative path inside the image directory")]
    UnsafePath {
        /// The offending rendered name.
        name: String,
    },
}

#[derive(Deserialize)]
struct RawDescriptor {
    name_pattern: String,
    parameter_list: serde_json::Map<String, Value>,
    #[serde(default)]
    pixel_format: Option<String>,
}

#[derive(Deserialize)]
struct RawParameter {
    values: Vec<Value>,
}

/// Validated description of a Cinema image database.
#[derive(Debug, Clone)]
pub struct Descriptor {
    axes: Vec<Axis>,
    name_pattern: String,
    pixel_format: PixelFormat,
    template: Template,
    combination_count: usize,
}

impl Descriptor {
    /// Build a descriptor from already-parsed parts.
    ///
    /// # Errors
    ///
    /// Returns a [`DescriptorError`] if an axis is empty or badly named,
    /// the pattern does not have exactly one placeholder name per axis,
    /// the pattern lacks a fixed-width extension, the space is too
    /// large to count, or some combination resolves to a name outside
    /// the image directory.
    pub fn new(
        axes: Vec<Axis>,
        name_pattern: String,
        pixel_format: PixelFormat,
    ) -> Result<Self, DescriptorError> {
        for axis in &axes {
            if axis.name().is_empty() || axis.name().contains(['{', '}']) {
                return Err(DescriptorError::InvalidAxisName {
                    name: axis.name().to_owned(),
                });
            }
            if axis.cardinality() == 0 {
                return Err(DescriptorError::EmptyAxis {
                    name: axis.name().to_owned(),
                });
            }
        }

        let names: Vec<&str> = axes.iter().map(Axis::name).collect();
        let template = Template::parse(&name_pattern, &names)?;
        if !has_image_extension(template.trailing_literal()) {
            return Err(DescriptorError::Extension {
                pattern: name_pattern,
            });
        }

        let cardinalities: Vec<usize> = axes.iter().map(Axis::cardinality).collect();
        let combination_count =
            total_combinations(&cardinalities).ok_or(DescriptorError::TooManyCombinations)?;

        let descriptor = Self {
            axes,
            name_pattern,
            pixel_format,
            template,
            combination_count,
        };
        descriptor.check_names_contained()?;
        Ok(descriptor)
    }

    /// Every rendered image name must consist of plain path components
    /// only: no root, prefix, `.` or `..`.
    fn check_names_contained(&self) -> Result<(), DescriptorError> {
        for combination in self.combinations() {
            let Some(values) = self.values_for(&combination) else {
                continue;
            };
            let name = self.template.render(&values);
            let contained = Path::new(&name)
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
            if !contained {
                return Err(DescriptorError::UnsafePath { name });
            }
        }
        Ok(())
    }

    /// Parse and validate an `info.json` document.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::Json`] for malformed JSON or missing
    /// fields, plus everything [`Descriptor::new`] can return.
    pub fn from_json(text: &str) -> Result<Self, DescriptorError> {
        let raw: RawDescriptor = serde_json::from_str(text)?;

        let pixel_format = match raw.pixel_format.as_deref() {
            None => PixelFormat::default(),
            Some(tag) => tag
                .parse::<PixelFormat>()
                .map_err(|_| DescriptorError::PixelFormat(tag.to_owned()))?,
        };

        let axes = raw
            .parameter_list
            .into_iter()
            .map(|(name, parameter)| parse_axis(name, parameter))
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(axes, raw.name_pattern, pixel_format)
    }

    /// Axes in declaration order.
    #[must_use]
    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    /// The raw name pattern.
    #[must_use]
    pub fn name_pattern(&self) -> &str {
        &self.name_pattern
    }

    /// Encoding of the scalar field in each image.
    #[must_use]
    pub const fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    /// Total number of combinations (product of cardinalities).
    #[must_use]
    pub const fn combination_count(&self) -> usize {
        self.combination_count
    }

    /// Start a fresh enumeration of every combination.
    #[must_use]
    pub fn combinations(&self) -> Combinations {
        let cardinalities: Vec<usize> = self.axes.iter().map(Axis::cardinality).collect();
        Combinations::new(&cardinalities)
    }

    /// String form of each axis value selected by `combination`.
    ///
    /// Returns `None` if `combination` does not fit this descriptor's
    /// axes (wrong length or an index out of range).
    #[must_use]
    pub fn values_for(&self, combination: &Combination) -> Option<Vec<String>> {
        if combination.indices().len() != self.axes.len() {
            return None;
        }
        self.axes
            .iter()
            .zip(combination.indices())
            .map(|(axis, &i)| axis.values().get(i).map(ToString::to_string))
            .collect()
    }

    /// Human-readable `axis=value` list, used in progress and errors.
    ///
    /// Falls back to the raw indices for a foreign combination.
    #[must_use]
    pub fn describe(&self, combination: &Combination) -> String {
        let Some(values) = self.values_for(combination) else {
            return format!("{:?}", combination.indices());
        };
        self.axes
            .iter()
            .zip(values)
            .map(|(axis, value)| format!("{}={value}", axis.name()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Image and metadata names relative to the image root, or `None`
    /// for a foreign combination.
    #[must_use]
    pub fn resolve_names(&self, combination: &Combination) -> Option<(String, String)> {
        let image = self.template.render(&self.values_for(combination)?);
        let end = image.len().checked_sub(IMAGE_EXTENSION_LEN)?;
        let metadata = format!("{}{METADATA_EXTENSION}", image.get(..end)?);
        Some((image, metadata))
    }

    /// Image and metadata paths under `image_root`, or `None` for a
    /// foreign combination.
    #[must_use]
    pub fn resolve(&self, combination: &Combination, image_root: &Path) -> Option<ResolvedPaths> {
        let (image, metadata) = self.resolve_names(combination)?;
        Some(ResolvedPaths {
            image_path: image_root.join(image),
            metadata_path: image_root.join(metadata),
        })
    }
}

fn parse_axis(name: String, parameter: Value) -> Result<Axis, DescriptorError> {
    let raw: RawParameter = match serde_json::from_value(parameter) {
        Ok(raw) => raw,
        Err(source) => return Err(DescriptorError::Parameter { name, source }),
    };

    let mut values = Vec::with_capacity(raw.values.len());
    for (index, value) in raw.values.into_iter().enumerate() {
        let value = match value {
            Value::String(s) => AxisValue::Text(s),
            Value::Number(n) => AxisValue::Number(n),
            Value::Bool(b) => AxisValue::Bool(b),
            Value::Null | Value::Array(_) | Value::Object(_) => {
                return Err(DescriptorError::InvalidAxisValue { axis: name, index });
            }
        };
        values.push(value);
    }

    Ok(Axis::new(name, values))
}

/// Whether `suffix` ends in `.` plus [`IMAGE_EXTENSION_LEN`] ASCII
/// alphanumerics.
fn has_image_extension(suffix: &str) -> bool {
    let bytes = suffix.as_bytes();
    let Some(dot) = bytes.len().checked_sub(IMAGE_EXTENSION_LEN + 1) else {
        return false;
    };
    bytes[dot] == b'.' && bytes[dot + 1..].iter().all(u8::is_ascii_alphanumeric)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    const INFO_JSON: &str = r#"{
        "type": "simple",
        "version": "0.0",
        "metadata": {"type": "parametric-image-stack"},
        "name_pattern": "{x}_{y}.png",
        "parameter_list": {
            "x": {"type": "range", "values": [5, 10], "default": 5, "label": "x"},
            "y": {"type": "option", "values": ["theta", "phi", "rho"], "label": "y"}
        }
    }"#;

    fn axis(name: &str, values: &[&str]) -> Axis {
        Axis::new(
            name.to_owned(),
            values.iter().map(|v| AxisValue::from(*v)).collect(),
        )
    }

    #[test]
    fn parses_axes_in_document_order() {
        let descriptor = Descriptor::from_json(INFO_JSON).unwrap();
        let names: Vec<&str> = descriptor.axes().iter().map(Axis::name).collect();
        assert_eq!(names, ["x", "y"]);
        assert_eq!(descriptor.axes()[0].cardinality(), 2);
        assert_eq!(descriptor.axes()[1].cardinality(), 3);
        assert_eq!(descriptor.combination_count(), 6);
        assert_eq!(descriptor.pixel_format(), PixelFormat::R8G8B8);
    }

    #[test]
    fn resolves_image_and_metadata_paths() {
        let descriptor = Descriptor::from_json(INFO_JSON).unwrap();
        let root = PathBuf::from("/db/image");
        let paths = descriptor
            .resolve(&Combination::new(vec![0, 0]), &root)
            .unwrap();
        assert_eq!(paths.image_path, PathBuf::from("/db/image/5_theta.png"));
        assert_eq!(paths.metadata_path, PathBuf::from("/db/image/5_theta.json"));
    }

    #[test]
    fn enumeration_resolves_to_distinct_paths() {
        let descriptor = Descriptor::from_json(INFO_JSON).unwrap();
        let names: Vec<String> = descriptor
            .combinations()
            .map(|c| descriptor.resolve_names(&c).unwrap().0)
            .collect();
        assert_eq!(
            names,
            [
                "5_theta.png",
                "10_theta.png",
                "5_phi.png",
                "10_phi.png",
                "5_rho.png",
                "10_rho.png",
            ]
        );
    }

    #[test]
    fn describe_lists_axis_values() {
        let descriptor = Descriptor::from_json(INFO_JSON).unwrap();
        assert_eq!(
            descriptor.describe(&Combination::new(vec![1, 2])),
            "x=10, y=rho"
        );
    }

    #[test]
    fn foreign_combination_does_not_resolve() {
        let descriptor = Descriptor::from_json(INFO_JSON).unwrap();
        let root = PathBuf::from("/db/image");
        for indices in [vec![0], vec![0, 3], vec![2, 0], vec![0, 0, 0]] {
            let combination = Combination::new(indices);
            assert_eq!(descriptor.values_for(&combination), None);
            assert_eq!(descriptor.resolve(&combination, &root), None);
        }
        assert_eq!(descriptor.describe(&Combination::new(vec![7])), "[7]");
    }

    #[test]
    fn names_escaping_the_image_directory_are_rejected() {
        let cases: [(&str, &[&str]); 5] = [
            ("{x}.png", &["ok", "/tmp/evil"]),
            ("{x}/a.png", &[".."]),
            ("{x}{y}/a.png", &["."]),
            ("../{x}.png", &["a"]),
            ("{x}/a.png", &[""]),
        ];
        for (pattern, values) in cases {
            let axes = if pattern.contains("{y}") {
                vec![axis("x", values), axis("y", values)]
            } else {
                vec![axis("x", values)]
            };
            let result = Descriptor::new(axes, pattern.to_owned(), PixelFormat::R8G8B8);
            assert!(
                matches!(result, Err(DescriptorError::UnsafePath { .. })),
                "{pattern:?} with {values:?} should be rejected, got {result:?}"
            );
        }
    }

    #[test]
    fn absolute_value_in_json_never_resolves_outside_root() {
        let json = r#"{"name_pattern": "{x}.png", "parameter_list": {"x": {"values": ["/tmp/evil"]}}}"#;
        let err = Descriptor::from_json(json).unwrap_err();
        assert!(matches!(&err, DescriptorError::UnsafePath { name } if name == "/tmp/evil.png"));
    }

    #[test]
    fn subdirectory_patterns_are_allowed() {
        let descriptor = Descriptor::new(
            vec![axis("x", &["a", "b"]), axis("y", &["1"])],
            "{x}/{y}.png".to_owned(),
            PixelFormat::R8G8B8,
        )
        .unwrap();
        let root = PathBuf::from("/db/image");
        let paths = descriptor
            .resolve(&Combination::new(vec![1, 0]), &root)
            .unwrap();
        assert_eq!(paths.image_path, PathBuf::from("/db/image/b/1.png"));
        assert_eq!(paths.metadata_path, PathBuf::from("/db/image/b/1.json"));
    }

    #[test]
    fn empty_axis_is_rejected() {
        let result = Descriptor::new(
            vec![axis("x", &["1"]), axis("y", &[])],
            "{x}_{y}.png".to_owned(),
            PixelFormat::R8G8B8,
        );
        assert!(matches!(result, Err(DescriptorError::EmptyAxis { name }) if name == "y"));
    }

    #[test]
    fn empty_values_in_json_is_rejected() {
        let json = r#"{"name_pattern": "{x}.png", "parameter_list": {"x": {"values": []}}}"#;
        assert!(matches!(
            Descriptor::from_json(json),
            Err(DescriptorError::EmptyAxis { .. })
        ));
    }

    #[test]
    fn braces_in_axis_name_are_rejected() {
        let result = Descriptor::new(
            vec![axis("a}b", &["1"])],
            "{a}b}.png".to_owned(),
            PixelFormat::R8G8B8,
        );
        assert!(matches!(
            result,
            Err(DescriptorError::InvalidAxisName { .. })
        ));
    }

    #[test]
    fn pattern_must_mention_every_axis() {
        let result = Descriptor::new(
            vec![axis("x", &["1"]), axis("y", &["2"])],
            "{x}.png".to_owned(),
            PixelFormat::R8G8B8,
        );
        assert!(matches!(
            result,
            Err(DescriptorError::Template(TemplateError::MissingPlaceholder { .. }))
        ));
    }

    #[test]
    fn pattern_needs_fixed_width_extension() {
        for pattern in ["{x}.tiff", "{x}", "{x}png", "{x}.p{x}", "{x}.p-g"] {
            let result = Descriptor::new(
                vec![axis("x", &["1"])],
                pattern.to_owned(),
                PixelFormat::R8G8B8,
            );
            assert!(
                matches!(result, Err(DescriptorError::Extension { .. })),
                "pattern {pattern:?} should be rejected, got {result:?}"
            );
        }
    }

    #[test]
    fn non_scalar_axis_value_is_rejected() {
        let json =
            r#"{"name_pattern": "{x}.png", "parameter_list": {"x": {"values": [1, null]}}}"#;
        assert!(matches!(
            Descriptor::from_json(json),
            Err(DescriptorError::InvalidAxisValue { index: 1, .. })
        ));
    }

    #[test]
    fn parameter_without_values_is_rejected() {
        let json = r#"{"name_pattern": "{x}.png", "parameter_list": {"x": {"type": "range"}}}"#;
        assert!(matches!(
            Descriptor::from_json(json),
            Err(DescriptorError::Parameter { .. })
        ));
    }

    #[test]
    fn missing_name_pattern_is_malformed() {
        let json = r#"{"parameter_list": {}}"#;
        assert!(matches!(
            Descriptor::from_json(json),
            Err(DescriptorError::Json(_))
        ));
    }

    #[test]
    fn unknown_pixel_format_is_rejected() {
        let json = r#"{"name_pattern": "a.png", "parameter_list": {}, "pixel_format": "F32"}"#;
        assert!(matches!(
            Descriptor::from_json(json),
            Err(DescriptorError::PixelFormat(tag)) if tag == "F32"
        ));
    }

    #[test]
    fn no_axes_is_a_single_image() {
        let json = r#"{"name_pattern": "only.png", "parameter_list": {}}"#;
        let descriptor = Descriptor::from_json(json).unwrap();
        assert_eq!(descriptor.combination_count(), 1);
        let names: Vec<_> = descriptor
            .combinations()
            .map(|c| descriptor.resolve_names(&c).unwrap())
            .collect();
        assert_eq!(names, [("only.png".to_owned(), "only.json".to_owned())]);
    }

    #[test]
    fn numeric_values_keep_json_text() {
        let json = r#"{"name_pattern": "{t}.png", "parameter_list": {"t": {"values": [0.5, 30.0, 7]}}}"#;
        let descriptor = Descriptor::from_json(json).unwrap();
        let names: Vec<String> = descriptor
            .combinations()
            .map(|c| descriptor.resolve_names(&c).unwrap().0)
            .collect();
        assert_eq!(names, ["0.5.png", "30.0.png", "7.png"]);
    }
}

//! `{name}` placeholder substitution for image name patterns.
//!
//! A pattern is tokenized once into literal and placeholder segments,
//! then rendered per combination. Rendering never rescans substituted
//! text, so a value that happens to contain braces is emitted as-is.

/// One piece of a parsed pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// Position of the bound name in the list given to [`Template::parse`].
    Placeholder(usize),
}

/// A parsed name pattern bound to an ordered list of names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
    arity: usize,
}

/// Errors raised while parsing a name pattern.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    /// A `{` was opened but never closed.
    #[error("unterminated placeholder starting at byte {offset}")]
    Unterminated {
        /// Byte offset of the opening brace.
        offset: usize,
    },

    /// A `{` appeared inside another placeholder.
    #[error("nested placeholder at byte {offset}")]
    Nested {
        /// Byte offset of the inner opening brace.
        offset: usize,
    },

    /// A `}` appeared outside any placeholder.
    #[error("unmatched '}}' at byte {offset}")]
    UnmatchedClose {
        /// Byte offset of the closing brace.
        offset: usize,
    },

    /// A placeholder names nothing in the bound list.
    #[error("placeholder '{{{name}}}' does not match any axis")]
    UnknownPlaceholder {
        /// Name inside the braces.
        name: String,
    },

    /// A bound name never appears in the pattern.
    #[error("pattern has no '{{{name}}}' placeholder")]
    MissingPlaceholder {
        /// The unused name.
        name: String,
    },
}

impl Template {
    /// Parse `pattern`, resolving each `{name}` against `names`.
    ///
    /// Every placeholder must name an entry of `names`, and every entry
    /// must appear at least once; a placeholder may repeat.
    ///
    /// # Errors
    ///
    /// Returns a [`TemplateError`] for unbalanced or nested braces,
    /// unknown placeholders, and names with no placeholder.
    pub fn parse(pattern: &str, names: &[&str]) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut used = vec![false; names.len()];
        let mut open: Option<usize> = None;

        for (offset, ch) in pattern.char_indices() {
            match (ch, open) {
                ('{', None) => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    open = Some(offset);
                }
                ('{', Some(_)) => return Err(TemplateError::Nested { offset }),
                ('}', None) => return Err(TemplateError::UnmatchedClose { offset }),
                ('}', Some(start)) => {
                    let name = &pattern[start + 1..offset];
                    let position = names.iter().position(|n| *n == name).ok_or_else(|| {
                        TemplateError::UnknownPlaceholder {
                            name: name.to_owned(),
                        }
                    })?;
                    used[position] = true;
                    segments.push(Segment::Placeholder(position));
                    open = None;
                }
                (_, None) => literal.push(ch),
                (_, Some(_)) => {}
            }
        }

        if let Some(offset) = open {
            return Err(TemplateError::Unterminated { offset });
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        if let Some(unused) = used.iter().position(|u| !u) {
            return Err(TemplateError::MissingPlaceholder {
                name: names[unused].to_owned(),
            });
        }

        Ok(Self {
            segments,
            arity: names.len(),
        })
    }

    /// Number of names this template was bound to.
    #[must_use]
    pub const fn arity(&self) -> usize {
        self.arity
    }

    /// Substitute `values[i]` for every placeholder bound to name `i`.
    ///
    /// `values` must have [`arity`](Self::arity) entries; missing entries
    /// render as empty text.
    #[must_use]
    pub fn render<S: AsRef<str>>(&self, values: &[S]) -> String {
        debug_assert_eq!(values.len(), self.arity, "template arity mismatch");
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(i) => {
                    if let Some(value) = values.get(*i) {
                        out.push_str(value.as_ref());
                    }
                }
            }
        }
        out
    }

    /// The literal text after the last placeholder, if any.
    #[must_use]
    pub fn trailing_literal(&self) -> &str {
        match self.segments.last() {
            Some(Segment::Literal(text)) => text,
            _ => "",
        }
    }
}

/// Parse `pattern` and render it with ordered `(name, value)` bindings.
///
/// # Errors
///
/// Same as [`Template::parse`].
pub fn substitute(pattern: &str, bindings: &[(&str, &str)]) -> Result<String, TemplateError> {
    let names: Vec<&str> = bindings.iter().map(|(name, _)| *name).collect();
    let values: Vec<&str> = bindings.iter().map(|(_, value)| *value).collect();
    Ok(Template::parse(pattern, &names)?.render(&values))
}

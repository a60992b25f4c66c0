//! Field annotations are small declarative strings describing how a field should be injected:
//!
//! ```text
//! name='datasource',default='zero'
//! value='${server.port:8080}'
//! type='private'
//! ```
//!
//! An annotation is a comma-separated list of `key='value'` pairs or bare `key`s (which are
//! equivalent to `key='true'`). Quoted values can contain escaped quotes (`\'`) and backslashes
//! (`\\`). The parsed [FieldMetadata] always contains the [TAG] key holding the raw annotation,
//! which marks the field as taking part in injection, even if the annotation is empty.

use crate::error::SyntaxError;
use itertools::Itertools;
use std::fmt::{Display, Formatter};

/// Key holding the raw annotation.
pub const TAG: &str = "tag";

/// Key selecting a named binding.
pub const NAME: &str = "name";

/// Key holding a literal or a `${...}` placeholder.
pub const VALUE: &str = "value";

/// Key holding a fallback literal, or [ZERO].
pub const DEFAULT: &str = "default";

/// Key selecting the binding type, currently only [PRIVATE].
pub const TYPE: &str = "type";

/// [DEFAULT] sentinel leaving reference fields empty when nothing is bound.
pub const ZERO: &str = "zero";

/// [TYPE] forcing a fresh, unshared instance.
pub const PRIVATE: &str = "private";

/// Parsed field annotation. Keys keep the order of their first appearance; a repeated key
/// overwrites the previous value.
#[derive(Clone, Default, Eq, PartialEq, Debug)]
pub struct FieldMetadata {
    entries: Vec<(String, String)>,
}

impl FieldMetadata {
    /// Returns the value for given key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(entry_key, _)| entry_key == key)
            .map(|(_, value)| value.as_str())
    }

    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The raw annotation this metadata was parsed from.
    #[inline]
    pub fn tag(&self) -> Option<&str> {
        self.get(TAG)
    }

    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.get(NAME)
    }

    #[inline]
    pub fn value(&self) -> Option<&str> {
        self.get(VALUE)
    }

    #[inline]
    pub fn default_value(&self) -> Option<&str> {
        self.get(DEFAULT)
    }

    /// Checks for `default='zero'`.
    #[inline]
    pub fn is_zero_default(&self) -> bool {
        self.default_value() == Some(ZERO)
    }

    /// Checks for `type='private'`.
    #[inline]
    pub fn is_private(&self) -> bool {
        self.get(TYPE) == Some(PRIVATE)
    }

    /// Renders all entries except [TAG] back into annotation syntax. Parsing the result yields
    /// the same entries.
    pub fn to_annotation(&self) -> String {
        self.entries
            .iter()
            .filter(|(key, _)| key != TAG)
            .map(|(key, value)| format!("{key}='{}'", escape(value)))
            .join(",")
    }

    fn insert(&mut self, key: String, value: String) {
        if let Some(entry) = self.entries.iter_mut().find(|(entry_key, _)| *entry_key == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }
}

impl Display for FieldMetadata {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_annotation())
    }
}

/// Parses a field annotation.
pub fn parse(annotation: &str) -> Result<FieldMetadata, SyntaxError> {
    let mut metadata = FieldMetadata::default();
    metadata.insert(TAG.to_string(), annotation.to_string());

    let bytes = annotation.as_bytes();
    let syntax_error = |offset: usize| SyntaxError {
        annotation: annotation.to_string(),
        offset,
    };

    let mut position = 0;
    loop {
        while position < bytes.len() && (bytes[position] == b' ' || bytes[position] == b',') {
            position += 1;
        }

        if position == bytes.len() {
            break;
        }

        let name_start = position;
        while position < bytes.len() && !matches!(bytes[position], b' ' | b',' | b'\'' | b'=') {
            position += 1;
        }

        if position == name_start {
            return Err(syntax_error(position));
        }

        let name = &annotation[name_start..position];

        if position == bytes.len() || bytes[position] == b' ' || bytes[position] == b',' {
            metadata.insert(name.to_string(), "true".to_string());
            continue;
        }

        if bytes[position] != b'=' || bytes.get(position + 1) != Some(&b'\'') {
            return Err(syntax_error(position));
        }

        // skip `='`
        position += 2;
        let value_start = position;
        while position < bytes.len() && bytes[position] != b'\'' {
            if bytes[position] == b'\\' {
                position += 1;
            }
            position += 1;
        }

        if position >= bytes.len() {
            return Err(syntax_error(value_start - 1));
        }

        metadata.insert(
            name.to_string(),
            unescape(&annotation[value_start..position]),
        );

        // skip closing quote
        position += 1;
    }

    Ok(metadata)
}

fn unescape(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                result.push(escaped);
            }
        } else {
            result.push(c);
        }
    }

    result
}

fn escape(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\\' || c == '\'' {
            result.push('\\');
        }
        result.push(c);
    }

    result
}

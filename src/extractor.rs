//! Turns raw page text or a JSON body into the six canonical field values.
//!
//! Every field is looked up on its own. A field that does not match is
//! `None` and never stops the others; the only failure is a JSON body that
//! cannot be read as an object at all.

use log::debug;
use serde_json::{Map, Value};

use crate::{
    errors::ContentFormatError,
    patterns::{BankPatterns, FieldPattern},
    record::FieldValues,
    registry::ExtractionMode,
};

/// How a single pattern is evaluated against one kind of content.
pub trait ExtractionStrategy {
    fn extract_field(&self, pattern: &FieldPattern) -> Option<String>;
}

/// Regex templates over flattened visible text.
pub struct TextStrategy<'a> {
    text: &'a str,
}

impl<'a> TextStrategy<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text }
    }
}

impl ExtractionStrategy for TextStrategy<'_> {
    fn extract_field(&self, pattern: &FieldPattern) -> Option<String> {
        let FieldPattern::LabeledText { templates, .. } = pattern else {
            return None;
        };
        templates.iter().find_map(|template| {
            template
                .captures(self.text)
                .and_then(|caps| caps.get(1))
                .map(|match_| match_.as_str().to_string())
        })
    }
}

/// Key lookups in a JSON object parsed once per extraction.
pub struct JsonStrategy {
    object: Map<String, Value>,
}

impl JsonStrategy {
    pub fn parse(content: &str) -> Result<Self, ContentFormatError> {
        if content.trim().is_empty() {
            return Err(ContentFormatError::Empty);
        }
        match serde_json::from_str::<Value>(content)? {
            Value::Object(object) => Ok(Self { object }),
            _ => Err(ContentFormatError::NotAnObject),
        }
    }

    fn lookup(&self, key: &str) -> Option<&Value> {
        // An exact key wins over a dotted path so keys containing dots
        // still resolve.
        if let Some(value) = self.object.get(key) {
            return Some(value);
        }
        let mut parts = key.split('.');
        let first = self.object.get(parts.next()?)?;
        parts.try_fold(first, |value, part| value.as_object()?.get(part))
    }
}

impl ExtractionStrategy for JsonStrategy {
    fn extract_field(&self, pattern: &FieldPattern) -> Option<String> {
        let FieldPattern::JsonKey(key) = pattern else {
            return None;
        };
        match self.lookup(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Extracts all six fields from `content`. The raw matched substrings are
/// returned untouched; units and locale formatting are left to consumers.
pub fn extract(
    content: &str,
    mode: ExtractionMode,
    patterns: &BankPatterns,
) -> Result<FieldValues, ContentFormatError> {
    let fields = match mode {
        ExtractionMode::RenderedPage => extract_with(&TextStrategy::new(content), patterns),
        ExtractionMode::JsonApi => extract_with(&JsonStrategy::parse(content)?, patterns),
    };
    Ok(fields)
}

pub fn extract_with(strategy: &impl ExtractionStrategy, patterns: &BankPatterns) -> FieldValues {
    patterns
        .iter()
        .map(|(field, pattern)| {
            let value = match pattern {
                FieldPattern::Absent => None,
                _ => strategy.extract_field(pattern),
            };
            if value.is_none() && !matches!(pattern, FieldPattern::Absent) {
                debug!(
                    "{}: no value for {} using pattern {:?}",
                    patterns.bank_id(),
                    field,
                    pattern.describe()
                );
            }
            (field, value)
        })
        .collect()
}

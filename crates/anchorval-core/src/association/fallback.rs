//! Explicit fallback values for anchors the text could not resolve.
//!
//! A fallback source is business data supplied by the caller (for example a
//! custodian position file). It is only consulted for unresolved anchors,
//! and every value taken from it is marked as such in the result.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A value supplied by a fallback source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FallbackValue {
    pub value: Decimal,
    /// Confidence the caller assigns to this value, clamped to `[0, 1]`.
    pub confidence: f64,
}

impl FallbackValue {
    /// A fallback value; a non-finite confidence becomes 0.
    pub fn new(value: Decimal, confidence: f64) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self { value, confidence }
    }
}

/// Source of values for unresolved anchors.
pub trait FallbackSource {
    /// Look up a value for an identifier.
    fn lookup(&self, identifier: &str) -> Option<FallbackValue>;
}

/// In-memory fallback table.
#[derive(Debug, Clone, Default)]
pub struct MapFallback {
    values: HashMap<String, FallbackValue>,
}

impl MapFallback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value.
    pub fn with_value(mut self, identifier: impl Into<String>, value: Decimal, confidence: f64) -> Self {
        self.insert(identifier, value, confidence);
        self
    }

    /// Insert or replace a value.
    pub fn insert(&mut self, identifier: impl Into<String>, value: Decimal, confidence: f64) {
        self.values
            .insert(identifier.into(), FallbackValue::new(value, confidence));
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FallbackSource for MapFallback {
    fn lookup(&self, identifier: &str) -> Option<FallbackValue> {
        self.values.get(identifier).copied()
    }
}

impl<S: Into<String>> FromIterator<(S, Decimal)> for MapFallback {
    fn from_iter<I: IntoIterator<Item = (S, Decimal)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (identifier, value) in iter {
            map.insert(identifier, value, 1.0);
        }
        map
    }
}

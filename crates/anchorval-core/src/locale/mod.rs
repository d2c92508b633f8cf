//! Locale numeric profiles.
//!
//! A profile says which character groups thousands and which one marks
//! decimals. Nothing is guessed: a token is read exactly the way the profile
//! says, or it is not read at all.

mod parser;
mod tokenizer;

pub use parser::{format_amount, parse_amount};
pub use tokenizer::{NumericTokenizer, RawToken};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Typographic apostrophe, emitted by most PDF text extractors for `'`.
const RIGHT_SINGLE_QUOTE: char = '\u{2019}';
const NO_BREAK_SPACE: char = '\u{00a0}';
const NARROW_NO_BREAK_SPACE: char = '\u{202f}';

/// How numbers are written in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleNumericProfile {
    /// Character grouping thousands (`None` for ungrouped numbers).
    pub thousands_separator: Option<char>,

    /// Character separating the integer part from the fraction.
    pub decimal_separator: char,

    /// Smallest value accepted as a candidate.
    pub min_plausible_value: Decimal,

    /// Largest value accepted as a candidate.
    pub max_plausible_value: Decimal,
}

impl Default for LocaleNumericProfile {
    fn default() -> Self {
        Self::swiss()
    }
}

impl LocaleNumericProfile {
    /// Create a profile and validate it.
    pub fn new(
        thousands_separator: Option<char>,
        decimal_separator: char,
        min_plausible_value: Decimal,
        max_plausible_value: Decimal,
    ) -> Result<Self, ConfigError> {
        let profile = Self {
            thousands_separator,
            decimal_separator,
            min_plausible_value,
            max_plausible_value,
        };
        profile.validate()?;
        Ok(profile)
    }

    /// Swiss convention: `1'234'567.50`.
    pub fn swiss() -> Self {
        Self::preset(Some('\''), '.')
    }

    /// English convention: `1,234,567.50`.
    pub fn us() -> Self {
        Self::preset(Some(','), '.')
    }

    /// German/Italian convention: `1.234.567,50`.
    pub fn continental() -> Self {
        Self::preset(Some('.'), ',')
    }

    /// French/Polish convention: `1 234 567,50`.
    pub fn spaced() -> Self {
        Self::preset(Some(' '), ',')
    }

    /// No grouping: `1234567.50`.
    pub fn plain() -> Self {
        Self::preset(None, '.')
    }

    /// Look up a preset by name.
    pub fn named(name: &str) -> Result<Self, ConfigError> {
        match name.to_ascii_lowercase().as_str() {
            "swiss" | "ch" => Ok(Self::swiss()),
            "us" | "en" => Ok(Self::us()),
            "continental" | "de" => Ok(Self::continental()),
            "spaced" | "fr" | "pl" => Ok(Self::spaced()),
            "plain" => Ok(Self::plain()),
            other => Err(ConfigError::UnknownProfile(other.to_string())),
        }
    }

    fn preset(thousands_separator: Option<char>, decimal_separator: char) -> Self {
        Self {
            thousands_separator,
            decimal_separator,
            min_plausible_value: Decimal::from(1_000),
            max_plausible_value: Decimal::from(50_000_000),
        }
    }

    /// Replace the plausibility bounds.
    pub fn with_bounds(mut self, min: Decimal, max: Decimal) -> Self {
        self.min_plausible_value = min;
        self.max_plausible_value = max;
        self
    }

    /// Check the profile for contradictions.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |c: char| c.is_alphanumeric() || c == '-' || c == '\u{2212}';

        if invalid(self.decimal_separator) {
            return Err(ConfigError::InvalidSeparator(self.decimal_separator));
        }
        if let Some(sep) = self.thousands_separator {
            if invalid(sep) {
                return Err(ConfigError::InvalidSeparator(sep));
            }
            if self.thousands_variants().contains(&self.decimal_separator) {
                return Err(ConfigError::SameSeparators(self.decimal_separator));
            }
        }
        if self.min_plausible_value > self.max_plausible_value {
            return Err(ConfigError::InvalidBounds {
                min: self.min_plausible_value.to_string(),
                max: self.max_plausible_value.to_string(),
            });
        }
        Ok(())
    }

    /// Every character read as a thousands separator.
    ///
    /// The apostrophe and the space have look-alikes that text extraction
    /// produces interchangeably.
    pub fn thousands_variants(&self) -> Vec<char> {
        match self.thousands_separator {
            None => Vec::new(),
            Some('\'') => vec!['\'', RIGHT_SINGLE_QUOTE],
            Some(' ') => vec![' ', NO_BREAK_SPACE, NARROW_NO_BREAK_SPACE],
            Some(c) => vec![c],
        }
    }

    /// Whether a value lies within the plausibility bounds (inclusive).
    pub fn is_plausible(&self, value: &Decimal) -> bool {
        *value >= self.min_plausible_value && *value <= self.max_plausible_value
    }

    /// Parse a raw token under this profile.
    pub fn parse(&self, raw: &str) -> Option<Decimal> {
        parse_amount(raw, self)
    }

    /// Parse a raw token and keep it only if it is plausible.
    pub fn parse_plausible(&self, raw: &str) -> Option<Decimal> {
        self.parse(raw).filter(|value| self.is_plausible(value))
    }

    /// Format a value the way this profile writes it.
    pub fn format(&self, value: Decimal) -> String {
        format_amount(value, self)
    }
}

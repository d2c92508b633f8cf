//! Numeric token scanning for a locale profile.

use regex::Regex;
use tracing::trace;

use super::LocaleNumericProfile;
use crate::error::ConfigError;

/// A numeric-looking substring of the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawToken<'a> {
    /// Token text as it appeared.
    pub text: &'a str,
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
}

/// Finds digit runs that may hold a number under a given profile.
///
/// Tokens always start and end on a digit. Digit runs glued to letters
/// (identifier fragments such as the body of an ISIN), date and range
/// pieces (`2024-01-31`, `12/48`) and percentages are skipped.
#[derive(Debug, Clone)]
pub struct NumericTokenizer {
    pattern: Regex,
}

impl NumericTokenizer {
    /// Build a tokenizer for the separators of a profile.
    pub fn new(profile: &LocaleNumericProfile) -> Result<Self, ConfigError> {
        let mut class = String::from(r"\d");
        for sep in profile.thousands_variants() {
            class.push_str(&regex::escape(&sep.to_string()));
        }
        class.push_str(&regex::escape(&profile.decimal_separator.to_string()));

        let pattern = Regex::new(&format!(r"[-\u{{2212}}]?\d(?:[{class}]*\d)?"))
            .map_err(|e| ConfigError::InvalidPattern(e.to_string()))?;

        Ok(Self { pattern })
    }

    /// Scan text for numeric tokens, in order of appearance.
    pub fn tokens<'a>(&self, text: &'a str) -> Vec<RawToken<'a>> {
        let mut tokens = Vec::new();
        let mut pos = 0;

        while let Some(m) = self.pattern.find_at(text, pos) {
            pos = m.end();
            let before = text[..m.start()].chars().next_back();
            let mut after = text[m.end()..].chars();
            let next = after.next();
            let next_next = after.next();

            if before.is_some_and(|c| c.is_alphanumeric() || c == '_') {
                // Only the leading digit run belongs to the preceding word;
                // a separator after it may start a real number.
                pos = m.start() + glued_prefix_len(m.as_str());
                trace!("skipping {:?}: glued to preceding text", &text[m.start()..pos]);
                continue;
            }

            let joins_digits = |c: Option<char>, d: Option<char>| {
                matches!(c, Some('-' | '/')) && d.is_some_and(|d| d.is_ascii_digit())
            };
            if joins_digits(next, next_next) || matches!(before, Some('/')) {
                trace!("skipping {:?}: date or range fragment", m.as_str());
                continue;
            }

            let percent = text[m.end()..].trim_start_matches([' ', '\u{00a0}']).starts_with('%');
            if percent {
                trace!("skipping {:?}: percentage", m.as_str());
                continue;
            }

            tokens.push(RawToken {
                text: m.as_str(),
                start: m.start(),
                end: m.end(),
            });
        }

        tokens
    }
}

/// Byte length of the optional sign and the digit run a match starts with.
fn glued_prefix_len(token: &str) -> usize {
    let body = token.trim_start_matches(['-', '\u{2212}']);
    let sign = token.len() - body.len();
    let digits = body.find(|c: char| !c.is_numeric()).unwrap_or(body.len());
    sign + digits
}

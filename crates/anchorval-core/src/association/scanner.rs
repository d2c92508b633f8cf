//! Anchor scanning.

use std::ops::Range;

use regex::{Regex, RegexBuilder};
use tracing::trace;

use super::isin::validate_isin;
use super::patterns::{ISIN_LABELED, ISIN_PATTERN};
use super::text_index::TextIndex;
use crate::error::ConfigError;
use crate::models::AnchorMatch;

/// Compiled-program size limit for caller patterns.
const PATTERN_SIZE_LIMIT: usize = 1 << 20;

/// Finds anchor identifiers in text.
///
/// Matching runs on the `regex` crate's finite automata, so scan time is
/// linear in the text length for any pattern.
#[derive(Debug, Clone)]
pub struct AnchorScanner {
    pattern: Regex,
    validator: Option<fn(&str) -> bool>,
}

impl AnchorScanner {
    /// Compile an anchor pattern.
    ///
    /// Fails if the pattern is invalid, too large, or matches the empty
    /// string (it would anchor at every position).
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        let regex = RegexBuilder::new(pattern)
            .size_limit(PATTERN_SIZE_LIMIT)
            .build()
            .map_err(|e| ConfigError::InvalidPattern(e.to_string()))?;
        Self::from_regex(regex)
    }

    /// Use an already compiled regex.
    pub fn from_regex(pattern: Regex) -> Result<Self, ConfigError> {
        if pattern.is_match("") {
            return Err(ConfigError::EmptyMatchingPattern(pattern.as_str().to_string()));
        }
        Ok(Self {
            pattern,
            validator: None,
        })
    }

    /// Scanner for bare ISIN-like codes.
    pub fn isin() -> Self {
        Self {
            pattern: ISIN_PATTERN.clone(),
            validator: None,
        }
    }

    /// Scanner for ISINs preceded by an `ISIN` label.
    pub fn labeled_isin() -> Self {
        Self {
            pattern: ISIN_LABELED.clone(),
            validator: None,
        }
    }

    /// Keep only identifiers accepted by `validator`.
    pub fn with_validator(mut self, validator: fn(&str) -> bool) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Set whether to validate ISIN check digits.
    pub fn with_isin_validation(self, validate: bool) -> Self {
        if validate {
            self.with_validator(validate_isin)
        } else {
            Self {
                validator: None,
                ..self
            }
        }
    }

    /// The pattern source.
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Scan text for all non-overlapping anchors, ordered by position.
    pub fn scan(&self, text: &str) -> Vec<AnchorMatch> {
        self.scan_indexed(text, &TextIndex::new(text))
    }

    pub(crate) fn scan_indexed(&self, text: &str, index: &TextIndex) -> Vec<AnchorMatch> {
        self.scan_range(text, index, 0..text.len())
    }

    /// Scan for anchors whose match starts inside `range` of `text`.
    ///
    /// Matching sees the whole text, so a match may run past `range.end` and
    /// word boundaries at `range.start` are judged against the preceding
    /// character. Positions are character offsets into the whole text.
    pub(crate) fn scan_range(&self, text: &str, index: &TextIndex, range: Range<usize>) -> Vec<AnchorMatch> {
        let mut anchors = Vec::new();
        let mut pos = range.start;

        while pos <= text.len() {
            let Some(caps) = self.pattern.captures_at(text, pos) else {
                break;
            };
            let Some(whole) = caps.get(0) else {
                break;
            };
            if whole.start() >= range.end {
                break;
            }
            pos = if whole.end() > whole.start() {
                whole.end()
            } else {
                whole.end() + text[whole.end()..].chars().next().map_or(1, char::len_utf8)
            };

            let m = caps.get(1).unwrap_or(whole);
            if m.as_str().is_empty() {
                continue;
            }
            if let Some(validate) = self.validator {
                if !validate(m.as_str()) {
                    trace!("anchor {:?} failed validation", m.as_str());
                    continue;
                }
            }

            let position = index.char_offset(m.start());
            let length = index.char_offset(m.end()) - position;
            anchors.push(AnchorMatch::new(m.as_str(), position, length));
        }

        anchors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_scan_isins_in_order() {
        let text = "XS2993414619 first, then CH0012032048 and XS2993414619 again";
        let anchors = AnchorScanner::isin().scan(text);
        let found: Vec<(&str, usize)> = anchors
            .iter()
            .map(|a| (a.identifier.as_str(), a.position))
            .collect();
        assert_eq!(
            found,
            vec![("XS2993414619", 0), ("CH0012032048", 25), ("XS2993414619", 42)]
        );
        assert!(anchors.iter().all(|a| a.length == 12));
    }

    #[test]
    fn test_no_anchors_is_empty() {
        assert!(AnchorScanner::isin().scan("nothing to see here 1'000").is_empty());
    }

    #[test]
    fn test_capture_group_sets_identifier_and_position() {
        let text = "Bond ISIN: XS2993414619 Valorn.: 140610687";
        let anchors = AnchorScanner::labeled_isin().scan(text);
        assert_eq!(anchors, vec![AnchorMatch::new("XS2993414619", 11, 12)]);
    }

    #[test]
    fn test_checksum_validation() {
        let text = "US0378331005 US0378331006";
        assert_eq!(AnchorScanner::isin().scan(text).len(), 2);

        let validated = AnchorScanner::isin().with_isin_validation(true).scan(text);
        assert_eq!(validated.len(), 1);
        assert_eq!(validated[0].identifier, "US0378331005");
    }

    #[test]
    fn test_character_positions_with_multibyte_text() {
        let text = "Wert 1’000’000 – CH0012032048";
        let anchors = AnchorScanner::isin().scan(text);
        assert_eq!(anchors[0].position, 17);
    }

    #[test]
    fn test_range_scan_sees_text_beyond_range() {
        let text = "Bond ISIN:\nXS2993414619 Countervalue 199'080.00 USD";
        let index = TextIndex::new(text);
        let scanner = AnchorScanner::labeled_isin();

        let anchors = scanner.scan_range(text, &index, 0..11);
        assert_eq!(anchors, vec![AnchorMatch::new("XS2993414619", 11, 12)]);

        // The match starting before the range belongs to the earlier range.
        assert!(scanner.scan_range(text, &index, 11..text.len()).is_empty());
    }

    #[test]
    fn test_range_scan_keeps_word_boundaries() {
        let text = "AXS2993414619 XS2530201644";
        let index = TextIndex::new(text);
        let anchors = AnchorScanner::isin().scan_range(text, &index, 1..text.len());
        assert_eq!(anchors, vec![AnchorMatch::new("XS2530201644", 14, 12)]);
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(matches!(
            AnchorScanner::new("([A-Z]"),
            Err(ConfigError::InvalidPattern(_))
        ));
        assert!(matches!(
            AnchorScanner::new("\\d*"),
            Err(ConfigError::EmptyMatchingPattern(_))
        ));
    }

    #[test]
    fn test_custom_pattern() {
        let scanner = AnchorScanner::new(r"\bValor\s+(\d{6,9})\b").unwrap();
        let anchors = scanner.scan("Valor 1234567 and Valor 7654321");
        let ids: Vec<&str> = anchors.iter().map(|a| a.identifier.as_str()).collect();
        assert_eq!(ids, vec!["1234567", "7654321"]);
    }
}

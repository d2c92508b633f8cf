//! Common regex patterns and marker lists.

use lazy_static::lazy_static;
use regex::Regex;

/// ISIN-like code: country prefix, nine alphanumerics, numeric check digit.
pub const ISIN_PATTERN_STR: &str = r"\b[A-Z]{2}[A-Z0-9]{9}[0-9]\b";

/// Currency symbols stripped from amount tokens and tagged near candidates.
pub const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥', '₣'];

/// Default ISO currency codes tagged near candidates.
pub const DEFAULT_CURRENCIES: &[&str] = &[
    "CHF", "USD", "EUR", "GBP", "JPY", "CAD", "AUD", "SEK", "NOK", "DKK", "PLN", "SGD", "HKD",
];

/// Default value keywords.
pub const DEFAULT_KEYWORDS: &[&str] = &["Total", "Market Value", "Countervalue", "Valuation"];

lazy_static! {
    pub static ref ISIN_PATTERN: Regex = Regex::new(ISIN_PATTERN_STR).unwrap();

    // Labeled ISIN, e.g. "ISIN: XS2993414619"
    pub static ref ISIN_LABELED: Regex = Regex::new(
        r"(?i)ISIN[\s:]*([A-Z]{2}[A-Z0-9]{9}[0-9])\b"
    ).unwrap();
}

/// A word found by a [`WordMatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordHit {
    /// Byte offset of the match start.
    pub start: usize,
    /// Byte offset one past the match end.
    pub end: usize,
    /// Index of the matched word in the list the matcher was built from.
    pub word: usize,
}

/// Matches any word from a list and reports which one matched.
///
/// Words are tried longest first, so "Market Value" wins over "Value".
/// Inner whitespace matches any whitespace run. Word boundaries are only
/// required at ends that are word characters, so symbols like `$` work.
#[derive(Debug, Clone)]
pub struct WordMatcher {
    regex: Regex,
    group_words: Vec<usize>,
}

impl WordMatcher {
    pub fn new(words: &[String], case_insensitive: bool) -> Result<Self, regex::Error> {
        let mut order: Vec<usize> = (0..words.len()).collect();
        order.sort_by(|a, b| words[*b].len().cmp(&words[*a].len()));

        let alternation: Vec<String> = order
            .iter()
            .map(|&i| {
                let word = words[i].trim();
                let escaped: Vec<String> = word.split_whitespace().map(regex::escape).collect();
                let lead = if word.starts_with(is_word_char) { r"\b" } else { "" };
                let trail = if word.ends_with(is_word_char) { r"\b" } else { "" };
                format!("{}({}){}", lead, escaped.join(r"\s+"), trail)
            })
            .collect();

        let flags = if case_insensitive { "(?i)" } else { "" };
        let regex = Regex::new(&format!("{}(?:{})", flags, alternation.join("|")))?;

        Ok(Self {
            regex,
            group_words: order,
        })
    }

    /// All non-overlapping hits, in order of appearance.
    pub fn find_all(&self, text: &str) -> Vec<WordHit> {
        self.regex
            .captures_iter(text)
            .filter_map(|caps| {
                let (group, m) = (1..caps.len()).find_map(|g| caps.get(g).map(|m| (g, m)))?;
                Some(WordHit {
                    start: m.start(),
                    end: m.end(),
                    word: self.group_words[group - 1],
                })
            })
            .collect()
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

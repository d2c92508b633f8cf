//! Context windows around anchors and candidate extraction.

use rust_decimal::Decimal;
use std::collections::BTreeSet;
use tracing::trace;

use super::patterns::{WordHit, WordMatcher};
use super::text_index::TextIndex;
use crate::error::ConfigError;
use crate::locale::{LocaleNumericProfile, NumericTokenizer};
use crate::models::{AnchorMatch, AssociationOptions, ContextTag, NumericCandidate};

/// A plausible numeric token, positioned in characters.
#[derive(Debug, Clone)]
struct PlacedToken {
    raw: String,
    value: Decimal,
    start: usize,
    end: usize,
}

/// A keyword or currency hit, positioned in characters.
#[derive(Debug, Clone, Copy)]
struct PlacedHit {
    start: usize,
    end: usize,
    word: usize,
}

/// Tokens and markers of one document, computed once and shared by all
/// anchors of that document.
#[derive(Debug)]
pub struct PreparedText {
    tokens: Vec<PlacedToken>,
    keywords: Vec<PlacedHit>,
    currencies: Vec<PlacedHit>,
    char_len: usize,
}

impl PreparedText {
    /// Number of plausible numeric tokens in the document.
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }
}

/// Extracts and tags the numeric candidates around each anchor.
#[derive(Debug, Clone)]
pub struct ContextWindowExtractor {
    profile: LocaleNumericProfile,
    tokenizer: NumericTokenizer,
    radius: usize,
    currency_radius: usize,
    keyword_radius: usize,
    keywords: Vec<String>,
    keyword_matcher: Option<WordMatcher>,
    currency_matcher: Option<WordMatcher>,
}

impl ContextWindowExtractor {
    /// Build an extractor for a profile and option set.
    pub fn new(
        profile: &LocaleNumericProfile,
        options: &AssociationOptions,
    ) -> Result<Self, ConfigError> {
        profile.validate()?;
        options.validate()?;

        let pattern_error = |e: regex::Error| ConfigError::InvalidPattern(e.to_string());

        let keyword_matcher = if options.keywords.is_empty() {
            None
        } else {
            Some(WordMatcher::new(&options.keywords, true).map_err(pattern_error)?)
        };
        let currency_matcher = if options.currencies.is_empty() {
            None
        } else {
            Some(WordMatcher::new(&options.currencies, false).map_err(pattern_error)?)
        };

        Ok(Self {
            profile: profile.clone(),
            tokenizer: NumericTokenizer::new(profile)?,
            radius: options.window_radius,
            currency_radius: options.currency_radius,
            keyword_radius: options.keyword_radius,
            keywords: options.keywords.iter().map(|k| k.trim().to_string()).collect(),
            keyword_matcher,
            currency_matcher,
        })
    }

    /// Character bounds `[start, end)` of the window around an anchor.
    pub fn window_bounds(&self, anchor: &AnchorMatch, char_len: usize) -> (usize, usize) {
        let start = anchor.position.saturating_sub(self.radius);
        let end = (anchor.end() + self.radius).min(char_len);
        (start, end)
    }

    /// Tokenize a document once.
    ///
    /// Tokens that fail to parse, fall outside the plausibility bounds, or
    /// overlap an anchor are dropped here.
    pub fn prepare(&self, text: &str, index: &TextIndex, anchors: &[AnchorMatch]) -> PreparedText {
        let mut tokens = Vec::new();

        for raw in self.tokenizer.tokens(text) {
            let Some(value) = self.profile.parse(raw.text) else {
                trace!("dropping unparseable token {:?}", raw.text);
                continue;
            };
            if !self.profile.is_plausible(&value) {
                trace!("dropping implausible token {:?}", raw.text);
                continue;
            }

            let start = index.char_offset(raw.start);
            let end = index.char_offset(raw.end);
            if overlaps_anchor(anchors, start, end) {
                continue;
            }

            tokens.push(PlacedToken {
                raw: raw.text.to_string(),
                value,
                start,
                end,
            });
        }

        let place = |hits: Vec<WordHit>| -> Vec<PlacedHit> {
            hits.into_iter()
                .map(|hit| PlacedHit {
                    start: index.char_offset(hit.start),
                    end: index.char_offset(hit.end),
                    word: hit.word,
                })
                .collect()
        };

        PreparedText {
            tokens,
            keywords: self
                .keyword_matcher
                .as_ref()
                .map(|m| place(m.find_all(text)))
                .unwrap_or_default(),
            currencies: self
                .currency_matcher
                .as_ref()
                .map(|m| place(m.find_all(text)))
                .unwrap_or_default(),
            char_len: index.char_len(),
        }
    }

    /// Candidates inside the window of `anchor`, nearest first.
    pub fn candidates(&self, prepared: &PreparedText, anchor: &AnchorMatch) -> Vec<NumericCandidate> {
        let (win_start, win_end) = self.window_bounds(anchor, prepared.char_len);

        let first = prepared.tokens.partition_point(|t| t.start < win_start);
        let mut candidates: Vec<NumericCandidate> = prepared.tokens[first..]
            .iter()
            .take_while(|t| t.start < win_end)
            .filter(|t| t.end <= win_end)
            .map(|token| {
                let offset_from_anchor = if token.start >= anchor.end() {
                    (token.start - anchor.end()) as i64
                } else {
                    -(anchor.position.saturating_sub(token.end) as i64)
                };

                NumericCandidate {
                    raw_text: token.raw.clone(),
                    parsed_value: token.value,
                    position: token.start,
                    offset_from_anchor,
                    context_tags: self.tags(prepared, token, (win_start, win_end)),
                }
            })
            .collect();

        candidates.sort_by_key(|c| (c.distance(), c.position));
        candidates
    }

    fn tags(
        &self,
        prepared: &PreparedText,
        token: &PlacedToken,
        window: (usize, usize),
    ) -> BTreeSet<ContextTag> {
        let mut tags = BTreeSet::new();

        let near_currency = hits_near(&prepared.currencies, token, self.currency_radius).next();
        if near_currency.is_some() {
            tags.insert(ContextTag::HasCurrencySymbol);
        }

        for hit in hits_near(&prepared.keywords, token, self.keyword_radius) {
            if hit.start >= window.0 && hit.end <= window.1 {
                tags.insert(ContextTag::NearKeyword(self.keywords[hit.word].clone()));
            }
        }

        if (token.value % Decimal::from(1_000)).is_zero() {
            tags.insert(ContextTag::IsRoundNumber);
        }

        tags
    }
}

/// Hits ending no earlier than `radius` before the token and starting no
/// later than `radius` after it. Hits are non-overlapping, so both their
/// starts and ends ascend.
fn hits_near<'a>(
    hits: &'a [PlacedHit],
    token: &PlacedToken,
    radius: usize,
) -> impl Iterator<Item = &'a PlacedHit> + 'a {
    let lower = token.start.saturating_sub(radius);
    let upper = token.end + radius;
    let first = hits.partition_point(|h| h.end < lower);
    hits[first..].iter().take_while(move |h| h.start <= upper)
}

fn overlaps_anchor(anchors: &[AnchorMatch], start: usize, end: usize) -> bool {
    let i = anchors.partition_point(|a| a.end() <= start);
    anchors.get(i).is_some_and(|a| a.position < end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::association::AnchorScanner;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn candidates_for(text: &str, options: &AssociationOptions) -> Vec<NumericCandidate> {
        let extractor =
            ContextWindowExtractor::new(&LocaleNumericProfile::swiss(), options).unwrap();
        let index = TextIndex::new(text);
        let anchors = AnchorScanner::isin().scan(text);
        let prepared = extractor.prepare(text, &index, &anchors);
        extractor.candidates(&prepared, &anchors[0])
    }

    #[test]
    fn test_single_candidate_tags() {
        let text = "ISIN: CH1234567890  Alpha Fund  1'234'567.50 CHF";
        let candidates = candidates_for(text, &AssociationOptions::default());

        assert_eq!(candidates.len(), 1);
        let candidate = &candidates[0];
        assert_eq!(candidate.raw_text, "1'234'567.50");
        assert_eq!(candidate.parsed_value, Decimal::from_str("1234567.50").unwrap());
        assert_eq!(candidate.offset_from_anchor, 14);
        assert_eq!(
            candidate.context_tags,
            BTreeSet::from([ContextTag::HasCurrencySymbol])
        );
    }

    #[test]
    fn test_nearest_first_with_signed_offsets() {
        let text = "USD 2'500'000 XS2993414619 Bond 10'250.75 USD";
        let candidates = candidates_for(text, &AssociationOptions::default());

        let offsets: Vec<i64> = candidates.iter().map(|c| c.offset_from_anchor).collect();
        assert_eq!(offsets, vec![-1, 6]);
        assert!(candidates[0].is_round());
        assert!(!candidates[1].is_round());
    }

    #[test]
    fn test_window_radius_limits_candidates() {
        let padding = " ".repeat(40);
        let text = format!("XS2993414619{}5'000.25 far{}7'000.10", padding, padding);
        let options = AssociationOptions::default()
            .with_window_radius(60)
            .with_keywords(Vec::<String>::new());
        let candidates = candidates_for(&text, &options);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].raw_text, "5'000.25");
    }

    #[test]
    fn test_implausible_and_unparseable_tokens_dropped() {
        let text = "Ref 99 ISIN: XS0000000001 page 12 of 48 value 12'3456 pending";
        assert!(candidates_for(text, &AssociationOptions::default()).is_empty());
    }

    #[test]
    fn test_keyword_tags_are_local() {
        let text = "XS2993414619 Total Assets 1'800'000.00 CHF .............................................................................. 2'000.50";
        let candidates = candidates_for(text, &AssociationOptions::default());

        assert_eq!(candidates.len(), 2);
        assert!(candidates[0].has_keyword());
        assert!(candidates[0].context_tags.contains(&ContextTag::NearKeyword("Total".to_string())));
        assert!(!candidates[1].has_keyword());
    }

    #[test]
    fn test_window_bounds() {
        let extractor = ContextWindowExtractor::new(
            &LocaleNumericProfile::swiss(),
            &AssociationOptions::default().with_window_radius(2),
        );
        // currency_radius (15) exceeds the window radius.
        assert!(extractor.is_err());

        let mut options = AssociationOptions::default().with_window_radius(2);
        options.currency_radius = 1;
        let extractor =
            ContextWindowExtractor::new(&LocaleNumericProfile::swiss(), &options).unwrap();
        let anchor = AnchorMatch::new("XS2993414619", 5, 12);
        assert_eq!(extractor.window_bounds(&anchor, 22), (3, 19));
        assert_eq!(extractor.window_bounds(&anchor, 18), (3, 18));
    }
}

//! Batch association: scan anchors, collect candidates, select values.

use std::collections::HashMap;
use std::ops::Range;
use std::time::Instant;

use tracing::{debug, info, warn};

use super::fallback::{FallbackSource, FallbackValue};
use super::scanner::AnchorScanner;
use super::scorer::CandidateScorer;
use super::shard::TextShard;
use super::text_index::TextIndex;
use super::window::ContextWindowExtractor;
use crate::error::ConfigError;
use crate::locale::LocaleNumericProfile;
use crate::models::{
    AnchorMatch, AssociationOptions, AssociationReport, AssociationResult, AssociatorConfig,
    Diagnostics, DuplicateAnchor, Resolution, ScoredCandidate,
};

/// Associates each anchor in a document with its most plausible value.
///
/// The associator holds only immutable configuration, so one instance can
/// serve many documents from many threads.
pub struct ValueAssociator {
    scanner: AnchorScanner,
    windows: ContextWindowExtractor,
    scorer: CandidateScorer,
    fallback: Option<Box<dyn FallbackSource + Send + Sync>>,
}

impl ValueAssociator {
    /// Build an associator, validating the whole configuration.
    pub fn new(
        scanner: AnchorScanner,
        profile: &LocaleNumericProfile,
        options: &AssociationOptions,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            scanner,
            windows: ContextWindowExtractor::new(profile, options)?,
            scorer: CandidateScorer::new(options.scoring.clone())?,
            fallback: None,
        })
    }

    /// Build an associator from a configuration file model.
    pub fn from_config(config: &AssociatorConfig) -> Result<Self, ConfigError> {
        Self::new(config.anchor.build_scanner()?, &config.profile, &config.options)
    }

    /// Consult `source` for anchors the text leaves unresolved.
    pub fn with_fallback(mut self, source: impl FallbackSource + Send + Sync + 'static) -> Self {
        self.fallback = Some(Box::new(source));
        self
    }

    /// Associate every anchor in `text`.
    pub fn associate(&self, text: &str) -> AssociationReport {
        let start = Instant::now();
        info!("Associating values in {} characters of text", text.len());

        let index = TextIndex::new(text);
        let anchors = self.scanner.scan_indexed(text, &index);
        let report = self.assemble(text, &index, anchors);

        debug!("Association finished in {:?}", start.elapsed());
        report
    }

    /// Associate every anchor in `text`, scanning `shards` in parallel.
    ///
    /// Shards must be slices of `text` (see [`shard_by_lines`](super::shard_by_lines));
    /// a shard that is not is skipped with a warning. Each worker matches
    /// against the whole text but keeps only matches starting in its shards,
    /// so an anchor spanning a shard boundary (a label on one line and the
    /// code on the next) is found exactly once. Context windows are taken
    /// from the whole text as well.
    pub fn associate_sharded(&self, text: &str, shards: &[TextShard<'_>]) -> AssociationReport {
        let start = Instant::now();
        info!(
            "Associating values in {} characters of text across {} shards",
            text.len(),
            shards.len()
        );

        let index = TextIndex::new(text);
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(shards.len().max(1));
        let per_worker = shards.len().div_ceil(workers).max(1);

        let mut anchors: Vec<AnchorMatch> = std::thread::scope(|scope| {
            let handles: Vec<_> = shards
                .chunks(per_worker)
                .map(|chunk| {
                    let index = &index;
                    scope.spawn(move || {
                        chunk
                            .iter()
                            .filter_map(|shard| shard_range(text, shard))
                            .flat_map(|range| self.scanner.scan_range(text, index, range))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|handle| match handle.join() {
                    Ok(found) => found,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        });

        // Overlapping shards could report the same anchor twice.
        anchors.sort_by_key(|a| a.position);
        let mut last_end = 0;
        anchors.retain(|a| {
            let keep = a.position >= last_end;
            if keep {
                last_end = a.end();
            }
            keep
        });

        let report = self.assemble(text, &index, anchors);
        debug!("Sharded association finished in {:?}", start.elapsed());
        report
    }

    fn assemble(&self, text: &str, index: &TextIndex, anchors: Vec<AnchorMatch>) -> AssociationReport {
        let prepared = self.windows.prepare(text, index, &anchors);
        debug!(
            "Found {} anchors and {} plausible numeric tokens",
            anchors.len(),
            prepared.token_count()
        );

        let duplicate_anchors = find_duplicates(&anchors);

        let results: Vec<AssociationResult> = anchors
            .into_iter()
            .map(|anchor| {
                let candidates = self.windows.candidates(&prepared, &anchor);
                let selection = self.scorer.select(candidates);

                let result = match selection.selected {
                    Some(i) => AssociationResult {
                        selected_value: Some(selection.candidates[i].candidate.parsed_value),
                        confidence: selection.confidence,
                        resolution: Resolution::Resolved,
                        selected_candidate: Some(i),
                        candidates_considered: selection.candidates,
                        anchor,
                    },
                    None => self.resolve_fallback(anchor, selection.candidates),
                };

                debug!(
                    "{} at {}: {:?} ({:?}, confidence {:.2})",
                    result.anchor.identifier,
                    result.anchor.position,
                    result.selected_value,
                    result.resolution,
                    result.confidence
                );
                result
            })
            .collect();

        let diagnostics = summarize(&results, duplicate_anchors.len());
        info!(
            "{} anchors: {} resolved, {} fallback, {} unresolved, {} duplicated identifiers",
            diagnostics.total_anchors,
            diagnostics.resolved,
            diagnostics.fallback,
            diagnostics.unresolved,
            diagnostics.duplicate_identifiers
        );

        AssociationReport {
            results,
            duplicate_anchors,
            diagnostics,
        }
    }

    fn resolve_fallback(
        &self,
        anchor: AnchorMatch,
        candidates: Vec<ScoredCandidate>,
    ) -> AssociationResult {
        let found = self
            .fallback
            .as_ref()
            .and_then(|source| source.lookup(&anchor.identifier));

        match found {
            Some(found) => AssociationResult {
                anchor,
                selected_value: Some(found.value),
                confidence: FallbackValue::new(found.value, found.confidence).confidence,
                resolution: Resolution::Fallback,
                selected_candidate: None,
                candidates_considered: candidates,
            },
            None => AssociationResult::unresolved(anchor, candidates),
        }
    }
}

/// Associate values in one call.
///
/// Fails only on malformed configuration.
pub fn associate(
    text: &str,
    anchor_pattern: &str,
    profile: &LocaleNumericProfile,
    options: &AssociationOptions,
) -> Result<AssociationReport, ConfigError> {
    let scanner = AnchorScanner::new(anchor_pattern)?;
    Ok(ValueAssociator::new(scanner, profile, options)?.associate(text))
}

/// Byte range of `shard` within `text`, if the shard is a slice of it.
fn shard_range(text: &str, shard: &TextShard<'_>) -> Option<Range<usize>> {
    let range = shard.byte_offset..shard.byte_offset.saturating_add(shard.text.len());
    if text.get(range.clone()) == Some(shard.text) {
        Some(range)
    } else {
        warn!("skipping shard at byte {}: not a slice of the document", shard.byte_offset);
        None
    }
}

/// Identifiers matched more than once, in order of first occurrence.
fn find_duplicates(anchors: &[AnchorMatch]) -> Vec<DuplicateAnchor> {
    let mut order: Vec<&str> = Vec::new();
    let mut positions: HashMap<&str, Vec<usize>> = HashMap::new();

    for anchor in anchors {
        let entry = positions.entry(anchor.identifier.as_str()).or_default();
        if entry.is_empty() {
            order.push(anchor.identifier.as_str());
        }
        entry.push(anchor.position);
    }

    order
        .into_iter()
        .filter_map(|identifier| {
            let positions = positions.remove(identifier)?;
            (positions.len() > 1).then(|| DuplicateAnchor {
                identifier: identifier.to_string(),
                positions,
            })
        })
        .collect()
}

fn summarize(results: &[AssociationResult], duplicate_identifiers: usize) -> Diagnostics {
    let count = |resolution: Resolution| results.iter().filter(|r| r.resolution == resolution).count();

    let average_confidence = if results.is_empty() {
        0.0
    } else {
        results.iter().map(|r| r.confidence).sum::<f64>() / results.len() as f64
    };

    Diagnostics {
        total_anchors: results.len(),
        resolved: count(Resolution::Resolved),
        fallback: count(Resolution::Fallback),
        unresolved: count(Resolution::Unresolved),
        duplicate_identifiers,
        average_confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::association::fallback::MapFallback;
    use crate::association::shard::shard_by_lines;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn associator() -> ValueAssociator {
        ValueAssociator::new(
            AnchorScanner::isin(),
            &LocaleNumericProfile::swiss(),
            &AssociationOptions::default().with_window_radius(60),
        )
        .unwrap()
    }

    const STATEMENT: &str = "\
Bonds
USD 200'000 GOLDMAN SACHS 0% NOTES ISIN: XS2993414619 Countervalue 199'080.00 USD
USD 1'000'000 CITIGROUP 0% NOTES ISIN: XS2530201644 Countervalue 1'004'990.00 USD
Equities
Position held with a third-party custodian pending valuation ISIN: CH0012032048 see appendix
";

    #[test]
    fn test_statement_association() {
        let report = associator().associate(STATEMENT);

        let values: Vec<Option<Decimal>> =
            report.results.iter().map(|r| r.selected_value).collect();
        assert_eq!(
            values,
            vec![
                Some(Decimal::from_str("199080.00").unwrap()),
                Some(Decimal::from_str("1004990.00").unwrap()),
                None,
            ]
        );
        assert_eq!(report.diagnostics.resolved, 2);
        assert_eq!(report.diagnostics.unresolved, 1);
        assert!(report.duplicate_anchors.is_empty());
    }

    #[test]
    fn test_fallback_only_fills_unresolved() {
        let fallback = MapFallback::new()
            .with_value("CH0012032048", Decimal::from(25_000), 0.4)
            .with_value("XS2993414619", Decimal::from(1), 1.0);
        let report = associator().with_fallback(fallback).associate(STATEMENT);

        assert_eq!(report.results[0].resolution, Resolution::Resolved);
        assert_eq!(
            report.results[0].selected_value,
            Some(Decimal::from_str("199080.00").unwrap())
        );

        let filled = &report.results[2];
        assert_eq!(filled.resolution, Resolution::Fallback);
        assert_eq!(filled.selected_value, Some(Decimal::from(25_000)));
        assert_eq!(filled.confidence, 0.4);
        assert_eq!(report.diagnostics.fallback, 1);
        assert_eq!(report.diagnostics.unresolved, 0);
    }

    #[test]
    fn test_sharded_matches_whole_document() {
        let associator = associator();
        let whole = associator.associate(STATEMENT);
        let shards = shard_by_lines(STATEMENT, 20);
        assert!(shards.len() > 2);

        let sharded = associator.associate_sharded(STATEMENT, &shards);
        assert_eq!(sharded, whole);
    }

    #[test]
    fn test_sharded_finds_anchor_split_across_lines() {
        let text = "Bond ISIN:\nXS2993414619 Countervalue 199'080.00 USD\nEnd\n";
        let associator = ValueAssociator::new(
            AnchorScanner::labeled_isin(),
            &LocaleNumericProfile::swiss(),
            &AssociationOptions::default().with_window_radius(60),
        )
        .unwrap();

        let whole = associator.associate(text);
        assert_eq!(whole.results.len(), 1);

        let shards = shard_by_lines(text, 1);
        assert_eq!(shards.len(), 3);
        assert_eq!(associator.associate_sharded(text, &shards), whole);
    }

    #[test]
    fn test_sharded_skips_foreign_shards() {
        let foreign = TextShard {
            text: "XS2993414619 1'000'000.00 USD",
            byte_offset: 0,
            char_offset: 0,
        };
        let report = associator().associate_sharded("nothing here", &[foreign]);
        assert!(report.results.is_empty());
    }

    struct BrokenSource;

    impl FallbackSource for BrokenSource {
        fn lookup(&self, _identifier: &str) -> Option<FallbackValue> {
            Some(FallbackValue {
                value: Decimal::from(10_000),
                confidence: f64::NAN,
            })
        }
    }

    #[test]
    fn test_non_finite_fallback_confidence_is_zero() {
        let report = associator().with_fallback(BrokenSource).associate(STATEMENT);

        let filled = &report.results[2];
        assert_eq!(filled.resolution, Resolution::Fallback);
        assert_eq!(filled.confidence, 0.0);
        assert!(report.diagnostics.average_confidence.is_finite());
    }

    #[test]
    fn test_duplicates_in_first_occurrence_order() {
        let anchors = vec![
            AnchorMatch::new("B", 0, 1),
            AnchorMatch::new("A", 5, 1),
            AnchorMatch::new("B", 9, 1),
            AnchorMatch::new("C", 12, 1),
            AnchorMatch::new("A", 20, 1),
        ];
        assert_eq!(
            find_duplicates(&anchors),
            vec![
                DuplicateAnchor {
                    identifier: "B".to_string(),
                    positions: vec![0, 9],
                },
                DuplicateAnchor {
                    identifier: "A".to_string(),
                    positions: vec![5, 20],
                },
            ]
        );
    }

    #[test]
    fn test_associate_rejects_bad_configuration() {
        let profile = LocaleNumericProfile {
            thousands_separator: Some('.'),
            ..LocaleNumericProfile::swiss()
        };
        assert_eq!(
            associate("", r"\b[A-Z]{2}\d{10}\b", &profile, &AssociationOptions::default()),
            Err(ConfigError::SameSeparators('.'))
        );
        assert!(matches!(
            associate(
                "",
                "x?",
                &LocaleNumericProfile::swiss(),
                &AssociationOptions::default()
            ),
            Err(ConfigError::EmptyMatchingPattern(_))
        ));
    }

    #[test]
    fn test_empty_document() {
        let report = associator().associate("");
        assert!(report.results.is_empty());
        assert_eq!(report.diagnostics.average_confidence, 0.0);
        assert_eq!(report.diagnostics.resolution_rate(), 1.0);
    }
}

//! Core library for anchor-to-value association in financial documents.
//!
//! This crate provides:
//! - Locale-aware parsing and formatting of monetary amounts
//! - Anchor scanning (ISIN by default, any regex pattern on request)
//! - Candidate extraction, scoring and disambiguation per anchor
//! - Association reports with diagnostics, duplicates and fallback values

pub mod association;
pub mod error;
pub mod locale;
pub mod models;

pub use association::{
    associate, shard_by_lines, AnchorScanner, CandidateScorer, ContextWindowExtractor,
    FallbackSource, FallbackValue, MapFallback, ScoringWeights, TextShard, ValueAssociator,
};
pub use error::{AnchorvalError, ConfigError, Result};
pub use locale::{format_amount, parse_amount, LocaleNumericProfile};
pub use models::{
    AnchorConfig, AnchorMatch, AssociationOptions, AssociationReport, AssociationResult,
    AssociatorConfig, ContextTag, Diagnostics, DuplicateAnchor, NumericCandidate, Resolution,
    ScoredCandidate,
};

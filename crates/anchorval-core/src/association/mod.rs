//! Anchor-to-value association.
//!
//! The pipeline for one document:
//! 1. [`AnchorScanner`] finds every anchor identifier.
//! 2. [`ContextWindowExtractor`] tokenizes the text once, then collects and
//!    tags the plausible numeric candidates around each anchor.
//! 3. [`CandidateScorer`] ranks each anchor's candidates and picks one.
//! 4. [`ValueAssociator`] runs the steps above, consults an optional
//!    [`FallbackSource`] and assembles the report.

mod associator;
pub mod fallback;
pub mod isin;
pub mod patterns;
pub mod scanner;
pub mod scorer;
pub mod shard;
mod text_index;
pub mod window;

pub use associator::{associate, ValueAssociator};
pub use fallback::{FallbackSource, FallbackValue, MapFallback};
pub use isin::validate_isin;
pub use scanner::AnchorScanner;
pub use scorer::{CandidateScorer, ScoringWeights, Selection};
pub use shard::{shard_by_lines, TextShard};
pub use text_index::TextIndex;
pub use window::{ContextWindowExtractor, PreparedText};

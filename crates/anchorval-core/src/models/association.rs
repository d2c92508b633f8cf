//! Association data models.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// An occurrence of an anchor identifier in the source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorMatch {
    /// The matched code.
    pub identifier: String,

    /// Character offset of the identifier in the source text.
    pub position: usize,

    /// Length of the identifier in characters.
    pub length: usize,
}

impl AnchorMatch {
    pub fn new(identifier: impl Into<String>, position: usize, length: usize) -> Self {
        Self {
            identifier: identifier.into(),
            position,
            length,
        }
    }

    /// Character offset one past the identifier.
    pub fn end(&self) -> usize {
        self.position + self.length
    }
}

/// Lexical evidence found around a candidate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContextTag {
    /// A currency code or symbol is close to the candidate.
    HasCurrencySymbol,
    /// A configured keyword is close to the candidate.
    NearKeyword(String),
    /// The value is a multiple of 1000 (a negative signal).
    IsRoundNumber,
}

impl fmt::Display for ContextTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HasCurrencySymbol => write!(f, "hasCurrencySymbol"),
            Self::NearKeyword(keyword) => write!(f, "nearKeyword:{}", keyword),
            Self::IsRoundNumber => write!(f, "isRoundNumber"),
        }
    }
}

impl FromStr for ContextTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hasCurrencySymbol" => Ok(Self::HasCurrencySymbol),
            "isRoundNumber" => Ok(Self::IsRoundNumber),
            other => other
                .strip_prefix("nearKeyword:")
                .map(|k| Self::NearKeyword(k.to_string()))
                .ok_or_else(|| format!("unknown context tag: {}", other)),
        }
    }
}

impl Serialize for ContextTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ContextTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A numeric token found near an anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumericCandidate {
    /// Token as it appeared (e.g. `1'234'567.50`).
    pub raw_text: String,

    /// Locale-normalized value.
    pub parsed_value: Decimal,

    /// Character offset of the token in the source text.
    pub position: usize,

    /// Signed character distance from the anchor: the gap after the anchor's
    /// end for tokens that follow it, the negated gap before its start for
    /// tokens that precede it.
    pub offset_from_anchor: i64,

    /// Lexical evidence.
    pub context_tags: BTreeSet<ContextTag>,
}

impl NumericCandidate {
    pub fn has_currency(&self) -> bool {
        self.context_tags.contains(&ContextTag::HasCurrencySymbol)
    }

    pub fn has_keyword(&self) -> bool {
        self.context_tags
            .iter()
            .any(|tag| matches!(tag, ContextTag::NearKeyword(_)))
    }

    pub fn is_round(&self) -> bool {
        self.context_tags.contains(&ContextTag::IsRoundNumber)
    }

    pub fn distance(&self) -> u64 {
        self.offset_from_anchor.unsigned_abs()
    }
}

/// A candidate together with its raw score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub candidate: NumericCandidate,

    /// Raw (unnormalized) score.
    pub score: f64,
}

/// Where the selected value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Selected from a candidate in the text.
    Resolved,
    /// Supplied by an explicit fallback source.
    Fallback,
    /// No value; callers must handle this explicitly.
    Unresolved,
}

/// The association outcome for one anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationResult {
    pub anchor: AnchorMatch,

    /// Selected value, `None` when unresolved.
    pub selected_value: Option<Decimal>,

    /// Dominance of the selected candidate, in `[0, 1]`. Zero when unresolved.
    pub confidence: f64,

    pub resolution: Resolution,

    /// Index of the selected candidate in `candidates_considered`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_candidate: Option<usize>,

    /// Candidates, nearest first.
    pub candidates_considered: Vec<ScoredCandidate>,
}

impl AssociationResult {
    /// An anchor without a value.
    pub fn unresolved(anchor: AnchorMatch, candidates: Vec<ScoredCandidate>) -> Self {
        Self {
            anchor,
            selected_value: None,
            confidence: 0.0,
            resolution: Resolution::Unresolved,
            selected_candidate: None,
            candidates_considered: candidates,
        }
    }

    /// The candidate the value was taken from, if it came from the text.
    pub fn selected(&self) -> Option<&ScoredCandidate> {
        self.selected_candidate
            .and_then(|i| self.candidates_considered.get(i))
    }
}

/// An identifier matched at more than one position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateAnchor {
    pub identifier: String,
    /// Character offsets of every occurrence, ascending.
    pub positions: Vec<usize>,
}

/// Aggregate counts for one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Anchors found.
    pub total_anchors: usize,
    /// Anchors resolved from the text.
    pub resolved: usize,
    /// Anchors filled from an explicit fallback source.
    pub fallback: usize,
    /// Anchors without a value.
    pub unresolved: usize,
    /// Identifiers seen more than once.
    pub duplicate_identifiers: usize,
    /// Mean confidence over all anchors (0 when there are none).
    pub average_confidence: f64,
}

impl Diagnostics {
    /// Share of anchors resolved from the text (1.0 for an empty document).
    pub fn resolution_rate(&self) -> f64 {
        if self.total_anchors == 0 {
            1.0
        } else {
            self.resolved as f64 / self.total_anchors as f64
        }
    }
}

/// Full association output for one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssociationReport {
    /// One result per anchor, in order of position.
    pub results: Vec<AssociationResult>,

    /// Identifiers matched more than once; every occurrence still has its
    /// own entry in `results`.
    pub duplicate_anchors: Vec<DuplicateAnchor>,

    pub diagnostics: Diagnostics,
}

//! Candidate scoring and disambiguation.
//!
//! Each candidate gets a raw score:
//!
//! ```text
//! score = 1 / (1 + |offset| / proximity_scale)
//!       + currency_bonus   if hasCurrencySymbol
//!       + keyword_bonus    if any nearKeyword tag
//!       - round_penalty    if isRoundNumber
//! ```
//!
//! The winner's confidence is the product of two factors in `[0, 1]`:
//!
//! - evidence: 1 when the winner carries both a currency marker and a
//!   keyword, otherwise `winner / saturation_score`, so a lone bare number
//!   far from the anchor is not reported as certain;
//! - separation: `(winner - runner_up) / decisive_margin`, or 1 without a
//!   runner-up, so close contenders drive confidence towards zero.
//!
//! A candidate carrying both a currency and a keyword saturates the evidence
//! factor anywhere in the window, and a farther round competitor without a
//! keyword scores at least `currency_bonus + keyword_bonus + round_penalty`
//! below it, which leaves separation at 1 under the default weights.

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

use crate::error::ConfigError;
use crate::models::{NumericCandidate, ScoredCandidate};

/// Weights of the scoring function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Distance (characters) at which the proximity score halves.
    pub proximity_scale: f64,

    /// Added when a currency marker is near the candidate.
    pub currency_bonus: f64,

    /// Added when a keyword is near the candidate.
    pub keyword_bonus: f64,

    /// Subtracted for round numbers.
    pub round_penalty: f64,

    /// Scores closer than this are treated as tied.
    pub tie_epsilon: f64,

    /// Score gap at which the winner counts as fully separated.
    pub decisive_margin: f64,

    /// Winner score at which evidence counts as complete.
    pub saturation_score: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            proximity_scale: 50.0,
            currency_bonus: 0.5,
            keyword_bonus: 0.75,
            round_penalty: 0.4,
            tie_epsilon: 0.01,
            decisive_margin: 1.0,
            saturation_score: 1.5,
        }
    }
}

impl ScoringWeights {
    /// Check that all weights are finite and in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_negative = [
            ("currency_bonus", self.currency_bonus),
            ("keyword_bonus", self.keyword_bonus),
            ("round_penalty", self.round_penalty),
            ("tie_epsilon", self.tie_epsilon),
        ];
        let positive = [
            ("proximity_scale", self.proximity_scale),
            ("decisive_margin", self.decisive_margin),
            ("saturation_score", self.saturation_score),
        ];

        let invalid = non_negative
            .iter()
            .find(|(_, v)| !v.is_finite() || *v < 0.0)
            .or_else(|| positive.iter().find(|(_, v)| !v.is_finite() || *v <= 0.0));

        match invalid {
            Some((name, value)) => Err(ConfigError::InvalidWeight {
                name: name.to_string(),
                value: *value,
            }),
            None => Ok(()),
        }
    }
}

/// Outcome of disambiguating one anchor's candidates.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// All candidates with their scores, in input order.
    pub candidates: Vec<ScoredCandidate>,
    /// Index of the winner, `None` when there were no candidates.
    pub selected: Option<usize>,
    /// Confidence in `[0, 1]`; zero without a winner.
    pub confidence: f64,
}

/// Scores candidates and selects the most plausible one.
#[derive(Debug, Clone, Default)]
pub struct CandidateScorer {
    weights: ScoringWeights,
}

impl CandidateScorer {
    pub fn new(weights: ScoringWeights) -> Result<Self, ConfigError> {
        weights.validate()?;
        Ok(Self { weights })
    }

    /// Raw score of a single candidate.
    pub fn score(&self, candidate: &NumericCandidate) -> f64 {
        let w = &self.weights;
        let mut score = 1.0 / (1.0 + candidate.distance() as f64 / w.proximity_scale);

        if candidate.has_currency() {
            score += w.currency_bonus;
        }
        if candidate.has_keyword() {
            score += w.keyword_bonus;
        }
        if candidate.is_round() {
            score -= w.round_penalty;
        }
        score
    }

    /// Score all candidates and pick a winner.
    ///
    /// Among candidates within `tie_epsilon` of the best score, the one
    /// nearest the anchor wins, then the one with a currency marker, then
    /// the earliest in the text.
    pub fn select(&self, candidates: Vec<NumericCandidate>) -> Selection {
        let scored: Vec<ScoredCandidate> = candidates
            .into_iter()
            .map(|candidate| ScoredCandidate {
                score: self.score(&candidate),
                candidate,
            })
            .collect();

        let Some(best) = scored.iter().map(|c| c.score).reduce(f64::max) else {
            return Selection {
                candidates: scored,
                selected: None,
                confidence: 0.0,
            };
        };

        let winner = scored
            .iter()
            .enumerate()
            .filter(|(_, c)| best - c.score <= self.weights.tie_epsilon)
            .min_by_key(|(_, c)| {
                (
                    c.candidate.distance(),
                    Reverse(c.candidate.has_currency()),
                    c.candidate.position,
                )
            })
            .map(|(i, _)| i)
            .unwrap_or(0);

        let runner_up = scored
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != winner)
            .map(|(_, c)| c.score)
            .reduce(f64::max);

        let confidence = self.confidence(&scored[winner], runner_up);

        Selection {
            candidates: scored,
            selected: Some(winner),
            confidence,
        }
    }

    fn confidence(&self, winner: &ScoredCandidate, runner_up: Option<f64>) -> f64 {
        let w = &self.weights;
        let corroborated = winner.candidate.has_currency() && winner.candidate.has_keyword();
        let evidence = if corroborated {
            1.0
        } else {
            (winner.score / w.saturation_score).clamp(0.0, 1.0)
        };
        let separation = match runner_up {
            Some(second) => ((winner.score - second) / w.decisive_margin).clamp(0.0, 1.0),
            None => 1.0,
        };
        evidence * separation
    }
}

//! Data models for association results and configuration.

pub mod association;
pub mod config;

pub use association::{
    AnchorMatch, AssociationReport, AssociationResult, ContextTag, Diagnostics, DuplicateAnchor,
    NumericCandidate, Resolution, ScoredCandidate,
};
pub use config::{AnchorConfig, AssociationOptions, AssociatorConfig};

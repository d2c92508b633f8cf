//! Configuration structures for the association pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::association::patterns::{
    CURRENCY_SYMBOLS, DEFAULT_CURRENCIES, DEFAULT_KEYWORDS, ISIN_PATTERN_STR,
};
use crate::association::scorer::ScoringWeights;
use crate::association::AnchorScanner;
use crate::error::{ConfigError, Result};
use crate::locale::LocaleNumericProfile;

/// Largest accepted context window radius, in characters.
pub const MAX_WINDOW_RADIUS: usize = 20_000;

/// Main configuration for the anchorval pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssociatorConfig {
    /// Number format of the documents.
    pub profile: LocaleNumericProfile,

    /// Anchor pattern configuration.
    pub anchor: AnchorConfig,

    /// Windowing and scoring options.
    pub options: AssociationOptions,
}

/// Anchor scanning configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorConfig {
    /// Regular expression for anchors. If it has a capture group, group 1
    /// is the identifier.
    pub pattern: String,

    /// Drop ISIN matches whose check digit is wrong.
    pub validate_checksum: bool,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            pattern: ISIN_PATTERN_STR.to_string(),
            validate_checksum: false,
        }
    }
}

impl AnchorConfig {
    /// Compile the configured pattern into a scanner.
    pub fn build_scanner(&self) -> std::result::Result<AnchorScanner, ConfigError> {
        Ok(AnchorScanner::new(&self.pattern)?.with_isin_validation(self.validate_checksum))
    }
}

/// Context window and scoring options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssociationOptions {
    /// Characters on each side of an anchor searched for candidates.
    pub window_radius: usize,

    /// Keywords that strengthen a nearby candidate.
    pub keywords: Vec<String>,

    /// Characters on each side of a candidate searched for a currency marker.
    pub currency_radius: usize,

    /// Characters on each side of a candidate searched for a keyword.
    pub keyword_radius: usize,

    /// Currency codes and symbols.
    pub currencies: Vec<String>,

    /// Scoring weights.
    pub scoring: ScoringWeights,
}

impl Default for AssociationOptions {
    fn default() -> Self {
        Self {
            window_radius: 300,
            keywords: DEFAULT_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            currency_radius: 15,
            keyword_radius: 60,
            currencies: DEFAULT_CURRENCIES
                .iter()
                .map(|s| s.to_string())
                .chain(CURRENCY_SYMBOLS.iter().map(|c| c.to_string()))
                .collect(),
            scoring: ScoringWeights::default(),
        }
    }
}

impl AssociationOptions {
    /// Set the window radius.
    pub fn with_window_radius(mut self, radius: usize) -> Self {
        self.window_radius = radius;
        self
    }

    /// Replace the keyword list.
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Check the options for unusable values.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.window_radius == 0 || self.window_radius > MAX_WINDOW_RADIUS {
            return Err(ConfigError::InvalidWindow {
                name: "window_radius".to_string(),
                reason: format!("must be between 1 and {}", MAX_WINDOW_RADIUS),
            });
        }
        if self.currency_radius > self.window_radius {
            return Err(ConfigError::InvalidWindow {
                name: "currency_radius".to_string(),
                reason: "must not exceed window_radius".to_string(),
            });
        }
        if self.keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(ConfigError::BlankEntry("keywords".to_string()));
        }
        if self.currencies.iter().any(|c| c.trim().is_empty()) {
            return Err(ConfigError::BlankEntry("currencies".to_string()));
        }
        self.scoring.validate()
    }
}

impl AssociatorConfig {
    /// Validate every section.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.profile.validate()?;
        self.anchor.build_scanner()?;
        self.options.validate()
    }

    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

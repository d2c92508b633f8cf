//! Subcommands and the association options they share.

pub mod batch;
pub mod config;
pub mod process;

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use clap::Args;
use rust_decimal::Decimal;
use tracing::{debug, info};

use anchorval_core::models::config::AssociatorConfig;
use anchorval_core::{
    shard_by_lines, AssociationReport, Diagnostics, LocaleNumericProfile, MapFallback,
    ValueAssociator,
};

/// Association settings that override the configuration file.
#[derive(Args, Clone, Debug, Default)]
pub struct AssociationArgs {
    /// Locale profile: swiss, us, continental, spaced or plain
    #[arg(short, long)]
    profile: Option<String>,

    /// Smallest plausible value
    #[arg(long)]
    min_value: Option<String>,

    /// Largest plausible value
    #[arg(long)]
    max_value: Option<String>,

    /// Anchor pattern (capture group 1, if any, is the identifier)
    #[arg(long)]
    pattern: Option<String>,

    /// Skip ISIN anchors with an invalid check digit
    #[arg(long)]
    validate_checksum: bool,

    /// Context window radius in characters
    #[arg(short, long)]
    window: Option<usize>,

    /// Keyword marking a value (repeatable, replaces the configured list)
    #[arg(short, long = "keyword")]
    keywords: Vec<String>,

    /// CSV of identifier,value[,confidence] used for unresolved anchors
    #[arg(long)]
    fallback: Option<PathBuf>,

    /// Scan documents in line-aligned shards of about this many bytes
    #[arg(long)]
    shard_size: Option<usize>,
}

impl AssociationArgs {
    /// Apply command-line overrides to a loaded configuration.
    pub fn apply(&self, config: &mut AssociatorConfig) -> anyhow::Result<()> {
        if let Some(name) = &self.profile {
            let named = LocaleNumericProfile::named(name)?;
            config.profile = named.with_bounds(
                config.profile.min_plausible_value,
                config.profile.max_plausible_value,
            );
        }
        if let Some(min) = &self.min_value {
            config.profile.min_plausible_value = parse_bound(min, &config.profile)?;
        }
        if let Some(max) = &self.max_value {
            config.profile.max_plausible_value = parse_bound(max, &config.profile)?;
        }
        if let Some(pattern) = &self.pattern {
            config.anchor.pattern = pattern.clone();
        }
        if self.validate_checksum {
            config.anchor.validate_checksum = true;
        }
        if let Some(window) = self.window {
            config.options.window_radius = window;
            config.options.currency_radius = config.options.currency_radius.min(window);
        }
        if !self.keywords.is_empty() {
            config.options.keywords = self.keywords.clone();
        }
        Ok(())
    }

    /// Build the associator, attaching the fallback file if one was given.
    pub fn build(&self, config: &AssociatorConfig) -> anyhow::Result<ValueAssociator> {
        let associator = ValueAssociator::from_config(config)?;

        match &self.fallback {
            Some(path) => {
                let fallback = load_fallback(path, &config.profile)?;
                info!("Loaded {} fallback values from {}", fallback.len(), path.display());
                Ok(associator.with_fallback(fallback))
            }
            None => Ok(associator),
        }
    }

    /// Associate one document, sharded if requested.
    pub fn associate(&self, associator: &ValueAssociator, text: &str) -> AssociationReport {
        match self.shard_size {
            Some(size) if size > 0 => {
                let shards = shard_by_lines(text, size);
                debug!("Split document into {} shards", shards.len());
                associator.associate_sharded(text, &shards)
            }
            _ => associator.associate(text),
        }
    }
}

/// Load the configuration file, or defaults when none is given.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<AssociatorConfig> {
    let config = match config_path {
        Some(path) => AssociatorConfig::from_file(Path::new(path))
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => AssociatorConfig::default(),
    };
    Ok(config)
}

/// Fail when the resolution rate is below `threshold`.
pub fn check_resolution_rate(diagnostics: &Diagnostics, threshold: Option<f64>) -> anyhow::Result<()> {
    let Some(threshold) = threshold else {
        return Ok(());
    };
    let rate = diagnostics.resolution_rate();
    if rate < threshold {
        anyhow::bail!(
            "Resolution rate {:.1}% is below the required {:.1}%",
            rate * 100.0,
            threshold * 100.0
        );
    }
    Ok(())
}

/// Bounds are written either in the profile's format or as plain decimals.
fn parse_bound(raw: &str, profile: &LocaleNumericProfile) -> anyhow::Result<Decimal> {
    profile
        .parse(raw)
        .or_else(|| Decimal::from_str(raw).ok())
        .with_context(|| format!("Invalid plausibility bound: {}", raw))
}

/// Read a fallback table with an `identifier,value[,confidence]` header.
fn load_fallback(path: &Path, profile: &LocaleNumericProfile) -> anyhow::Result<MapFallback> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open fallback file {}", path.display()))?;

    let mut fallback = MapFallback::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let row = line + 2;

        let identifier = record
            .get(0)
            .filter(|s| !s.is_empty())
            .with_context(|| format!("{}:{}: missing identifier", path.display(), row))?;
        let raw_value = record
            .get(1)
            .with_context(|| format!("{}:{}: missing value", path.display(), row))?;
        let value = parse_bound(raw_value, profile)
            .with_context(|| format!("{}:{}: invalid value", path.display(), row))?;
        let confidence = match record.get(2).filter(|s| !s.is_empty()) {
            Some(raw) => raw
                .parse::<f64>()
                .with_context(|| format!("{}:{}: invalid confidence {}", path.display(), row, raw))?,
            None => 1.0,
        };

        fallback.insert(identifier, value, confidence);
    }

    Ok(fallback)
}

//! Error types for the anchorval-core library.
//!
//! Only configuration mistakes are errors. Messy input data (unparseable
//! tokens, unresolved anchors, duplicate anchors) is reported through the
//! association report instead.

use thiserror::Error;

/// Main error type for the anchorval library.
#[derive(Error, Debug)]
pub enum AnchorvalError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to read or write a JSON document.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Malformed configuration, detected when an associator is built.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Thousands and decimal separator are the same character.
    #[error("thousands separator and decimal separator are both {0:?}")]
    SameSeparators(char),

    /// A separator would be indistinguishable from number content.
    #[error("separator {0:?} must not be a letter, digit or sign")]
    InvalidSeparator(char),

    /// Plausibility bounds are inverted.
    #[error("minimum plausible value {min} exceeds maximum {max}")]
    InvalidBounds { min: String, max: String },

    /// The anchor pattern failed to compile.
    #[error("invalid anchor pattern: {0}")]
    InvalidPattern(String),

    /// The anchor pattern accepts the empty string and would match everywhere.
    #[error("anchor pattern {0:?} matches the empty string")]
    EmptyMatchingPattern(String),

    /// Context window settings are unusable.
    #[error("invalid window setting {name}: {reason}")]
    InvalidWindow { name: String, reason: String },

    /// A scoring weight is negative or not finite.
    #[error("invalid scoring weight {name}: {value}")]
    InvalidWeight { name: String, value: f64 },

    /// A keyword or currency marker is blank.
    #[error("blank entry in {0} list")]
    BlankEntry(String),

    /// Unknown named locale profile.
    #[error("unknown locale profile: {0}")]
    UnknownProfile(String),
}

/// Result type for the anchorval library.
pub type Result<T> = std::result::Result<T, AnchorvalError>;

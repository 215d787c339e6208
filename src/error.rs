//! Error types for rcprops library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for rcprops operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for rcprops library
///
/// Ordinary absence (unknown key, no default, converter returning "no value")
/// is never an error: read methods return `Ok(None)` for it.
#[derive(Error, Debug)]
pub enum Error {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("Failed to read source '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot open source '{url}': {reason}")]
    SourceUnreadable { url: String, reason: String },

    // -------------------------------------------------------------------------
    // Source Errors
    // -------------------------------------------------------------------------
    #[error("Can't convert '{spec}' to a valid URL: {reason}")]
    MalformedSource { spec: String, reason: String },

    #[error("Source uses the 'resources:' scheme but no resources path resolver is set")]
    ResolverNotSet,

    #[error("No loader accepts source '{0}'")]
    NoLoader(String),

    // -------------------------------------------------------------------------
    // Parsing Errors
    // -------------------------------------------------------------------------
    #[error("Failed to parse source: {0}")]
    Parse(String),

    #[error("Failed to parse JSON source: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Conversion Errors
    // -------------------------------------------------------------------------
    #[error("Cannot convert '{value}' to {target}")]
    Conversion { value: String, target: String },

    #[error("You cannot specify a separator and a tokenizer together on {scope} level")]
    AmbiguousTokenizer { scope: String },

    #[error("{name} can't be instantiated: {reason}")]
    Instantiation { name: String, reason: String },

    // -------------------------------------------------------------------------
    // Access Errors
    // -------------------------------------------------------------------------
    #[error("Invalid property key: {0}")]
    InvalidKey(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Check if this error comes from the conversion pipeline
    #[must_use]
    pub fn is_conversion_error(&self) -> bool {
        matches!(
            self,
            Error::Conversion { .. } | Error::AmbiguousTokenizer { .. } | Error::Instantiation { .. }
        )
    }

    /// Check if this error relates to source resolution or reading
    #[must_use]
    pub fn is_source_error(&self) -> bool {
        matches!(
            self,
            Error::FileRead { .. }
                | Error::SourceUnreadable { .. }
                | Error::MalformedSource { .. }
                | Error::ResolverNotSet
                | Error::NoLoader(_)
        )
    }

    pub(crate) fn conversion(value: impl std::fmt::Display, target: impl std::fmt::Display) -> Self {
        Error::Conversion {
            value: value.to_string(),
            target: target.to_string(),
        }
    }
}

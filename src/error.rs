//! Error types for wcmp
//!
//! This module defines the errors that can abort a whole evaluation run.
//! Problems found *inside* a record are never errors: requirement checks
//! report them as [`Outcome`](crate::conformance::Outcome) values and KPI
//! checks as comments.

use std::fmt;
use thiserror::Error;

/// Result type alias using wcmp Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for wcmp operations
#[derive(Error, Debug)]
pub enum Error {
    /// Input is not a recognized WCMP 1.3 or WCMP 2 document
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A codelist, schema or vocabulary is not present in the local cache
    #[error("cache missing: {0}")]
    CacheMissing(String),

    /// Grade computation was given a percentage outside 0..=100
    #[error("invalid percentage: {0}")]
    InvalidPercentage(f64),

    /// A KPI or requirement selector did not match any registered check
    #[error("unknown check: {0}")]
    UnknownCheck(String),

    /// Two checks were registered under the same identifier
    #[error("duplicate check identifier: {0}")]
    DuplicateCheck(String),

    /// Value error (invalid argument or report state)
    #[error("value error: {0}")]
    Value(String),

    /// Resource loading error
    #[error("resource error: {0}")]
    Resource(String),

    /// Schema could not be loaded or compiled
    #[error("schema error: {0}")]
    Schema(String),

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding/decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Archive extraction error
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Topic hierarchy table error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Build a [`Error::CacheMissing`] that tells the caller how to recover
    pub fn cache_missing(what: impl fmt::Display) -> Self {
        Error::CacheMissing(format!("{}. Run 'wcmp bundle sync' to cache", what))
    }
}

/// Document parsing error
#[derive(Debug, Clone)]
pub struct ParseError {
    /// Error message
    pub message: String,
    /// Location in the document (line, path or byte offset)
    pub location: Option<String>,
    /// Excerpt of the offending content
    pub source: Option<String>,
}

impl ParseError {
    /// Create a new parse error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
            source: None,
        }
    }

    /// Set the location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the source excerpt
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref loc) = self.location {
            write!(f, "\n\nLocation: {}", loc)?;
        }

        if let Some(ref src) = self.source {
            write!(f, "\n\nSource:\n{}", src)?;
        }

        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// Unexpected problem inside a single check
///
/// A fault never aborts a run. Runners record it against the check that
/// raised it and carry on with the next one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault(pub String);

impl Fault {
    /// Create a fault from a message
    pub fn new(message: impl Into<String>) -> Self {
        Fault(message.into())
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Error> for Fault {
    fn from(err: Error) -> Self {
        Fault(err.to_string())
    }
}

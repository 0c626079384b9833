//! Record location resolution
//!
//! A record to evaluate is named on the command line as either a file path
//! or an HTTP(S) URL. Tests and library callers may also pass content that
//! is already in memory.

use crate::error::Result;
use std::fmt;
use std::path::PathBuf;
use url::Url;

/// Record location - a URL, a file path, or in-memory content
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    /// File system path
    Path(PathBuf),
    /// HTTP or HTTPS URL
    Url(Url),
    /// In-memory record content
    String(String),
}

impl Location {
    /// Create a location from a command-line argument
    ///
    /// Anything that parses as an `http`/`https` URL is remote; everything
    /// else, including `file:` URLs, names a local path.
    pub fn parse(s: &str) -> Result<Self> {
        if let Ok(url) = Url::parse(s) {
            match url.scheme() {
                "http" | "https" => return Ok(Location::Url(url)),
                "file" => {
                    if let Ok(path) = url.to_file_path() {
                        return Ok(Location::Path(path));
                    }
                }
                _ => {}
            }
        }

        Ok(Location::Path(PathBuf::from(s)))
    }

    /// Get the location as a string
    pub fn as_str(&self) -> String {
        match self {
            Location::Path(p) => p.to_string_lossy().to_string(),
            Location::Url(u) => u.to_string(),
            Location::String(_) => "<memory>".to_string(),
        }
    }

    /// Check if this is a remote location (URL)
    pub fn is_remote(&self) -> bool {
        matches!(self, Location::Url(_))
    }

    /// Check if this is a local file
    pub fn is_file(&self) -> bool {
        matches!(self, Location::Path(_))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_from_url() {
        let loc = Location::parse("https://example.com/record.xml").unwrap();
        assert!(matches!(loc, Location::Url(_)));
        assert!(loc.is_remote());
    }

    #[test]
    fn test_location_from_path() {
        let loc = Location::parse("/tmp/record.xml").unwrap();
        assert!(matches!(loc, Location::Path(_)));
        assert!(loc.is_file());

        let loc = Location::parse("records/sample.json").unwrap();
        assert!(loc.is_file());
    }

    #[test]
    fn test_file_url_is_local() {
        let loc = Location::parse("file:///tmp/record.xml").unwrap();
        assert_eq!(loc, Location::Path(PathBuf::from("/tmp/record.xml")));
    }

    #[test]
    fn test_location_as_str() {
        let loc = Location::String("{}".to_string());
        assert_eq!(loc.as_str(), "<memory>");
    }
}

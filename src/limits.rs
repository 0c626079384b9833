//! Resource limits for record loading and bundle unpacking
//!
//! Metadata records arrive from arbitrary files and URLs, and bundle
//! archives are downloaded from the network. These limits bound what a
//! single invocation is willing to read, parse or unpack.

use crate::error::{Error, Result};

/// Global limits configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Limits {
    /// Maximum record size in bytes
    pub max_document_size: usize,

    /// Maximum XML element nesting depth
    pub max_xml_depth: usize,

    /// Maximum number of attributes on a single element
    pub max_attributes: usize,

    /// Maximum number of namespace declarations in a record
    pub max_namespaces: usize,

    /// Maximum JSON nesting depth
    pub max_json_depth: usize,

    /// Maximum number of entries unpacked from a bundle archive
    pub max_archive_entries: usize,

    /// Maximum uncompressed size of a bundle archive in bytes
    pub max_archive_size: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_document_size: 50 * 1024 * 1024, // 50 MB
            max_xml_depth: 512,
            max_attributes: 256,
            max_namespaces: 256,
            max_json_depth: 128,
            max_archive_entries: 20_000,
            max_archive_size: 512 * 1024 * 1024, // 512 MB
        }
    }
}

impl Limits {
    /// Create a new Limits with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create strict limits (more restrictive)
    pub fn strict() -> Self {
        Self {
            max_document_size: 5 * 1024 * 1024, // 5 MB
            max_xml_depth: 100,
            max_attributes: 64,
            max_namespaces: 64,
            max_json_depth: 32,
            max_archive_entries: 5_000,
            max_archive_size: 128 * 1024 * 1024, // 128 MB
        }
    }

    /// Check if a record size is within limits
    pub fn check_document_size(&self, size: usize) -> Result<()> {
        if size > self.max_document_size {
            Err(Error::LimitExceeded(format!(
                "Document size {} bytes exceeds maximum {} bytes",
                size, self.max_document_size
            )))
        } else {
            Ok(())
        }
    }

    /// Check if XML depth is within limits
    pub fn check_xml_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_xml_depth {
            Err(Error::LimitExceeded(format!(
                "XML depth {} exceeds maximum {}",
                depth, self.max_xml_depth
            )))
        } else {
            Ok(())
        }
    }

    /// Check if number of attributes is within limits
    pub fn check_attributes(&self, count: usize) -> Result<()> {
        if count > self.max_attributes {
            Err(Error::LimitExceeded(format!(
                "Attribute count {} exceeds maximum {}",
                count, self.max_attributes
            )))
        } else {
            Ok(())
        }
    }

    /// Check if number of namespace declarations is within limits
    pub fn check_namespaces(&self, count: usize) -> Result<()> {
        if count > self.max_namespaces {
            Err(Error::LimitExceeded(format!(
                "Namespace count {} exceeds maximum {}",
                count, self.max_namespaces
            )))
        } else {
            Ok(())
        }
    }

    /// Check if JSON nesting depth is within limits
    pub fn check_json_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_json_depth {
            Err(Error::LimitExceeded(format!(
                "JSON depth {} exceeds maximum {}",
                depth, self.max_json_depth
            )))
        } else {
            Ok(())
        }
    }

    /// Check an archive's entry count and total uncompressed size
    pub fn check_archive(&self, entries: usize, uncompressed: u64) -> Result<()> {
        if entries > self.max_archive_entries {
            return Err(Error::LimitExceeded(format!(
                "Archive entry count {} exceeds maximum {}",
                entries, self.max_archive_entries
            )));
        }
        if uncompressed > self.max_archive_size {
            return Err(Error::LimitExceeded(format!(
                "Archive size {} bytes exceeds maximum {} bytes",
                uncompressed, self.max_archive_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = Limits::default();
        assert_eq!(limits.max_xml_depth, 512);
        assert!(limits.check_xml_depth(200).is_ok());
        assert!(limits.check_xml_depth(600).is_err());
    }

    #[test]
    fn test_strict_limits() {
        let limits = Limits::strict();
        assert!(limits.max_xml_depth < Limits::default().max_xml_depth);
        assert!(limits.check_xml_depth(150).is_err());
    }

    #[test]
    fn test_check_document_size() {
        let limits = Limits::default();
        assert!(limits.check_document_size(1024).is_ok());
        assert!(limits.check_document_size(60 * 1024 * 1024).is_err());
    }

    #[test]
    fn test_check_archive() {
        let limits = Limits::strict();
        assert!(limits.check_archive(10, 1024).is_ok());
        assert!(limits.check_archive(10_000, 1024).is_err());
        assert!(limits.check_archive(10, 1024 * 1024 * 1024).is_err());
    }
}

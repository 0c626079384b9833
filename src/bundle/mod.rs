//! Local cache of codelists, schemas, the topic hierarchy and the spelling
//! dictionary
//!
//! The cache is written only by [`sync`](sync::sync) and is read-only while
//! records are evaluated. Every loader fails with
//! [`Error::CacheMissing`] when the cache is absent or was written by an
//! incompatible version, so a missing file is never mistaken for an empty
//! codelist.

pub mod codelists;
pub mod schemas;
pub mod sync;
pub mod topics;

pub use codelists::{parse_catalogue, Authority, Codelists};
pub use schemas::{JsonSchema, SchemaHandle, XmlSchema};
pub use sync::sync;
pub use topics::{build_topics, TopicHierarchy};

use crate::documents::Family;
use crate::error::{Error, Result};
use crate::probes::WordList;
use crate::settings::Settings;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Cache layout version written by this crate
pub const MANIFEST_FORMAT: u32 = 1;

/// Relative paths inside the cache directory
pub mod layout {
    /// Sync manifest
    pub const MANIFEST: &str = "manifest.json";
    /// WCMP 1.3 resources
    pub const WCMP1_DIR: &str = "wcmp-1.3";
    /// Unpacked ISO/TS 19139 schema bundle
    pub const ISO_SCHEMA_DIR: &str = "wcmp-1.3/schema";
    /// Wrapper schema importing gmd and gmx
    pub const ISO_ALL_XSD: &str = "wcmp-1.3/iso-all.xsd";
    /// ISO codelist catalogue
    pub const ISO_CODELISTS: &str = "wcmp-1.3/schema/resources/Codelist/gmxCodelists.xml";
    /// WMO codelist catalogue
    pub const WMO_CODELISTS: &str = "wcmp-1.3/WMOCodeLists.xml";
    /// WCMP 2 resources
    pub const WCMP2_DIR: &str = "wcmp-2";
    /// Bundled WCMP 2 JSON Schema
    pub const WCMP2_SCHEMA: &str = "wcmp-2/wcmp2-bundled.json";
    /// Topic hierarchy tables
    pub const TOPICS_DIR: &str = "wis2-topic-hierarchy";
    /// Flattened topic list
    pub const TOPICS_FILE: &str = "wis2-topic-hierarchy/all.json";
    /// Spelling dictionary directory
    pub const DICTIONARY_DIR: &str = "dictionary";
    /// Spelling word list
    pub const DICTIONARY: &str = "dictionary/words.txt";
}

/// Record of the last successful sync
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Cache layout version
    pub format: u32,
    /// When the cache was written
    pub synced_at: DateTime<Utc>,
}

impl Manifest {
    /// Manifest for a cache written now
    pub fn now() -> Self {
        Self {
            format: MANIFEST_FORMAT,
            synced_at: Utc::now(),
        }
    }
}

/// Handle on a cache directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    root: PathBuf,
}

impl Bundle {
    /// Cache rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache at the configured directory
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.cache_dir())
    }

    /// Cache directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a layout entry
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Read the manifest, failing if the cache is absent or stale
    pub fn check_manifest(&self) -> Result<Manifest> {
        let path = self.path(layout::MANIFEST);
        if !path.exists() {
            error!("No bundle cache at {}", self.root.display());
            return Err(Error::cache_missing(format!(
                "Bundle cache {} not found",
                self.root.display()
            )));
        }
        let manifest: Manifest = serde_json::from_str(&fs::read_to_string(&path)?)?;
        if manifest.format != MANIFEST_FORMAT {
            error!(
                "Bundle cache format {} does not match {}",
                manifest.format, MANIFEST_FORMAT
            );
            return Err(Error::cache_missing(format!(
                "Bundle cache {} is stale (format {}, expected {})",
                self.root.display(),
                manifest.format,
                MANIFEST_FORMAT
            )));
        }
        debug!("Using bundle cache synced at {}", manifest.synced_at);
        Ok(manifest)
    }

    /// Write the manifest
    pub fn write_manifest(&self, manifest: &Manifest) -> Result<()> {
        fs::write(
            self.path(layout::MANIFEST),
            serde_json::to_string_pretty(manifest)?,
        )?;
        Ok(())
    }

    /// ISO and WMO codelists
    pub fn load_codelists(&self) -> Result<Codelists> {
        self.check_manifest()?;
        let mut codelists = Codelists::new();
        codelists.extend(
            Authority::Iso,
            codelists::load_catalogue(&self.path(layout::ISO_CODELISTS))?,
        );
        codelists.extend(
            Authority::Wmo,
            codelists::load_catalogue(&self.path(layout::WMO_CODELISTS))?,
        );
        Ok(codelists)
    }

    /// One codelist by authority and name
    pub fn load_codelist(&self, authority: Authority, name: &str) -> Result<BTreeSet<String>> {
        let codelists = self.load_codelists()?;
        Ok(codelists.require(authority, name)?.clone())
    }

    /// Schema for a record family
    pub fn load_schema(&self, family: Family) -> Result<SchemaHandle> {
        self.check_manifest()?;
        match family {
            Family::Wcmp1 => {
                let wrapper = self.path(layout::ISO_ALL_XSD);
                let schema_dir = self.path(layout::ISO_SCHEMA_DIR);
                if !wrapper.exists() || !schema_dir.is_dir() {
                    return Err(Error::cache_missing("ISO/TS 19139 schema missing"));
                }
                Ok(SchemaHandle::Xml(XmlSchema::load(&wrapper, &schema_dir)?))
            }
            Family::Wcmp2 => {
                let path = self.path(layout::WCMP2_SCHEMA);
                if !path.exists() {
                    return Err(Error::cache_missing("WCMP2 schema missing"));
                }
                Ok(SchemaHandle::Json(JsonSchema::load(&path)?))
            }
        }
    }

    /// Flattened WIS2 topic hierarchy
    pub fn load_topics(&self) -> Result<TopicHierarchy> {
        self.check_manifest()?;
        TopicHierarchy::load(&self.path(layout::TOPICS_FILE))
    }

    /// Spelling word list
    pub fn load_dictionary(&self) -> Result<WordList> {
        self.check_manifest()?;
        let path = self.path(layout::DICTIONARY);
        if !path.exists() {
            return Err(Error::cache_missing("Spelling dictionary missing"));
        }
        WordList::load(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_cache() {
        let dir = TempDir::new().unwrap();
        let bundle = Bundle::new(dir.path().join("absent"));
        let err = bundle.load_codelists().unwrap_err();
        assert!(matches!(err, Error::CacheMissing(_)));
        assert!(err.to_string().contains("wcmp bundle sync"));
    }

    #[test]
    fn test_stale_manifest() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(layout::MANIFEST),
            r#"{"format": 0, "synced_at": "2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        let err = Bundle::new(dir.path()).check_manifest().unwrap_err();
        assert!(err.to_string().contains("stale"));
    }

    #[test]
    fn test_manifest_roundtrip() {
        let dir = TempDir::new().unwrap();
        let bundle = Bundle::new(dir.path());
        let manifest = Manifest::now();
        bundle.write_manifest(&manifest).unwrap();
        assert_eq!(bundle.check_manifest().unwrap(), manifest);
    }

    #[test]
    fn test_missing_schema_after_sync() {
        let dir = TempDir::new().unwrap();
        let bundle = Bundle::new(dir.path());
        bundle.write_manifest(&Manifest::now()).unwrap();
        let err = bundle.load_schema(Family::Wcmp2).unwrap_err();
        assert!(err.to_string().starts_with("cache missing: WCMP2 schema missing"));
    }
}

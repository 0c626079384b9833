//! Codelist catalogues
//!
//! Both the ISO `gmxCodelists.xml` and the WMO `WMOCodeLists.xml` are
//! `gmx:CT_CodelistCatalogue` documents. Each
//! `gmx:codelistItem/gmx:CodeListDictionary` names a list through its
//! `gml:id`; the list values are the
//! `gmx:codeEntry/gmx:CodeDefinition/gml:identifier` texts.

use crate::error::{Error, ParseError, Result};
use crate::namespaces::{GML_NAMESPACE, GMX_NAMESPACE};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::Path;

/// GML 3.2 as used by the ISO catalogue; older catalogues use plain GML
const GML_NAMESPACES: [&str; 2] = [GML_NAMESPACE, "http://www.opengis.net/gml"];

/// Owner of a codelist catalogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Authority {
    /// ISO/TS 19139 codelists
    Iso,
    /// WMO codelists
    Wmo,
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Authority::Iso => f.write_str("iso"),
            Authority::Wmo => f.write_str("wmo"),
        }
    }
}

/// Codelists keyed by authority and list name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Codelists {
    lists: BTreeMap<Authority, BTreeMap<String, BTreeSet<String>>>,
}

impl Codelists {
    /// Create an empty set of codelists
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a list
    pub fn insert<I, S>(&mut self, authority: Authority, name: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lists
            .entry(authority)
            .or_default()
            .insert(name.into(), values.into_iter().map(Into::into).collect());
    }

    /// Builder form of [`Codelists::insert`]
    pub fn with_list<I, S>(mut self, authority: Authority, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(authority, name, values);
        self
    }

    /// Add every list of a parsed catalogue
    pub fn extend(&mut self, authority: Authority, catalogue: BTreeMap<String, BTreeSet<String>>) {
        self.lists.entry(authority).or_default().extend(catalogue);
    }

    /// A list, if the catalogue defines it
    pub fn get(&self, authority: Authority, name: &str) -> Option<&BTreeSet<String>> {
        self.lists.get(&authority).and_then(|lists| lists.get(name))
    }

    /// A list the caller cannot do without
    pub fn require(&self, authority: Authority, name: &str) -> Result<&BTreeSet<String>> {
        self.get(authority, name).ok_or_else(|| {
            Error::cache_missing(format!("Codelist {}/{} is not in the cache", authority, name))
        })
    }

    /// Whether `value` is in the list (false when the list is unknown)
    pub fn contains(&self, authority: Authority, name: &str, value: &str) -> bool {
        self.get(authority, name)
            .map_or(false, |values| values.contains(value))
    }

    /// Names of the lists of an authority
    pub fn names(&self, authority: Authority) -> impl Iterator<Item = &str> {
        self.lists
            .get(&authority)
            .into_iter()
            .flat_map(|lists| lists.keys().map(String::as_str))
    }

    /// Whether no list is loaded
    pub fn is_empty(&self) -> bool {
        self.lists.values().all(BTreeMap::is_empty)
    }
}

/// Parse a `gmx:CT_CodelistCatalogue`
pub fn parse_catalogue(xml: &str) -> Result<BTreeMap<String, BTreeSet<String>>> {
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    let doc = roxmltree::Document::parse_with_options(xml, options)
        .map_err(|e| ParseError::new(format!("Malformed codelist catalogue: {}", e)))?;

    let root = doc.root_element();
    if !(root.tag_name().namespace() == Some(GMX_NAMESPACE)
        && root.tag_name().name() == "CT_CodelistCatalogue")
    {
        return Err(ParseError::new(format!(
            "Expected gmx:CT_CodelistCatalogue, got {}",
            root.tag_name().name()
        ))
        .into());
    }

    let mut lists = BTreeMap::new();
    for item in root.children().filter(|n| is_gmx(n, "codelistItem")) {
        for dictionary in item.children().filter(|n| is_gmx(n, "CodeListDictionary")) {
            let Some(name) = GML_NAMESPACES
                .iter()
                .find_map(|ns| dictionary.attribute((*ns, "id")))
            else {
                continue;
            };
            let values: BTreeSet<String> = dictionary
                .children()
                .filter(|n| is_gmx(n, "codeEntry"))
                .flat_map(|entry| entry.children().filter(|n| is_gmx(n, "CodeDefinition")))
                .flat_map(|definition| {
                    definition.children().filter(|n| {
                        n.tag_name().name() == "identifier"
                            && n.tag_name()
                                .namespace()
                                .map_or(false, |ns| GML_NAMESPACES.contains(&ns))
                    })
                })
                .filter_map(|identifier| identifier.text())
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty())
                .collect();
            lists.insert(name.to_string(), values);
        }
    }
    Ok(lists)
}

/// Load a catalogue file
pub fn load_catalogue(path: &Path) -> Result<BTreeMap<String, BTreeSet<String>>> {
    if !path.exists() {
        return Err(Error::cache_missing(format!(
            "Codelist catalogue {} missing",
            path.display()
        )));
    }
    let content = fs::read_to_string(path)?;
    parse_catalogue(&content)
}

fn is_gmx(node: &roxmltree::Node, local: &str) -> bool {
    node.is_element()
        && node.tag_name().namespace() == Some(GMX_NAMESPACE)
        && node.tag_name().name() == local
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOGUE: &str = r#"<?xml version="1.0"?>
<gmx:CT_CodelistCatalogue xmlns:gmx="http://www.isotc211.org/2005/gmx"
    xmlns:gml="http://www.opengis.net/gml/3.2">
  <gmx:name/>
  <gmx:codelistItem>
    <gmx:CodeListDictionary gml:id="WMO_CategoryCode">
      <gml:identifier codeSpace="WMO">WMO_CategoryCode</gml:identifier>
      <gmx:codeEntry>
        <gmx:CodeDefinition gml:id="WMO_CategoryCode_weatherObservations">
          <gml:identifier codeSpace="WMO">weatherObservations</gml:identifier>
        </gmx:CodeDefinition>
      </gmx:codeEntry>
      <gmx:codeEntry>
        <gmx:CodeDefinition gml:id="WMO_CategoryCode_climatology">
          <gml:identifier codeSpace="WMO">climatology</gml:identifier>
        </gmx:CodeDefinition>
      </gmx:codeEntry>
    </gmx:CodeListDictionary>
  </gmx:codelistItem>
</gmx:CT_CodelistCatalogue>"#;

    #[test]
    fn test_parse_catalogue() {
        let lists = parse_catalogue(CATALOGUE).unwrap();
        let values = &lists["WMO_CategoryCode"];
        assert_eq!(values.len(), 2);
        assert!(values.contains("weatherObservations"));
        // the dictionary's own identifier is not a value
        assert!(!values.contains("WMO_CategoryCode"));
    }

    #[test]
    fn test_wrong_root_is_rejected() {
        assert!(matches!(parse_catalogue("<catalog/>"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_codelists_lookup() {
        let mut codelists = Codelists::new();
        codelists.extend(Authority::Wmo, parse_catalogue(CATALOGUE).unwrap());
        assert!(codelists.contains(Authority::Wmo, "WMO_CategoryCode", "climatology"));
        assert!(!codelists.contains(Authority::Iso, "WMO_CategoryCode", "climatology"));
        assert!(matches!(
            codelists.require(Authority::Iso, "CI_RoleCode"),
            Err(Error::CacheMissing(_))
        ));
        assert_eq!(codelists.names(Authority::Wmo).collect::<Vec<_>>(), vec!["WMO_CategoryCode"]);
    }
}

//! WCMP 1.3 field extractors
//!
//! Paths are written against the fixed `gco`/`gmd`/`gml`/`gmx`/`xlink`
//! prefixes. Any other prefix bound on the record root stays usable, but the
//! fixed table wins when both bind the same prefix.

use super::parse_timestamp;
use crate::documents::{Element, XmlDocument};
use crate::error::Result;
use crate::namespaces::{NamespaceContext, GCO_NAMESPACE, GMX_NAMESPACE, XLINK_NAMESPACE};
use crate::xpath::{self, XPathNode};
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// Location of the WMO codelist catalogue, used as thesaurus anchor prefix
pub const WMO_CODELISTS: &str = "http://wis.wmo.int/2012/codelists/WMOCodeLists.xml";

/// Keyword groups of the data identification section
pub const KEYWORD_SETS: &str =
    "gmd:identificationInfo/gmd:MD_DataIdentification/gmd:descriptiveKeywords/gmd:MD_Keywords";

/// Legal constraints of the data identification section
pub const OTHER_CONSTRAINTS: &str = "gmd:identificationInfo/gmd:MD_DataIdentification/gmd:resourceConstraints/gmd:MD_LegalConstraints/gmd:otherConstraints";

/// Geographic bounding boxes of the data identification section
pub const BOUNDING_BOXES: &str = "gmd:identificationInfo/gmd:MD_DataIdentification/gmd:extent/gmd:EX_Extent/gmd:geographicElement/gmd:EX_GeographicBoundingBox";

/// A `gco:CharacterString` or `gmx:Anchor` value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextValue<'a> {
    /// Trimmed text content
    pub text: Option<&'a str>,
    /// `xlink:href` of an anchor
    pub href: Option<&'a str>,
    /// Whether the value is a `gmx:Anchor`
    pub anchor: bool,
    /// Source line
    pub line: u32,
}

impl<'a> TextValue<'a> {
    /// The text, falling back to the anchor target
    pub fn value(&self) -> Option<&'a str> {
        self.text.or(self.href)
    }
}

/// Character string and anchor children of `parent`, strings first
pub fn text_values(parent: &Element) -> Vec<TextValue<'_>> {
    let strings = parent
        .children
        .iter()
        .filter(|e| e.is(GCO_NAMESPACE, "CharacterString"))
        .map(|e| TextValue {
            text: e.text().map(str::trim),
            href: None,
            anchor: false,
            line: e.line,
        });
    let anchors = parent
        .children
        .iter()
        .filter(|e| e.is(GMX_NAMESPACE, "Anchor"))
        .map(|e| TextValue {
            text: e.text().map(str::trim),
            href: e.get_attribute_ns(XLINK_NAMESPACE, "href"),
            anchor: true,
            line: e.line,
        });
    strings.chain(anchors).collect()
}

/// Value of a codelist element: `@codeListValue`, else its text
pub fn codelist_value(element: &Element) -> Option<&str> {
    element
        .get_attribute("codeListValue")
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| element.text().map(str::trim))
}

/// One `gmd:MD_Keywords` group
#[derive(Debug, Clone)]
pub struct KeywordSet<'a> {
    /// The `gmd:MD_Keywords` element
    pub element: &'a Element,
    /// `gmd:keyword` elements
    pub keywords: Vec<&'a Element>,
    /// `gmd:type/gmd:MD_KeywordTypeCode` elements
    pub types: Vec<&'a Element>,
    /// `gmd:thesaurusName/gmd:CI_Citation/gmd:title` elements
    pub thesauri: Vec<&'a Element>,
}

impl<'a> KeywordSet<'a> {
    fn from_element(element: &'a Element, namespaces: &NamespaceContext) -> Result<Self> {
        Ok(Self {
            element,
            keywords: xpath::select_elements(element, "gmd:keyword", namespaces)?,
            types: xpath::select_elements(element, "gmd:type/gmd:MD_KeywordTypeCode", namespaces)?,
            thesauri: xpath::select_elements(
                element,
                "gmd:thesaurusName/gmd:CI_Citation/gmd:title",
                namespaces,
            )?,
        })
    }

    /// Keyword values, anchors contributing their text
    pub fn keyword_values(&self) -> Vec<&'a str> {
        self.keywords
            .iter()
            .flat_map(|k| text_values(*k))
            .filter_map(|v| v.value())
            .collect()
    }

    /// Keyword type codes
    pub fn type_values(&self) -> Vec<&'a str> {
        self.types.iter().filter_map(|t| codelist_value(*t)).collect()
    }

    /// Thesaurus titles
    pub fn thesaurus_names(&self) -> Vec<&'a str> {
        self.thesauri
            .iter()
            .flat_map(|t| text_values(*t))
            .filter_map(|v| v.value())
            .collect()
    }

    /// Whether the first thesaurus title names the WMO codelist `code`
    ///
    /// An anchor must point at `WMOCodeLists.xml#code` (or carry `code` as
    /// its text); a character string must equal `code`.
    pub fn cites_thesaurus(&self, code: &str) -> bool {
        let Some(title) = self.thesauri.first() else {
            return false;
        };
        let target = format!("{}#{}", WMO_CODELISTS, code);
        text_values(title).iter().any(|v| {
            if v.anchor {
                v.href == Some(target.as_str()) || v.text == Some(code)
            } else {
                v.text == Some(code)
            }
        })
    }

    /// Source line of the group
    pub fn line(&self) -> u32 {
        self.element.line
    }
}

/// Typed accessors over a WCMP 1.3 record
#[derive(Debug, Clone)]
pub struct Wcmp1Fields<'a> {
    doc: &'a XmlDocument,
    namespaces: NamespaceContext,
}

impl<'a> Wcmp1Fields<'a> {
    /// Create accessors for a record
    pub fn new(doc: &'a XmlDocument) -> Self {
        let namespaces = doc.root_namespaces().scoped(&NamespaceContext::wcmp1());
        Self { doc, namespaces }
    }

    /// The record
    pub fn document(&self) -> &'a XmlDocument {
        self.doc
    }

    /// The `gmd:MD_Metadata` root
    pub fn root(&self) -> &'a Element {
        &self.doc.root
    }

    /// Prefix table used for path evaluation
    pub fn namespaces(&self) -> &NamespaceContext {
        &self.namespaces
    }

    /// Evaluate a path against the root element
    pub fn select(&self, path: &str) -> Result<Vec<XPathNode<'a>>> {
        xpath::select(&self.doc.root, path, &self.namespaces)
    }

    /// Elements matching a path
    pub fn elements(&self, path: &str) -> Result<Vec<&'a Element>> {
        xpath::select_elements(&self.doc.root, path, &self.namespaces)
    }

    /// First element matching a path
    pub fn first(&self, path: &str) -> Result<Option<&'a Element>> {
        Ok(self.elements(path)?.into_iter().next())
    }

    /// Non-empty string values matching a path
    pub fn values(&self, path: &str) -> Result<Vec<&'a str>> {
        xpath::select_values(&self.doc.root, path, &self.namespaces)
    }

    /// Evaluate a path relative to some element of this record
    pub fn elements_in(&self, context: &'a Element, path: &str) -> Result<Vec<&'a Element>> {
        xpath::select_elements(context, path, &self.namespaces)
    }

    /// `gmd:fileIdentifier` elements directly under the root
    pub fn file_identifiers(&self) -> Result<Vec<&'a Element>> {
        self.elements("gmd:fileIdentifier")
    }

    /// The first file identifier string and its line
    pub fn identifier(&self) -> Result<Option<(&'a str, u32)>> {
        Ok(self
            .elements("gmd:fileIdentifier/gco:CharacterString")?
            .into_iter()
            .find_map(|e| e.text().map(|t| (t.trim(), e.line))))
    }

    /// All keyword groups
    pub fn keyword_sets(&self) -> Result<Vec<KeywordSet<'a>>> {
        self.elements(KEYWORD_SETS)?
            .into_iter()
            .map(|e| KeywordSet::from_element(e, &self.namespaces))
            .collect()
    }

    /// Keyword groups whose thesaurus is the WMO codelist `code`
    pub fn keyword_sets_for(&self, code: &str) -> Result<Vec<KeywordSet<'a>>> {
        Ok(self
            .keyword_sets()?
            .into_iter()
            .filter(|set| set.cites_thesaurus(code))
            .collect())
    }

    /// Whether any descriptive keyword is `GlobalExchange`
    pub fn is_for_global_exchange(&self) -> Result<bool> {
        let keywords = self.elements(&format!("{}//gmd:keyword", KEYWORD_SETS))?;
        let global = keywords
            .iter()
            .flat_map(|k| text_values(k))
            .any(|v| v.value() == Some("GlobalExchange"));
        debug!("Record is for global exchange: {}", global);
        Ok(global)
    }

    /// The `gmd:hierarchyLevel/gmd:MD_ScopeCode` element
    pub fn scope_code(&self) -> Result<Option<&'a Element>> {
        self.first("gmd:hierarchyLevel/gmd:MD_ScopeCode")
    }

    /// Geographic bounding boxes
    pub fn bounding_boxes(&self) -> Result<Vec<&'a Element>> {
        self.elements(BOUNDING_BOXES)
    }

    /// `gmd:otherConstraints` elements of the legal constraints
    pub fn other_constraints(&self) -> Result<Vec<&'a Element>> {
        self.elements(OTHER_CONSTRAINTS)
    }

    /// Text values of every element matched by `path`
    pub fn text_values_at(&self, path: &str) -> Result<Vec<TextValue<'a>>> {
        Ok(self
            .elements(path)?
            .into_iter()
            .flat_map(text_values)
            .collect())
    }
}

/// Resolve a `gml:beginPosition`/`gml:endPosition` to an instant
///
/// `indeterminatePosition` is honoured relative to `now`: `now` and
/// `unknown` map to `now`, `before` to a day earlier and `after` to a day
/// later. Other values and unparseable text yield `None`.
pub fn parse_time_position(element: &Element, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if let Some(position) = element.get_attribute("indeterminatePosition") {
        return match position.trim() {
            "now" | "unknown" => Some(now),
            "before" => Some(now - Duration::hours(24)),
            "after" => Some(now + Duration::hours(24)),
            other => {
                debug!("Unexpected indeterminatePosition: {}", other);
                None
            }
        };
    }
    let text = element.text()?;
    let parsed = parse_timestamp(text);
    if parsed.is_none() {
        debug!("Invalid time string: {}", text.trim());
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const RECORD: &str = r#"<gmd:MD_Metadata xmlns:gmd="http://www.isotc211.org/2005/gmd"
    xmlns:gco="http://www.isotc211.org/2005/gco"
    xmlns:gmx="http://www.isotc211.org/2005/gmx"
    xmlns:gml="http://www.opengis.net/gml/3.2"
    xmlns:xlink="http://www.w3.org/1999/xlink">
  <gmd:fileIdentifier><gco:CharacterString>urn:x-wmo:md:int.wmo.wis::X</gco:CharacterString></gmd:fileIdentifier>
  <gmd:identificationInfo>
    <gmd:MD_DataIdentification>
      <gmd:descriptiveKeywords>
        <gmd:MD_Keywords>
          <gmd:keyword><gco:CharacterString>weatherObservations</gco:CharacterString></gmd:keyword>
          <gmd:type><gmd:MD_KeywordTypeCode codeList="x#MD_KeywordTypeCode" codeListValue="theme">theme</gmd:MD_KeywordTypeCode></gmd:type>
          <gmd:thesaurusName><gmd:CI_Citation><gmd:title>
            <gmx:Anchor xlink:href="http://wis.wmo.int/2012/codelists/WMOCodeLists.xml#WMO_CategoryCode">WMO_CategoryCode</gmx:Anchor>
          </gmd:title></gmd:CI_Citation></gmd:thesaurusName>
        </gmd:MD_Keywords>
      </gmd:descriptiveKeywords>
      <gmd:descriptiveKeywords>
        <gmd:MD_Keywords>
          <gmd:keyword><gmx:Anchor xlink:href="http://example.com/ge">GlobalExchange</gmx:Anchor></gmd:keyword>
          <gmd:thesaurusName><gmd:CI_Citation><gmd:title>
            <gco:CharacterString>WMO_DistributionScopeCode</gco:CharacterString>
          </gmd:title></gmd:CI_Citation></gmd:thesaurusName>
        </gmd:MD_Keywords>
      </gmd:descriptiveKeywords>
    </gmd:MD_DataIdentification>
  </gmd:identificationInfo>
</gmd:MD_Metadata>"#;

    #[test]
    fn test_identifier() {
        let doc = XmlDocument::from_string(RECORD).unwrap();
        let fields = Wcmp1Fields::new(&doc);
        assert_eq!(
            fields.identifier().unwrap(),
            Some(("urn:x-wmo:md:int.wmo.wis::X", 6))
        );
        assert_eq!(fields.file_identifiers().unwrap().len(), 1);
    }

    #[test]
    fn test_keyword_sets() {
        let doc = XmlDocument::from_string(RECORD).unwrap();
        let fields = Wcmp1Fields::new(&doc);
        let sets = fields.keyword_sets().unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].keyword_values(), vec!["weatherObservations"]);
        assert_eq!(sets[0].type_values(), vec!["theme"]);
        assert_eq!(sets[0].thesaurus_names(), vec!["WMO_CategoryCode"]);

        let categories = fields.keyword_sets_for("WMO_CategoryCode").unwrap();
        assert_eq!(categories.len(), 1);
        let scopes = fields.keyword_sets_for("WMO_DistributionScopeCode").unwrap();
        assert_eq!(scopes.len(), 1);
        assert_eq!(scopes[0].keyword_values(), vec!["GlobalExchange"]);
    }

    #[test]
    fn test_global_exchange() {
        let doc = XmlDocument::from_string(RECORD).unwrap();
        assert!(Wcmp1Fields::new(&doc).is_for_global_exchange().unwrap());
    }

    #[test]
    fn test_default_namespace_record_is_addressable() {
        let xml = r#"<MD_Metadata xmlns="http://www.isotc211.org/2005/gmd"><fileIdentifier/></MD_Metadata>"#;
        let doc = XmlDocument::from_string(xml).unwrap();
        let fields = Wcmp1Fields::new(&doc);
        assert_eq!(fields.file_identifiers().unwrap().len(), 1);
    }

    #[test]
    fn test_time_positions() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let doc = XmlDocument::from_string(
            r#"<p><b indeterminatePosition="before"/><e indeterminatePosition="now"/><t>2020-01-01T00:00:00Z</t><x>soon</x></p>"#,
        )
        .unwrap();
        let children = &doc.root.children;
        assert_eq!(
            parse_time_position(&children[0], now),
            Some(now - Duration::hours(24))
        );
        assert_eq!(parse_time_position(&children[1], now), Some(now));
        assert_eq!(
            parse_time_position(&children[2], now),
            Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_time_position(&children[3], now), None);
    }
}

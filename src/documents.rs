//! Metadata record parsing
//!
//! This module turns raw record bytes into a [`ParsedDocument`]: an owned
//! XML element tree for WCMP 1.3 records or a JSON value for WCMP 2
//! records. The family is sniffed from the content itself.

use crate::error::{ParseError, Result};
use crate::limits::Limits;
use crate::namespaces::{
    NamespaceContext, NamespaceDeclaration, QName, GCO_NAMESPACE, GMD_NAMESPACE,
};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Document family of a metadata record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    /// WMO Core Metadata Profile 1.3 (ISO 19139 XML)
    Wcmp1,
    /// WMO Core Metadata Profile 2 (GeoJSON-based JSON)
    Wcmp2,
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::Wcmp1 => f.write_str("WCMP 1.3"),
            Family::Wcmp2 => f.write_str("WCMP 2"),
        }
    }
}

/// Common view of a parsed record
pub trait Record {
    /// Family this record type belongs to
    const FAMILY: Family;

    /// Record identifier, when the record carries one
    fn record_id(&self) -> Option<String>;
}

/// XML Element in the document tree
#[derive(Debug, Clone)]
pub struct Element {
    /// Element qualified name
    pub qname: QName,
    /// Element attributes
    pub attributes: HashMap<QName, String>,
    /// Text content (if any)
    pub text: Option<String>,
    /// Child elements
    pub children: Vec<Element>,
    /// Namespace declarations made on this element
    pub namespaces: NamespaceContext,
    /// 1-based line of the start tag
    pub line: u32,
}

impl Element {
    /// Create a new element
    pub fn new(qname: QName) -> Self {
        Self {
            qname,
            attributes: HashMap::new(),
            text: None,
            children: Vec::new(),
            namespaces: NamespaceContext::new(),
            line: 0,
        }
    }

    /// Get the local name of the element
    pub fn local_name(&self) -> &str {
        &self.qname.local_name
    }

    /// Get the namespace of the element
    pub fn namespace(&self) -> Option<&str> {
        self.qname.namespace.as_deref()
    }

    /// Check the element name
    pub fn is(&self, namespace: &str, local_name: &str) -> bool {
        self.qname.is(namespace, local_name)
    }

    /// Get an attribute value by local name, ignoring its namespace
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(qname, _)| qname.local_name == name)
            .map(|(_, value)| value.as_str())
    }

    /// Get an attribute value by qualified name
    pub fn get_attribute_qname(&self, qname: &QName) -> Option<&str> {
        self.attributes.get(qname).map(|s| s.as_str())
    }

    /// Get a namespaced attribute value
    pub fn get_attribute_ns(&self, namespace: &str, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(qname, _)| qname.is(namespace, local_name))
            .map(|(_, value)| value.as_str())
    }

    /// Add a child element
    pub fn add_child(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Append text content
    pub fn push_text(&mut self, text: &str) {
        match &mut self.text {
            Some(existing) => existing.push_str(text),
            None => self.text = Some(text.to_string()),
        }
    }

    /// Text content, `None` when absent or blank
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// Find child elements by local name
    pub fn find_children(&self, local_name: &str) -> Vec<&Element> {
        self.children
            .iter()
            .filter(|e| e.local_name() == local_name)
            .collect()
    }

    /// First child with the given name
    pub fn child(&self, namespace: &str, local_name: &str) -> Option<&Element> {
        self.children.iter().find(|e| e.is(namespace, local_name))
    }

    /// All children with the given name
    pub fn children_named<'a>(
        &'a self,
        namespace: &'a str,
        local_name: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.children
            .iter()
            .filter(move |e| e.is(namespace, local_name))
    }

    /// This element and all its descendants, in document order
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }
}

/// Pre-order iterator over an element and its descendants
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.children.iter().rev());
        Some(next)
    }
}

/// Parsed WCMP 1.3 record
#[derive(Debug, Clone)]
pub struct XmlDocument {
    /// Root element (`gmd:MD_Metadata`)
    pub root: Element,
    /// Every namespace declaration in the record, in document order
    pub declarations: Vec<NamespaceDeclaration>,
}

impl XmlDocument {
    /// Parse an XML record with default limits
    pub fn from_string(xml: &str) -> Result<Self> {
        Self::parse(xml.as_bytes(), &Limits::default())
    }

    /// Parse an XML record from bytes
    pub fn parse(xml: &[u8], limits: &Limits) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.trim_text(true);

        let mut lines = LineCounter::new(xml);
        let mut stack: Vec<(Element, NamespaceContext)> = Vec::new();
        let mut root: Option<Element> = None;
        let mut declarations = Vec::new();
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let before = reader.buffer_position();
            let event = reader.read_event_into(&mut buf).map_err(|e| {
                ParseError::new(format!("Malformed XML: {}", e))
                    .with_location(format!("line {}", lines.line_at(before)))
            })?;
            let after = reader.buffer_position();

            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let is_empty = matches!(event, Event::Empty(_));
                    let tag_len = e.len() + if is_empty { 3 } else { 2 };
                    let line = lines.line_at(after.saturating_sub(tag_len));

                    if root.is_some() && stack.is_empty() {
                        return Err(ParseError::new("Multiple root elements")
                            .with_location(format!("line {}", line))
                            .into());
                    }
                    limits.check_xml_depth(stack.len() + 1)?;

                    let parent_scope = stack
                        .last()
                        .map(|(_, scope)| scope.clone())
                        .unwrap_or_default();
                    let (element, scope) = parse_element(e, &parent_scope, line, limits)?;

                    if let Some(default) = element.namespaces.get_default_namespace() {
                        declarations.push(NamespaceDeclaration {
                            prefix: None,
                            uri: default.to_string(),
                            line,
                        });
                    }
                    for (prefix, uri) in element.namespaces.iter() {
                        declarations.push(NamespaceDeclaration {
                            prefix: Some(prefix.clone()),
                            uri: uri.clone(),
                            line,
                        });
                    }
                    limits.check_namespaces(declarations.len())?;

                    if is_empty {
                        attach(&mut stack, &mut root, element);
                    } else {
                        stack.push((element, scope));
                    }
                }
                Event::End(_) => {
                    if let Some((current, _)) = stack.pop() {
                        attach(&mut stack, &mut root, current);
                    }
                }
                Event::Text(e) => {
                    if let Some((current, _)) = stack.last_mut() {
                        let text = e.unescape().map_err(|err| {
                            ParseError::new(format!("Failed to unescape text: {}", err))
                                .with_location(format!("line {}", lines.line_at(before)))
                        })?;
                        current.push_text(&text);
                    }
                }
                Event::CData(e) => {
                    if let Some((current, _)) = stack.last_mut() {
                        let raw = e.into_inner();
                        current.push_text(&String::from_utf8_lossy(&raw));
                    }
                }
                Event::Eof => break,
                _ => {} // Declarations, comments, processing instructions, doctype
            }
        }

        if !stack.is_empty() {
            return Err(ParseError::new("Unexpected end of document: unclosed elements").into());
        }

        let root = root.ok_or_else(|| ParseError::new("XML document has no root element"))?;
        Ok(Self { root, declarations })
    }

    /// Namespace bindings declared on the root element, default repaired
    pub fn root_namespaces(&self) -> NamespaceContext {
        self.root.namespaces.repaired()
    }
}

impl Record for XmlDocument {
    const FAMILY: Family = Family::Wcmp1;

    fn record_id(&self) -> Option<String> {
        self.root
            .child(GMD_NAMESPACE, "fileIdentifier")
            .and_then(|id| id.child(GCO_NAMESPACE, "CharacterString"))
            .and_then(|cs| cs.text())
            .map(|t| t.trim().to_string())
    }
}

fn attach(stack: &mut [(Element, NamespaceContext)], root: &mut Option<Element>, element: Element) {
    if let Some((parent, _)) = stack.last_mut() {
        parent.add_child(element);
    } else {
        *root = Some(element);
    }
}

/// Parse a start tag, resolving prefixes against the enclosing scope
fn parse_element(
    start: &BytesStart,
    parent_scope: &NamespaceContext,
    line: u32,
    limits: &Limits,
) -> Result<(Element, NamespaceContext)> {
    let location = || format!("line {}", line);

    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| ParseError::new(format!("Invalid element name: {}", e)).with_location(location()))?
        .to_string();

    let mut declared = NamespaceContext::new();
    let mut raw_attributes = Vec::new();

    for attr_result in start.attributes() {
        let attr = attr_result.map_err(|e| {
            ParseError::new(format!("Failed to parse attribute: {}", e)).with_location(location())
        })?;

        let attr_name = std::str::from_utf8(attr.key.as_ref()).map_err(|e| {
            ParseError::new(format!("Invalid attribute name: {}", e)).with_location(location())
        })?;

        let attr_value = attr
            .unescape_value()
            .map_err(|e| {
                ParseError::new(format!("Failed to unescape attribute value: {}", e))
                    .with_location(location())
            })?
            .to_string();

        if attr_name == "xmlns" {
            declared.set_default_namespace(attr_value);
        } else if let Some(prefix) = attr_name.strip_prefix("xmlns:") {
            declared.add_prefix(prefix, attr_value);
        } else {
            raw_attributes.push((attr_name.to_string(), attr_value));
        }
    }
    limits.check_attributes(raw_attributes.len())?;

    let scope = parent_scope.scoped(&declared);

    let qname = match name.split_once(':') {
        Some((prefix, local)) => {
            let namespace = scope.get_namespace(prefix).ok_or_else(|| {
                ParseError::new(format!("Unbound namespace prefix '{}' on <{}>", prefix, name))
                    .with_location(location())
            })?;
            QName::namespaced(namespace, local)
        }
        None => QName::new(
            scope.get_default_namespace().filter(|ns| !ns.is_empty()),
            name.as_str(),
        ),
    };

    let mut element = Element::new(qname);
    element.line = line;
    element.namespaces = declared;

    for (attr_name, value) in raw_attributes {
        let attr_qname = match attr_name.split_once(':') {
            Some((prefix, local)) => {
                let namespace = scope.get_namespace(prefix).ok_or_else(|| {
                    ParseError::new(format!(
                        "Unbound namespace prefix '{}' on attribute '{}'",
                        prefix, attr_name
                    ))
                    .with_location(location())
                })?;
                QName::namespaced(namespace, local)
            }
            None => QName::local(attr_name),
        };
        element.attributes.insert(attr_qname, value);
    }

    Ok((element, scope))
}

/// Maps byte offsets to 1-based line numbers, assuming mostly increasing offsets
struct LineCounter<'a> {
    content: &'a [u8],
    offset: usize,
    line: u32,
}

impl<'a> LineCounter<'a> {
    fn new(content: &'a [u8]) -> Self {
        Self {
            content,
            offset: 0,
            line: 1,
        }
    }

    fn line_at(&mut self, position: usize) -> u32 {
        let position = position.min(self.content.len());
        if position < self.offset {
            self.offset = 0;
            self.line = 1;
        }
        let newlines = self.content[self.offset..position]
            .iter()
            .filter(|&&b| b == b'\n')
            .count();
        self.line += newlines as u32;
        self.offset = position;
        self.line
    }
}

/// Parsed WCMP 2 record
#[derive(Debug, Clone)]
pub struct JsonRecord {
    /// The record as decoded JSON
    pub value: Value,
}

impl JsonRecord {
    /// Wrap an already-decoded value, checking the WCMP 2 shape
    pub fn from_value(value: Value) -> Result<Self> {
        match value.get("properties") {
            Some(Value::Object(_)) => Ok(Self { value }),
            Some(_) => Err(ParseError::new("'properties' is not a JSON object").into()),
            None => Err(ParseError::new("JSON document has no 'properties' object").into()),
        }
    }

    /// Parse a WCMP 2 record from bytes
    pub fn parse(json: &[u8], limits: &Limits) -> Result<Self> {
        let value: Value = serde_json::from_slice(json).map_err(|e| {
            ParseError::new(format!("Not a recognized WCMP document: {}", e))
                .with_location(format!("line {} column {}", e.line(), e.column()))
        })?;
        limits.check_json_depth(json_depth(&value))?;
        if !value.is_object() {
            return Err(ParseError::new("JSON document is not an object").into());
        }
        Self::from_value(value)
    }

    /// `properties` object
    pub fn properties(&self) -> &serde_json::Map<String, Value> {
        // shape checked at construction
        static EMPTY: once_cell::sync::Lazy<serde_json::Map<String, Value>> =
            once_cell::sync::Lazy::new(serde_json::Map::new);
        self.value
            .get("properties")
            .and_then(Value::as_object)
            .unwrap_or(&EMPTY)
    }

    /// A property by key
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties().get(key)
    }
}

impl Record for JsonRecord {
    const FAMILY: Family = Family::Wcmp2;

    fn record_id(&self) -> Option<String> {
        self.value.get("id").and_then(Value::as_str).map(str::to_string)
    }
}

fn json_depth(value: &Value) -> usize {
    match value {
        Value::Array(items) => 1 + items.iter().map(json_depth).max().unwrap_or(0),
        Value::Object(map) => 1 + map.values().map(json_depth).max().unwrap_or(0),
        _ => 0,
    }
}

/// A parsed record of either family
#[derive(Debug, Clone)]
pub enum ParsedDocument {
    /// WCMP 1.3 XML record
    Xml(XmlDocument),
    /// WCMP 2 JSON record
    Json(JsonRecord),
}

impl ParsedDocument {
    /// Family of the record
    pub fn family(&self) -> Family {
        match self {
            ParsedDocument::Xml(_) => Family::Wcmp1,
            ParsedDocument::Json(_) => Family::Wcmp2,
        }
    }

    /// Record identifier
    pub fn record_id(&self) -> Option<String> {
        match self {
            ParsedDocument::Xml(doc) => doc.record_id(),
            ParsedDocument::Json(doc) => doc.record_id(),
        }
    }
}

/// Parse a record with default limits, sniffing its family
pub fn parse(content: &[u8]) -> Result<ParsedDocument> {
    parse_with_limits(content, &Limits::default())
}

/// Parse a record, sniffing its family
///
/// Content starting with `<` must be a `gmd:MD_Metadata` document; anything
/// else must be a JSON object with a `properties` object.
pub fn parse_with_limits(content: &[u8], limits: &Limits) -> Result<ParsedDocument> {
    limits.check_document_size(content.len())?;

    // leading whitespace stays in place so reported lines match the source
    let content = content.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(content);
    let first = content
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .ok_or_else(|| ParseError::new("Empty document"))?;

    if *first == b'<' {
        let doc = XmlDocument::parse(content, limits)?;
        if !doc.root.is(GMD_NAMESPACE, "MD_Metadata") {
            return Err(ParseError::new(format!(
                "Unrecognized root element '{}'",
                doc.root.qname
            ))
            .with_location(format!("line {}", doc.root.line))
            .into());
        }
        Ok(ParsedDocument::Xml(doc))
    } else {
        Ok(ParsedDocument::Json(JsonRecord::parse(content, limits)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::namespaces::GMX_NAMESPACE;

    const MINIMAL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gmd:MD_Metadata xmlns:gmd="http://www.isotc211.org/2005/gmd"
    xmlns:gco="http://www.isotc211.org/2005/gco"
    xmlns:gmx="http://www.isotc211.org/2005/gmx"
    xmlns:xlink="http://www.w3.org/1999/xlink">
  <gmd:fileIdentifier>
    <gco:CharacterString>urn:x-wmo:md:int.wmo.wis::TEST</gco:CharacterString>
  </gmd:fileIdentifier>
  <gmd:keyword><gmx:Anchor xlink:href="http://example.com/a">A &amp; B</gmx:Anchor></gmd:keyword>
</gmd:MD_Metadata>"#;

    #[test]
    fn test_parse_xml_record() {
        let doc = parse(MINIMAL.as_bytes()).unwrap();
        assert_eq!(doc.family(), Family::Wcmp1);
        assert_eq!(
            doc.record_id().as_deref(),
            Some("urn:x-wmo:md:int.wmo.wis::TEST")
        );
    }

    #[test]
    fn test_source_lines() {
        let doc = XmlDocument::from_string(MINIMAL).unwrap();
        assert_eq!(doc.root.line, 2);
        let file_id = doc.root.child(GMD_NAMESPACE, "fileIdentifier").unwrap();
        assert_eq!(file_id.line, 6);
        let keyword = doc.root.child(GMD_NAMESPACE, "keyword").unwrap();
        assert_eq!(keyword.line, 9);
    }

    #[test]
    fn test_attributes_and_text_resolved() {
        let doc = XmlDocument::from_string(MINIMAL).unwrap();
        let anchor = doc
            .root
            .child(GMD_NAMESPACE, "keyword")
            .and_then(|k| k.child(GMX_NAMESPACE, "Anchor"))
            .unwrap();
        assert_eq!(
            anchor.get_attribute_ns(crate::namespaces::XLINK_NAMESPACE, "href"),
            Some("http://example.com/a")
        );
        assert_eq!(anchor.text(), Some("A & B"));
    }

    #[test]
    fn test_declarations_recorded() {
        let doc = XmlDocument::from_string(MINIMAL).unwrap();
        assert_eq!(doc.declarations.len(), 4);
        assert!(doc.declarations.iter().all(|d| d.prefix.is_some()));
        assert!(doc.declarations.iter().all(|d| d.line == 2));
    }

    #[test]
    fn test_default_namespace_resolves_elements() {
        let xml = r#"<MD_Metadata xmlns="http://www.isotc211.org/2005/gmd"><fileIdentifier/></MD_Metadata>"#;
        let doc = parse(xml.as_bytes()).unwrap();
        let ParsedDocument::Xml(doc) = doc else {
            panic!("expected XML");
        };
        assert!(doc.root.child(GMD_NAMESPACE, "fileIdentifier").is_some());
        assert_eq!(doc.declarations[0].prefix, None);
    }

    #[test]
    fn test_unrecognized_root() {
        let err = parse(b"<catalog/>").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        assert!(err.to_string().contains("catalog"));
    }

    #[test]
    fn test_unbound_prefix() {
        let err = parse(b"<gmd:MD_Metadata/>").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_parse_json_record() {
        let doc = parse(br#"  {"id": "urn:x-wmo:md:can:eccc-msc:1", "properties": {}}"#).unwrap();
        assert_eq!(doc.family(), Family::Wcmp2);
        assert_eq!(doc.record_id().as_deref(), Some("urn:x-wmo:md:can:eccc-msc:1"));
    }

    #[test]
    fn test_json_without_properties() {
        assert!(matches!(parse(br#"{"id": "x"}"#), Err(Error::Parse(_))));
        assert!(matches!(parse(b"[1, 2]"), Err(Error::Parse(_))));
        assert!(matches!(parse(b"not a record"), Err(Error::Parse(_))));
        assert!(matches!(parse(b"   "), Err(Error::Parse(_))));
    }

    #[test]
    fn test_bom_is_ignored() {
        let mut content = b"\xEF\xBB\xBF".to_vec();
        content.extend_from_slice(br#"{"properties": {}}"#);
        assert_eq!(parse(&content).unwrap().family(), Family::Wcmp2);
    }

    #[test]
    fn test_leading_blank_lines_keep_line_numbers() {
        let padded = format!("\n\n{}", MINIMAL);
        let ParsedDocument::Xml(doc) = parse(padded.as_bytes()).unwrap() else {
            panic!("expected an XML record");
        };
        assert_eq!(doc.root.line, 4);

        let broken = "\n\n<gmd:MD_Metadata xmlns:gmd=\"http://www.isotc211.org/2005/gmd\">\n  <foo:bar/>\n</gmd:MD_Metadata>\n";
        let err = parse(broken.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Location: line 4"), "{}", err);
    }

    #[test]
    fn test_depth_limit() {
        let xml = format!(
            r#"<gmd:MD_Metadata xmlns:gmd="{}">{}{}</gmd:MD_Metadata>"#,
            GMD_NAMESPACE,
            "<a>".repeat(200),
            "</a>".repeat(200)
        );
        let result = parse_with_limits(xml.as_bytes(), &Limits::strict());
        assert!(matches!(result, Err(Error::LimitExceeded(_))));
    }

    #[test]
    fn test_descendants_in_document_order() {
        let doc = XmlDocument::from_string("<a><b><c/></b><d/></a>").unwrap();
        let names: Vec<&str> = doc.root.descendants().map(|e| e.local_name()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }
}

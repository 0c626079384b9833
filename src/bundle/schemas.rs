//! Cached schemas
//!
//! WCMP 1.3 records are checked against the ISO/TS 19139 bundle at three
//! levels: every element and qualified attribute must belong to a namespace
//! the bundle defines, every element must be declared by the schemas of its
//! namespace, and `gco` simple values must be lexically valid. Content models
//! are not evaluated. WCMP 2 records are validated against the bundled JSON
//! Schema.

use crate::documents::{Element, Family, ParsedDocument, XmlDocument};
use crate::error::{Error, Result};
use crate::namespaces::{GCO_NAMESPACE, GMD_NAMESPACE, XML_NAMESPACE, XSD_NAMESPACE, XSI_NAMESPACE};
use jsonschema::JSONSchema;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

static INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]?\d+$").expect("valid regex"));
static DECIMAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)$").expect("valid regex"));
static REAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?|-?INF|NaN)$").expect("valid regex")
});
// xs:date, xs:gYearMonth or xs:gYear
static DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?\d{4,}(-\d{2}(-\d{2})?)?(Z|[+-]\d{2}:\d{2})?$").expect("valid regex")
});
static DATE_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?\d{4,}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})?$")
        .expect("valid regex")
});

/// Declaration-level view of the ISO/TS 19139 schema bundle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlSchema {
    namespaces: BTreeSet<String>,
    elements: BTreeMap<String, BTreeSet<String>>,
}

impl XmlSchema {
    /// Create a schema from a set of target namespaces
    pub fn from_namespaces<I, S>(namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            namespaces: namespaces.into_iter().map(Into::into).collect(),
            elements: BTreeMap::new(),
        }
    }

    /// Add element declarations for a namespace
    pub fn with_elements<I, S>(mut self, namespace: impl Into<String>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let namespace = namespace.into();
        self.namespaces.insert(namespace.clone());
        self.elements
            .entry(namespace)
            .or_default()
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// Load the wrapper schema and every XSD below `schema_dir`
    pub fn load(wrapper: &Path, schema_dir: &Path) -> Result<Self> {
        let mut schema = Self::default();
        scan_xsd(wrapper, &mut schema)?;

        for entry in WalkDir::new(schema_dir).follow_links(false) {
            let entry = entry.map_err(|e| Error::Schema(e.to_string()))?;
            let path = entry.path();
            if entry.file_type().is_file() && path.extension().map_or(false, |ext| ext == "xsd") {
                scan_xsd(path, &mut schema)?;
            }
        }
        debug!(
            "Schema bundle defines {} namespaces, {} with element declarations",
            schema.namespaces.len(),
            schema.elements.len()
        );
        Ok(schema)
    }

    /// Namespaces defined by the bundle
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.namespaces.iter().map(String::as_str)
    }

    /// Whether the bundle defines `namespace`
    pub fn defines(&self, namespace: &str) -> bool {
        self.namespaces.contains(namespace)
    }

    /// Whether `local_name` is declared in `namespace`
    ///
    /// Namespaces whose schemas declare no elements accept any name.
    pub fn declares(&self, namespace: &str, local_name: &str) -> bool {
        self.elements
            .get(namespace)
            .map_or(true, |names| names.contains(local_name))
    }

    /// Every problem found in the record, in document order
    pub fn validate(&self, doc: &XmlDocument) -> Vec<String> {
        let mut errors = Vec::new();
        if !doc.root.is(GMD_NAMESPACE, "MD_Metadata") {
            errors.push(format!(
                "Line {}: root element {} is not gmd:MD_Metadata",
                doc.root.line, doc.root.qname
            ));
        }

        for element in doc.root.descendants() {
            match element.namespace() {
                Some(ns) if !self.defines(ns) => errors.push(format!(
                    "Line {}: element '{}' is in namespace {} which the schema does not define",
                    element.line,
                    element.local_name(),
                    ns
                )),
                Some(ns) if !self.declares(ns, element.local_name()) => errors.push(format!(
                    "Line {}: element '{}' is not declared in namespace {}",
                    element.line,
                    element.local_name(),
                    ns
                )),
                Some(_) => {}
                None => errors.push(format!(
                    "Line {}: element '{}' has no namespace",
                    element.line,
                    element.local_name()
                )),
            }
            if let Some(error) = check_gco_value(element) {
                errors.push(error);
            }

            let mut foreign: Vec<_> = element
                .attributes
                .keys()
                .filter_map(|name| name.namespace.as_deref().map(|ns| (ns, name)))
                .filter(|(ns, _)| !(self.defines(ns) || *ns == XSI_NAMESPACE || *ns == XML_NAMESPACE))
                .map(|(_, name)| name.to_string())
                .collect();
            foreign.sort();
            for name in foreign {
                errors.push(format!(
                    "Line {}: attribute {} on '{}' is not defined by the schema",
                    element.line,
                    name,
                    element.local_name()
                ));
            }
        }
        errors
    }
}

/// Lexical check of a `gco` simple value
fn check_gco_value(element: &Element) -> Option<String> {
    if element.namespace() != Some(GCO_NAMESPACE) {
        return None;
    }
    let value = element.text.as_deref().unwrap_or("").trim();
    let valid = match element.local_name() {
        "Boolean" => matches!(value, "true" | "false" | "1" | "0"),
        "Integer" => INTEGER.is_match(value),
        "Decimal" => DECIMAL.is_match(value),
        "Real" => REAL.is_match(value),
        "Date" => DATE.is_match(value),
        "DateTime" => DATE_TIME.is_match(value),
        _ => true,
    };
    (!valid).then(|| invalid_value(element, value))
}

fn invalid_value(element: &Element, value: &str) -> String {
    format!(
        "Line {}: '{}' is not a valid gco:{}",
        element.line,
        value,
        element.local_name()
    )
}

/// Collect a schema's target namespace, imported namespaces and element
/// declarations
fn scan_xsd(path: &Path, schema: &mut XmlSchema) -> Result<()> {
    let content = fs::read_to_string(path)?;
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    let doc = roxmltree::Document::parse_with_options(&content, options)
        .map_err(|e| Error::Schema(format!("{}: {}", path.display(), e)))?;

    let is_xsd = |n: &roxmltree::Node<'_, '_>, name: &str| {
        n.is_element() && n.tag_name().namespace() == Some(XSD_NAMESPACE) && n.tag_name().name() == name
    };
    let root = doc.root_element();
    for import in root.children().filter(|n| is_xsd(n, "import")) {
        if let Some(ns) = import.attribute("namespace") {
            schema.namespaces.insert(ns.to_string());
        }
    }

    let Some(target) = root.attribute("targetNamespace") else {
        return Ok(());
    };
    schema.namespaces.insert(target.to_string());
    let declared: Vec<String> = root
        .descendants()
        .filter(|n| is_xsd(n, "element"))
        .filter_map(|n| n.attribute("name"))
        .map(str::to_string)
        .collect();
    if !declared.is_empty() {
        schema
            .elements
            .entry(target.to_string())
            .or_default()
            .extend(declared);
    }
    Ok(())
}

/// Compiled WCMP 2 JSON Schema
pub struct JsonSchema {
    compiled: JSONSchema,
}

impl JsonSchema {
    /// Compile a schema document
    pub fn compile(schema: &Value) -> Result<Self> {
        let compiled = JSONSchema::compile(schema)
            .map_err(|e| Error::Schema(format!("Invalid WCMP2 schema: {}", e)))?;
        Ok(Self { compiled })
    }

    /// Load and compile a schema file
    pub fn load(path: &Path) -> Result<Self> {
        let schema: Value = serde_json::from_str(&fs::read_to_string(path)?)?;
        Self::compile(&schema)
    }

    /// Every validation error, as `pointer: message`
    pub fn validate(&self, instance: &Value) -> Vec<String> {
        match self.compiled.validate(instance) {
            Ok(()) => Vec::new(),
            Err(errors) => errors
                .map(|e| {
                    let path = e.instance_path.to_string();
                    if path.is_empty() {
                        e.to_string()
                    } else {
                        format!("{}: {}", path, e)
                    }
                })
                .collect(),
        }
    }
}

impl fmt::Debug for JsonSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSchema").finish_non_exhaustive()
    }
}

/// Schema for one record family
#[derive(Debug)]
pub enum SchemaHandle {
    /// ISO/TS 19139 bundle
    Xml(XmlSchema),
    /// WCMP 2 JSON Schema
    Json(JsonSchema),
}

impl SchemaHandle {
    /// Family this schema applies to
    pub fn family(&self) -> Family {
        match self {
            SchemaHandle::Xml(_) => Family::Wcmp1,
            SchemaHandle::Json(_) => Family::Wcmp2,
        }
    }

    /// Validate a record, returning every error found
    pub fn validate(&self, document: &ParsedDocument) -> Result<Vec<String>> {
        match (self, document) {
            (SchemaHandle::Xml(schema), ParsedDocument::Xml(doc)) => Ok(schema.validate(doc)),
            (SchemaHandle::Json(schema), ParsedDocument::Json(record)) => {
                Ok(schema.validate(&record.value))
            }
            _ => Err(Error::Value(format!(
                "{} schema cannot validate a {} record",
                self.family(),
                document.family()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::{GCO_NAMESPACE, XLINK_NAMESPACE};
    use serde_json::json;
    use tempfile::TempDir;

    fn iso_schema() -> XmlSchema {
        XmlSchema::from_namespaces([GMD_NAMESPACE, GCO_NAMESPACE, XLINK_NAMESPACE])
    }

    #[test]
    fn test_xml_schema_accepts_known_namespaces() {
        let doc = XmlDocument::from_string(
            r#"<gmd:MD_Metadata xmlns:gmd="http://www.isotc211.org/2005/gmd"
                xmlns:gco="http://www.isotc211.org/2005/gco"
                xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
                xsi:schemaLocation="x y">
              <gmd:fileIdentifier><gco:CharacterString>id</gco:CharacterString></gmd:fileIdentifier>
            </gmd:MD_Metadata>"#,
        )
        .unwrap();
        assert!(iso_schema().validate(&doc).is_empty());
    }

    #[test]
    fn test_xml_schema_reports_foreign_namespaces() {
        let doc = XmlDocument::from_string(
            r#"<gmd:MD_Metadata xmlns:gmd="http://www.isotc211.org/2005/gmd"
                xmlns:foo="http://example.com/foo">
              <foo:extra foo:flag="1"/>
            </gmd:MD_Metadata>"#,
        )
        .unwrap();
        let errors = iso_schema().validate(&doc);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("Line 3: element 'extra'"));
        assert!(errors[1].contains("attribute {http://example.com/foo}flag"));
    }

    #[test]
    fn test_xml_schema_load_scans_bundle() {
        let dir = TempDir::new().unwrap();
        let gmd = dir.path().join("schema/gmd");
        fs::create_dir_all(&gmd).unwrap();
        fs::write(
            gmd.join("gmd.xsd"),
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                targetNamespace="http://www.isotc211.org/2005/gmd">
              <xs:import namespace="http://www.isotc211.org/2005/gco" schemaLocation="../gco/gco.xsd"/>
              <xs:element name="MD_Metadata" type="gmd:MD_Metadata_Type"/>
              <xs:complexType name="MD_Metadata_Type">
                <xs:sequence>
                  <xs:element name="fileIdentifier" type="gco:CharacterString_PropertyType"/>
                </xs:sequence>
              </xs:complexType>
            </xs:schema>"#,
        )
        .unwrap();
        let wrapper = dir.path().join("iso-all.xsd");
        fs::write(
            &wrapper,
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
              <xs:import namespace="http://www.isotc211.org/2005/gmx" schemaLocation="schema/gmx/gmx.xsd"/>
            </xs:schema>"#,
        )
        .unwrap();

        let schema = XmlSchema::load(&wrapper, &dir.path().join("schema")).unwrap();
        assert_eq!(
            schema.namespaces().collect::<Vec<_>>(),
            vec![GCO_NAMESPACE, GMD_NAMESPACE, "http://www.isotc211.org/2005/gmx"]
        );
        assert!(schema.declares(GMD_NAMESPACE, "MD_Metadata"));
        assert!(schema.declares(GMD_NAMESPACE, "fileIdentifier"));
        assert!(!schema.declares(GMD_NAMESPACE, "notAnIsoElement"));
        // no declarations were scanned for gco
        assert!(schema.declares(GCO_NAMESPACE, "Anything"));
    }

    #[test]
    fn test_xml_schema_reports_undeclared_elements_and_bad_values() {
        let schema = iso_schema()
            .with_elements(GMD_NAMESPACE, ["MD_Metadata", "fileIdentifier"])
            .with_elements(GCO_NAMESPACE, ["CharacterString", "Boolean", "Decimal", "Date"]);
        let doc = XmlDocument::from_string(
            r#"<gmd:MD_Metadata xmlns:gmd="http://www.isotc211.org/2005/gmd"
                xmlns:gco="http://www.isotc211.org/2005/gco">
              <gmd:fileIdentifier><gco:CharacterString>id</gco:CharacterString></gmd:fileIdentifier>
              <gmd:notAnIsoElement><gco:Boolean>banana</gco:Boolean></gmd:notAnIsoElement>
              <gco:Decimal> -42.5 </gco:Decimal>
              <gco:Date>2023-01</gco:Date>
              <gco:Date>01/02/2023</gco:Date>
            </gmd:MD_Metadata>"#,
        )
        .unwrap();
        let errors = schema.validate(&doc);
        assert_eq!(
            errors,
            vec![
                format!("Line 4: element 'notAnIsoElement' is not declared in namespace {}", GMD_NAMESPACE),
                "Line 4: 'banana' is not a valid gco:Boolean".to_string(),
                "Line 7: '01/02/2023' is not a valid gco:Date".to_string(),
            ]
        );
    }

    #[test]
    fn test_json_schema_collects_every_error() {
        let schema = JsonSchema::compile(&json!({
            "type": "object",
            "required": ["id", "properties"],
            "properties": {"id": {"type": "string"}}
        }))
        .unwrap();

        assert!(schema.validate(&json!({"id": "x", "properties": {}})).is_empty());
        let errors = schema.validate(&json!({"id": 5}));
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.starts_with("/id:")));
    }

    #[test]
    fn test_handle_rejects_other_family() {
        let handle = SchemaHandle::Xml(iso_schema());
        let record = crate::documents::parse(br#"{"id": "x", "properties": {}}"#).unwrap();
        assert!(matches!(handle.validate(&record), Err(Error::Value(_))));
    }
}

//! XML namespace handling
//!
//! This module provides qualified names (QNames), namespace prefix mappings
//! and the fixed namespace table used by WCMP 1.3 records.

use std::collections::BTreeMap;
use std::fmt;

/// XML Namespace URI
pub type NamespaceUri = String;

/// Namespace prefix
pub type Prefix = String;

/// ISO 19139 common types
pub const GCO_NAMESPACE: &str = "http://www.isotc211.org/2005/gco";

/// ISO 19139 metadata
pub const GMD_NAMESPACE: &str = "http://www.isotc211.org/2005/gmd";

/// GML 3.2
pub const GML_NAMESPACE: &str = "http://www.opengis.net/gml/3.2";

/// ISO 19139 extended types (anchors, codelist catalogues)
pub const GMX_NAMESPACE: &str = "http://www.isotc211.org/2005/gmx";

/// XLink
pub const XLINK_NAMESPACE: &str = "http://www.w3.org/1999/xlink";

/// XML Schema instance
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// XML Schema
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// XML namespace, bound to `xml` without declaration
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Qualified name (QName) - combination of namespace and local name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    /// Namespace URI (None for no namespace)
    pub namespace: Option<NamespaceUri>,
    /// Local name
    pub local_name: String,
}

impl QName {
    /// Create a new QName
    pub fn new(namespace: Option<impl Into<String>>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(|s| s.into()),
            local_name: local_name.into(),
        }
    }

    /// Create a QName without a namespace
    pub fn local(local_name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local_name: local_name.into(),
        }
    }

    /// Create a QName with a namespace
    pub fn namespaced(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local_name: local_name.into(),
        }
    }

    /// Check whether this name is `{namespace}local_name`
    pub fn is(&self, namespace: &str, local_name: &str) -> bool {
        self.local_name == local_name && self.namespace.as_deref() == Some(namespace)
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local_name),
            None => f.write_str(&self.local_name),
        }
    }
}

/// Namespace context for resolving prefixes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamespaceContext {
    /// Mapping from prefix to namespace URI
    prefixes: BTreeMap<Prefix, NamespaceUri>,
    /// Default namespace (no prefix)
    default_namespace: Option<NamespaceUri>,
}

impl NamespaceContext {
    /// Create a new empty namespace context
    pub fn new() -> Self {
        Self::default()
    }

    /// The prefixes every WCMP 1.3 path expression in this crate relies on
    pub fn wcmp1() -> Self {
        let mut ctx = Self::new();
        ctx.add_prefix("gco", GCO_NAMESPACE);
        ctx.add_prefix("gmd", GMD_NAMESPACE);
        ctx.add_prefix("gml", GML_NAMESPACE);
        ctx.add_prefix("gmx", GMX_NAMESPACE);
        ctx.add_prefix("xlink", XLINK_NAMESPACE);
        ctx.add_prefix("xsi", XSI_NAMESPACE);
        ctx
    }

    /// Add a namespace prefix mapping
    pub fn add_prefix(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.prefixes.insert(prefix.into(), namespace.into());
    }

    /// Set the default namespace
    pub fn set_default_namespace(&mut self, namespace: impl Into<String>) {
        self.default_namespace = Some(namespace.into());
    }

    /// Get the namespace for a prefix
    pub fn get_namespace(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE);
        }
        self.prefixes.get(prefix).map(|s| s.as_str())
    }

    /// Get the default namespace
    pub fn get_default_namespace(&self) -> Option<&str> {
        self.default_namespace.as_deref()
    }

    /// Iterate over prefix bindings
    pub fn iter(&self) -> impl Iterator<Item = (&Prefix, &NamespaceUri)> {
        self.prefixes.iter()
    }

    /// Number of prefix bindings, the default namespace included
    pub fn len(&self) -> usize {
        self.prefixes.len() + usize::from(self.default_namespace.is_some())
    }

    /// Whether nothing is bound
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A new context with `inner` declarations shadowing these ones
    pub fn scoped(&self, inner: &NamespaceContext) -> NamespaceContext {
        let mut merged = self.clone();
        for (prefix, uri) in &inner.prefixes {
            merged.prefixes.insert(prefix.clone(), uri.clone());
        }
        if let Some(default) = &inner.default_namespace {
            merged.default_namespace = Some(default.clone());
        }
        merged
    }

    /// Derive a context without a default namespace
    ///
    /// The default namespace is rebound to a prefix named after the last
    /// path segment of its URI (`.../gmd` becomes `gmd`) unless that prefix
    /// is already taken. `self` is left untouched.
    pub fn repaired(&self) -> NamespaceContext {
        let mut repaired = NamespaceContext {
            prefixes: self.prefixes.clone(),
            default_namespace: None,
        };
        if let Some(default) = &self.default_namespace {
            let prefix = default
                .trim_end_matches('/')
                .rsplit(['/', '#', ':'])
                .next()
                .filter(|p| !p.is_empty())
                .unwrap_or("default");
            if !repaired.prefixes.contains_key(prefix) {
                repaired.add_prefix(prefix, default.clone());
            }
        }
        repaired
    }
}

/// A namespace declaration as written in a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDeclaration {
    /// Declared prefix, `None` for a default namespace declaration
    pub prefix: Option<Prefix>,
    /// Bound namespace URI
    pub uri: NamespaceUri,
    /// 1-based line of the declaring element
    pub line: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qname_creation() {
        let qname = QName::namespaced(GMD_NAMESPACE, "MD_Metadata");
        assert_eq!(qname.namespace, Some(GMD_NAMESPACE.to_string()));
        assert_eq!(qname.local_name, "MD_Metadata");
        assert!(qname.is(GMD_NAMESPACE, "MD_Metadata"));
        assert!(!qname.is(GMX_NAMESPACE, "MD_Metadata"));
    }

    #[test]
    fn test_qname_display() {
        let qname = QName::namespaced("http://example.com", "element");
        assert_eq!(qname.to_string(), "{http://example.com}element");

        let qname_local = QName::local("element");
        assert_eq!(qname_local.to_string(), "element");
    }

    #[test]
    fn test_namespace_context() {
        let mut ctx = NamespaceContext::new();
        ctx.add_prefix("gmd", GMD_NAMESPACE);
        ctx.set_default_namespace("http://example.com");

        assert_eq!(ctx.get_namespace("gmd"), Some(GMD_NAMESPACE));
        assert_eq!(ctx.get_namespace("xml"), Some(XML_NAMESPACE));
        assert_eq!(ctx.get_default_namespace(), Some("http://example.com"));
        assert_eq!(ctx.len(), 2);
    }

    #[test]
    fn test_scoped_shadows_outer() {
        let mut outer = NamespaceContext::new();
        outer.add_prefix("a", "urn:outer");
        let mut inner = NamespaceContext::new();
        inner.add_prefix("a", "urn:inner");
        inner.set_default_namespace("urn:default");

        let merged = outer.scoped(&inner);
        assert_eq!(merged.get_namespace("a"), Some("urn:inner"));
        assert_eq!(merged.get_default_namespace(), Some("urn:default"));
        assert_eq!(outer.get_namespace("a"), Some("urn:outer"));
    }

    #[test]
    fn test_repaired_rebinds_default() {
        let mut ctx = NamespaceContext::new();
        ctx.set_default_namespace(GMD_NAMESPACE);
        ctx.add_prefix("gco", GCO_NAMESPACE);

        let repaired = ctx.repaired();
        assert_eq!(repaired.get_default_namespace(), None);
        assert_eq!(repaired.get_namespace("gmd"), Some(GMD_NAMESPACE));
        assert_eq!(repaired.get_namespace("gco"), Some(GCO_NAMESPACE));

        // input is untouched
        assert_eq!(ctx.get_default_namespace(), Some(GMD_NAMESPACE));
        assert_eq!(ctx.get_namespace("gmd"), None);
    }

    #[test]
    fn test_repaired_keeps_existing_prefix() {
        let mut ctx = NamespaceContext::new();
        ctx.add_prefix("gmd", "urn:other");
        ctx.set_default_namespace(GMD_NAMESPACE);

        let repaired = ctx.repaired();
        assert_eq!(repaired.get_namespace("gmd"), Some("urn:other"));
    }
}

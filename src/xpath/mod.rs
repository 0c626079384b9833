//! Path expressions over WCMP 1.3 records
//!
//! Requirement and KPI checks locate record content with short
//! slash-separated paths such as
//! `gmd:identificationInfo//gmd:abstract/gco:CharacterString`.
//!
//! ## Limitations
//!
//! Only the location-path subset those checks need is supported:
//! - child, descendant (`//`) and self (`.`) steps
//! - `*` wildcards
//! - a terminal attribute step (`@xlink:href`)
//!
//! Predicates, functions and reverse axes are not supported.

mod selectors;

pub use selectors::{split_path, ElementSelector, PathStep, PathStepKind};

use crate::documents::Element;
use crate::error::Result;
use crate::namespaces::{NamespaceContext, QName};

/// A node selected by a path expression
#[derive(Debug, Clone, Copy)]
pub enum XPathNode<'a> {
    /// An element node
    Element(&'a Element),
    /// An attribute node
    Attribute {
        /// Element carrying the attribute
        owner: &'a Element,
        /// Attribute name
        name: &'a QName,
        /// Attribute value
        value: &'a str,
    },
}

impl<'a> XPathNode<'a> {
    /// String value: trimmed element text or the attribute value
    pub fn value(&self) -> Option<&'a str> {
        match self {
            XPathNode::Element(element) => element.text().map(str::trim),
            XPathNode::Attribute { value, .. } => Some(value),
        }
    }

    /// Source line of the node (the owner element's line for attributes)
    pub fn line(&self) -> u32 {
        match self {
            XPathNode::Element(element) => element.line,
            XPathNode::Attribute { owner, .. } => owner.line,
        }
    }

    /// Element node, if this is one
    pub fn as_element(&self) -> Option<&'a Element> {
        match self {
            XPathNode::Element(element) => Some(element),
            XPathNode::Attribute { .. } => None,
        }
    }
}

/// Evaluate a path expression against an element
pub fn select<'a>(
    context: &'a Element,
    path: &str,
    namespaces: &NamespaceContext,
) -> Result<Vec<XPathNode<'a>>> {
    ElementSelector::new(path).select(context, namespaces)
}

/// Evaluate a path expression, keeping element nodes only
pub fn select_elements<'a>(
    context: &'a Element,
    path: &str,
    namespaces: &NamespaceContext,
) -> Result<Vec<&'a Element>> {
    Ok(select(context, path, namespaces)?
        .into_iter()
        .filter_map(|node| node.as_element())
        .collect())
}

/// Evaluate a path expression, keeping non-empty string values
pub fn select_values<'a>(
    context: &'a Element,
    path: &str,
    namespaces: &NamespaceContext,
) -> Result<Vec<&'a str>> {
    Ok(select(context, path, namespaces)?
        .into_iter()
        .filter_map(|node| node.value())
        .filter(|value| !value.is_empty())
        .collect())
}

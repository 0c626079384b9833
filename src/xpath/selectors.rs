//! Path selectors over record element trees
//!
//! A selector is a slash-separated list of steps. Supported forms are
//! `a/b`, `./a`, `.//a`, `//a`, `a//b`, `/root/a`, `*` wildcards and a
//! terminal `@attr` step. Prefixes are resolved through a
//! [`NamespaceContext`], so a record may use any prefix it likes for a
//! namespace.

use super::XPathNode;
use crate::documents::Element;
use crate::error::{Error, Result};
use crate::namespaces::{NamespaceContext, QName};
use std::collections::HashSet;

/// Element selector compiled from a path expression
#[derive(Debug, Clone)]
pub struct ElementSelector {
    /// The raw path expression
    pub xpath: String,
    /// Parsed path steps
    pub steps: Vec<PathStep>,
    /// Whether evaluation starts above the root element
    pub absolute: bool,
}

impl ElementSelector {
    /// Create a new element selector from a path expression
    pub fn new(xpath: impl Into<String>) -> Self {
        let xpath = xpath.into();
        let steps = split_path(&xpath)
            .into_iter()
            .map(PathStep::parse)
            .collect();
        let absolute = xpath.trim_start().starts_with('/');
        Self {
            xpath,
            steps,
            absolute,
        }
    }

    /// Check if this selector matches any descendant
    pub fn is_descendant(&self) -> bool {
        self.steps
            .iter()
            .find(|s| s.kind != PathStepKind::Self_)
            .map(|s| s.kind == PathStepKind::DescendantOrSelf)
            .unwrap_or(false)
    }

    /// Evaluate the selector
    ///
    /// Relative paths start at `context`; absolute paths start at a virtual
    /// document node whose only child is `context`.
    pub fn select<'a>(
        &self,
        context: &'a Element,
        namespaces: &NamespaceContext,
    ) -> Result<Vec<XPathNode<'a>>> {
        let mut current: Vec<Cursor<'a>> = if self.absolute {
            vec![Cursor::Document(context)]
        } else {
            vec![Cursor::Element(context)]
        };
        let mut attributes: Vec<XPathNode<'a>> = Vec::new();

        for (index, step) in self.steps.iter().enumerate() {
            match step.kind {
                PathStepKind::Self_ => {}
                PathStepKind::DescendantOrSelf => {
                    let mut seen = HashSet::new();
                    let mut expanded = Vec::new();
                    for cursor in &current {
                        let (document, start) = match cursor {
                            Cursor::Document(root) => (true, *root),
                            Cursor::Element(element) => (false, *element),
                        };
                        if document {
                            expanded.push(*cursor);
                        }
                        for element in start.descendants() {
                            if seen.insert(element as *const Element) {
                                expanded.push(Cursor::Element(element));
                            }
                        }
                    }
                    current = expanded;
                }
                PathStepKind::Child => {
                    let test = step.name_test(namespaces)?;
                    let mut seen = HashSet::new();
                    let mut next = Vec::new();
                    for cursor in &current {
                        for child in cursor.children() {
                            if test.matches(&child.qname) && seen.insert(child as *const Element) {
                                next.push(Cursor::Element(child));
                            }
                        }
                    }
                    current = next;
                }
                PathStepKind::Attribute => {
                    if index + 1 != self.steps.len() {
                        return Err(Error::Value(format!(
                            "Attribute step must be last in '{}'",
                            self.xpath
                        )));
                    }
                    let test = step.name_test(namespaces)?;
                    for cursor in &current {
                        if let Cursor::Element(owner) = cursor {
                            for (qname, value) in &owner.attributes {
                                if test.matches(qname) {
                                    attributes.push(XPathNode::Attribute {
                                        owner: *owner,
                                        name: qname,
                                        value: value.as_str(),
                                    });
                                }
                            }
                        }
                    }
                    return Ok(attributes);
                }
            }
        }

        Ok(current
            .into_iter()
            .filter_map(|cursor| match cursor {
                Cursor::Element(element) => Some(XPathNode::Element(element)),
                Cursor::Document(_) => None,
            })
            .collect())
    }
}

#[derive(Debug, Clone, Copy)]
enum Cursor<'a> {
    /// The virtual node above the root element
    Document(&'a Element),
    Element(&'a Element),
}

impl<'a> Cursor<'a> {
    fn children(&self) -> Box<dyn Iterator<Item = &'a Element> + 'a> {
        match *self {
            Cursor::Document(root) => Box::new(std::iter::once(root)),
            Cursor::Element(element) => Box::new(element.children.iter()),
        }
    }
}

/// A single step in a path expression
#[derive(Debug, Clone, PartialEq)]
pub struct PathStep {
    /// The kind of step
    pub kind: PathStepKind,
    /// The local name
    pub name: String,
    /// Optional namespace prefix
    pub prefix: Option<String>,
}

impl PathStep {
    /// Parse a step from a string
    pub fn parse(step: &str) -> Self {
        let step = step.trim();

        if step == "." || step == "self::node()" {
            return Self {
                kind: PathStepKind::Self_,
                name: String::new(),
                prefix: None,
            };
        }

        if step == ".//" {
            return Self {
                kind: PathStepKind::DescendantOrSelf,
                name: String::new(),
                prefix: None,
            };
        }

        let (kind, rest) = if let Some(rest) = step.strip_prefix('@') {
            (PathStepKind::Attribute, rest)
        } else if let Some(rest) = step.strip_prefix("attribute::") {
            (PathStepKind::Attribute, rest)
        } else if let Some(rest) = step.strip_prefix("child::") {
            (PathStepKind::Child, rest)
        } else {
            (PathStepKind::Child, step)
        };

        let (prefix, name) = if let Some((prefix, local)) = rest.split_once(':') {
            (Some(prefix.to_string()), local.to_string())
        } else {
            (None, rest.to_string())
        };

        Self { kind, name, prefix }
    }

    /// Create a child step
    pub fn child(name: impl Into<String>) -> Self {
        Self {
            kind: PathStepKind::Child,
            name: name.into(),
            prefix: None,
        }
    }

    /// Get the qualified name (prefix:local)
    pub fn qname(&self) -> String {
        if let Some(prefix) = &self.prefix {
            format!("{}:{}", prefix, self.name)
        } else {
            self.name.clone()
        }
    }

    /// Check if this step matches any element (*)
    pub fn is_wildcard(&self) -> bool {
        self.name == "*"
    }

    fn name_test(&self, namespaces: &NamespaceContext) -> Result<NameTest> {
        let namespace = match &self.prefix {
            Some(prefix) => Some(
                namespaces
                    .get_namespace(prefix)
                    .ok_or_else(|| Error::Value(format!("Unknown prefix in path: {}", prefix)))?
                    .to_string(),
            ),
            None => None,
        };
        Ok(NameTest {
            namespace,
            local_name: if self.is_wildcard() {
                None
            } else {
                Some(self.name.clone())
            },
            any_namespace: self.prefix.is_none() && self.is_wildcard(),
        })
    }
}

struct NameTest {
    namespace: Option<String>,
    local_name: Option<String>,
    any_namespace: bool,
}

impl NameTest {
    fn matches(&self, qname: &QName) -> bool {
        let local_ok = self
            .local_name
            .as_deref()
            .map_or(true, |name| name == qname.local_name);
        let namespace_ok = self.any_namespace || self.namespace == qname.namespace;
        local_ok && namespace_ok
    }
}

/// Kind of path step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStepKind {
    /// Child axis (default)
    Child,
    /// Attribute axis (@)
    Attribute,
    /// Descendant-or-self axis (//)
    DescendantOrSelf,
    /// Self axis (.)
    Self_,
}

/// Split a path expression into path steps
///
/// Handles both `/` and `//` separators. A `//` separator becomes its own
/// `.//` step.
pub fn split_path(path: &str) -> Vec<&str> {
    let path = path.trim();

    if path.is_empty() {
        return Vec::new();
    }

    let mut steps = Vec::new();
    let mut current_start = 0;

    if path.starts_with(".//") {
        steps.push(".");
        steps.push(".//");
        current_start = 3;
    } else if path.starts_with("./") {
        steps.push(".");
        current_start = 2;
    } else if path == "." {
        return vec!["."];
    } else if path.starts_with("//") {
        steps.push(".//");
        current_start = 2;
    } else if path.starts_with('/') {
        current_start = 1;
    }

    let bytes = path.as_bytes();
    let len = bytes.len();
    let mut i = current_start;

    while i < len {
        if bytes[i] == b'/' {
            let is_double = i + 1 < len && bytes[i + 1] == b'/';

            if i > current_start {
                steps.push(&path[current_start..i]);
            }

            if is_double {
                steps.push(".//");
                current_start = i + 2;
                i += 2;
            } else {
                current_start = i + 1;
                i += 1;
            }
        } else {
            i += 1;
        }
    }

    if current_start < len {
        steps.push(&path[current_start..]);
    }

    steps
}

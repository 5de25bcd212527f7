// crates/xmlbind/src/tree/mod.rs

//! A small owned element tree, the shape the binding engine walks.
//!
//! Names are stored resolved: `ns` holds the namespace URI, never a prefix.
//! Prefixes only exist in the `nsmap` declarations a node carries and are
//! chosen again by the writer.

mod parser;
mod writer;

pub use parser::{parse, parse_str};
pub use writer::write;

use std::fmt;

/// The namespace bound to the reserved `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// An insertion-ordered prefix→URI table. The empty prefix is the default
/// namespace; an empty URI undeclares it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NsMap(Vec<(String, String)>);

impl NsMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `prefix` to `uri`, replacing an earlier binding in place.
    pub fn insert(&mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Option<String> {
        let prefix = prefix.into();
        let uri = uri.into();
        match self.0.iter_mut().find(|(p, _)| *p == prefix) {
            Some((_, old)) => Some(std::mem::replace(old, uri)),
            None => {
                self.0.push((prefix, uri));
                None
            }
        }
    }

    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<P: Into<String>, U: Into<String>> FromIterator<(P, U)> for NsMap {
    fn from_iter<I: IntoIterator<Item = (P, U)>>(iter: I) -> Self {
        let mut map = NsMap::new();
        for (prefix, uri) in iter {
            map.insert(prefix, uri);
        }
        map
    }
}

/// A prefix used without a declaration in scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UnknownPrefix(pub String);

impl From<UnknownPrefix> for crate::error::ParsingError {
    fn from(e: UnknownPrefix) -> Self {
        crate::error::ParsingError::UnknownPrefix { prefix: e.0 }
    }
}

impl From<UnknownPrefix> for crate::error::EncodeError {
    fn from(e: UnknownPrefix) -> Self {
        crate::error::EncodeError::UnknownPrefix { prefix: e.0 }
    }
}

/// A chain of namespace maps, innermost first.
#[derive(Debug, Clone, Copy)]
pub(crate) struct NsScope<'a> {
    map: &'a NsMap,
    parent: Option<&'a NsScope<'a>>,
}

impl<'a> NsScope<'a> {
    pub fn root(map: &'a NsMap) -> Self {
        Self { map, parent: None }
    }

    pub fn push(&'a self, map: &'a NsMap) -> NsScope<'a> {
        NsScope {
            map,
            parent: Some(self),
        }
    }

    /// Looks `prefix` up from the innermost map outwards.
    pub fn lookup(&self, prefix: &str) -> Option<&'a str> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE);
        }
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(uri) = current.map.get(prefix) {
                return Some(uri);
            }
            scope = current.parent;
        }
        None
    }

    /// Resolves an optional prefix into a namespace URI.
    ///
    /// No prefix means no namespace. An undeclared empty prefix also means no
    /// namespace; any other undeclared prefix is an error.
    pub fn resolve(&self, prefix: Option<&str>) -> Result<Option<String>, UnknownPrefix> {
        let Some(prefix) = prefix else {
            return Ok(None);
        };
        match self.lookup(prefix) {
            Some("") => Ok(None),
            Some(uri) => Ok(Some(uri.to_string())),
            None if prefix.is_empty() => Ok(None),
            None => Err(UnknownPrefix(prefix.to_string())),
        }
    }
}

/// Clark notation: `{uri}tag`, or the bare tag outside any namespace.
pub fn clark(tag: &str, ns: Option<&str>) -> String {
    match ns {
        Some(uri) => format!("{{{}}}{}", uri, tag),
        None => tag.to_string(),
    }
}

/// Splits a `{uri}tag` key back into its local name and namespace. Keys
/// without a well-formed `{uri}` part are bare names.
pub fn split_clark(key: &str) -> (&str, Option<&str>) {
    key.strip_prefix('{')
        .and_then(|rest| rest.split_once('}'))
        .map_or((key, None), |(uri, tag)| (tag, Some(uri)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub ns: Option<String>,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, ns: Option<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ns,
            value: value.into(),
        }
    }
}

/// One element: resolved name, local namespace declarations, attributes in
/// document order, child elements and the text before the first child.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Node {
    pub tag: String,
    pub ns: Option<String>,
    pub nsmap: NsMap,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
    pub text: Option<String>,
}

impl Node {
    pub fn new(tag: impl Into<String>, ns: Option<String>) -> Self {
        Self {
            tag: tag.into(),
            ns,
            ..Default::default()
        }
    }

    pub fn is_named(&self, tag: &str, ns: Option<&str>) -> bool {
        self.tag == tag && self.ns.as_deref() == ns
    }

    pub fn attribute(&self, name: &str, ns: Option<&str>) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name && a.ns.as_deref() == ns)
            .map(|a| a.value.as_str())
    }

    /// No attributes, no children and no text.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
            && self.children.is_empty()
            && self.text.as_deref().is_none_or(str::is_empty)
    }

    pub fn qualified_name(&self) -> String {
        clark(&self.tag, self.ns.as_deref())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.qualified_name())
    }
}

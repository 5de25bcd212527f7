// crates/xmlbind/src/tree/parser.rs

use super::{clark, Attribute, Node, NsMap, XML_NAMESPACE};
use crate::error::ParsingError;
use log::trace;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, BytesStart, Event};
use quick_xml::reader::Reader;

/// Parses a UTF-8 document into a [`Node`] tree.
pub fn parse(source: &[u8]) -> Result<Node, ParsingError> {
    let text = std::str::from_utf8(source)
        .map_err(|e| ParsingError::malformed(format!("document is not valid UTF-8: {}", e)))?;
    parse_str(text)
}

/// Parses a document held in a string.
///
/// Comments, processing instructions and the doctype are skipped. CDATA and
/// character references are folded into the surrounding text.
pub fn parse_str(source: &str) -> Result<Node, ParsingError> {
    let mut reader = Reader::from_str(source);
    let mut scopes: Vec<NsMap> = Vec::new();
    let mut open: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                let node = open_element(&reader, &start, &mut scopes)?;
                open.push(node);
            }
            Event::Empty(start) => {
                let node = open_element(&reader, &start, &mut scopes)?;
                scopes.pop();
                attach(node, &mut open, &mut root)?;
            }
            Event::End(_) => {
                let mut node = open
                    .pop()
                    .ok_or_else(|| ParsingError::malformed("closing tag without an open element"))?;
                scopes.pop();
                if node.text.as_deref().is_some_and(|t| t.trim().is_empty()) {
                    node.text = None;
                }
                attach(node, &mut open, &mut root)?;
            }
            Event::Text(text) => {
                let decoded = reader
                    .decoder()
                    .decode(&*text)
                    .map_err(ParsingError::malformed)?;
                push_text(&mut open, &decoded)?;
            }
            Event::CData(data) => {
                let decoded = reader
                    .decoder()
                    .decode(&*data)
                    .map_err(ParsingError::malformed)?;
                push_text(&mut open, &decoded)?;
            }
            Event::GeneralRef(reference) => {
                let resolved = resolve_reference(&reader, &reference)?;
                push_text(&mut open, &resolved)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(unclosed) = open.last() {
        return Err(ParsingError::malformed(format!(
            "element {} is never closed",
            unclosed
        )));
    }
    root.ok_or_else(|| ParsingError::malformed("document has no root element"))
}

/// Builds a node from a start tag, pushing its namespace declarations as a
/// new scope. The caller pops the scope when the element closes.
fn open_element(
    reader: &Reader<&[u8]>,
    start: &BytesStart<'_>,
    scopes: &mut Vec<NsMap>,
) -> Result<Node, ParsingError> {
    let decoder = reader.decoder();
    let mut declared = NsMap::new();
    let mut raw_attributes = Vec::new();

    for attr in start.attributes() {
        let attr = attr.map_err(ParsingError::malformed)?;
        let key = decoder
            .decode(attr.key.as_ref())
            .map_err(ParsingError::malformed)?
            .into_owned();
        let value = attr
            .unescape_value()
            .map_err(ParsingError::malformed)?
            .into_owned();
        if key == "xmlns" {
            declared.insert("", value);
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            declared.insert(prefix, value);
        } else {
            raw_attributes.push((key, value));
        }
    }
    scopes.push(declared.clone());

    let name = decoder
        .decode(start.name().as_ref())
        .map_err(ParsingError::malformed)?
        .into_owned();
    let (prefix, tag) = split_name(&name);
    let ns = resolve(scopes, Some(prefix.unwrap_or("")))?;

    let mut attributes = Vec::with_capacity(raw_attributes.len());
    for (key, value) in raw_attributes {
        let (prefix, name) = split_name(&key);
        // Unprefixed attributes are never in a namespace.
        let ns = resolve(scopes, prefix)?;
        attributes.push(Attribute::new(name, ns, value));
    }

    trace!("Opened element {}", clark(tag, ns.as_deref()));
    Ok(Node {
        tag: tag.to_string(),
        ns,
        nsmap: declared,
        attributes,
        children: Vec::new(),
        text: None,
    })
}

/// Resolves a prefix against the open elements' declarations, innermost
/// first.
fn resolve(scopes: &[NsMap], prefix: Option<&str>) -> Result<Option<String>, ParsingError> {
    let Some(prefix) = prefix else {
        return Ok(None);
    };
    if prefix == "xml" {
        return Ok(Some(XML_NAMESPACE.to_string()));
    }
    match scopes.iter().rev().find_map(|map| map.get(prefix)) {
        Some("") => Ok(None),
        Some(uri) => Ok(Some(uri.to_string())),
        None if prefix.is_empty() => Ok(None),
        None => Err(ParsingError::UnknownPrefix {
            prefix: prefix.to_string(),
        }),
    }
}

fn split_name(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}

fn resolve_reference(
    reader: &Reader<&[u8]>,
    reference: &BytesRef<'_>,
) -> Result<String, ParsingError> {
    if let Some(ch) = reference
        .resolve_char_ref()
        .map_err(ParsingError::malformed)?
    {
        return Ok(ch.to_string());
    }
    let name = reader
        .decoder()
        .decode(&*reference)
        .map_err(ParsingError::malformed)?;
    resolve_predefined_entity(&name)
        .map(str::to_string)
        .ok_or_else(|| ParsingError::malformed(format!("undeclared entity &{};", name)))
}

/// Appends character data to the innermost open element. Text after the
/// first child element is not part of the model and is dropped.
fn push_text(open: &mut [Node], text: &str) -> Result<(), ParsingError> {
    match open.last_mut() {
        Some(node) => {
            if node.children.is_empty() {
                node.text.get_or_insert_with(String::new).push_str(text);
            }
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(ParsingError::malformed("text outside of the root element")),
    }
}

fn attach(node: Node, open: &mut [Node], root: &mut Option<Node>) -> Result<(), ParsingError> {
    match open.last_mut() {
        Some(parent) => {
            parent.children.push(node);
            Ok(())
        }
        None if root.is_some() => Err(ParsingError::malformed(format!(
            "second root element {}",
            node
        ))),
        None => {
            *root = Some(node);
            Ok(())
        }
    }
}

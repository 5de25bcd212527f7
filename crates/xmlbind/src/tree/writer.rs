// crates/xmlbind/src/tree/writer.rs

use super::{Node, NsMap};
use crate::codec::WriteOptions;
use crate::error::EncodeError;
use log::debug;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::writer::Writer;
use std::io::Write;

/// Serializes a tree into a UTF-8 document.
///
/// Namespace prefixes are picked from the `nsmap` declarations in scope.
/// Namespaces nobody declared get a generated `ns0`, `ns1`, ... prefix on the
/// element that first needs them.
pub fn write(node: &Node, options: &WriteOptions) -> Result<Vec<u8>, EncodeError> {
    if let Some(encoding) = options.encoding.as_deref() {
        if !is_utf8(encoding) {
            return Err(EncodeError::UnsupportedEncoding {
                encoding: encoding.to_string(),
            });
        }
    }

    let writer = if options.pretty {
        Writer::new_with_indent(Vec::new(), b' ', 2)
    } else {
        Writer::new(Vec::new())
    };
    let mut out = TreeWriter {
        writer,
        scopes: Vec::new(),
        generated: 0,
    };

    if options.declaration {
        out.writer.write_event(Event::Decl(BytesDecl::new(
            "1.0",
            options.encoding.as_deref(),
            None,
        )))?;
        if !options.pretty {
            out.writer.get_mut().write_all(b"\n")?;
        }
    }
    out.write_node(node)?;

    let bytes = out.writer.into_inner();
    debug!("Wrote document {} ({} bytes)", node, bytes.len());
    Ok(bytes)
}

fn is_utf8(encoding: &str) -> bool {
    encoding.eq_ignore_ascii_case("utf-8") || encoding.eq_ignore_ascii_case("utf8")
}

struct TreeWriter {
    writer: Writer<Vec<u8>>,
    /// Declarations of every open element, outermost first.
    scopes: Vec<NsMap>,
    generated: usize,
}

impl TreeWriter {
    fn write_node(&mut self, node: &Node) -> Result<(), EncodeError> {
        let mut declared = node.nsmap.clone();
        let name = self.element_name(node, &mut declared);

        let mut attributes = Vec::with_capacity(node.attributes.len());
        for attr in &node.attributes {
            let qname = match attr.ns.as_deref() {
                None => attr.name.clone(),
                Some(uri) => {
                    let prefix = self.prefix_for(uri, false, &mut declared);
                    format!("{}:{}", prefix, attr.name)
                }
            };
            attributes.push((qname, attr.value.as_str()));
        }

        let mut start = BytesStart::new(name.as_str());
        for (prefix, uri) in declared.iter() {
            if prefix.is_empty() {
                start.push_attribute(("xmlns", uri));
            } else {
                start.push_attribute((format!("xmlns:{}", prefix).as_str(), uri));
            }
        }
        for (qname, value) in &attributes {
            start.push_attribute((qname.as_str(), *value));
        }

        let text = node.text.as_deref().filter(|t| !t.is_empty());
        if node.children.is_empty() && text.is_none() {
            self.writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        self.scopes.push(declared);
        self.writer.write_event(Event::Start(start))?;
        if let Some(text) = text {
            self.writer.write_event(Event::Text(BytesText::new(text)))?;
        }
        for child in &node.children {
            self.write_node(child)?;
        }
        self.writer
            .write_event(Event::End(BytesEnd::new(name.as_str())))?;
        self.scopes.pop();
        Ok(())
    }

    fn element_name(&mut self, node: &Node, declared: &mut NsMap) -> String {
        match node.ns.as_deref() {
            None => {
                if self
                    .lookup("", declared)
                    .is_some_and(|uri| !uri.is_empty())
                {
                    declared.insert("", "");
                }
                node.tag.clone()
            }
            Some(uri) => {
                let prefix = self.prefix_for(uri, true, declared);
                if prefix.is_empty() {
                    node.tag.clone()
                } else {
                    format!("{}:{}", prefix, node.tag)
                }
            }
        }
    }

    /// Innermost binding of `prefix`, the element's own declarations first.
    fn lookup<'s>(&'s self, prefix: &str, declared: &'s NsMap) -> Option<&'s str> {
        declared
            .get(prefix)
            .or_else(|| self.scopes.iter().rev().find_map(|map| map.get(prefix)))
    }

    /// Finds a prefix bound to `uri` that is not shadowed, declaring a fresh
    /// one on the current element when none is in scope. Attributes cannot
    /// use the default namespace.
    fn prefix_for(&mut self, uri: &str, allow_default: bool, declared: &mut NsMap) -> String {
        let candidates = declared
            .iter()
            .chain(self.scopes.iter().rev().flat_map(|map| map.iter()));
        for (prefix, bound) in candidates {
            if bound != uri || (prefix.is_empty() && !allow_default) {
                continue;
            }
            if self.lookup(prefix, declared) == Some(uri) {
                return prefix.to_string();
            }
        }

        loop {
            let prefix = format!("ns{}", self.generated);
            self.generated += 1;
            if self.lookup(&prefix, declared).is_none() {
                declared.insert(prefix.clone(), uri);
                return prefix;
            }
        }
    }
}

// crates/xmlbind/src/decoder.rs

//! Walks an element tree against a model binding and assembles the raw
//! record handed to the validation layer.

use crate::binding::{Collection, FieldBinding, FieldKind, ModelBinding, SearchMode};
use crate::error::{Error, ParsingError};
use crate::tree::{clark, Attribute, Node, NsScope};
use crate::validate::Context;
use crate::value::{Record, Value};
use log::{debug, trace};
use std::collections::BTreeMap;

/// Decodes a document root, checking its identity first.
pub(crate) fn decode_document(
    binding: &ModelBinding,
    root: &Node,
    context: Context<'_>,
) -> Result<Value, Error> {
    let scope = NsScope::root(binding.nsmap());
    let ns = scope.resolve(binding.ns()).map_err(ParsingError::from)?;
    if !root.is_named(binding.tag(), ns.as_deref()) {
        return Err(ParsingError::RootNotFound {
            actual: root.qualified_name(),
            expected: clark(binding.tag(), ns.as_deref()),
        }
        .into());
    }
    debug!("Decoding document with root {}", root);
    Decoder { context }.decode_model(binding, root, &scope, "")
}

/// Claims attributes and children of one element as fields match them.
struct Cursor<'n> {
    node: &'n Node,
    mode: SearchMode,
    attributes: Vec<bool>,
    children: Vec<bool>,
    /// Where ordered and strict searches resume.
    position: usize,
    /// Cursors of wrapper children, kept so later fields can share them.
    wrappers: BTreeMap<usize, Cursor<'n>>,
}

impl<'n> Cursor<'n> {
    fn new(node: &'n Node, mode: SearchMode) -> Self {
        Self {
            node,
            mode,
            attributes: vec![false; node.attributes.len()],
            children: vec![false; node.children.len()],
            position: 0,
            wrappers: BTreeMap::new(),
        }
    }

    fn take_attribute(&mut self, name: &str, ns: Option<&str>) -> Option<&'n str> {
        let node = self.node;
        let idx = node
            .attributes
            .iter()
            .enumerate()
            .position(|(i, a)| !self.attributes[i] && a.name == name && a.ns.as_deref() == ns)?;
        self.attributes[idx] = true;
        Some(node.attributes[idx].value.as_str())
    }

    /// Claims every attribute not yet taken and not named in `reserved`.
    fn take_remaining_attributes(&mut self, reserved: &[&str]) -> Record {
        let mut record = Record::new();
        for (i, attr) in self.node.attributes.iter().enumerate() {
            if self.attributes[i] || (attr.ns.is_none() && reserved.contains(&attr.name.as_str())) {
                continue;
            }
            self.attributes[i] = true;
            record.insert(attribute_key(attr), Value::Text(attr.value.clone()));
        }
        record
    }

    /// The first unconsumed child at or after the cursor.
    fn next_free(&self) -> Option<usize> {
        (self.position..self.children.len()).find(|&i| !self.children[i])
    }

    fn find(&self, tag: &str, ns: Option<&str>) -> Option<usize> {
        let matches = |i: usize| !self.children[i] && self.node.children[i].is_named(tag, ns);
        match self.mode {
            SearchMode::Strict => self.next_free().filter(|&i| matches(i)),
            SearchMode::Ordered => (self.position..self.children.len()).find(|&i| matches(i)),
            SearchMode::Unordered => (0..self.children.len()).find(|&i| matches(i)),
        }
    }

    fn consume(&mut self, idx: usize) -> &'n Node {
        self.children[idx] = true;
        if self.mode != SearchMode::Unordered {
            self.position = idx + 1;
        }
        &self.node.children[idx]
    }

    /// Finds a wrapper child. A wrapper entered by an earlier field is
    /// re-found in every search mode, latest first, so that fields sharing
    /// it need not be adjacent.
    fn locate_wrapper(&mut self, tag: &str, ns: Option<&str>) -> Option<usize> {
        let node = self.node;
        let entered = self
            .wrappers
            .keys()
            .rev()
            .copied()
            .find(|&i| node.children[i].is_named(tag, ns));
        if entered.is_some() {
            return entered;
        }
        let idx = self.find(tag, ns)?;
        self.consume(idx);
        Some(idx)
    }

    fn enter(&mut self, idx: usize) -> &mut Cursor<'n> {
        let node = self.node;
        let mode = self.mode;
        self.wrappers
            .entry(idx)
            .or_insert_with(|| Cursor::new(&node.children[idx], mode))
    }

    /// Under strict search, a required field that did not match is an error
    /// if something else sits where it was expected.
    fn check_mismatch(&self, path: &str, tag: &str, ns: Option<&str>) -> Result<(), ParsingError> {
        if self.mode != SearchMode::Strict {
            return Ok(());
        }
        match self.next_free() {
            Some(idx) => Err(ParsingError::UnexpectedElement {
                path: path.to_string(),
                actual: self.node.children[idx].qualified_name(),
                expected: Some(clark(tag, ns)),
            }),
            None => Ok(()),
        }
    }

    /// Fails on the first attribute or child no field claimed.
    fn check_exhausted(&self, path: &str) -> Result<(), ParsingError> {
        if let Some(i) = self.attributes.iter().position(|used| !used) {
            return Err(ParsingError::UnexpectedElement {
                path: path.to_string(),
                actual: format!("@{}", attribute_key(&self.node.attributes[i])),
                expected: None,
            });
        }
        if let Some(i) = self.children.iter().position(|used| !used) {
            return Err(ParsingError::UnexpectedElement {
                path: path.to_string(),
                actual: self.node.children[i].qualified_name(),
                expected: None,
            });
        }
        self.wrappers
            .values()
            .try_for_each(|wrapper| wrapper.check_exhausted(path))
    }
}

fn attribute_key(attr: &Attribute) -> String {
    clark(&attr.name, attr.ns.as_deref())
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

/// Splits whitespace-separated list values for sequence and tuple adapters.
fn list_value(field: &FieldBinding, raw: &str, path: &str) -> Result<Value, ParsingError> {
    match field.collection() {
        Some(Collection::Sequence) => Ok(Value::Seq(
            raw.split_whitespace().map(Value::from).collect(),
        )),
        Some(Collection::Tuple(len)) => {
            let items: Vec<Value> = raw.split_whitespace().map(Value::from).collect();
            if items.len() < len {
                return Err(ParsingError::MissingField {
                    path: format!("{}[{}]", path, items.len()),
                });
            }
            Ok(Value::Seq(items))
        }
        _ => Ok(Value::Text(raw.to_string())),
    }
}

struct Decoder<'c> {
    context: Context<'c>,
}

impl Decoder<'_> {
    fn decode_model(
        &self,
        binding: &ModelBinding,
        node: &Node,
        scope: &NsScope<'_>,
        path: &str,
    ) -> Result<Value, Error> {
        let mut cursor = Cursor::new(node, binding.search_mode());
        let mut record = Record::new();

        for field in binding.fields() {
            if field.kind() == FieldKind::Computed {
                continue;
            }
            let field_path = join(path, field.name());
            let value = match self.decode_field(binding, field, field, &mut cursor, scope, &field_path)? {
                Some(value) => value,
                None => match field.resolve_default()? {
                    Some(default) => {
                        trace!("Field `{}` absent, using default", field_path);
                        default
                    }
                    None if field.is_repeated() => Value::Seq(Vec::new()),
                    None => return Err(ParsingError::MissingField { path: field_path }.into()),
                },
            };
            record.insert(field.name().to_string(), value);
        }

        if binding.search_mode() == SearchMode::Strict {
            cursor.check_exhausted(if path.is_empty() { binding.tag() } else { path })?;
        }
        binding.validate(&mut record, self.context)?;
        Ok(Value::Map(record))
    }

    /// Decodes one field, returning `None` when it is absent. `outer` is the
    /// declared field; `field` is the binding being matched, which differs
    /// for the inner binding of a wrapped field.
    fn decode_field(
        &self,
        binding: &ModelBinding,
        outer: &FieldBinding,
        field: &FieldBinding,
        cursor: &mut Cursor<'_>,
        scope: &NsScope<'_>,
        path: &str,
    ) -> Result<Option<Value>, Error> {
        let required = !outer.has_default() && !outer.is_repeated();
        match field.kind() {
            FieldKind::Attribute => self.decode_attribute(binding, field, cursor, scope, path),
            FieldKind::Text => match cursor.node.text.as_deref() {
                Some(text) => Ok(Some(list_value(field, text, path)?)),
                None => Ok(None),
            },
            FieldKind::Element => self.decode_element(binding, field, cursor, scope, path, required),
            FieldKind::Wrapped => {
                let Some(inner) = field.inner() else {
                    return Ok(None);
                };
                let ns = scope
                    .resolve(field.wrapper_ns(binding))
                    .map_err(ParsingError::from)?;
                let mut current = cursor;
                for segment in field.wrapper_path() {
                    let Some(idx) = current.locate_wrapper(segment, ns.as_deref()) else {
                        if required {
                            current.check_mismatch(path, segment, ns.as_deref())?;
                        }
                        trace!("Wrapper <{}> of `{}` not found", segment, path);
                        return Ok(None);
                    };
                    current = current.enter(idx);
                }
                self.decode_field(binding, outer, inner, current, scope, path)
            }
            FieldKind::Computed => Ok(None),
        }
    }

    fn decode_attribute(
        &self,
        binding: &ModelBinding,
        field: &FieldBinding,
        cursor: &mut Cursor<'_>,
        scope: &NsScope<'_>,
        path: &str,
    ) -> Result<Option<Value>, Error> {
        if field.collection() == Some(Collection::Mapping) {
            // Attributes bound by name elsewhere in the model stay theirs.
            let reserved: Vec<&str> = binding
                .fields()
                .iter()
                .filter(|f| f.wire_kind() == FieldKind::Attribute && f.collection() != Some(Collection::Mapping))
                .map(FieldBinding::tag)
                .collect();
            let map = cursor.take_remaining_attributes(&reserved);
            return Ok((!map.is_empty()).then_some(Value::Map(map)));
        }

        let ns = scope
            .resolve(field.attribute_ns(binding))
            .map_err(ParsingError::from)?;
        match cursor.take_attribute(field.tag(), ns.as_deref()) {
            Some(raw) => {
                trace!("Field `{}` matched attribute {}", path, field.tag());
                Ok(Some(list_value(field, raw, path)?))
            }
            None => Ok(None),
        }
    }

    fn decode_element(
        &self,
        binding: &ModelBinding,
        field: &FieldBinding,
        cursor: &mut Cursor<'_>,
        scope: &NsScope<'_>,
        path: &str,
        required: bool,
    ) -> Result<Option<Value>, Error> {
        let nested;
        let scope = match field.model() {
            Some(model) => {
                nested = scope.push(model.nsmap());
                &nested
            }
            None => scope,
        };
        let tag = field.tag();
        let ns = scope
            .resolve(field.element_ns(binding))
            .map_err(ParsingError::from)?;

        let (limit, indexed) = match field.collection() {
            Some(Collection::Sequence) => (usize::MAX, true),
            Some(Collection::Tuple(len)) => (len, true),
            _ => (1, false),
        };
        let mut items = Vec::new();
        while items.len() < limit {
            let Some(idx) = cursor.find(tag, ns.as_deref()) else {
                break;
            };
            let child = cursor.consume(idx);
            trace!("Field `{}` matched {}", path, child);
            let item_path = if indexed {
                format!("{}[{}]", path, items.len())
            } else {
                path.to_string()
            };
            items.push(self.element_value(field, child, scope, &item_path)?);
        }

        if items.is_empty() {
            if required {
                cursor.check_mismatch(path, tag, ns.as_deref())?;
                if let Some(Collection::Tuple(_)) = field.collection() {
                    return Err(ParsingError::MissingField {
                        path: format!("{}[0]", path),
                    }
                    .into());
                }
            }
            return Ok(None);
        }

        match field.collection() {
            Some(Collection::Tuple(len)) if items.len() < len => Err(ParsingError::MissingField {
                path: format!("{}[{}]", path, items.len()),
            }
            .into()),
            Some(Collection::Sequence | Collection::Tuple(_)) => Ok(Some(Value::Seq(items))),
            _ => Ok(items.pop()),
        }
    }

    fn element_value(
        &self,
        field: &FieldBinding,
        child: &Node,
        scope: &NsScope<'_>,
        path: &str,
    ) -> Result<Value, Error> {
        if let Some(model) = field.model() {
            return self.decode_model(model, child, scope, path);
        }
        if field.collection() == Some(Collection::Mapping) {
            let map = child
                .attributes
                .iter()
                .map(|attr| (attribute_key(attr), Value::Text(attr.value.clone())))
                .collect();
            return Ok(Value::Map(map));
        }
        Ok(child.text.clone().map_or(Value::None, Value::Text))
    }
}

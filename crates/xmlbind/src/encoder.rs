// crates/xmlbind/src/encoder.rs

//! Builds an element tree from a model's raw value.

use crate::binding::{Collection, FieldBinding, FieldKind, ModelBinding};
use crate::error::EncodeError;
use crate::tree::{split_clark, Attribute, Node, NsMap, NsScope};
use crate::value::{Record, Value};
use log::{debug, trace};
use std::collections::BTreeSet;

/// Encodes `value` as the root element of `binding`.
///
/// `elide_empty` is the caller's request; models that set their own policy
/// override it for their fields.
pub(crate) fn encode_document(
    binding: &ModelBinding,
    value: &Value,
    elide_empty: bool,
) -> Result<Node, EncodeError> {
    let record = value.as_map().ok_or_else(|| EncodeError::UnexpectedShape {
        path: binding.tag().to_string(),
        expected: "map",
        actual: value.kind(),
    })?;
    let scope = NsScope::root(binding.nsmap());
    let ns = scope.resolve(binding.ns())?;

    let mut root = Node::new(binding.tag(), ns);
    let mut encoder = Encoder {
        elide_empty,
        hoisted: binding.nsmap().clone(),
    };
    encoder.encode_model(binding, record, &mut root, &scope, "")?;
    root.nsmap = encoder.hoisted;

    debug!("Encoded {} with {} children", root, root.children.len());
    Ok(root)
}

/// Remaining wrapper tags of a wrapped field and their namespace.
#[derive(Clone, Copy)]
struct WrapperTarget<'a> {
    segments: &'a [String],
    ns: Option<&'a str>,
}

/// The model being encoded, its namespace scope and its effective elision.
struct Frame<'a> {
    binding: &'a ModelBinding,
    scope: &'a NsScope<'a>,
    elide: bool,
}

/// Child-index trails, relative to one model element, of the wrappers its
/// wrapped fields created. Only these are shared between fields.
type Wrappers = BTreeSet<Vec<usize>>;

fn trail_to(trail: &[usize], idx: usize) -> Vec<usize> {
    let mut next = trail.to_vec();
    next.push(idx);
    next
}

struct Encoder {
    elide_empty: bool,
    /// Declarations collected for the root element.
    hoisted: NsMap,
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

/// Attributes first, then text, then child elements.
fn emit_order(field: &FieldBinding) -> u8 {
    match field.wire_kind() {
        FieldKind::Attribute => 0,
        FieldKind::Text => 1,
        _ => 2,
    }
}

fn text_of(value: &Value, path: &str) -> Result<String, EncodeError> {
    match value {
        Value::None => Ok(String::new()),
        Value::Text(s) => Ok(s.clone()),
        other => Err(EncodeError::UnexpectedShape {
            path: path.to_string(),
            expected: "text",
            actual: other.kind(),
        }),
    }
}

/// Text of an attribute or text field; list adapters join with spaces.
fn list_text(field: &FieldBinding, value: &Value, path: &str) -> Result<String, EncodeError> {
    match (field.collection(), value) {
        (Some(Collection::Sequence | Collection::Tuple(_)), Value::Seq(items)) => {
            let tokens = items
                .iter()
                .enumerate()
                .map(|(i, item)| text_of(item, &format!("{}[{}]", path, i)))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(tokens.join(" "))
        }
        (Some(Collection::Sequence | Collection::Tuple(_)), Value::Text(_)) => Err(
            EncodeError::UnexpectedShape {
                path: path.to_string(),
                expected: "sequence",
                actual: value.kind(),
            },
        ),
        _ => text_of(value, path),
    }
}

/// Attributes projected from a mapping. `{uri}name` keys, as decoding
/// produces for namespaced attributes, get their namespace back.
fn mapped_attributes(map: &Record, elide: bool, path: &str) -> Result<Vec<Attribute>, EncodeError> {
    let mut attributes = Vec::with_capacity(map.len());
    for (key, item) in map {
        let text = text_of(item, &join(path, key))?;
        if elide && text.is_empty() {
            continue;
        }
        let (name, ns) = split_clark(key);
        attributes.push(Attribute::new(name, ns.map(str::to_string), text));
    }
    Ok(attributes)
}

fn shape(path: &str, expected: &'static str, value: &Value) -> EncodeError {
    EncodeError::UnexpectedShape {
        path: path.to_string(),
        expected,
        actual: value.kind(),
    }
}

impl Encoder {
    fn encode_model(
        &mut self,
        binding: &ModelBinding,
        record: &Record,
        node: &mut Node,
        scope: &NsScope<'_>,
        path: &str,
    ) -> Result<(), EncodeError> {
        let frame = Frame {
            binding,
            scope,
            elide: binding.elide_empty().unwrap_or(self.elide_empty),
        };
        let mut wrappers = Wrappers::new();

        for order in 0..=2 {
            for field in binding.fields() {
                if field.is_excluded() || emit_order(field) != order {
                    continue;
                }
                let field_path = join(path, field.name());
                let Some(value) = Self::field_value(field, record, &field_path, frame.elide)? else {
                    trace!("Field `{}` has no value, skipped", field_path);
                    continue;
                };
                self.encode_field(&frame, &mut wrappers, field, &value, node, &field_path)?;
            }
        }
        Ok(())
    }

    /// The field's value from the record, else its default.
    fn field_value(
        field: &FieldBinding,
        record: &Record,
        path: &str,
        elide: bool,
    ) -> Result<Option<Value>, EncodeError> {
        if let Some(value) = record.get(field.name()) {
            return Ok(Some(value.clone()));
        }
        match field.resolve_default() {
            Ok(Some(value)) => Ok(Some(value)),
            Ok(None) if elide => Ok(None),
            Ok(None) => Err(EncodeError::MissingValue {
                path: path.to_string(),
            }),
            Err(e) => Err(EncodeError::DefaultFailed {
                path: path.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn encode_field(
        &mut self,
        frame: &Frame<'_>,
        wrappers: &mut Wrappers,
        field: &FieldBinding,
        value: &Value,
        node: &mut Node,
        path: &str,
    ) -> Result<(), EncodeError> {
        match field.kind() {
            FieldKind::Attribute => self.encode_attribute(frame, field, value, node, path),
            FieldKind::Text => {
                if frame.elide && value.is_empty() {
                    return Ok(());
                }
                let text = list_text(field, value, path)?;
                if !text.is_empty() {
                    node.text = Some(text);
                }
                Ok(())
            }
            FieldKind::Element => self.encode_element(frame, field, value, node, path),
            FieldKind::Wrapped => {
                let Some(inner) = field.inner() else {
                    return Ok(());
                };
                let ns = frame.scope.resolve(field.wrapper_ns(frame.binding))?;
                let target = WrapperTarget {
                    segments: field.wrapper_path(),
                    ns: ns.as_deref(),
                };
                self.encode_wrapped(frame, wrappers, &mut Vec::new(), inner, value, node, target, path)
            }
            FieldKind::Computed => match field.inner() {
                Some(inner) => self.encode_field(frame, wrappers, inner, value, node, path),
                None => Ok(()),
            },
        }
    }

    fn encode_attribute(
        &mut self,
        frame: &Frame<'_>,
        field: &FieldBinding,
        value: &Value,
        node: &mut Node,
        path: &str,
    ) -> Result<(), EncodeError> {
        if field.collection() == Some(Collection::Mapping) {
            let map = match value {
                Value::Map(map) => map,
                Value::None => return Ok(()),
                other => return Err(shape(path, "map", other)),
            };
            node.attributes
                .extend(mapped_attributes(map, frame.elide, path)?);
            return Ok(());
        }

        if frame.elide && value.is_empty() {
            return Ok(());
        }
        let ns = frame.scope.resolve(field.attribute_ns(frame.binding))?;
        let text = list_text(field, value, path)?;
        node.attributes.push(Attribute::new(field.tag(), ns, text));
        Ok(())
    }

    fn encode_element(
        &mut self,
        frame: &Frame<'_>,
        field: &FieldBinding,
        value: &Value,
        node: &mut Node,
        path: &str,
    ) -> Result<(), EncodeError> {
        let nested;
        let scope = match field.model() {
            Some(model) => {
                nested = frame.scope.push(model.nsmap());
                &nested
            }
            None => frame.scope,
        };
        let ns = scope.resolve(field.element_ns(frame.binding))?;

        match field.collection() {
            Some(Collection::Sequence | Collection::Tuple(_)) => {
                let items: &[Value] = match value {
                    Value::Seq(items) => items,
                    Value::None => &[],
                    other => return Err(shape(path, "sequence", other)),
                };
                for (i, item) in items.iter().enumerate() {
                    let item_path = format!("{}[{}]", path, i);
                    if let Some(child) =
                        self.build_element(frame.elide, field, item, ns.clone(), scope, &item_path)?
                    {
                        node.children.push(child);
                    }
                }
            }
            _ => {
                if let Some(child) = self.build_element(frame.elide, field, value, ns, scope, path)? {
                    node.children.push(child);
                }
            }
        }
        Ok(())
    }

    /// Builds one element for `value`, or `None` when it is elided by the
    /// enclosing model's policy.
    fn build_element(
        &mut self,
        elide: bool,
        field: &FieldBinding,
        value: &Value,
        ns: Option<String>,
        scope: &NsScope<'_>,
        path: &str,
    ) -> Result<Option<Node>, EncodeError> {
        let mut child = Node::new(field.tag(), ns);
        match (field.model(), field.collection()) {
            (Some(model), _) => match value {
                Value::Map(record) => self.encode_model(model, record, &mut child, scope, path)?,
                Value::None => {}
                other => return Err(shape(path, "map", other)),
            },
            (None, Some(Collection::Mapping)) => match value {
                Value::Map(map) => child
                    .attributes
                    .extend(mapped_attributes(map, elide, path)?),
                Value::None => {}
                other => return Err(shape(path, "map", other)),
            },
            (None, _) => {
                let text = text_of(value, path)?;
                if !text.is_empty() {
                    child.text = Some(text);
                }
            }
        }

        if elide && child.is_empty() {
            trace!("Element `{}` is empty, elided", path);
            return Ok(None);
        }
        if let Some(model) = field.model() {
            self.declare(model.nsmap(), &mut child);
        }
        Ok(Some(child))
    }

    /// Places the nested wrappers on `parent` and encodes `inner` inside
    /// the innermost one.
    ///
    /// A wrapper created by an earlier field of the same model is reused;
    /// an element of the same name emitted by a plain field is not.
    /// `trail` is the index path from the model element down to `parent`.
    #[allow(clippy::too_many_arguments)]
    fn encode_wrapped(
        &mut self,
        frame: &Frame<'_>,
        wrappers: &mut Wrappers,
        trail: &mut Vec<usize>,
        inner: &FieldBinding,
        value: &Value,
        parent: &mut Node,
        target: WrapperTarget<'_>,
        path: &str,
    ) -> Result<(), EncodeError> {
        let Some((first, rest)) = target.segments.split_first() else {
            return self.encode_field(frame, wrappers, inner, value, parent, path);
        };

        let reused = (0..parent.children.len()).rev().find(|&i| {
            parent.children[i].is_named(first, target.ns) && wrappers.contains(&trail_to(trail, i))
        });
        let (idx, created) = match reused {
            Some(idx) => (idx, false),
            None => {
                parent
                    .children
                    .push(Node::new(first.as_str(), target.ns.map(str::to_string)));
                let idx = parent.children.len() - 1;
                wrappers.insert(trail_to(trail, idx));
                (idx, true)
            }
        };

        let nested = WrapperTarget {
            segments: rest,
            ns: target.ns,
        };
        trail.push(idx);
        let result = self.encode_wrapped(
            frame,
            wrappers,
            trail,
            inner,
            value,
            &mut parent.children[idx],
            nested,
            path,
        );
        trail.pop();
        result?;

        // A created wrapper is always the last child, so removing it leaves
        // the other trails valid.
        if created && frame.elide && parent.children[idx].is_empty() {
            parent.children.remove(idx);
            let pruned = trail_to(trail, idx);
            wrappers.retain(|t| !t.starts_with(&pruned));
        }
        Ok(())
    }

    /// Hoists a nested model's declarations to the root. A default namespace
    /// or a prefix already bound to another URI stays on the element.
    fn declare(&mut self, nsmap: &NsMap, node: &mut Node) {
        for (prefix, uri) in nsmap.iter() {
            match self.hoisted.get(prefix) {
                Some(bound) if bound == uri => {}
                None if !prefix.is_empty() => {
                    self.hoisted.insert(prefix, uri);
                }
                _ => {
                    node.nsmap.insert(prefix, uri);
                }
            }
        }
    }
}

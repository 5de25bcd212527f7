// crates/xmlbind/src/binding/field.rs

use super::ModelBinding;
use crate::validate::ValidationError;
use crate::value::{to_value, Value};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Where a field lives on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Attribute,
    Element,
    Text,
    Wrapped,
    Computed,
}

impl FieldKind {
    pub(crate) fn name(self) -> &'static str {
        match self {
            FieldKind::Attribute => "attribute",
            FieldKind::Element => "element",
            FieldKind::Text => "text",
            FieldKind::Wrapped => "wrapped",
            FieldKind::Computed => "computed",
        }
    }
}

/// Repetition or projection applied on top of a field's kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    /// Zero or more occurrences.
    Sequence,
    /// Exactly `n` occurrences.
    Tuple(usize),
    /// An attribute set read as key→value.
    Mapping,
}

impl Collection {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Collection::Sequence => "sequence",
            Collection::Tuple(_) => "tuple",
            Collection::Mapping => "mapping",
        }
    }
}

pub type DefaultFactory = Arc<dyn Fn() -> Result<Value, ValidationError> + Send + Sync>;

/// A literal default or a producer invoked on every use.
#[derive(Clone)]
pub enum DefaultValue {
    Value(Value),
    Factory(DefaultFactory),
}

impl DefaultValue {
    pub fn resolve(&self) -> Result<Value, ValidationError> {
        match self {
            DefaultValue::Value(value) => Ok(value.clone()),
            DefaultValue::Factory(factory) => factory(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Value(value) => f.debug_tuple("Value").field(value).finish(),
            DefaultValue::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// The resolved wire shape of one model field.
#[derive(Debug, Clone)]
pub struct FieldBinding {
    pub(crate) name: String,
    pub(crate) kind: FieldKind,
    pub(crate) tag: Option<String>,
    pub(crate) ns: Option<String>,
    pub(crate) default: Option<DefaultValue>,
    pub(crate) exclude: bool,
    pub(crate) model: Option<&'static ModelBinding>,
    pub(crate) collection: Option<Collection>,
    pub(crate) wrapper: Vec<String>,
    pub(crate) inner: Option<Box<FieldBinding>>,
}

impl FieldBinding {
    fn new(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            tag: None,
            ns: None,
            default: None,
            exclude: false,
            model: None,
            collection: None,
            wrapper: Vec::new(),
            inner: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// The wire name: explicit tag, else the nested model's root tag, else
    /// the field name.
    pub fn tag(&self) -> &str {
        self.tag
            .as_deref()
            .or(self.model.map(ModelBinding::tag))
            .unwrap_or(&self.name)
    }

    /// The namespace prefix declared on the field itself.
    pub fn ns(&self) -> Option<&str> {
        self.ns.as_deref()
    }

    pub fn is_excluded(&self) -> bool {
        self.exclude
    }

    pub fn model(&self) -> Option<&'static ModelBinding> {
        self.model
    }

    pub fn collection(&self) -> Option<Collection> {
        self.collection
    }

    /// Wrapper tags of a wrapped field, outermost first.
    pub fn wrapper_path(&self) -> &[String] {
        &self.wrapper
    }

    /// The inner binding of a wrapped or computed field.
    pub fn inner(&self) -> Option<&FieldBinding> {
        self.inner.as_deref()
    }

    /// The kind that decides where the field is emitted: computed fields
    /// take their inner binding's kind.
    pub(crate) fn wire_kind(&self) -> FieldKind {
        match (self.kind, self.inner()) {
            (FieldKind::Computed, Some(inner)) => inner.kind,
            (kind, _) => kind,
        }
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some() || self.inner().is_some_and(FieldBinding::has_default)
    }

    /// The default for an absent field, `None` when the field is required.
    ///
    /// Factories are invoked on each call. An outer default of a wrapped
    /// field takes precedence over its inner binding's.
    pub fn resolve_default(&self) -> Result<Option<Value>, ValidationError> {
        match (&self.default, self.inner()) {
            (Some(default), _) => default.resolve().map(Some),
            (None, Some(inner)) => inner.resolve_default(),
            (None, None) => Ok(None),
        }
    }

    /// Element namespace prefix: the field's, else the nested model's, else
    /// the enclosing model's.
    pub(crate) fn element_ns<'a>(&'a self, owner: &'a ModelBinding) -> Option<&'a str> {
        self.ns()
            .or(self.model.and_then(ModelBinding::ns))
            .or(owner.ns())
    }

    /// Attributes are only namespaced on request.
    pub(crate) fn attribute_ns<'a>(&'a self, owner: &'a ModelBinding) -> Option<&'a str> {
        self.ns()
            .or(if owner.ns_attrs() { owner.ns() } else { None })
    }

    /// Wrapper elements share the field's namespace, else the model's.
    pub(crate) fn wrapper_ns<'a>(&'a self, owner: &'a ModelBinding) -> Option<&'a str> {
        self.ns().or(owner.ns())
    }

    /// `true` when zero matches are acceptable without a default.
    pub(crate) fn is_repeated(&self) -> bool {
        matches!(self.collection, Some(Collection::Sequence))
            || self.inner().is_some_and(FieldBinding::is_repeated)
    }
}

/// Declarator for one model field.
///
/// ```
/// use xmlbind::Field;
///
/// let field = Field::element("item").tag("entry").sequence();
/// let attr = Field::attr("version").default("1.0");
/// ```
#[derive(Debug, Clone)]
pub struct Field {
    pub(crate) binding: FieldBinding,
    pub(crate) error: Option<String>,
}

impl Field {
    fn of(name: &str, kind: FieldKind) -> Self {
        Self {
            binding: FieldBinding::new(name, kind),
            error: None,
        }
    }

    pub fn attr(name: &str) -> Self {
        Self::of(name, FieldKind::Attribute)
    }

    pub fn element(name: &str) -> Self {
        Self::of(name, FieldKind::Element)
    }

    pub fn text(name: &str) -> Self {
        Self::of(name, FieldKind::Text)
    }

    /// A field matched under the `/`-separated wrapper `path`.
    ///
    /// The inner binding keeps its own name for the wire tag; the field is
    /// stored under `name`.
    pub fn wrapped(name: &str, path: &str, inner: Field) -> Self {
        let mut field = Self::of(name, FieldKind::Wrapped);
        field.binding.wrapper = path.split('/').map(str::to_string).collect();
        field.error = inner.error;
        field.binding.inner = Some(Box::new(inner.binding));
        field
    }

    /// A field supplied by the validation layer and emitted as `inner`.
    pub fn computed(name: &str, inner: Field) -> Self {
        let mut field = Self::of(name, FieldKind::Computed);
        field.error = inner.error;
        field.binding.inner = Some(Box::new(inner.binding));
        field
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.binding.tag = Some(tag.to_string());
        self
    }

    pub fn ns(mut self, prefix: &str) -> Self {
        self.binding.ns = Some(prefix.to_string());
        self
    }

    /// A literal default. It is lowered into a raw value once, here; a value
    /// that cannot be lowered is reported when the model is built.
    pub fn default<T: Serialize>(mut self, value: T) -> Self {
        match to_value(&value) {
            Ok(value) => self.binding.default = Some(DefaultValue::Value(value)),
            Err(e) => self.error = Some(e.to_string()),
        }
        self
    }

    /// A default produced by `factory` every time it is needed.
    pub fn default_with<T, F>(mut self, factory: F) -> Self
    where
        T: Serialize,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.binding.default = Some(DefaultValue::Factory(Arc::new(move || {
            to_value(&factory())
        })));
        self
    }

    /// Shorthand for a `None` default.
    pub fn optional(mut self) -> Self {
        self.binding.default = Some(DefaultValue::Value(Value::None));
        self
    }

    pub fn exclude(mut self) -> Self {
        self.binding.exclude = true;
        self
    }

    /// Decodes and encodes the element through a nested model binding.
    pub fn model(mut self, model: &'static ModelBinding) -> Self {
        self.binding.model = Some(model);
        self
    }

    pub fn sequence(mut self) -> Self {
        self.binding.collection = Some(Collection::Sequence);
        self
    }

    pub fn tuple(mut self, len: usize) -> Self {
        self.binding.collection = Some(Collection::Tuple(len));
        self
    }

    pub fn mapping(mut self) -> Self {
        self.binding.collection = Some(Collection::Mapping);
        self
    }

    pub fn name(&self) -> &str {
        &self.binding.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_tag_resolution() {
        assert_eq!(Field::element("item").binding.tag(), "item");
        assert_eq!(Field::element("item").tag("entry").binding.tag(), "entry");
        assert_eq!(Field::attr("id").binding.tag(), "id");
    }

    #[test]
    fn test_literal_default_is_lowered() {
        let field = Field::attr("count").default(2u32);
        assert_eq!(
            field.binding.resolve_default().unwrap(),
            Some(Value::from("2"))
        );
        assert!(Field::attr("count").binding.resolve_default().unwrap().is_none());
        assert_eq!(
            Field::attr("x").optional().binding.resolve_default().unwrap(),
            Some(Value::None)
        );
    }

    #[test]
    fn test_factory_runs_on_every_resolution() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let field = Field::element("items").default_with(|| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            vec![1u8, 2]
        });

        for _ in 0..3 {
            let value = field.binding.resolve_default().unwrap().unwrap();
            assert_eq!(value.as_seq().map(<[Value]>::len), Some(2));
        }
        assert_eq!(CALLS.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_wrapped_default_precedence() {
        let inner_only = Field::wrapped("w", "a/b", Field::element("x").default("inner"));
        assert_eq!(inner_only.binding.wrapper_path(), ["a", "b"]);
        assert!(inner_only.binding.has_default());
        assert_eq!(
            inner_only.binding.resolve_default().unwrap(),
            Some(Value::from("inner"))
        );

        let outer = Field::wrapped("w", "a", Field::element("x").default("inner")).optional();
        assert_eq!(outer.binding.resolve_default().unwrap(), Some(Value::None));
    }

    #[test]
    fn test_computed_takes_inner_wire_kind() {
        let field = Field::computed("total", Field::attr("total"));
        assert_eq!(field.binding.kind(), FieldKind::Computed);
        assert_eq!(field.binding.wire_kind(), FieldKind::Attribute);
    }
}

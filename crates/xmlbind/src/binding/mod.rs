// crates/xmlbind/src/binding/mod.rs

//! Immutable binding metadata: how each field of a model maps onto the wire.
//!
//! A [`ModelBinding`] is built once per model type, usually inside a
//! `OnceLock` in [`XmlModel::binding`](crate::XmlModel::binding), and then
//! shared read-only by every decode and encode call.

mod field;

pub use field::{Collection, DefaultFactory, DefaultValue, Field, FieldBinding, FieldKind};

use crate::error::BindingError;
use crate::tree::NsMap;
use crate::validate::{run_validators, Context, FieldValidator, ValidationError, ValidationInfo};
use crate::value::{Record, Value};
use std::fmt;
use std::sync::Arc;

/// How strictly fields are matched against child elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// Children must appear exactly in declaration order, with no leftovers.
    #[default]
    Strict,
    /// Children are searched forward from the last match; unrelated ones are
    /// skipped.
    Ordered,
    /// Any unconsumed child may match.
    Unordered,
}

/// The binding of a whole model: root identity, namespace configuration and
/// the ordered field bindings.
pub struct ModelBinding {
    tag: String,
    ns: Option<String>,
    nsmap: NsMap,
    ns_attrs: bool,
    search_mode: SearchMode,
    elide_empty: Option<bool>,
    fields: Vec<FieldBinding>,
    validators: Vec<(String, FieldValidator)>,
}

impl ModelBinding {
    /// Starts a root model definition.
    pub fn builder(tag: &str) -> ModelBindingBuilder {
        ModelBindingBuilder {
            tag: tag.to_string(),
            ns: None,
            nsmap: NsMap::new(),
            ns_attrs: false,
            search_mode: SearchMode::default(),
            elide_empty: None,
            fields: Vec::new(),
            validators: Vec::new(),
        }
    }

    /// Starts a subclass definition seeded with everything `parent` declares.
    pub fn inherit(parent: &ModelBinding) -> ModelBindingBuilder {
        ModelBindingBuilder {
            tag: parent.tag.clone(),
            ns: parent.ns.clone(),
            nsmap: parent.nsmap.clone(),
            ns_attrs: parent.ns_attrs,
            search_mode: parent.search_mode,
            elide_empty: parent.elide_empty,
            fields: parent
                .fields
                .iter()
                .map(|binding| Field {
                    binding: binding.clone(),
                    error: None,
                })
                .collect(),
            validators: parent.validators.clone(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Namespace prefix of the root element.
    pub fn ns(&self) -> Option<&str> {
        self.ns.as_deref()
    }

    pub fn nsmap(&self) -> &NsMap {
        &self.nsmap
    }

    pub fn ns_attrs(&self) -> bool {
        self.ns_attrs
    }

    pub fn search_mode(&self) -> SearchMode {
        self.search_mode
    }

    /// The model's own elision policy; `None` defers to the caller.
    pub fn elide_empty(&self) -> Option<bool> {
        self.elide_empty
    }

    pub fn fields(&self) -> &[FieldBinding] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldBinding> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Runs the field validators over a decoded record.
    pub fn validate(&self, record: &mut Record, context: Context<'_>) -> Result<(), ValidationError> {
        run_validators(&self.tag, &self.validators, record, context)
    }
}

impl fmt::Debug for ModelBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelBinding")
            .field("tag", &self.tag)
            .field("ns", &self.ns)
            .field("nsmap", &self.nsmap)
            .field("ns_attrs", &self.ns_attrs)
            .field("search_mode", &self.search_mode)
            .field("elide_empty", &self.elide_empty)
            .field("fields", &self.fields)
            .field("validators", &self.validators.len())
            .finish()
    }
}

pub struct ModelBindingBuilder {
    tag: String,
    ns: Option<String>,
    nsmap: NsMap,
    ns_attrs: bool,
    search_mode: SearchMode,
    elide_empty: Option<bool>,
    fields: Vec<Field>,
    validators: Vec<(String, FieldValidator)>,
}

impl ModelBindingBuilder {
    pub fn tag(mut self, tag: &str) -> Self {
        self.tag = tag.to_string();
        self
    }

    pub fn ns(mut self, prefix: &str) -> Self {
        self.ns = Some(prefix.to_string());
        self
    }

    /// Adds prefix→URI declarations; a prefix declared again is rebound.
    pub fn nsmap<I, P, U>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (P, U)>,
        P: Into<String>,
        U: Into<String>,
    {
        for (prefix, uri) in entries {
            self.nsmap.insert(prefix, uri);
        }
        self
    }

    pub fn ns_attrs(mut self, enabled: bool) -> Self {
        self.ns_attrs = enabled;
        self
    }

    pub fn search_mode(mut self, mode: SearchMode) -> Self {
        self.search_mode = mode;
        self
    }

    pub fn elide_empty(mut self, enabled: bool) -> Self {
        self.elide_empty = Some(enabled);
        self
    }

    /// Appends a field, or replaces an inherited field of the same name in
    /// place.
    pub fn field(mut self, field: Field) -> Self {
        match self.fields.iter_mut().find(|f| f.name() == field.name()) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
        self
    }

    /// Registers a validator for `field`. Validators run in registration
    /// order, inherited ones first.
    pub fn validator<F>(mut self, field: &str, validator: F) -> Self
    where
        F: Fn(Value, &ValidationInfo<'_>) -> Result<Value, ValidationError> + Send + Sync + 'static,
    {
        self.validators.push((field.to_string(), Arc::new(validator)));
        self
    }

    pub fn build(self) -> Result<ModelBinding, BindingError> {
        let mut text_field: Option<&str> = None;
        for field in &self.fields {
            if let Some(reason) = &field.error {
                return Err(BindingError::InvalidDefault {
                    field: field.name().to_string(),
                    reason: reason.clone(),
                });
            }
            check_field(&field.binding)?;
            if field.binding.wire_kind() == FieldKind::Text {
                if let Some(first) = text_field {
                    return Err(BindingError::DuplicateText {
                        model: self.tag.clone(),
                        first: first.to_string(),
                        second: field.name().to_string(),
                    });
                }
                text_field = Some(field.name());
            }
        }
        for (name, _) in &self.validators {
            if !self.fields.iter().any(|f| f.name() == name) {
                return Err(BindingError::UnknownField {
                    model: self.tag.clone(),
                    field: name.clone(),
                });
            }
        }

        Ok(ModelBinding {
            tag: self.tag,
            ns: self.ns,
            nsmap: self.nsmap,
            ns_attrs: self.ns_attrs,
            search_mode: self.search_mode,
            elide_empty: self.elide_empty,
            fields: self.fields.into_iter().map(|f| f.binding).collect(),
            validators: self.validators,
        })
    }
}

fn check_field(field: &FieldBinding) -> Result<(), BindingError> {
    let name = || field.name.clone();

    if field.model.is_some() && field.kind != FieldKind::Element {
        return Err(BindingError::ModelOnNonElement { field: name() });
    }
    match (field.collection, field.kind) {
        (Some(Collection::Tuple(0)), _) => {
            return Err(BindingError::EmptyTuple { field: name() });
        }
        (Some(Collection::Mapping), FieldKind::Element | FieldKind::Attribute) => {
            if field.model.is_some() {
                return Err(BindingError::UnsupportedAdapter {
                    field: name(),
                    adapter: "mapping",
                    kind: "nested model",
                });
            }
        }
        (Some(collection), FieldKind::Wrapped | FieldKind::Computed)
        | (Some(collection @ Collection::Mapping), FieldKind::Text) => {
            return Err(BindingError::UnsupportedAdapter {
                field: name(),
                adapter: collection.name(),
                kind: field.kind.name(),
            });
        }
        _ => {}
    }

    match field.kind {
        FieldKind::Wrapped => {
            if field.wrapper.iter().any(String::is_empty) {
                return Err(BindingError::EmptyWrapperPath { field: name() });
            }
            let inner = field.inner().ok_or_else(|| BindingError::UnsupportedInner {
                field: name(),
                kind: "nothing",
            })?;
            if matches!(inner.kind, FieldKind::Wrapped | FieldKind::Computed) {
                return Err(BindingError::UnsupportedInner {
                    field: name(),
                    kind: inner.kind.name(),
                });
            }
            check_field(inner)
        }
        FieldKind::Computed => {
            let inner = field.inner().ok_or_else(|| BindingError::UnsupportedInner {
                field: name(),
                kind: "nothing",
            })?;
            if !matches!(inner.kind, FieldKind::Attribute | FieldKind::Element) {
                return Err(BindingError::UnsupportedInner {
                    field: name(),
                    kind: inner.kind.name(),
                });
            }
            check_field(inner)
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;

    fn sub() -> &'static ModelBinding {
        static BINDING: OnceLock<ModelBinding> = OnceLock::new();
        BINDING.get_or_init(|| {
            ModelBinding::builder("sub")
                .ns("s")
                .build()
                .unwrap()
        })
    }

    #[test]
    fn test_inheritance_merges_configuration_and_fields() {
        let parent = ModelBinding::builder("model")
            .ns("tst")
            .nsmap([("tst", "urn:test")])
            .search_mode(SearchMode::Ordered)
            .field(Field::attr("attr1"))
            .field(Field::element("element1"))
            .validator("attr1", |v: Value, _: &ValidationInfo<'_>| Ok(v))
            .build()
            .unwrap();

        let child = ModelBinding::inherit(&parent)
            .tag("child")
            .elide_empty(true)
            .field(Field::attr("attr1").default("x"))
            .field(Field::element("element2"))
            .build()
            .unwrap();

        assert_eq!(child.tag(), "child");
        assert_eq!(child.ns(), Some("tst"));
        assert_eq!(child.nsmap().get("tst"), Some("urn:test"));
        assert_eq!(child.search_mode(), SearchMode::Ordered);
        assert_eq!(child.elide_empty(), Some(true));
        assert_eq!(parent.elide_empty(), None);

        let names: Vec<_> = child.fields().iter().map(FieldBinding::name).collect();
        assert_eq!(names, ["attr1", "element1", "element2"]);
        assert!(child.field("attr1").unwrap().has_default());
        assert!(!parent.field("attr1").unwrap().has_default());
        assert_eq!(child.validators.len(), 1);
    }

    #[test]
    fn test_nested_model_supplies_tag_and_namespace() {
        let model = ModelBinding::builder("model")
            .ns("m")
            .field(Field::element("child").model(sub()))
            .field(Field::element("plain"))
            .build()
            .unwrap();

        let child = model.field("child").unwrap();
        assert_eq!(child.tag(), "sub");
        assert_eq!(child.element_ns(&model), Some("s"));
        assert_eq!(model.field("plain").unwrap().element_ns(&model), Some("m"));
    }

    #[test]
    fn test_attribute_namespacing_is_opt_in() {
        let plain = ModelBinding::builder("m")
            .ns("p")
            .field(Field::attr("a"))
            .build()
            .unwrap();
        assert_eq!(plain.field("a").unwrap().attribute_ns(&plain), None);

        let namespaced = ModelBinding::inherit(&plain).ns_attrs(true).build().unwrap();
        assert_eq!(
            namespaced.field("a").unwrap().attribute_ns(&namespaced),
            Some("p")
        );
    }

    #[test]
    fn test_build_rejects_invalid_declarations() {
        let dup = ModelBinding::builder("m")
            .field(Field::text("a"))
            .field(Field::text("b"))
            .build();
        assert!(matches!(dup, Err(BindingError::DuplicateText { .. })));

        let model_on_attr = ModelBinding::builder("m")
            .field(Field::attr("a").model(sub()))
            .build();
        assert!(matches!(model_on_attr, Err(BindingError::ModelOnNonElement { .. })));

        let mapping_on_text = ModelBinding::builder("m")
            .field(Field::text("a").mapping())
            .build();
        assert!(matches!(
            mapping_on_text,
            Err(BindingError::UnsupportedAdapter { adapter: "mapping", .. })
        ));

        let empty_tuple = ModelBinding::builder("m")
            .field(Field::element("a").tuple(0))
            .build();
        assert!(matches!(empty_tuple, Err(BindingError::EmptyTuple { .. })));

        let empty_path = ModelBinding::builder("m")
            .field(Field::wrapped("a", "outer//inner", Field::element("a")))
            .build();
        assert!(matches!(empty_path, Err(BindingError::EmptyWrapperPath { .. })));

        let text_inner = ModelBinding::builder("m")
            .field(Field::computed("a", Field::text("a")))
            .build();
        assert!(matches!(text_inner, Err(BindingError::UnsupportedInner { .. })));

        let unknown = ModelBinding::builder("m")
            .validator("nope", |v: Value, _: &ValidationInfo<'_>| Ok(v))
            .build();
        assert!(matches!(unknown, Err(BindingError::UnknownField { .. })));
    }

    #[test]
    fn test_invalid_default_is_reported_at_build() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(vec![1u8], 1u8);
        let result = ModelBinding::builder("m")
            .field(Field::element("a").default(map))
            .build();
        assert!(matches!(result, Err(BindingError::InvalidDefault { .. })));
    }
}

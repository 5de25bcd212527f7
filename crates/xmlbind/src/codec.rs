// crates/xmlbind/src/codec.rs

//! Document-level entry points.

use crate::binding::ModelBinding;
use crate::error::Error;
use crate::tree::{self, Node};
use crate::validate::{Context, ValidationError};
use crate::value::{from_value, to_value, Value};
use crate::{decoder, encoder};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Options for [`to_xml`]. Everything is off by default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Drop empty attributes and elements, unless a model says otherwise.
    pub elide_empty: bool,
    /// Emit an `<?xml ...?>` declaration.
    pub declaration: bool,
    /// Encoding named in the declaration. Only UTF-8 is supported.
    pub encoding: Option<String>,
    /// Indent nested elements by two spaces.
    pub pretty: bool,
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elide_empty(mut self, enabled: bool) -> Self {
        self.elide_empty = enabled;
        self
    }

    pub fn declaration(mut self, enabled: bool) -> Self {
        self.declaration = enabled;
        self
    }

    pub fn encoding(mut self, encoding: &str) -> Self {
        self.encoding = Some(encoding.to_string());
        self
    }

    pub fn pretty(mut self, enabled: bool) -> Self {
        self.pretty = enabled;
        self
    }
}

/// A type bound to an XML element.
///
/// Implementors provide the binding, typically built once in a `OnceLock`;
/// every other method has a default.
///
/// ```
/// use std::sync::OnceLock;
/// use serde::{Deserialize, Serialize};
/// use xmlbind::{Field, ModelBinding, XmlModel};
///
/// #[derive(Debug, Serialize, Deserialize, PartialEq)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// impl XmlModel for Point {
///     fn binding() -> &'static ModelBinding {
///         static BINDING: OnceLock<ModelBinding> = OnceLock::new();
///         BINDING.get_or_init(|| {
///             ModelBinding::builder("point")
///                 .field(Field::attr("x"))
///                 .field(Field::attr("y"))
///                 .build()
///                 .expect("valid binding")
///         })
///     }
/// }
///
/// let point = Point::from_xml(r#"<point x="1" y="2"/>"#, None).unwrap();
/// assert_eq!(point, Point { x: 1, y: 2 });
/// ```
pub trait XmlModel: Serialize + DeserializeOwned {
    fn binding() -> &'static ModelBinding;

    /// Turns a validated raw record into the model. The context is the one
    /// handed to the decode call.
    fn validate(raw: Value, _context: Context<'_>) -> Result<Self, ValidationError> {
        from_value(raw)
    }

    fn from_xml(source: impl AsRef<[u8]>, context: Context<'_>) -> Result<Self, Error> {
        from_xml(source, context)
    }

    fn from_xml_tree(root: &Node, context: Context<'_>) -> Result<Self, Error> {
        from_xml_tree(root, context)
    }

    fn to_xml(&self, options: &WriteOptions) -> Result<Vec<u8>, Error> {
        to_xml(self, options)
    }

    fn to_xml_tree(&self, elide_empty: bool) -> Result<Node, Error> {
        to_xml_tree(self, elide_empty)
    }
}

/// Parses a document and decodes its root as `T`.
pub fn from_xml<T: XmlModel>(source: impl AsRef<[u8]>, context: Context<'_>) -> Result<T, Error> {
    let root = tree::parse(source.as_ref())?;
    from_xml_tree(&root, context)
}

/// Decodes an already parsed root element as `T`.
pub fn from_xml_tree<T: XmlModel>(root: &Node, context: Context<'_>) -> Result<T, Error> {
    let raw = decoder::decode_document(T::binding(), root, context)?;
    Ok(T::validate(raw, context)?)
}

/// Encodes `instance` and serializes the resulting tree.
pub fn to_xml<T: XmlModel>(instance: &T, options: &WriteOptions) -> Result<Vec<u8>, Error> {
    let root = to_xml_tree(instance, options.elide_empty)?;
    Ok(tree::write(&root, options)?)
}

/// Encodes `instance` into a tree without serializing it.
pub fn to_xml_tree<T: XmlModel>(instance: &T, elide_empty: bool) -> Result<Node, Error> {
    let raw = to_value(instance)?;
    Ok(encoder::encode_document(T::binding(), &raw, elide_empty)?)
}

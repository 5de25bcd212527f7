// src/lib.rs

#![doc = "Declarative binding between typed Rust models and XML documents."]
#![doc = ""]
#![doc = "A model describes its wire shape once, as a `ModelBinding` built from"]
#![doc = "`Field` declarators: attributes, elements, text, wrapped subtrees and"]
#![doc = "computed values, optionally repeated (`sequence`, `tuple`) or projected"]
#![doc = "onto an attribute set (`mapping`)."]
#![doc = ""]
#![doc = "- `from_xml`: decodes a document into a model, running field validators."]
#![doc = "- `to_xml`: encodes a model, with optional empty-value elision."]
#![doc = "- `XmlModel`: the same entry points as methods of the model type."]

// --- Crate Modules ---

pub mod binding;
mod codec;
mod decoder;
mod encoder;
pub mod error;
pub mod tree;
pub mod validate;
pub mod value;

// --- Public API Re-exports ---

pub use binding::{Collection, Field, FieldBinding, FieldKind, ModelBinding, ModelBindingBuilder, SearchMode};
pub use codec::{from_xml, from_xml_tree, to_xml, to_xml_tree, WriteOptions, XmlModel};
pub use error::{BindingError, EncodeError, Error, ParsingError};
pub use tree::{Node, NsMap};
pub use validate::{Context, ValidationError, ValidationInfo};
pub use value::{from_value, to_value, Record, Value};

// crates/xmlbind/src/value/mod.rs

//! Raw, wire-neutral values exchanged between the binding engine and the
//! validation layer.
//!
//! The decoder never produces typed data: it assembles a tree of `Value`s
//! (strings, lists and string-keyed maps) which the validation layer then
//! coerces into the model type. The encoder works the other way round, starting
//! from the `Value` a model serializes to.

mod de;
mod ser;

pub use de::from_value;
pub use ser::to_value;

use std::collections::BTreeMap;
use std::fmt;

/// A name→raw-value mapping: one decoded model, or one mapping field.
pub type Record = BTreeMap<String, Value>;

/// A raw value as it appears on the wire, before type coercion.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// No value (an element without text, or a `None` on the model side).
    #[default]
    None,
    /// Character data taken from an attribute, an element or a text node.
    Text(String),
    /// Repeated values collected by a sequence or tuple adapter.
    Seq(Vec<Value>),
    /// A nested model or a mapping projected from an attribute set.
    Map(Record),
}

impl Value {
    /// Returns `true` for values that empty-elision drops: `None`, `""`, and
    /// empty sequences or maps.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::None => true,
            Value::Text(s) => s.is_empty(),
            Value::Seq(items) => items.is_empty(),
            Value::Map(map) => map.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::Seq(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Record> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Short name of the variant, used in shape mismatch messages.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Text(_) => "text",
            Value::Seq(_) => "sequence",
            Value::Map(_) => "map",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Seq(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Record> for Value {
    fn from(map: Record) -> Self {
        Value::Map(map)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Seq(items)
    }
}

// crates/xmlbind/src/value/de.rs

//! `serde::Deserializer` over a raw [`Value`].
//!
//! This is where raw wire strings are coerced into typed values: numbers and
//! booleans are parsed from text, a missing text (`Value::None`) reads as an
//! empty string or as `None` for options, and hex text becomes bytes.

use super::Value;
use crate::validate::ValidationError;
use serde::de::value::{MapDeserializer, SeqDeserializer, StringDeserializer};
use serde::de::{self, DeserializeOwned, IntoDeserializer, Visitor};

/// Coerces a raw [`Value`] into `T`.
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T, ValidationError> {
    T::deserialize(value)
}

impl<'de> IntoDeserializer<'de, ValidationError> for Value {
    type Deserializer = Value;

    fn into_deserializer(self) -> Value {
        self
    }
}

impl Value {
    fn into_text(self, expected: &str) -> Result<String, ValidationError> {
        match self {
            Value::Text(s) => Ok(s),
            other => Err(ValidationError::new(format!(
                "expected {}, got {}",
                expected,
                other.kind()
            ))),
        }
    }

    fn visit_seq<'de, V: Visitor<'de>>(items: Vec<Value>, visitor: V) -> Result<V::Value, ValidationError> {
        let mut seq: SeqDeserializer<_, ValidationError> = SeqDeserializer::new(items.into_iter());
        let value = visitor.visit_seq(&mut seq)?;
        seq.end()?;
        Ok(value)
    }

    fn visit_map<'de, V: Visitor<'de>>(
        map: super::Record,
        visitor: V,
    ) -> Result<V::Value, ValidationError> {
        let mut map: MapDeserializer<'de, _, ValidationError> = MapDeserializer::new(map.into_iter());
        let value = visitor.visit_map(&mut map)?;
        map.end()?;
        Ok(value)
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

macro_rules! deserialize_parsed {
    ($($method:ident => $visit:ident: $ty:ty),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ValidationError> {
                let text = self.into_text("a number")?;
                let parsed = text.trim().parse::<$ty>().map_err(|e| {
                    ValidationError::new(format!("invalid number {:?}: {}", text, e))
                })?;
                visitor.$visit(parsed)
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for Value {
    type Error = ValidationError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ValidationError> {
        match self {
            Value::None => visitor.visit_unit(),
            Value::Text(s) => visitor.visit_string(s),
            Value::Seq(items) => Value::visit_seq(items, visitor),
            Value::Map(map) => Value::visit_map(map, visitor),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ValidationError> {
        let text = self.into_text("a boolean")?;
        match parse_bool(&text) {
            Some(b) => visitor.visit_bool(b),
            None => Err(ValidationError::new(format!("invalid boolean {:?}", text))),
        }
    }

    deserialize_parsed! {
        deserialize_i8 => visit_i8: i8,
        deserialize_i16 => visit_i16: i16,
        deserialize_i32 => visit_i32: i32,
        deserialize_i64 => visit_i64: i64,
        deserialize_i128 => visit_i128: i128,
        deserialize_u8 => visit_u8: u8,
        deserialize_u16 => visit_u16: u16,
        deserialize_u32 => visit_u32: u32,
        deserialize_u64 => visit_u64: u64,
        deserialize_u128 => visit_u128: u128,
        deserialize_f32 => visit_f32: f32,
        deserialize_f64 => visit_f64: f64,
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ValidationError> {
        let text = self.into_text("a character")?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => visitor.visit_char(c),
            _ => Err(ValidationError::new(format!("expected a single character, got {:?}", text))),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ValidationError> {
        self.deserialize_string(visitor)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ValidationError> {
        match self {
            Value::None => visitor.visit_str(""),
            other => visitor.visit_string(other.into_text("text")?),
        }
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ValidationError> {
        self.deserialize_byte_buf(visitor)
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ValidationError> {
        match self {
            Value::None => visitor.visit_byte_buf(Vec::new()),
            other => {
                let text = other.into_text("hex text")?;
                let bytes = hex::decode(text.trim())
                    .map_err(|e| ValidationError::new(format!("invalid hex {:?}: {}", text, e)))?;
                visitor.visit_byte_buf(bytes)
            }
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ValidationError> {
        // An empty attribute is how an absent optional value is written
        // when elision is off.
        match self {
            Value::None => visitor.visit_none(),
            Value::Text(text) if text.is_empty() => visitor.visit_none(),
            other => visitor.visit_some(other),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ValidationError> {
        match self {
            Value::None => visitor.visit_unit(),
            Value::Text(s) if s.is_empty() => visitor.visit_unit(),
            other => Err(ValidationError::new(format!("expected nothing, got {}", other.kind()))),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, ValidationError> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, ValidationError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ValidationError> {
        match self {
            Value::None => Value::visit_seq(Vec::new(), visitor),
            Value::Seq(items) => Value::visit_seq(items, visitor),
            other => Err(ValidationError::new(format!("expected a sequence, got {}", other.kind()))),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, ValidationError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, ValidationError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ValidationError> {
        match self {
            Value::None => Value::visit_map(super::Record::new(), visitor),
            Value::Map(map) => Value::visit_map(map, visitor),
            other => Err(ValidationError::new(format!("expected a map, got {}", other.kind()))),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, ValidationError> {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, ValidationError> {
        match self {
            Value::Text(variant) => {
                let variant: StringDeserializer<ValidationError> = variant.trim().to_string().into_deserializer();
                visitor.visit_enum(variant)
            }
            Value::Map(map) if map.len() == 1 => {
                let Some((variant, value)) = map.into_iter().next() else {
                    return Err(ValidationError::new("expected a single-entry map for enum"));
                };
                visitor.visit_enum(EnumDeserializer { variant, value })
            }
            other => Err(ValidationError::new(format!(
                "expected an enum variant, got {}",
                other.kind()
            ))),
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ValidationError> {
        self.deserialize_string(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ValidationError> {
        visitor.visit_unit()
    }
}

/// Enum access for data-carrying variants encoded as `{variant: value}`.
struct EnumDeserializer {
    variant: String,
    value: Value,
}

impl<'de> de::EnumAccess<'de> for EnumDeserializer {
    type Error = ValidationError;
    type Variant = VariantDeserializer;

    fn variant_seed<V: de::DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> Result<(V::Value, VariantDeserializer), ValidationError> {
        let variant: StringDeserializer<ValidationError> = self.variant.into_deserializer();
        let tag = seed.deserialize(variant)?;
        Ok((tag, VariantDeserializer { value: self.value }))
    }
}

struct VariantDeserializer {
    value: Value,
}

impl<'de> de::VariantAccess<'de> for VariantDeserializer {
    type Error = ValidationError;

    fn unit_variant(self) -> Result<(), ValidationError> {
        de::Deserialize::deserialize(self.value)
    }

    fn newtype_variant_seed<T: de::DeserializeSeed<'de>>(
        self,
        seed: T,
    ) -> Result<T::Value, ValidationError> {
        seed.deserialize(self.value)
    }

    fn tuple_variant<V: Visitor<'de>>(self, len: usize, visitor: V) -> Result<V::Value, ValidationError> {
        de::Deserializer::deserialize_tuple(self.value, len, visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, ValidationError> {
        de::Deserializer::deserialize_struct(self.value, "", fields, visitor)
    }
}

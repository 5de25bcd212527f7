// crates/xmlbind/src/value/ser.rs

//! `serde::Serializer` that lowers a typed model into a raw [`Value`].
//!
//! Scalars become their display text, `None` and unit become [`Value::None`],
//! sequences and tuples become [`Value::Seq`], structs and maps become
//! [`Value::Map`]. Byte strings are written as lowercase hex.

use super::{Record, Value};
use crate::validate::ValidationError;
use serde::ser::{self, Serialize};

/// Serializes `value` into a raw [`Value`].
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value, ValidationError> {
    value.serialize(ValueSerializer)
}

impl Serialize for Value {
    fn serialize<S: ser::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use ser::{SerializeMap, SerializeSeq};
        match self {
            Value::None => serializer.serialize_none(),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Seq(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            }
        }
    }
}

struct ValueSerializer;

fn text(v: impl ToString) -> Result<Value, ValidationError> {
    Ok(Value::Text(v.to_string()))
}

impl ser::Serializer for ValueSerializer {
    type Ok = Value;
    type Error = ValidationError;

    type SerializeSeq = SeqSerializer;
    type SerializeTuple = SeqSerializer;
    type SerializeTupleStruct = SeqSerializer;
    type SerializeTupleVariant = TupleVariantSerializer;
    type SerializeMap = MapSerializer;
    type SerializeStruct = MapSerializer;
    type SerializeStructVariant = StructVariantSerializer;

    fn serialize_bool(self, v: bool) -> Result<Value, ValidationError> {
        text(v)
    }

    fn serialize_i8(self, v: i8) -> Result<Value, ValidationError> {
        text(v)
    }

    fn serialize_i16(self, v: i16) -> Result<Value, ValidationError> {
        text(v)
    }

    fn serialize_i32(self, v: i32) -> Result<Value, ValidationError> {
        text(v)
    }

    fn serialize_i64(self, v: i64) -> Result<Value, ValidationError> {
        text(v)
    }

    fn serialize_i128(self, v: i128) -> Result<Value, ValidationError> {
        text(v)
    }

    fn serialize_u8(self, v: u8) -> Result<Value, ValidationError> {
        text(v)
    }

    fn serialize_u16(self, v: u16) -> Result<Value, ValidationError> {
        text(v)
    }

    fn serialize_u32(self, v: u32) -> Result<Value, ValidationError> {
        text(v)
    }

    fn serialize_u64(self, v: u64) -> Result<Value, ValidationError> {
        text(v)
    }

    fn serialize_u128(self, v: u128) -> Result<Value, ValidationError> {
        text(v)
    }

    fn serialize_f32(self, v: f32) -> Result<Value, ValidationError> {
        text(v)
    }

    fn serialize_f64(self, v: f64) -> Result<Value, ValidationError> {
        text(v)
    }

    fn serialize_char(self, v: char) -> Result<Value, ValidationError> {
        text(v)
    }

    fn serialize_str(self, v: &str) -> Result<Value, ValidationError> {
        text(v)
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value, ValidationError> {
        Ok(Value::Text(hex::encode(v)))
    }

    fn serialize_none(self) -> Result<Value, ValidationError> {
        Ok(Value::None)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Value, ValidationError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value, ValidationError> {
        Ok(Value::None)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value, ValidationError> {
        Ok(Value::None)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Value, ValidationError> {
        text(variant)
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Value, ValidationError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value, ValidationError> {
        let mut map = Record::new();
        map.insert(variant.to_string(), to_value(value)?);
        Ok(Value::Map(map))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqSerializer, ValidationError> {
        Ok(SeqSerializer {
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqSerializer, ValidationError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<SeqSerializer, ValidationError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<TupleVariantSerializer, ValidationError> {
        Ok(TupleVariantSerializer {
            variant,
            items: Vec::with_capacity(len),
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<MapSerializer, ValidationError> {
        Ok(MapSerializer {
            map: Record::new(),
            next_key: None,
        })
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<MapSerializer, ValidationError> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<StructVariantSerializer, ValidationError> {
        Ok(StructVariantSerializer {
            variant,
            map: Record::new(),
        })
    }
}

struct SeqSerializer {
    items: Vec<Value>,
}

impl ser::SerializeSeq for SeqSerializer {
    type Ok = Value;
    type Error = ValidationError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ValidationError> {
        self.items.push(to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value, ValidationError> {
        Ok(Value::Seq(self.items))
    }
}

impl ser::SerializeTuple for SeqSerializer {
    type Ok = Value;
    type Error = ValidationError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ValidationError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value, ValidationError> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for SeqSerializer {
    type Ok = Value;
    type Error = ValidationError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ValidationError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value, ValidationError> {
        ser::SerializeSeq::end(self)
    }
}

struct TupleVariantSerializer {
    variant: &'static str,
    items: Vec<Value>,
}

impl ser::SerializeTupleVariant for TupleVariantSerializer {
    type Ok = Value;
    type Error = ValidationError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ValidationError> {
        self.items.push(to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value, ValidationError> {
        let mut map = Record::new();
        map.insert(self.variant.to_string(), Value::Seq(self.items));
        Ok(Value::Map(map))
    }
}

struct MapSerializer {
    map: Record,
    next_key: Option<String>,
}

impl ser::SerializeMap for MapSerializer {
    type Ok = Value;
    type Error = ValidationError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), ValidationError> {
        match to_value(key)? {
            Value::Text(key) => {
                self.next_key = Some(key);
                Ok(())
            }
            other => Err(ValidationError::new(format!(
                "map keys must serialize to text, got {}",
                other.kind()
            ))),
        }
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ValidationError> {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| ValidationError::new("map value serialized before its key"))?;
        self.map.insert(key, to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value, ValidationError> {
        Ok(Value::Map(self.map))
    }
}

impl ser::SerializeStruct for MapSerializer {
    type Ok = Value;
    type Error = ValidationError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), ValidationError> {
        self.map.insert(key.to_string(), to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value, ValidationError> {
        Ok(Value::Map(self.map))
    }
}

struct StructVariantSerializer {
    variant: &'static str,
    map: Record,
}

impl ser::SerializeStructVariant for StructVariantSerializer {
    type Ok = Value;
    type Error = ValidationError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), ValidationError> {
        self.map.insert(key.to_string(), to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<Value, ValidationError> {
        let mut outer = Record::new();
        outer.insert(self.variant.to_string(), Value::Map(self.map));
        Ok(Value::Map(outer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct Inner {
        id: u32,
        label: Option<String>,
    }

    #[derive(Serialize)]
    #[serde(rename_all = "lowercase")]
    enum Kind {
        Primary,
    }

    #[derive(Serialize)]
    struct Outer {
        flag: bool,
        ratio: f64,
        kind: Kind,
        inner: Inner,
        items: Vec<Inner>,
        pair: (u8, u8),
        attrs: BTreeMap<String, String>,
        #[serde(with = "serde_bytes_as_slice")]
        raw: Vec<u8>,
    }

    mod serde_bytes_as_slice {
        pub fn serialize<S: serde::Serializer>(v: &[u8], s: S) -> Result<S::Ok, S::Error> {
            s.serialize_bytes(v)
        }
    }

    fn txt(s: &str) -> Value {
        Value::from(s)
    }

    #[test]
    fn test_struct_lowering() {
        let mut attrs = BTreeMap::new();
        attrs.insert("key".to_string(), "value".to_string());
        let outer = Outer {
            flag: true,
            ratio: 0.5,
            kind: Kind::Primary,
            inner: Inner { id: 1, label: None },
            items: vec![Inner {
                id: 2,
                label: Some("two".to_string()),
            }],
            pair: (3, 4),
            attrs,
            raw: vec![0xde, 0xad],
        };

        let value = to_value(&outer).unwrap();
        let map = value.as_map().unwrap();

        assert_eq!(map["flag"], txt("true"));
        assert_eq!(map["ratio"], txt("0.5"));
        assert_eq!(map["kind"], txt("primary"));
        assert_eq!(map["inner"].as_map().unwrap()["label"], Value::None);
        assert_eq!(map["items"].as_seq().unwrap()[0].as_map().unwrap()["label"], txt("two"));
        assert_eq!(map["pair"], Value::Seq(vec![txt("3"), txt("4")]));
        assert_eq!(map["attrs"].as_map().unwrap()["key"], txt("value"));
        assert_eq!(map["raw"], txt("dead"));
    }

    #[test]
    fn test_non_text_map_key_is_rejected() {
        let mut map = BTreeMap::new();
        map.insert(vec![1u8], 1u8);
        assert!(to_value(&map).is_err());
    }

    #[test]
    fn test_raw_value_lowers_to_itself() {
        let mut map = Record::new();
        map.insert("a".to_string(), Value::Seq(vec![txt("1"), Value::None]));
        let value = Value::Map(map);
        assert_eq!(to_value(&value).unwrap(), value);
    }
}

//! The document tree.
//!
//! [`Value`] is the format-agnostic node type every save walk produces and
//! every load walk consumes. Besides plain scalars and containers it carries
//! the two reference kinds the engine understands: live-instance ids and
//! catalog ids.
//!
//! Use [`to_value`] and [`from_value`] to bridge arbitrary serde types into
//! and out of the tree.

use std::fmt;

use serde::de::{self, DeserializeSeed, IntoDeserializer, Visitor};
use serde::ser;
use serde::{Deserialize, Serialize};

/// One node of the document tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    /// Named children in insertion order.
    Map(Vec<(String, Value)>),
    /// Hierarchical id of a live instance (`catalog.top.child.own`).
    Instance(String),
    /// Stable id of a static catalog asset.
    Catalog(u32),
}

impl Value {
    pub fn empty_map() -> Self {
        Value::Map(Vec::new())
    }

    /// Looks up a named child. Always `None` for non-map nodes.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.iter().find(|(k, _)| k == name).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short shape name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I64(_) => "i64",
            Value::U64(_) => "u64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Instance(_) => "instance reference",
            Value::Catalog(_) => "catalog reference",
        }
    }
}

/// Error raised while bridging a serde type through [`Value`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValueError(String);

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ValueError {}

impl ser::Error for ValueError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        ValueError(msg.to_string())
    }
}

impl de::Error for ValueError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        ValueError(msg.to_string())
    }
}

/// Convert any `T: Serialize` into a [`Value`].
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value, ValueError> {
    value.serialize(ValueSerializer)
}

/// Convert a [`Value`] back into any `T: DeserializeOwned`.
pub fn from_value<T: de::DeserializeOwned>(value: Value) -> Result<T, ValueError> {
    T::deserialize(value)
}

// ---------------------------------------------------------------------------
// T -> Value
// ---------------------------------------------------------------------------

struct ValueSerializer;

/// Wraps `inner` in a single-entry map when it belongs to an enum variant.
fn tagged(variant: Option<&'static str>, inner: Value) -> Value {
    match variant {
        Some(name) => Value::Map(vec![(name.to_owned(), inner)]),
        None => inner,
    }
}

impl ser::Serializer for ValueSerializer {
    type Ok = Value;
    type Error = ValueError;
    type SerializeSeq = SeqBuilder;
    type SerializeTuple = SeqBuilder;
    type SerializeTupleStruct = SeqBuilder;
    type SerializeTupleVariant = SeqBuilder;
    type SerializeMap = MapBuilder;
    type SerializeStruct = MapBuilder;
    type SerializeStructVariant = MapBuilder;

    fn serialize_bool(self, v: bool) -> Result<Value, ValueError> {
        Ok(Value::Bool(v))
    }
    fn serialize_i8(self, v: i8) -> Result<Value, ValueError> {
        Ok(Value::I64(v.into()))
    }
    fn serialize_i16(self, v: i16) -> Result<Value, ValueError> {
        Ok(Value::I64(v.into()))
    }
    fn serialize_i32(self, v: i32) -> Result<Value, ValueError> {
        Ok(Value::I64(v.into()))
    }
    fn serialize_i64(self, v: i64) -> Result<Value, ValueError> {
        Ok(Value::I64(v))
    }
    fn serialize_u8(self, v: u8) -> Result<Value, ValueError> {
        Ok(Value::U64(v.into()))
    }
    fn serialize_u16(self, v: u16) -> Result<Value, ValueError> {
        Ok(Value::U64(v.into()))
    }
    fn serialize_u32(self, v: u32) -> Result<Value, ValueError> {
        Ok(Value::U64(v.into()))
    }
    fn serialize_u64(self, v: u64) -> Result<Value, ValueError> {
        Ok(Value::U64(v))
    }
    fn serialize_f32(self, v: f32) -> Result<Value, ValueError> {
        Ok(Value::F32(v))
    }
    fn serialize_f64(self, v: f64) -> Result<Value, ValueError> {
        Ok(Value::F64(v))
    }
    fn serialize_char(self, v: char) -> Result<Value, ValueError> {
        Ok(Value::String(v.to_string()))
    }
    fn serialize_str(self, v: &str) -> Result<Value, ValueError> {
        Ok(Value::String(v.to_owned()))
    }
    fn serialize_bytes(self, v: &[u8]) -> Result<Value, ValueError> {
        Ok(Value::Bytes(v.to_vec()))
    }
    fn serialize_none(self) -> Result<Value, ValueError> {
        Ok(Value::Null)
    }
    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<Value, ValueError> {
        value.serialize(self)
    }
    fn serialize_unit(self) -> Result<Value, ValueError> {
        Ok(Value::Null)
    }
    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value, ValueError> {
        Ok(Value::Null)
    }
    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<Value, ValueError> {
        Ok(Value::String(variant.to_owned()))
    }
    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Value, ValueError> {
        value.serialize(self)
    }
    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value, ValueError> {
        Ok(tagged(Some(variant), value.serialize(ValueSerializer)?))
    }
    fn serialize_seq(self, len: Option<usize>) -> Result<SeqBuilder, ValueError> {
        Ok(SeqBuilder::new(None, len.unwrap_or(0)))
    }
    fn serialize_tuple(self, len: usize) -> Result<SeqBuilder, ValueError> {
        Ok(SeqBuilder::new(None, len))
    }
    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<SeqBuilder, ValueError> {
        Ok(SeqBuilder::new(None, len))
    }
    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SeqBuilder, ValueError> {
        Ok(SeqBuilder::new(Some(variant), len))
    }
    fn serialize_map(self, len: Option<usize>) -> Result<MapBuilder, ValueError> {
        Ok(MapBuilder::new(None, len.unwrap_or(0)))
    }
    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<MapBuilder, ValueError> {
        Ok(MapBuilder::new(None, len))
    }
    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<MapBuilder, ValueError> {
        Ok(MapBuilder::new(Some(variant), len))
    }
}

/// Accumulates sequence, tuple and tuple-variant elements.
struct SeqBuilder {
    variant: Option<&'static str>,
    items: Vec<Value>,
}

impl SeqBuilder {
    fn new(variant: Option<&'static str>, capacity: usize) -> Self {
        Self {
            variant,
            items: Vec::with_capacity(capacity),
        }
    }

    fn push<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), ValueError> {
        self.items.push(value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn finish(self) -> Result<Value, ValueError> {
        Ok(tagged(self.variant, Value::List(self.items)))
    }
}

impl ser::SerializeSeq for SeqBuilder {
    type Ok = Value;
    type Error = ValueError;
    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), ValueError> {
        self.push(value)
    }
    fn end(self) -> Result<Value, ValueError> {
        self.finish()
    }
}

impl ser::SerializeTuple for SeqBuilder {
    type Ok = Value;
    type Error = ValueError;
    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), ValueError> {
        self.push(value)
    }
    fn end(self) -> Result<Value, ValueError> {
        self.finish()
    }
}

impl ser::SerializeTupleStruct for SeqBuilder {
    type Ok = Value;
    type Error = ValueError;
    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), ValueError> {
        self.push(value)
    }
    fn end(self) -> Result<Value, ValueError> {
        self.finish()
    }
}

impl ser::SerializeTupleVariant for SeqBuilder {
    type Ok = Value;
    type Error = ValueError;
    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), ValueError> {
        self.push(value)
    }
    fn end(self) -> Result<Value, ValueError> {
        self.finish()
    }
}

/// Accumulates map, struct and struct-variant entries.
struct MapBuilder {
    variant: Option<&'static str>,
    entries: Vec<(String, Value)>,
    key: Option<String>,
}

impl MapBuilder {
    fn new(variant: Option<&'static str>, capacity: usize) -> Self {
        Self {
            variant,
            entries: Vec::with_capacity(capacity),
            key: None,
        }
    }

    fn push<T: ?Sized + Serialize>(&mut self, key: String, value: &T) -> Result<(), ValueError> {
        self.entries.push((key, value.serialize(ValueSerializer)?));
        Ok(())
    }

    fn finish(self) -> Result<Value, ValueError> {
        Ok(tagged(self.variant, Value::Map(self.entries)))
    }
}

impl ser::SerializeMap for MapBuilder {
    type Ok = Value;
    type Error = ValueError;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), ValueError> {
        let key = match key.serialize(ValueSerializer)? {
            Value::String(s) => s,
            Value::I64(n) => n.to_string(),
            Value::U64(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => {
                return Err(ValueError(format!(
                    "map keys must be strings, found {}",
                    other.kind()
                )))
            }
        };
        self.key = Some(key);
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), ValueError> {
        let key = self
            .key
            .take()
            .ok_or_else(|| ValueError("map value without a key".into()))?;
        self.push(key, value)
    }

    fn end(self) -> Result<Value, ValueError> {
        self.finish()
    }
}

impl ser::SerializeStruct for MapBuilder {
    type Ok = Value;
    type Error = ValueError;
    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), ValueError> {
        self.push(key.to_owned(), value)
    }
    fn end(self) -> Result<Value, ValueError> {
        self.finish()
    }
}

impl ser::SerializeStructVariant for MapBuilder {
    type Ok = Value;
    type Error = ValueError;
    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), ValueError> {
        self.push(key.to_owned(), value)
    }
    fn end(self) -> Result<Value, ValueError> {
        self.finish()
    }
}

// ---------------------------------------------------------------------------
// Value -> T
// ---------------------------------------------------------------------------

impl<'de> IntoDeserializer<'de, ValueError> for Value {
    type Deserializer = Value;

    fn into_deserializer(self) -> Value {
        self
    }
}

impl<'de> de::Deserializer<'de> for Value {
    type Error = ValueError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ValueError> {
        match self {
            Value::Null => visitor.visit_unit(),
            Value::Bool(v) => visitor.visit_bool(v),
            Value::I64(v) => visitor.visit_i64(v),
            Value::U64(v) => visitor.visit_u64(v),
            Value::F32(v) => visitor.visit_f32(v),
            Value::F64(v) => visitor.visit_f64(v),
            Value::String(v) | Value::Instance(v) => visitor.visit_string(v),
            Value::Bytes(v) => visitor.visit_byte_buf(v),
            Value::Catalog(id) => visitor.visit_u32(id),
            Value::List(items) => {
                let mut seq: de::value::SeqDeserializer<_, ValueError> =
                    de::value::SeqDeserializer::new(items.into_iter());
                let out = visitor.visit_seq(&mut seq)?;
                seq.end()?;
                Ok(out)
            }
            Value::Map(entries) => {
                let entries = entries.into_iter().map(|(key, node)| (MapKey(key), node));
                let mut map: de::value::MapDeserializer<'de, _, ValueError> =
                    de::value::MapDeserializer::new(entries);
                let out = visitor.visit_map(&mut map)?;
                map.end()?;
                Ok(out)
            }
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ValueError> {
        match self {
            Value::Null => visitor.visit_none(),
            other => visitor.visit_some(other),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, ValueError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, ValueError> {
        match self {
            Value::String(variant) => visitor.visit_enum(VariantNode {
                variant,
                content: None,
            }),
            Value::Map(entries) if entries.len() == 1 => {
                let mut entries = entries.into_iter();
                match entries.next() {
                    Some((variant, content)) => visitor.visit_enum(VariantNode {
                        variant,
                        content: Some(content),
                    }),
                    None => Err(ValueError("empty enum node".into())),
                }
            }
            other => Err(ValueError(format!(
                "expected string or single-entry map for enum, found {}",
                other.kind()
            ))),
        }
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map struct
        identifier ignored_any
    }
}

/// A map key. Keys are stored as strings, so integer and bool keys are
/// parsed back into whatever type the target asks for.
struct MapKey(String);

impl MapKey {
    fn parse<T: std::str::FromStr>(&self, expected: &str) -> Result<T, ValueError> {
        self.0
            .parse()
            .map_err(|_| ValueError(format!("map key '{}' is not a valid {expected}", self.0)))
    }
}

macro_rules! parse_key {
    ($($method:ident => $ty:ty, $visit:ident;)*) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ValueError> {
            visitor.$visit(self.parse::<$ty>(stringify!($ty))?)
        }
    )*};
}

impl<'de> IntoDeserializer<'de, ValueError> for MapKey {
    type Deserializer = MapKey;

    fn into_deserializer(self) -> MapKey {
        self
    }
}

impl<'de> de::Deserializer<'de> for MapKey {
    type Error = ValueError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ValueError> {
        visitor.visit_string(self.0)
    }

    parse_key! {
        deserialize_bool => bool, visit_bool;
        deserialize_i8 => i8, visit_i8;
        deserialize_i16 => i16, visit_i16;
        deserialize_i32 => i32, visit_i32;
        deserialize_i64 => i64, visit_i64;
        deserialize_u8 => u8, visit_u8;
        deserialize_u16 => u16, visit_u16;
        deserialize_u32 => u32, visit_u32;
        deserialize_u64 => u64, visit_u64;
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ValueError> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, ValueError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, ValueError> {
        visitor.visit_enum(VariantNode {
            variant: self.0,
            content: None,
        })
    }

    serde::forward_to_deserialize_any! {
        i128 u128 f32 f64 char str string bytes byte_buf unit unit_struct seq
        tuple tuple_struct map struct identifier ignored_any
    }
}

/// An enum variant name plus its optional payload.
struct VariantNode {
    variant: String,
    content: Option<Value>,
}

impl<'de> de::EnumAccess<'de> for VariantNode {
    type Error = ValueError;
    type Variant = VariantContent;

    fn variant_seed<S: DeserializeSeed<'de>>(
        self,
        seed: S,
    ) -> Result<(S::Value, VariantContent), ValueError> {
        let name = seed.deserialize(Value::String(self.variant))?;
        Ok((name, VariantContent(self.content)))
    }
}

/// Payload of a variant, absent for unit variants stored as plain strings.
struct VariantContent(Option<Value>);

impl VariantContent {
    fn into_node(self) -> Value {
        self.0.unwrap_or(Value::Null)
    }
}

impl<'de> de::VariantAccess<'de> for VariantContent {
    type Error = ValueError;

    fn unit_variant(self) -> Result<(), ValueError> {
        match self.0 {
            None | Some(Value::Null) => Ok(()),
            Some(other) => Err(ValueError(format!(
                "expected unit variant, found {}",
                other.kind()
            ))),
        }
    }

    fn newtype_variant_seed<S: DeserializeSeed<'de>>(self, seed: S) -> Result<S::Value, ValueError> {
        seed.deserialize(self.into_node())
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, ValueError> {
        de::Deserializer::deserialize_any(self.into_node(), visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, ValueError> {
        de::Deserializer::deserialize_any(self.into_node(), visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_map_to_widest_node() {
        assert_eq!(to_value(&7u8).unwrap(), Value::U64(7));
        assert_eq!(to_value(&-3i16).unwrap(), Value::I64(-3));
        assert_eq!(to_value(&'x').unwrap(), Value::String("x".into()));
        assert_eq!(to_value(&None::<u32>).unwrap(), Value::Null);
    }

    #[test]
    fn integers_cross_sign_when_in_range() {
        assert_eq!(from_value::<u32>(Value::I64(12)).unwrap(), 12);
        assert_eq!(from_value::<i8>(Value::U64(100)).unwrap(), 100);
        assert!(from_value::<u8>(Value::I64(-1)).is_err());
        assert!(from_value::<u8>(Value::U64(300)).is_err());
    }

    #[test]
    fn shape_mismatch_is_an_error() {
        assert!(from_value::<bool>(Value::String("yes".into())).is_err());
        assert!(from_value::<String>(Value::U64(1)).is_err());
    }

    #[test]
    fn struct_and_enum_shapes() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        enum Shape {
            Point,
            Circle(f32),
            Rect { w: u32, h: u32 },
            Pair(i32, i32),
        }

        let rect = to_value(&Shape::Rect { w: 2, h: 3 }).unwrap();
        assert_eq!(
            rect,
            Value::Map(vec![(
                "Rect".into(),
                Value::Map(vec![("w".into(), Value::U64(2)), ("h".into(), Value::U64(3))])
            )])
        );
        assert_eq!(from_value::<Shape>(rect).unwrap(), Shape::Rect { w: 2, h: 3 });

        for shape in [Shape::Point, Shape::Circle(1.5), Shape::Pair(-1, 4)] {
            let node = to_value(&shape).unwrap();
            assert_eq!(from_value::<Shape>(node).unwrap(), shape);
        }
    }

    #[test]
    fn map_lookup() {
        let node = Value::Map(vec![("a".into(), Value::Bool(true))]);
        assert_eq!(node.get("a"), Some(&Value::Bool(true)));
        assert_eq!(node.get("b"), None);
        assert_eq!(Value::U64(1).get("a"), None);
    }

    #[test]
    fn numeric_map_keys_become_strings() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(3u32, true);
        assert_eq!(
            to_value(&map).unwrap(),
            Value::Map(vec![("3".into(), Value::Bool(true))])
        );
    }

    #[test]
    fn non_string_map_keys_load_back() {
        use std::collections::{BTreeMap, HashMap};

        let by_level = BTreeMap::from([(1u32, 10u64), (2, 20)]);
        let node = to_value(&by_level).unwrap();
        assert_eq!(from_value::<BTreeMap<u32, u64>>(node).unwrap(), by_level);

        let offsets = BTreeMap::from([(-4i64, "low".to_owned()), (9, "high".to_owned())]);
        let node = to_value(&offsets).unwrap();
        assert_eq!(from_value::<BTreeMap<i64, String>>(node).unwrap(), offsets);

        let flags = HashMap::from([(true, 1u8), (false, 0)]);
        let node = to_value(&flags).unwrap();
        assert_eq!(from_value::<HashMap<bool, u8>>(node).unwrap(), flags);
    }

    #[test]
    fn enum_map_keys_load_back() {
        #[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
        enum Slot {
            Head,
            Hand,
        }

        let gear = std::collections::BTreeMap::from([(Slot::Head, 2u32), (Slot::Hand, 5)]);
        let node = to_value(&gear).unwrap();
        assert_eq!(
            from_value::<std::collections::BTreeMap<Slot, u32>>(node).unwrap(),
            gear
        );
    }

    #[test]
    fn unparsable_map_key_is_an_error() {
        let node = Value::Map(vec![("north".into(), Value::U64(1))]);
        assert!(from_value::<std::collections::BTreeMap<u32, u64>>(node).is_err());
    }
}

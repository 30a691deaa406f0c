//! The value codec.
//!
//! [`Field`] converts one in-memory value to and from a document node.
//! Scalars map onto plain nodes, containers recurse element by element, and
//! persistable objects (via `#[derive(Persist)]`) open a nested object node
//! and run their own member walk.
//!
//! Sequence and map elements decode through
//! [`decode_element`](Field::decode_element), which lets live-instance
//! references inside containers spawn or link eagerly during phase 0.

use std::collections::{BTreeMap, HashMap};
use std::ops::{Deref, DerefMut};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::serialize::{
    from_value, to_value, DeserializeContext, FieldError, SerializeContext, SerializeError, Value,
};

/// Conversion between one in-memory value and one document node.
pub trait Field {
    /// Encode `self`. `Ok(None)` omits the field from the document.
    fn encode(&self, ctx: &mut SerializeContext<'_>) -> Result<Option<Value>, SerializeError>;

    /// Decode `node` into `self`.
    ///
    /// `node` borrows the parsed document for as long as `ctx` does. On
    /// error `self` is left as it was, except for references which are
    /// cleared when the stored target cannot be found.
    fn decode<'d>(
        &mut self,
        node: &'d Value,
        ctx: &mut DeserializeContext<'d>,
    ) -> Result<(), FieldError>;

    /// Decode `node` as an element of a sequence or map.
    fn decode_element<'d>(
        &mut self,
        node: &'d Value,
        ctx: &mut DeserializeContext<'d>,
    ) -> Result<(), FieldError> {
        self.decode(node, ctx)
    }
}

/// Creates fresh destination values for container elements and optional
/// fields during decode.
pub trait Instantiate {
    fn instantiate() -> Self;
}

impl<T: Default> Instantiate for T {
    fn instantiate() -> Self {
        T::default()
    }
}

fn serde_decode<T: DeserializeOwned>(node: &Value) -> Result<T, FieldError> {
    from_value(node.clone()).map_err(|_| FieldError::mismatch(std::any::type_name::<T>(), node))
}

macro_rules! signed_field {
    ($($ty:ty),* $(,)?) => {$(
        impl Field for $ty {
            fn encode(&self, _ctx: &mut SerializeContext<'_>) -> Result<Option<Value>, SerializeError> {
                Ok(Some(Value::I64(*self as i64)))
            }

            fn decode<'d>(
                &mut self,
                node: &'d Value,
                _ctx: &mut DeserializeContext<'d>,
            ) -> Result<(), FieldError> {
                *self = serde_decode(node)?;
                Ok(())
            }
        }
    )*};
}

macro_rules! unsigned_field {
    ($($ty:ty),* $(,)?) => {$(
        impl Field for $ty {
            fn encode(&self, _ctx: &mut SerializeContext<'_>) -> Result<Option<Value>, SerializeError> {
                Ok(Some(Value::U64(*self as u64)))
            }

            fn decode<'d>(
                &mut self,
                node: &'d Value,
                _ctx: &mut DeserializeContext<'d>,
            ) -> Result<(), FieldError> {
                *self = serde_decode(node)?;
                Ok(())
            }
        }
    )*};
}

signed_field!(i8, i16, i32, i64, isize);
unsigned_field!(u8, u16, u32, u64, usize);

macro_rules! plain_field {
    ($($ty:ty => |$v:ident| $encode:expr),* $(,)?) => {$(
        impl Field for $ty {
            fn encode(&self, _ctx: &mut SerializeContext<'_>) -> Result<Option<Value>, SerializeError> {
                let $v = self;
                Ok(Some($encode))
            }

            fn decode<'d>(
                &mut self,
                node: &'d Value,
                _ctx: &mut DeserializeContext<'d>,
            ) -> Result<(), FieldError> {
                *self = serde_decode(node)?;
                Ok(())
            }
        }
    )*};
}

plain_field! {
    bool => |v| Value::Bool(*v),
    f32 => |v| Value::F32(*v),
    f64 => |v| Value::F64(*v),
    char => |v| Value::String(v.to_string()),
    String => |v| Value::String(v.clone()),
}

/// Raw document nodes pass through untouched.
impl Field for Value {
    fn encode(&self, _ctx: &mut SerializeContext<'_>) -> Result<Option<Value>, SerializeError> {
        Ok(Some(self.clone()))
    }

    fn decode<'d>(
        &mut self,
        node: &'d Value,
        _ctx: &mut DeserializeContext<'d>,
    ) -> Result<(), FieldError> {
        *self = node.clone();
        Ok(())
    }
}

impl<T: Field + Instantiate> Field for Option<T> {
    fn encode(&self, ctx: &mut SerializeContext<'_>) -> Result<Option<Value>, SerializeError> {
        match self {
            Some(inner) => inner.encode(ctx),
            None => Ok(None),
        }
    }

    fn decode<'d>(
        &mut self,
        node: &'d Value,
        ctx: &mut DeserializeContext<'d>,
    ) -> Result<(), FieldError> {
        if node.is_null() {
            *self = None;
            return Ok(());
        }
        match self {
            Some(inner) => inner.decode(node, ctx),
            None => {
                let mut inner = T::instantiate();
                inner.decode(node, ctx)?;
                *self = Some(inner);
                Ok(())
            }
        }
    }

    fn decode_element<'d>(
        &mut self,
        node: &'d Value,
        ctx: &mut DeserializeContext<'d>,
    ) -> Result<(), FieldError> {
        if node.is_null() {
            *self = None;
            return Ok(());
        }
        let mut inner = self.take().unwrap_or_else(T::instantiate);
        let result = inner.decode_element(node, ctx);
        *self = Some(inner);
        result
    }
}

impl<T: Field> Field for Box<T> {
    fn encode(&self, ctx: &mut SerializeContext<'_>) -> Result<Option<Value>, SerializeError> {
        (**self).encode(ctx)
    }

    fn decode<'d>(
        &mut self,
        node: &'d Value,
        ctx: &mut DeserializeContext<'d>,
    ) -> Result<(), FieldError> {
        (**self).decode(node, ctx)
    }

    fn decode_element<'d>(
        &mut self,
        node: &'d Value,
        ctx: &mut DeserializeContext<'d>,
    ) -> Result<(), FieldError> {
        (**self).decode_element(node, ctx)
    }
}

fn encode_elements<'t, T: Field + 't>(
    items: impl Iterator<Item = &'t T>,
    ctx: &mut SerializeContext<'_>,
) -> Result<Value, SerializeError> {
    let mut nodes = Vec::new();
    for item in items {
        nodes.push(item.encode(ctx)?.unwrap_or(Value::Null));
    }
    Ok(Value::List(nodes))
}

fn decode_into<'d, T: Field>(
    slot: &mut T,
    index: usize,
    node: &'d Value,
    ctx: &mut DeserializeContext<'d>,
) {
    if let Err(err) = slot.decode_element(node, ctx) {
        log::warn!("Element {index} not loaded: {err}");
    }
}

/// Sequences are rebuilt with the stored length on every decode.
impl<T: Field + Instantiate> Field for Vec<T> {
    fn encode(&self, ctx: &mut SerializeContext<'_>) -> Result<Option<Value>, SerializeError> {
        encode_elements(self.iter(), ctx).map(Some)
    }

    fn decode<'d>(
        &mut self,
        node: &'d Value,
        ctx: &mut DeserializeContext<'d>,
    ) -> Result<(), FieldError> {
        let Value::List(items) = node else {
            return Err(FieldError::mismatch("list", node));
        };
        let mut rebuilt = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let mut element = T::instantiate();
            decode_into(&mut element, index, item, ctx);
            rebuilt.push(element);
        }
        *self = rebuilt;
        Ok(())
    }
}

/// Fixed-size arrays keep their declared length; extra stored elements are
/// ignored and missing ones stay fresh.
impl<T: Field + Instantiate, const N: usize> Field for [T; N] {
    fn encode(&self, ctx: &mut SerializeContext<'_>) -> Result<Option<Value>, SerializeError> {
        encode_elements(self.iter(), ctx).map(Some)
    }

    fn decode<'d>(
        &mut self,
        node: &'d Value,
        ctx: &mut DeserializeContext<'d>,
    ) -> Result<(), FieldError> {
        let Value::List(items) = node else {
            return Err(FieldError::mismatch(format!("list of {N}"), node));
        };
        if items.len() != N {
            log::debug!("Stored list has {} elements, expected {N}", items.len());
        }
        let mut rebuilt: [T; N] = std::array::from_fn(|_| T::instantiate());
        for (index, (slot, item)) in rebuilt.iter_mut().zip(items).enumerate() {
            decode_into(slot, index, item, ctx);
        }
        *self = rebuilt;
        Ok(())
    }
}

macro_rules! string_map_field {
    ($map:ident) => {
        /// Entries are stored as named children in key order. Decode updates
        /// entries in place; keys absent from the document are kept.
        impl<T: Field + Instantiate> Field for $map<String, T> {
            fn encode(
                &self,
                ctx: &mut SerializeContext<'_>,
            ) -> Result<Option<Value>, SerializeError> {
                let mut keys: Vec<&String> = self.keys().collect();
                keys.sort();
                let mut entries = Vec::with_capacity(keys.len());
                for key in keys {
                    if let Some(node) = self[key].encode(ctx)? {
                        entries.push((key.clone(), node));
                    }
                }
                Ok(Some(Value::Map(entries)))
            }

            fn decode<'d>(
                &mut self,
                node: &'d Value,
                ctx: &mut DeserializeContext<'d>,
            ) -> Result<(), FieldError> {
                let Value::Map(entries) = node else {
                    return Err(FieldError::mismatch("map", node));
                };
                for (key, item) in entries {
                    let slot = self.entry(key.clone()).or_insert_with(T::instantiate);
                    if let Err(err) = slot.decode_element(item, ctx) {
                        log::warn!("Entry '{key}' not loaded: {err}");
                    }
                }
                Ok(())
            }
        }
    };
}

string_map_field!(HashMap);
string_map_field!(BTreeMap);

/// Stores any serde type as a plain node.
///
/// Use for leaf types that have no [`Field`] impl of their own, or mark the
/// struct field `#[persist(serde)]` to get the same behavior without the
/// wrapper.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Serde<T>(pub T);

impl<T> Deref for Serde<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Serde<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T: Serialize + DeserializeOwned> Field for Serde<T> {
    fn encode(&self, _ctx: &mut SerializeContext<'_>) -> Result<Option<Value>, SerializeError> {
        to_value(&self.0)
            .map(Some)
            .map_err(|e| SerializeError::FieldError {
                field: std::any::type_name::<T>().to_owned(),
                message: e.to_string(),
            })
    }

    fn decode<'d>(
        &mut self,
        node: &'d Value,
        _ctx: &mut DeserializeContext<'d>,
    ) -> Result<(), FieldError> {
        self.0 = serde_decode(node)?;
        Ok(())
    }
}

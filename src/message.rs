//! # Dynamic Messages
//!
//! In-memory message values for the schema-driven codec.
//!
//! A [`Message`] maps tags to values in ascending tag order. Presence is
//! explicit: a field is present exactly when its tag is in the map, so a
//! present zero is still encoded. Repeated fields are ordered vectors with
//! append operations.
//!
//! [`MessageBuilder`] sets fields by name and checks every call against a
//! [`MessageDescriptor`] so typos and label mistakes fail at construction
//! instead of at encode time.
//!
//! ## Example
//! ```rust
//! use protowire::message::{Message, Value};
//!
//! let mut phone = Message::new();
//! phone.set(1, "555-4321").set(2, 1u64);
//!
//! let mut person = Message::new();
//! person.set(1, "John Doe").set(2, 1234i64);
//! person.push(4, phone);
//! assert_eq!(person.repeated(4).len(), 1);
//! assert_eq!(person.get(1).and_then(Value::as_str), Some("John Doe"));
//! ```

use crate::error::{CodecError, Result};
use crate::schema::MessageDescriptor;
use bytes::Bytes;
use std::collections::btree_map::{self, BTreeMap};

/// A single field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `int32`, `int64`, `enum`
    Int(i64),
    /// `uint32`, `uint64`, `fixed32`, `fixed64`
    UInt(u64),
    Bool(bool),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Bytes),
    Message(Message),
}

impl Value {
    /// Short name of the variant, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Int(_) => "signed integer",
            Value::UInt(_) => "unsigned integer",
            Value::Bool(_) => "bool",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Message(_) => "message",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int(v) => Some(v),
            Value::UInt(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::UInt(v) => Some(v),
            Value::Int(v) => u64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            Value::String(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&Message> {
        match self {
            Value::Message(m) => Some(m),
            _ => None,
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

value_from! {
    i8 => Int, i16 => Int, i32 => Int, i64 => Int,
    u8 => UInt, u16 => UInt, u32 => UInt, u64 => UInt,
    bool => Bool,
    f32 => Float,
    f64 => Double,
    String => String,
    &str => String,
    Bytes => Bytes,
    Vec<u8> => Bytes,
    Message => Message,
}

/// Singular or repeated content of one field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Single(Value),
    Repeated(Vec<Value>),
}

impl FieldValue {
    /// Values in order; a singular field yields one element
    pub fn values(&self) -> &[Value] {
        match self {
            FieldValue::Single(v) => std::slice::from_ref(v),
            FieldValue::Repeated(vs) => vs,
        }
    }
}

/// Ordered mapping from tag to field value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    fields: BTreeMap<u32, FieldValue>,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a singular field, replacing any previous content
    pub fn set(&mut self, tag: u32, value: impl Into<Value>) -> &mut Self {
        self.fields.insert(tag, FieldValue::Single(value.into()));
        self
    }

    /// Builder-style [`Message::set`]
    pub fn with(mut self, tag: u32, value: impl Into<Value>) -> Self {
        self.set(tag, value);
        self
    }

    /// Append one element to a repeated field
    pub fn push(&mut self, tag: u32, value: impl Into<Value>) -> &mut Self {
        self.repeated_mut(tag).push(value.into());
        self
    }

    /// Append every element of `values` to a repeated field
    pub fn extend<I, V>(&mut self, tag: u32, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.repeated_mut(tag).extend(values.into_iter().map(Into::into));
        self
    }

    /// Mutable access to a repeated field, creating it empty if absent.
    /// A singular value already stored under `tag` becomes the first element.
    pub fn repeated_mut(&mut self, tag: u32) -> &mut Vec<Value> {
        let entry = self
            .fields
            .entry(tag)
            .or_insert_with(|| FieldValue::Repeated(Vec::new()));
        if let FieldValue::Single(v) = entry {
            let first = std::mem::replace(v, Value::Bool(false));
            *entry = FieldValue::Repeated(vec![first]);
        }
        match entry {
            FieldValue::Repeated(values) => values,
            FieldValue::Single(_) => unreachable!("singular field converted above"),
        }
    }

    /// The singular value under `tag`, or the last element of a repeated field
    pub fn get(&self, tag: u32) -> Option<&Value> {
        self.fields.get(&tag).and_then(|f| f.values().last())
    }

    /// Mutable singular value under `tag`
    pub fn get_mut(&mut self, tag: u32) -> Option<&mut Value> {
        match self.fields.get_mut(&tag) {
            Some(FieldValue::Single(v)) => Some(v),
            Some(FieldValue::Repeated(vs)) => vs.last_mut(),
            None => None,
        }
    }

    /// All values under `tag` in order (empty if absent)
    pub fn repeated(&self, tag: u32) -> &[Value] {
        self.fields.get(&tag).map(FieldValue::values).unwrap_or(&[])
    }

    pub fn field(&self, tag: u32) -> Option<&FieldValue> {
        self.fields.get(&tag)
    }

    pub fn contains(&self, tag: u32) -> bool {
        self.fields.contains_key(&tag)
    }

    pub fn remove(&mut self, tag: u32) -> Option<FieldValue> {
        self.fields.remove(&tag)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields in ascending tag order
    pub fn iter(&self) -> btree_map::Iter<'_, u32, FieldValue> {
        self.fields.iter()
    }
}

impl<'a> IntoIterator for &'a Message {
    type Item = (&'a u32, &'a FieldValue);
    type IntoIter = btree_map::Iter<'a, u32, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// Name-based message construction checked against a descriptor
#[derive(Debug)]
pub struct MessageBuilder<'d> {
    descriptor: &'d MessageDescriptor,
    message: Message,
}

impl<'d> MessageBuilder<'d> {
    pub fn new(descriptor: &'d MessageDescriptor) -> Self {
        Self {
            descriptor,
            message: Message::new(),
        }
    }

    /// Set a singular field by name
    pub fn set(mut self, name: &str, value: impl Into<Value>) -> Result<Self> {
        let (tag, repeated) = self.lookup(name)?;
        if repeated {
            return Err(self.mismatch(tag, format!("'{name}' is repeated, use push")));
        }
        self.message.set(tag, value);
        Ok(self)
    }

    /// Append to a repeated field by name
    pub fn push(mut self, name: &str, value: impl Into<Value>) -> Result<Self> {
        let (tag, repeated) = self.lookup(name)?;
        if !repeated {
            return Err(self.mismatch(tag, format!("'{name}' is not repeated, use set")));
        }
        self.message.push(tag, value);
        Ok(self)
    }

    /// Append several elements to a repeated field by name
    pub fn extend<I, V>(mut self, name: &str, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let (tag, repeated) = self.lookup(name)?;
        if !repeated {
            return Err(self.mismatch(tag, format!("'{name}' is not repeated, use set")));
        }
        self.message.extend(tag, values);
        Ok(self)
    }

    pub fn build(self) -> Message {
        self.message
    }

    fn lookup(&self, name: &str) -> Result<(u32, bool)> {
        let field = self.descriptor.field_by_name(name).ok_or_else(|| {
            CodecError::UnknownField(format!("{}.{name}", self.descriptor.name))
        })?;
        Ok((field.tag, field.is_repeated()))
    }

    fn mismatch(&self, tag: u32, reason: String) -> CodecError {
        CodecError::SchemaMismatch {
            tag,
            offset: None,
            reason: format!("{}: {reason}", self.descriptor.name),
        }
    }
}

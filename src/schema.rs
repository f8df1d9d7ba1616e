//! # Schema Descriptors
//!
//! Fixed, load-time description of message types: field names, tags, scalar
//! or message types, labels and the packing policy of repeated scalars.
//!
//! Descriptors are built in code or loaded from TOML. They are validated once
//! by [`Schema::new`]; the codec relies on that validation and never re-checks
//! tag ranges or dangling message references.
//!
//! ## TOML layout
//! ```toml
//! package = "tutorial"
//!
//! [[messages]]
//! name = "Person"
//! fields = [
//!   { name = "name", tag = 1, type = "string", label = "required" },
//!   { name = "id", tag = 2, type = "int32", label = "required" },
//!   { name = "phone", tag = 4, type = { message = "PhoneNumber" }, label = "repeated" },
//! ]
//! ```

use crate::core::wire::{is_valid_tag, WireType, MAX_TAG};
use crate::error::{CodecError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::path::Path;

/// Scalar field types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    Int32,
    Int64,
    Uint32,
    Uint64,
    Bool,
    Enum,
    Fixed32,
    Fixed64,
    Float,
    Double,
    String,
    Bytes,
}

impl ScalarType {
    /// Wire type of a single (unpacked) value
    pub fn wire_type(self) -> WireType {
        match self {
            ScalarType::Int32
            | ScalarType::Int64
            | ScalarType::Uint32
            | ScalarType::Uint64
            | ScalarType::Bool
            | ScalarType::Enum => WireType::Varint,
            ScalarType::Fixed32 | ScalarType::Float => WireType::Fixed32,
            ScalarType::Fixed64 | ScalarType::Double => WireType::Fixed64,
            ScalarType::String | ScalarType::Bytes => WireType::LengthDelimited,
        }
    }

    /// Only numeric scalars may use the packed layout
    pub fn is_packable(self) -> bool {
        self.wire_type() != WireType::LengthDelimited
    }

    /// Name used in `.proto` text
    pub fn proto_name(self) -> &'static str {
        match self {
            ScalarType::Int32 => "int32",
            ScalarType::Int64 => "int64",
            ScalarType::Uint32 => "uint32",
            ScalarType::Uint64 => "uint64",
            ScalarType::Bool => "bool",
            // enum definitions are not part of the descriptor model
            ScalarType::Enum => "int32",
            ScalarType::Fixed32 => "fixed32",
            ScalarType::Fixed64 => "fixed64",
            ScalarType::Float => "float",
            ScalarType::Double => "double",
            ScalarType::String => "string",
            ScalarType::Bytes => "bytes",
        }
    }
}

/// Type of a field: a scalar or a reference to another message by name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldType {
    Scalar(ScalarType),
    Message { message: String },
}

impl FieldType {
    pub fn message(name: impl Into<String>) -> Self {
        FieldType::Message {
            message: name.into(),
        }
    }

    pub fn wire_type(&self) -> WireType {
        match self {
            FieldType::Scalar(scalar) => scalar.wire_type(),
            FieldType::Message { .. } => WireType::LengthDelimited,
        }
    }
}

impl From<ScalarType> for FieldType {
    fn from(scalar: ScalarType) -> Self {
        FieldType::Scalar(scalar)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    /// Singular, may be absent
    #[default]
    Optional,
    /// Singular; only affects `.proto` rendering, presence is not enforced
    Required,
    Repeated,
}

impl Label {
    pub fn as_str(self) -> &'static str {
        match self {
            Label::Optional => "optional",
            Label::Required => "required",
            Label::Repeated => "repeated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub tag: u32,
    #[serde(rename = "type")]
    pub ty: FieldType,
    #[serde(default)]
    pub label: Label,
    /// Encode as a single length-delimited run (repeated numeric scalars only)
    #[serde(default)]
    pub packed: bool,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, tag: u32, ty: impl Into<FieldType>) -> Self {
        Self {
            name: name.into(),
            tag,
            ty: ty.into(),
            label: Label::Optional,
            packed: false,
        }
    }

    /// Field holding a nested message of type `message`
    pub fn message(name: impl Into<String>, tag: u32, message: impl Into<String>) -> Self {
        Self::new(name, tag, FieldType::message(message))
    }

    pub fn required(mut self) -> Self {
        self.label = Label::Required;
        self
    }

    pub fn repeated(mut self) -> Self {
        self.label = Label::Repeated;
        self
    }

    /// Repeated with the packed layout
    pub fn packed(mut self) -> Self {
        self.label = Label::Repeated;
        self.packed = true;
        self
    }

    #[inline]
    pub fn is_repeated(&self) -> bool {
        self.label == Label::Repeated
    }

    /// Wire type of one element on the wire when not packed
    #[inline]
    pub fn wire_type(&self) -> WireType {
        self.ty.wire_type()
    }

    /// Whether a length-delimited occurrence may carry packed elements
    pub fn accepts_packed(&self) -> bool {
        self.is_repeated() && matches!(self.ty, FieldType::Scalar(s) if s.is_packable())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDescriptor {
    pub name: String,
    /// Always sorted by tag
    #[serde(deserialize_with = "sorted_fields")]
    fields: Vec<FieldDescriptor>,
}

impl MessageDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field (builder style), keeping fields ordered by tag.
    /// Fields sharing a tag stay in insertion order so validation sees both.
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        let at = self.fields.partition_point(|f| f.tag <= field.tag);
        self.fields.insert(at, field);
        self
    }

    /// Fields in ascending tag order
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Look up a field by tag
    pub fn field_by_tag(&self, tag: u32) -> Option<&FieldDescriptor> {
        self.fields
            .binary_search_by_key(&tag, |f| f.tag)
            .ok()
            .map(|idx| &self.fields[idx])
    }

    /// Look up a field by name
    pub fn field_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn validate(&self, known: &HashSet<&str>) -> Vec<String> {
        let mut errors = Vec::new();
        let mut tags = HashSet::new();
        let mut names = HashSet::new();

        for field in &self.fields {
            let at = format!("{}.{}", self.name, field.name);
            if field.name.is_empty() {
                errors.push(format!("{}: field with tag {} has no name", self.name, field.tag));
            } else if !names.insert(field.name.as_str()) {
                errors.push(format!("{at}: duplicate field name"));
            }

            if !is_valid_tag(field.tag) {
                errors.push(format!(
                    "{at}: tag {} outside 1..={MAX_TAG}",
                    field.tag
                ));
            } else if !tags.insert(field.tag) {
                errors.push(format!("{at}: duplicate tag {}", field.tag));
            }

            if field.packed && !field.accepts_packed() {
                errors.push(format!(
                    "{at}: packed is only valid on repeated numeric scalars"
                ));
            }

            if let FieldType::Message { message } = &field.ty {
                if !known.contains(message.as_str()) {
                    errors.push(format!("{at}: unknown message type '{message}'"));
                }
            }
        }

        errors
    }
}

fn sorted_fields<'de, D>(deserializer: D) -> std::result::Result<Vec<FieldDescriptor>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let mut fields = Vec::<FieldDescriptor>::deserialize(deserializer)?;
    fields.sort_by_key(|f| f.tag);
    Ok(fields)
}

/// A validated set of message descriptors
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    messages: Vec<MessageDescriptor>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

#[derive(Deserialize)]
struct SchemaFile {
    package: Option<String>,
    #[serde(default)]
    messages: Vec<MessageDescriptor>,
}

impl Schema {
    /// Validate descriptors and build the lookup index.
    ///
    /// # Errors
    /// `InvalidSchema` listing every problem found: duplicate or out-of-range
    /// tags, duplicate names, `packed` on a non-packable field, or a reference
    /// to a message type that is not in the set.
    pub fn new(package: Option<String>, messages: Vec<MessageDescriptor>) -> Result<Self> {
        let mut errors = Vec::new();
        let mut known = HashSet::new();
        for message in &messages {
            if message.name.is_empty() {
                errors.push("message with empty name".to_string());
            } else if !known.insert(message.name.as_str()) {
                errors.push(format!("duplicate message '{}'", message.name));
            }
        }
        for message in &messages {
            errors.extend(message.validate(&known));
        }
        if !errors.is_empty() {
            return Err(CodecError::InvalidSchema(errors.join("; ")));
        }
        let index = messages
            .iter()
            .enumerate()
            .map(|(i, m)| (m.name.clone(), i))
            .collect();

        Ok(Self {
            package,
            messages,
            index,
        })
    }

    /// Load a schema from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let file: SchemaFile = toml::from_str(content)
            .map_err(|e| CodecError::InvalidSchema(format!("Failed to parse TOML: {e}")))?;
        Self::new(file.package, file.messages)
    }

    /// Load a schema from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CodecError::InvalidSchema(format!("Failed to serialize schema: {e}")))
    }

    /// Descriptor for `name`, or `UnknownMessageType`
    pub fn message(&self, name: &str) -> Result<&MessageDescriptor> {
        self.index
            .get(name)
            .map(|&i| &self.messages[i])
            .ok_or_else(|| CodecError::UnknownMessageType(name.to_string()))
    }

    pub fn messages(&self) -> &[MessageDescriptor] {
        &self.messages
    }

    /// Render the schema as proto2 source text
    pub fn to_proto(&self) -> String {
        let mut out = String::new();
        if let Some(package) = &self.package {
            let _ = writeln!(out, "package {package};");
        }
        for message in &self.messages {
            let _ = write!(out, "\nmessage {} {{\n", message.name);
            for field in &message.fields {
                let ty = match &field.ty {
                    FieldType::Scalar(s) => s.proto_name(),
                    FieldType::Message { message } => message.as_str(),
                };
                let packed = if field.packed { " [packed = true]" } else { "" };
                let _ = writeln!(
                    out,
                    "\t{} {} {} = {}{};",
                    field.label.as_str(),
                    ty,
                    field.name,
                    field.tag,
                    packed
                );
            }
            out.push_str("}\n");
        }
        out
    }
}

//! `.proto` schema inference from a parsed [`RawMessage`].
//!
//! Every message shape becomes a `MSGn` descriptor, numbered in the order
//! shapes are first completed (children before parents). Shapes whose fields
//! render identically share one descriptor. Fields are named `fldN` after
//! their tag. A tag seen once is `required`; a tag seen more than once is
//! `repeated` and typed from its first occurrence.

use super::{RawMessage, RawValue};
use crate::error::Result;
use crate::schema::{FieldDescriptor, FieldType, MessageDescriptor, ScalarType, Schema};
use std::collections::HashMap;

/// Package name of every inferred schema
pub const INFERRED_PACKAGE: &str = "ProtodecMessages";

/// An inferred schema and the name of the top-level message type
#[derive(Debug, Clone)]
pub struct InferredSchema {
    pub schema: Schema,
    pub root: String,
}

impl InferredSchema {
    /// Render as `.proto` text
    pub fn to_proto(&self) -> String {
        self.schema.to_proto()
    }
}

/// Infer descriptors for `message` and everything nested in it
pub fn infer_schema(message: &RawMessage) -> Result<InferredSchema> {
    let mut inference = Inference::default();
    let root = inference.visit(message);
    let schema = Schema::new(Some(INFERRED_PACKAGE.to_string()), inference.messages)?;
    Ok(InferredSchema { schema, root })
}

#[derive(Default)]
struct Inference {
    messages: Vec<MessageDescriptor>,
    shapes: HashMap<Vec<FieldDescriptor>, String>,
}

impl Inference {
    fn visit(&mut self, message: &RawMessage) -> String {
        let mut fields = Vec::with_capacity(message.len());
        for (&tag, values) in message {
            let Some(first) = values.first() else {
                continue;
            };
            let field = FieldDescriptor::new(format!("fld{tag}"), tag, self.field_type(first));
            fields.push(if values.len() > 1 {
                field.repeated()
            } else {
                field.required()
            });
        }

        if let Some(name) = self.shapes.get(&fields) {
            return name.clone();
        }
        let name = format!("MSG{}", self.messages.len() + 1);
        self.shapes.insert(fields.clone(), name.clone());
        let descriptor = fields
            .into_iter()
            .fold(MessageDescriptor::new(name.clone()), MessageDescriptor::field);
        self.messages.push(descriptor);
        name
    }

    fn field_type(&mut self, value: &RawValue) -> FieldType {
        match value {
            RawValue::Varint(_) => ScalarType::Int64.into(),
            RawValue::Fixed64(_) => ScalarType::Double.into(),
            RawValue::Fixed32(_) => ScalarType::Float.into(),
            RawValue::Text(_) => ScalarType::String.into(),
            RawValue::Bytes(_) => ScalarType::Bytes.into(),
            RawValue::Message(nested) => FieldType::message(self.visit(nested)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phone(number: &str, kind: u64) -> RawValue {
        let mut m = RawMessage::new();
        m.push(1, RawValue::Text(number.into()));
        m.push(2, RawValue::Varint(kind));
        RawValue::Message(m)
    }

    #[test]
    fn test_identical_shapes_share_a_type() {
        let mut person = RawMessage::new();
        person.push(1, RawValue::Text("John Doe".into()));
        person.push(4, phone("555-4321", 1));
        let mut root = RawMessage::new();
        root.push(1, RawValue::Message(person));
        root.push(2, phone("555-0000", 2));

        let inferred = infer_schema(&root).unwrap();
        let names: Vec<&str> = inferred
            .schema
            .messages()
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(names, vec!["MSG1", "MSG2", "MSG3"]);
        assert_eq!(inferred.root, "MSG3");
        assert_eq!(
            inferred.to_proto(),
            "package ProtodecMessages;\n\
             \nmessage MSG1 {\n\trequired string fld1 = 1;\n\trequired int64 fld2 = 2;\n}\n\
             \nmessage MSG2 {\n\trequired string fld1 = 1;\n\trequired MSG1 fld4 = 4;\n}\n\
             \nmessage MSG3 {\n\trequired MSG2 fld1 = 1;\n\trequired MSG1 fld2 = 2;\n}\n"
        );
    }

    #[test]
    fn test_repeated_typed_from_first_element() {
        let mut root = RawMessage::new();
        root.push(3, RawValue::Fixed32(0));
        root.push(3, RawValue::Varint(1));
        root.push(5, RawValue::Fixed64(0));

        let inferred = infer_schema(&root).unwrap();
        assert_eq!(
            inferred.to_proto(),
            "package ProtodecMessages;\n\nmessage MSG1 {\n\trepeated float fld3 = 3;\n\trequired double fld5 = 5;\n}\n"
        );
    }
}

//! The schema IR: a resolved protobuf schema, decoupled from descriptor syntax.

use std::fmt;

use polyglot_schema::ScalarType;
use serde::{Deserialize, Serialize};

use crate::error::CompileError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Unique name of the schema, usually its source file path.
    pub name:     String,
    #[serde(default)]
    pub package:  Option<String>,
    /// Names of already-compiled schemas this one refers to.
    #[serde(default)]
    pub imports:  Vec<String>,
    #[serde(default)]
    pub enums:    Vec<Enum>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub services: Vec<Service>,
}

impl Schema {
    pub fn new(name: &str) -> Self {
        Schema {
            name:     name.to_owned(),
            package:  None,
            imports:  Vec::new(),
            enums:    Vec::new(),
            messages: Vec::new(),
            services: Vec::new(),
        }
    }

    /// Parses a JSON IR document.
    pub fn from_json(text: &str) -> Result<Self, CompileError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn with_package(mut self, package: &str) -> Self {
        self.package = Some(package.to_owned());
        self
    }

    pub fn with_import(mut self, name: &str) -> Self {
        self.imports.push(name.to_owned());
        self
    }

    pub fn with_enum(mut self, definition: Enum) -> Self {
        self.enums.push(definition);
        self
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_service(mut self, service: Service) -> Self {
        self.services.push(service);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub name:   String,
    /// Declaration order is wire order.
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl Message {
    pub fn new(name: &str, fields: Vec<Field>) -> Self {
        Message { name: name.to_owned(), fields }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name:       String,
    pub number:     u32,
    #[serde(rename = "type")]
    pub ty:         FieldType,
    #[serde(default)]
    pub deprecated: bool,
}

impl Field {
    pub fn new(name: &str, number: u32, ty: FieldType) -> Self {
        Field { name: name.to_owned(), number, ty, deprecated: false }
    }

    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }
}

/// Declared field type as delivered in the IR. Containers may only wrap a
/// scalar or a named type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Scalar(ScalarType),
    Named(String),
    Optional(Box<FieldType>),
    Repeated(Box<FieldType>),
    Map {
        key:   Box<FieldType>,
        value: Box<FieldType>,
    },
}

impl FieldType {
    pub fn scalar(scalar: ScalarType) -> Self {
        FieldType::Scalar(scalar)
    }

    pub fn named(name: &str) -> Self {
        FieldType::Named(name.to_owned())
    }

    pub fn optional(self) -> Self {
        FieldType::Optional(Box::new(self))
    }

    pub fn repeated(self) -> Self {
        FieldType::Repeated(Box::new(self))
    }

    pub fn map(key: FieldType, value: FieldType) -> Self {
        FieldType::Map { key: Box::new(key), value: Box::new(value) }
    }

    pub fn is_container(&self) -> bool {
        !matches!(self, FieldType::Scalar(_) | FieldType::Named(_))
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Scalar(scalar) => f.write_str(scalar.proto_name()),
            FieldType::Named(name) => f.write_str(name),
            FieldType::Optional(inner) => write!(f, "optional {}", inner),
            FieldType::Repeated(inner) => write!(f, "repeated {}", inner),
            FieldType::Map { key, value } => write!(f, "map<{}, {}>", key, value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enum {
    pub name:   String,
    pub values: Vec<EnumValue>,
}

impl Enum {
    pub fn new(name: &str, values: &[(&str, i32)]) -> Self {
        Enum {
            name:   name.to_owned(),
            values: values
                .iter()
                .map(|&(symbol, value)| EnumValue { name: symbol.to_owned(), value })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValue {
    pub name:  String,
    pub value: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub name:    String,
    #[serde(default)]
    pub methods: Vec<Method>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Method {
    pub name:   String,
    pub input:  String,
    pub output: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_ir() {
        let schema = Schema::from_json(
            r#"{
                "name": "geo.proto",
                "package": "geo",
                "enums": [{ "name": "Shape", "values": [{ "name": "ROUND", "value": 0 }] }],
                "messages": [{
                    "name": "Point",
                    "fields": [
                        { "name": "x", "number": 1, "type": { "scalar": "int32" } },
                        { "name": "tags", "number": 2, "type": { "map": { "key": { "scalar": "uint32" }, "value": { "named": "Shape" } } } },
                        { "name": "next", "number": 3, "type": { "optional": { "named": "Point" } }, "deprecated": true }
                    ]
                }]
            }"#,
        )
        .unwrap();

        assert_eq!(schema.package.as_deref(), Some("geo"));
        let point = &schema.messages[0];
        assert_eq!(point.fields[0].ty, FieldType::scalar(ScalarType::Int32));
        assert_eq!(
            point.fields[1].ty,
            FieldType::map(FieldType::scalar(ScalarType::Uint32), FieldType::named("Shape"))
        );
        assert_eq!(point.fields[2].ty, FieldType::named("Point").optional());
        assert!(point.fields[2].deprecated);
    }

    #[test]
    fn rejects_malformed_json() {
        let err = Schema::from_json(r#"{ "messages": [] }"#).unwrap_err();
        assert!(matches!(err, CompileError::Json(_)), "got {:?}", err);
    }

    #[test]
    fn displays_field_types() {
        let ty = FieldType::map(FieldType::scalar(ScalarType::String), FieldType::named("Node"));
        assert_eq!(ty.to_string(), "map<string, Node>");
        assert_eq!(FieldType::named("Node").repeated().to_string(), "repeated Node");
    }
}

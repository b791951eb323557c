//! The Type Mapper: resolves declared field types into closed, id-based
//! types and records every wire decision for the field.

use std::{collections::HashMap, sync::Arc};

use polyglot_schema::{ScalarType, SequenceLength, WireKind};
use serde::Serialize;

use crate::{
    compiler::CompiledSchema,
    error::CompileError,
    plan::{EnumId, MessageId, MethodPlan, Origin, Presence, ServicePlan, ENUM_PRIMITIVE},
    types::{Field, FieldType, Message, Schema, Service},
    utils::quote,
};

/// A type that can sit inside a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Primitive(ScalarType),
    Enum(EnumId),
    Message(MessageId),
}

impl ElementType {
    pub fn wire_kind(self) -> WireKind {
        match self {
            ElementType::Primitive(scalar) => scalar.wire_kind(),
            ElementType::Enum(_) => ENUM_PRIMITIVE.wire_kind(),
            ElementType::Message(_) => WireKind::LengthDelimitedNested,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedType {
    Primitive(ScalarType),
    Enum(EnumId),
    Message(MessageId),
    Optional(ElementType),
    Repeated(ElementType),
    Map { key: ElementType, value: ElementType },
}

impl ResolvedType {
    pub fn presence(self) -> Presence {
        match self {
            ResolvedType::Primitive(_) | ResolvedType::Enum(_) | ResolvedType::Message(_) => {
                Presence::Required
            }
            ResolvedType::Optional(_) => Presence::Optional,
            ResolvedType::Repeated(_) => Presence::Repeated,
            ResolvedType::Map { .. } => Presence::Map,
        }
    }

    fn single(element: ElementType) -> Self {
        match element {
            ElementType::Primitive(scalar) => ResolvedType::Primitive(scalar),
            ElementType::Enum(id) => ResolvedType::Enum(id),
            ElementType::Message(id) => ResolvedType::Message(id),
        }
    }
}

/// Every mapping decision for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldMapping {
    pub name:          String,
    pub number:        u32,
    pub ty:            ResolvedType,
    pub presence:      Presence,
    /// Kind of the value, the element of a repeated field or the value of a map.
    pub wire_kind:     WireKind,
    pub key_wire_kind: Option<WireKind>,
    pub sequence:      Option<SequenceLength>,
    pub deprecated:    bool,
}

impl FieldMapping {
    fn new(field: &Field, ty: ResolvedType) -> Self {
        let (wire_kind, key_wire_kind) = match ty {
            ResolvedType::Primitive(scalar) => (scalar.wire_kind(), None),
            ResolvedType::Enum(_) => (ENUM_PRIMITIVE.wire_kind(), None),
            ResolvedType::Message(_) => (WireKind::LengthDelimitedNested, None),
            ResolvedType::Optional(element) | ResolvedType::Repeated(element) => {
                (element.wire_kind(), None)
            }
            ResolvedType::Map { key, value } => (value.wire_kind(), Some(key.wire_kind())),
        };
        let sequence = match ty {
            ResolvedType::Repeated(_) | ResolvedType::Map { .. } => {
                Some(SequenceLength::for_element(wire_kind))
            }
            _ => None,
        };
        FieldMapping {
            name: field.name.clone(),
            number: field.number,
            ty,
            presence: ty.presence(),
            wire_kind,
            key_wire_kind,
            sequence,
            deprecated: field.deprecated,
        }
    }
}

pub struct TypeMapper<'a> {
    schema:   &'a Schema,
    imports:  &'a [Arc<CompiledSchema>],
    messages: HashMap<&'a str, usize>,
    enums:    HashMap<&'a str, usize>,
}

impl<'a> TypeMapper<'a> {
    pub fn new(schema: &'a Schema, imports: &'a [Arc<CompiledSchema>]) -> Self {
        let messages = schema.messages.iter().enumerate().map(|(i, m)| (m.name.as_str(), i)).collect();
        let enums = schema.enums.iter().enumerate().map(|(i, e)| (e.name.as_str(), i)).collect();
        TypeMapper { schema, imports, messages, enums }
    }

    fn find_local(&self, name: &str) -> Option<ElementType> {
        if let Some(&index) = self.messages.get(name) {
            return Some(ElementType::Message(MessageId::local(index)));
        }
        self.enums.get(name).map(|&index| ElementType::Enum(EnumId::local(index)))
    }

    /// Looks a type name up: local declarations first, then imports.
    /// `Ok(None)` means nothing matched.
    pub fn resolve_name(&self, name: &str) -> Result<Option<ElementType>, String> {
        let name = name.strip_prefix('.').unwrap_or(name);
        let unqualified = match &self.schema.package {
            Some(package) => strip_package(name, package).unwrap_or(name),
            None => name,
        };
        if let Some(found) = self.find_local(unqualified) {
            return Ok(Some(found));
        }

        for (i, import) in self.imports.iter().enumerate() {
            let Some(package) = &import.package else { continue };
            if let Some(found) = strip_package(name, package).and_then(|rest| import.find_type(rest, Origin::Import(i))) {
                return Ok(Some(found));
            }
        }

        let matches: Vec<(usize, ElementType)> = self
            .imports
            .iter()
            .enumerate()
            .filter_map(|(i, import)| import.find_type(name, Origin::Import(i)).map(|found| (i, found)))
            .collect();
        match matches.as_slice() {
            [] => Ok(None),
            [(_, found)] => Ok(Some(*found)),
            many => Err(format!(
                "{} is declared by several imports ({})",
                quote(name),
                many.iter().map(|(i, _)| quote(&self.imports[*i].name)).collect::<Vec<_>>().join(", ")
            )),
        }
    }

    fn element(&self, owner: &str, member: &str, ty: &FieldType) -> Result<ElementType, CompileError> {
        match ty {
            FieldType::Scalar(scalar) => Ok(ElementType::Primitive(*scalar)),
            FieldType::Named(name) => match self.resolve_name(name) {
                Ok(Some(found)) => Ok(found),
                Ok(None) => Err(CompileError::UnresolvedType {
                    message:   owner.to_owned(),
                    field:     member.to_owned(),
                    type_name: name.clone(),
                }),
                Err(reason) => Err(CompileError::consistency(format!("field {}.{}", owner, member), reason)),
            },
            container => Err(CompileError::consistency(
                format!("field {}.{}", owner, member),
                format!("{} cannot be nested inside another container", quote(&container.to_string())),
            )),
        }
    }

    pub fn map_field(&self, message: &Message, field: &Field) -> Result<FieldMapping, CompileError> {
        let element = |ty: &FieldType| self.element(&message.name, &field.name, ty);
        let ty = match &field.ty {
            FieldType::Optional(inner) => ResolvedType::Optional(element(inner)?),
            FieldType::Repeated(inner) => ResolvedType::Repeated(element(inner)?),
            FieldType::Map { key, value } => {
                let key_type = element(key)?;
                let value_type = element(value)?;
                let float_key = matches!(key_type, ElementType::Primitive(scalar) if scalar.is_float());
                if !key_type.wire_kind().is_map_key_capable() || float_key {
                    return Err(CompileError::MapKeyType {
                        message:  message.name.clone(),
                        field:    field.name.clone(),
                        key_type: key.to_string(),
                    });
                }
                ResolvedType::Map { key: key_type, value: value_type }
            }
            single => ResolvedType::single(element(single)?),
        };
        Ok(FieldMapping::new(field, ty))
    }

    pub fn map_message(&self, message: &Message) -> Result<Vec<FieldMapping>, CompileError> {
        message.fields.iter().map(|field| self.map_field(message, field)).collect()
    }

    fn resolve_message(&self, service: &str, method: &str, name: &str) -> Result<MessageId, CompileError> {
        match self.element(service, method, &FieldType::Named(name.to_owned()))? {
            ElementType::Message(id) => Ok(id),
            _ => Err(CompileError::consistency(
                format!("method {}.{}", service, method),
                format!("{} is not a message", quote(name)),
            )),
        }
    }

    pub fn map_service(&self, service: &Service) -> Result<ServicePlan, CompileError> {
        let methods = service
            .methods
            .iter()
            .map(|method| {
                Ok(MethodPlan {
                    name:   method.name.clone(),
                    input:  self.resolve_message(&service.name, &method.name, &method.input)?,
                    output: self.resolve_message(&service.name, &method.name, &method.output)?,
                })
            })
            .collect::<Result<Vec<_>, CompileError>>()?;
        Ok(ServicePlan { name: service.name.clone(), methods })
    }
}

fn strip_package<'n>(name: &'n str, package: &str) -> Option<&'n str> {
    name.strip_prefix(package)?.strip_prefix('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(ty: FieldType) -> (Message, Field) {
        let field = Field::new("f", 1, ty);
        (Message::new("M", vec![field.clone()]), field)
    }

    fn map(schema: &Schema, ty: FieldType) -> Result<FieldMapping, CompileError> {
        let (message, field) = field(ty);
        TypeMapper::new(schema, &[]).map_field(&message, &field)
    }

    #[test]
    fn maps_scalars_to_wire_kinds() {
        let schema = Schema::new("a.proto");
        let mapping = map(&schema, FieldType::scalar(ScalarType::Sint64)).unwrap();
        assert_eq!(mapping.ty, ResolvedType::Primitive(ScalarType::Sint64));
        assert_eq!(mapping.presence, Presence::Required);
        assert_eq!(mapping.wire_kind, WireKind::SignedVarint);
        assert_eq!(mapping.sequence, None);
    }

    #[test]
    fn repeated_length_rule_follows_element_kind() {
        let schema = Schema::new("a.proto").with_message(Message::new("Leaf", vec![]));
        let fixed = map(&schema, FieldType::scalar(ScalarType::Fixed32).repeated()).unwrap();
        assert_eq!(fixed.sequence, Some(SequenceLength::Elements));

        let strings = map(&schema, FieldType::scalar(ScalarType::String).repeated()).unwrap();
        assert_eq!(strings.sequence, Some(SequenceLength::Bytes));

        let nested = map(&schema, FieldType::named("Leaf").repeated()).unwrap();
        assert_eq!(nested.ty, ResolvedType::Repeated(ElementType::Message(MessageId::local(0))));
        assert_eq!(nested.wire_kind, WireKind::LengthDelimitedNested);
        assert_eq!(nested.sequence, Some(SequenceLength::Bytes));
    }

    #[test]
    fn enums_map_to_unsigned_varint() {
        let schema = Schema::new("a.proto").with_enum(crate::types::Enum::new("E", &[("A", 0)]));
        let mapping = map(&schema, FieldType::named("E")).unwrap();
        assert_eq!(mapping.ty, ResolvedType::Enum(EnumId::local(0)));
        assert_eq!(mapping.wire_kind, WireKind::UnsignedVarint);
    }

    #[test]
    fn map_keys_must_be_integers_or_bool() {
        let schema = Schema::new("a.proto");
        let int_key = map(&schema, FieldType::map(FieldType::scalar(ScalarType::Uint64), FieldType::scalar(ScalarType::String)));
        let int_key = int_key.unwrap();
        assert_eq!(int_key.key_wire_kind, Some(WireKind::UnsignedVarint));
        assert_eq!(int_key.sequence, Some(SequenceLength::Bytes));

        for bad in [ScalarType::String, ScalarType::Bytes, ScalarType::Double] {
            let result = map(&schema, FieldType::map(FieldType::scalar(bad), FieldType::scalar(ScalarType::Int32)));
            match result {
                Err(CompileError::MapKeyType { message, field, key_type }) => {
                    assert_eq!((message.as_str(), field.as_str()), ("M", "f"));
                    assert_eq!(key_type, bad.proto_name());
                }
                other => panic!("expected a map key error, got {:?}", other),
            }
        }
    }

    #[test]
    fn reports_unresolved_types() {
        let schema = Schema::new("a.proto");
        match map(&schema, FieldType::named("Missing").optional()) {
            Err(CompileError::UnresolvedType { message, field, type_name }) => {
                assert_eq!((message.as_str(), field.as_str(), type_name.as_str()), ("M", "f", "Missing"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn rejects_nested_containers() {
        let schema = Schema::new("a.proto");
        let result = map(&schema, FieldType::scalar(ScalarType::Int32).repeated().optional());
        assert!(matches!(result, Err(CompileError::IrConsistency { .. })), "got {:?}", result);
    }

    #[test]
    fn service_methods_must_name_messages() {
        let schema = Schema::new("a.proto")
            .with_enum(crate::types::Enum::new("E", &[("A", 0)]))
            .with_message(Message::new("Req", vec![]));
        let mapper = TypeMapper::new(&schema, &[]);
        let service = |input: &str, output: &str| Service {
            name:    "Api".into(),
            methods: vec![crate::types::Method { name: "Call".into(), input: input.into(), output: output.into() }],
        };

        let plan = mapper.map_service(&service("Req", "Req")).unwrap();
        assert_eq!((plan.methods[0].input, plan.methods[0].output), (MessageId::local(0), MessageId::local(0)));

        match mapper.map_service(&service("Req", "Missing")) {
            Err(CompileError::UnresolvedType { message, field, type_name }) => {
                assert_eq!((message.as_str(), field.as_str(), type_name.as_str()), ("Api", "Call", "Missing"));
            }
            other => panic!("unexpected {:?}", other),
        }

        match mapper.map_service(&service("E", "Req")) {
            Err(CompileError::IrConsistency { context, reason }) => {
                assert_eq!(context, "method Api.Call");
                assert_eq!(reason, "\"E\" is not a message");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn strips_own_package() {
        let schema = Schema::new("a.proto").with_package("pkg").with_message(Message::new("Leaf", vec![]));
        let mapper = TypeMapper::new(&schema, &[]);
        let expected = Some(ElementType::Message(MessageId::local(0)));
        assert_eq!(mapper.resolve_name("Leaf"), Ok(expected));
        assert_eq!(mapper.resolve_name("pkg.Leaf"), Ok(expected));
        assert_eq!(mapper.resolve_name(".pkg.Leaf"), Ok(expected));
        assert_eq!(mapper.resolve_name("other.Leaf"), Ok(None));
    }
}

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    compiler::ImportTable,
    error::CompileError,
    types::{FieldType, Schema},
    utils::quote,
};

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
    static ref TYPE_REFERENCE: Regex =
        Regex::new(r"^\.?[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").unwrap();
}

fn check_identifier(context: &str, kind: &str, name: &str) -> Result<(), CompileError> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(CompileError::consistency(
            context,
            format!("{} {} is not a valid identifier", kind, quote(name)),
        ))
    }
}

/// Structural checks that must hold before types are mapped. Returns the
/// first violation found.
pub fn verify_schema(schema: &Schema, imports: &ImportTable) -> Result<(), CompileError> {
    let context = format!("schema {}", quote(&schema.name));

    // 1) Package and imports
    if let Some(package) = &schema.package {
        if !package.split('.').all(|part| IDENTIFIER.is_match(part)) {
            return Err(CompileError::consistency(
                &context,
                format!("package {} is not a dotted identifier", quote(package)),
            ));
        }
    }
    let mut seen = HashSet::new();
    for import in &schema.imports {
        if import == &schema.name {
            return Err(CompileError::consistency(&context, "a schema cannot import itself"));
        }
        if !seen.insert(import.as_str()) {
            return Err(CompileError::consistency(
                &context,
                format!("import {} is listed twice", quote(import)),
            ));
        }
        if imports.get(import).is_none() {
            return Err(CompileError::UnresolvedImport {
                schema: schema.name.clone(),
                import: import.clone(),
            });
        }
    }

    // 2) Type names are unique across enums and messages
    let mut type_names = HashSet::new();
    let declared = schema
        .enums
        .iter()
        .map(|e| e.name.as_str())
        .chain(schema.messages.iter().map(|m| m.name.as_str()));
    for name in declared {
        check_identifier(&context, "type name", name)?;
        if !type_names.insert(name) {
            return Err(CompileError::consistency(
                &context,
                format!("the type {} is defined twice", quote(name)),
            ));
        }
    }

    // 3) Enums
    for definition in &schema.enums {
        let context = format!("enum {}", quote(&definition.name));
        if definition.values.is_empty() {
            return Err(CompileError::consistency(&context, "an enum needs at least one value"));
        }
        let mut symbols = HashSet::new();
        let mut values = HashSet::new();
        for value in &definition.values {
            check_identifier(&context, "symbol", &value.name)?;
            if !symbols.insert(value.name.as_str()) {
                return Err(CompileError::consistency(
                    &context,
                    format!("the symbol {} is defined twice", quote(&value.name)),
                ));
            }
            if !values.insert(value.value) {
                return Err(CompileError::consistency(
                    &context,
                    format!("the value {} is used twice", value.value),
                ));
            }
        }
    }

    // 4) Messages
    for message in &schema.messages {
        let context = format!("message {}", quote(&message.name));
        let mut names = HashSet::new();
        let mut numbers = HashSet::new();
        for field in &message.fields {
            check_identifier(&context, "field", &field.name)?;
            if !names.insert(field.name.as_str()) {
                return Err(CompileError::consistency(
                    &context,
                    format!("the field {} is defined twice", quote(&field.name)),
                ));
            }
            if field.number == 0 {
                return Err(CompileError::consistency(
                    &context,
                    format!("the number of field {} must be positive", quote(&field.name)),
                ));
            }
            if !numbers.insert(field.number) {
                return Err(CompileError::consistency(
                    &context,
                    format!("the number of field {} is used twice", quote(&field.name)),
                ));
            }
            check_references(&context, &field.ty)?;
        }
    }

    // 5) Services
    let mut services = HashSet::new();
    for service in &schema.services {
        check_identifier(&context, "service", &service.name)?;
        if !services.insert(service.name.as_str()) {
            return Err(CompileError::consistency(
                &context,
                format!("the service {} is defined twice", quote(&service.name)),
            ));
        }
        let context = format!("service {}", quote(&service.name));
        let mut methods = HashSet::new();
        for method in &service.methods {
            check_identifier(&context, "method", &method.name)?;
            if !methods.insert(method.name.as_str()) {
                return Err(CompileError::consistency(
                    &context,
                    format!("the method {} is defined twice", quote(&method.name)),
                ));
            }
        }
    }

    Ok(())
}

fn check_references(context: &str, ty: &FieldType) -> Result<(), CompileError> {
    match ty {
        FieldType::Scalar(_) => Ok(()),
        FieldType::Named(name) if TYPE_REFERENCE.is_match(name) => Ok(()),
        FieldType::Named(name) => Err(CompileError::consistency(
            context,
            format!("{} is not a valid type reference", quote(name)),
        )),
        FieldType::Optional(inner) | FieldType::Repeated(inner) => check_references(context, inner),
        FieldType::Map { key, value } => {
            check_references(context, key)?;
            check_references(context, value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Enum, Field, Message, Service, Method};
    use polyglot_schema::ScalarType;

    fn int32() -> FieldType {
        FieldType::scalar(ScalarType::Int32)
    }

    fn verify(schema: &Schema) -> Result<(), CompileError> {
        verify_schema(schema, &ImportTable::new())
    }

    fn reason(result: Result<(), CompileError>) -> String {
        match result {
            Err(CompileError::IrConsistency { reason, .. }) => reason,
            other => panic!("expected an IR consistency error, got {:?}", other),
        }
    }

    #[test]
    fn accepts_well_formed_schema() {
        let schema = Schema::new("a.proto")
            .with_package("pkg.v1")
            .with_enum(Enum::new("Kind", &[("A", 0), ("B", 5)]))
            .with_message(Message::new("Point", vec![Field::new("x", 1, int32()), Field::new("y", 2, int32())]))
            .with_service(Service {
                name:    "Plotter".into(),
                methods: vec![Method { name: "Plot".into(), input: "Point".into(), output: ".pkg.v1.Point".into() }],
            });
        verify(&schema).unwrap();
    }

    #[test]
    fn rejects_duplicate_type_names() {
        let schema = Schema::new("a.proto")
            .with_enum(Enum::new("Thing", &[("A", 0)]))
            .with_message(Message::new("Thing", vec![]));
        assert_eq!(reason(verify(&schema)), "the type \"Thing\" is defined twice");
    }

    #[test]
    fn rejects_duplicate_fields() {
        let by_name = Schema::new("a.proto")
            .with_message(Message::new("M", vec![Field::new("x", 1, int32()), Field::new("x", 2, int32())]));
        assert_eq!(reason(verify(&by_name)), "the field \"x\" is defined twice");

        let by_number = Schema::new("a.proto")
            .with_message(Message::new("M", vec![Field::new("x", 1, int32()), Field::new("y", 1, int32())]));
        assert_eq!(reason(verify(&by_number)), "the number of field \"y\" is used twice");

        let zero = Schema::new("a.proto").with_message(Message::new("M", vec![Field::new("x", 0, int32())]));
        assert_eq!(reason(verify(&zero)), "the number of field \"x\" must be positive");
    }

    #[test]
    fn rejects_bad_enums() {
        let empty = Schema::new("a.proto").with_enum(Enum::new("E", &[]));
        assert_eq!(reason(verify(&empty)), "an enum needs at least one value");

        let values = Schema::new("a.proto").with_enum(Enum::new("E", &[("A", 1), ("B", 1)]));
        assert_eq!(reason(verify(&values)), "the value 1 is used twice");
    }

    #[test]
    fn rejects_bad_identifiers() {
        let schema = Schema::new("a.proto").with_message(Message::new("2D", vec![]));
        assert_eq!(reason(verify(&schema)), "type name \"2D\" is not a valid identifier");

        let reference = Schema::new("a.proto")
            .with_message(Message::new("M", vec![Field::new("x", 1, FieldType::named("a..b"))]));
        assert_eq!(reason(verify(&reference)), "\"a..b\" is not a valid type reference");
    }

    #[test]
    fn rejects_bad_imports() {
        let own = Schema::new("a.proto").with_import("a.proto");
        assert_eq!(reason(verify(&own)), "a schema cannot import itself");

        let missing = Schema::new("a.proto").with_import("b.proto");
        match verify(&missing) {
            Err(CompileError::UnresolvedImport { schema, import }) => {
                assert_eq!(schema, "a.proto");
                assert_eq!(import, "b.proto");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}

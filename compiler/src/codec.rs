//! The Codec Synthesizer. Both functions are pure: the same declaration and
//! mappings always produce the same plan.

use polyglot_schema::SequenceLength;

use crate::{
    mapper::{ElementType, FieldMapping, ResolvedType},
    plan::{CodecPlan, EnumId, EnumPlan, EnumSymbol, MessageId, PlanStep, StepShape, ValueStep},
    types::{Enum, Message},
};

fn value_step(element: ElementType) -> ValueStep {
    match element {
        ElementType::Primitive(scalar) => ValueStep::Scalar(scalar.primitive()),
        ElementType::Enum(id) => ValueStep::Enum(id),
        ElementType::Message(id) => ValueStep::Nested(id),
    }
}

fn sequence_length(mapping: &FieldMapping) -> SequenceLength {
    mapping.sequence.unwrap_or_else(|| SequenceLength::for_element(mapping.wire_kind))
}

fn step_shape(mapping: &FieldMapping) -> StepShape {
    match mapping.ty {
        ResolvedType::Primitive(scalar) => StepShape::Single(value_step(ElementType::Primitive(scalar))),
        ResolvedType::Enum(id) => StepShape::Single(ValueStep::Enum(id)),
        ResolvedType::Message(id) => StepShape::Single(ValueStep::Nested(id)),
        ResolvedType::Optional(element) => StepShape::Optional(value_step(element)),
        ResolvedType::Repeated(element) => StepShape::Repeated {
            element: value_step(element),
            length:  sequence_length(mapping),
        },
        ResolvedType::Map { key, value } => StepShape::Map {
            key:    value_step(key),
            value:  value_step(value),
            length: sequence_length(mapping),
        },
    }
}

/// Builds the plan for one message. Steps keep the field declaration order.
pub fn synthesize_message(id: MessageId, message: &Message, mappings: &[FieldMapping]) -> CodecPlan {
    let steps = mappings
        .iter()
        .map(|mapping| {
            let shape = step_shape(mapping);
            PlanStep {
                field: mapping.name.clone(),
                number: mapping.number,
                presence: mapping.presence,
                skippable: matches!(shape, StepShape::Optional(_)),
                shape,
                deprecated: mapping.deprecated,
            }
        })
        .collect();
    CodecPlan { id, name: message.name.clone(), steps }
}

pub fn synthesize_enum(id: EnumId, definition: &Enum) -> EnumPlan {
    EnumPlan {
        id,
        name: definition.name.clone(),
        values: definition
            .values
            .iter()
            .map(|v| EnumSymbol { name: v.name.clone(), value: v.value })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        mapper::TypeMapper,
        plan::Presence,
        types::{Field, FieldType, Schema},
    };
    use polyglot_schema::{Primitive, ScalarType};

    fn plan(schema: &Schema, index: usize) -> CodecPlan {
        let message = &schema.messages[index];
        let mappings = TypeMapper::new(schema, &[]).map_message(message).unwrap();
        synthesize_message(MessageId::local(index), message, &mappings)
    }

    #[test]
    fn steps_follow_declaration_order() {
        let schema = Schema::new("a.proto").with_message(Message::new(
            "Mixed",
            vec![
                Field::new("z", 9, FieldType::scalar(ScalarType::Bool)),
                Field::new("a", 1, FieldType::scalar(ScalarType::Double)),
                Field::new("m", 4, FieldType::scalar(ScalarType::String).optional()),
            ],
        ));
        let plan = plan(&schema, 0);
        let order: Vec<(&str, u32)> = plan.steps.iter().map(|s| (s.field.as_str(), s.number)).collect();
        assert_eq!(order, [("z", 9), ("a", 1), ("m", 4)]);
        assert_eq!(plan.steps[1].shape, StepShape::Single(ValueStep::Scalar(Primitive::F64)));
        assert!(!plan.steps[0].skippable);
        assert!(plan.steps[2].skippable);
        assert_eq!(plan.steps[2].presence, Presence::Optional);
    }

    #[test]
    fn self_reference_defers_to_own_plan() {
        let schema = Schema::new("a.proto").with_message(Message::new(
            "Tree",
            vec![
                Field::new("left", 1, FieldType::named("Tree").optional()),
                Field::new("kids", 2, FieldType::named("Tree").repeated()),
            ],
        ));
        let plan = plan(&schema, 0);
        let me = ValueStep::Nested(MessageId::local(0));
        assert_eq!(plan.steps[0].shape, StepShape::Optional(me));
        assert_eq!(plan.steps[1].shape, StepShape::Repeated { element: me, length: SequenceLength::Bytes });
    }

    #[test]
    fn synthesis_is_deterministic() {
        let schema = Schema::new("a.proto").with_message(Message::new(
            "Bag",
            vec![
                Field::new("ints", 1, FieldType::scalar(ScalarType::Sfixed64).repeated()),
                Field::new(
                    "names",
                    2,
                    FieldType::map(FieldType::scalar(ScalarType::Int32), FieldType::scalar(ScalarType::String)),
                ),
            ],
        ));
        let first = plan(&schema, 0);
        let second = plan(&schema, 0);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}

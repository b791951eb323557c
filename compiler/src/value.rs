//! A dynamic value model that encodes and decodes any compiled message by
//! walking its codec plan.

use std::collections::BTreeMap;

use polyglot_schema::{ByteBuffer, ByteBufferMut, Primitive, SequenceLength};

use crate::{
    compiler::CompiledSchema,
    error::CodecError,
    plan::{CodecPlan, MessageId, PlanStep, StepShape, ValueStep, ENUM_PRIMITIVE},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    U32(u32),
    U64(u64),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Vec<u8>),
    /// The raw integer of an enum, known symbol or not.
    Enum(i32),
    Array(Vec<Value>),
    /// Key/value pairs in encoding order.
    Map(Vec<(Value, Value)>),
    /// A message: its name and the fields that are present.
    Object(String, BTreeMap<String, Value>),
}

impl Value {
    pub fn object<'f>(name: &str, fields: impl IntoIterator<Item = (&'f str, Value)>) -> Value {
        Value::Object(
            name.to_owned(),
            fields.into_iter().map(|(field, value)| (field.to_owned(), value)).collect(),
        )
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        match self {
            Value::Object(_, fields) => fields.get(field),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Enum(_) => "enum",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Object(_, _) => "object",
        }
    }

    /// Encodes this object as the message `id` of `schema`.
    pub fn encode(&self, schema: &CompiledSchema, id: MessageId) -> Result<Vec<u8>, CodecError> {
        let (owner, plan) = schema
            .message_plan(id)
            .ok_or_else(|| CodecError::UnknownMessage(format!("{:?}", id)))?;
        let mut bb = ByteBufferMut::new();
        encode_message(owner, plan, "", self, &mut bb)?;
        Ok(bb.data())
    }

    /// Encodes this object as the local message with the object's name.
    pub fn encode_named(&self, schema: &CompiledSchema) -> Result<Vec<u8>, CodecError> {
        let name = match self {
            Value::Object(name, _) => name,
            other => return Err(mismatch("", "object", other)),
        };
        let plan = schema.message(name).ok_or_else(|| CodecError::UnknownMessage(name.clone()))?;
        self.encode(schema, plan.id)
    }

    pub fn decode(schema: &CompiledSchema, id: MessageId, bytes: &[u8]) -> Result<Value, CodecError> {
        let (owner, plan) = schema
            .message_plan(id)
            .ok_or_else(|| CodecError::UnknownMessage(format!("{:?}", id)))?;
        decode_message(owner, plan, &mut ByteBuffer::new(bytes))
    }

    pub fn decode_named(schema: &CompiledSchema, name: &str, bytes: &[u8]) -> Result<Value, CodecError> {
        let plan = schema.message(name).ok_or_else(|| CodecError::UnknownMessage(name.to_owned()))?;
        Value::decode(schema, plan.id, bytes)
    }
}

fn mismatch(field: &str, expected: &str, found: &Value) -> CodecError {
    CodecError::TypeMismatch {
        field:    field.to_owned(),
        expected: expected.to_owned(),
        found:    found.kind_name().to_owned(),
    }
}

fn write_primitive(primitive: Primitive, field: &str, value: &Value, bb: &mut ByteBufferMut) -> Result<(), CodecError> {
    match (primitive, value) {
        (Primitive::Bool, Value::Bool(v)) => bb.write_bool(*v),
        (Primitive::VarU32, Value::U32(v)) => bb.write_var_uint(*v),
        (Primitive::VarU64, Value::U64(v)) => bb.write_var_uint64(*v),
        (Primitive::VarI32, Value::I32(v)) => bb.write_var_int(*v),
        (Primitive::VarI64, Value::I64(v)) => bb.write_var_int64(*v),
        (Primitive::FixedU32, Value::U32(v)) => bb.write_fixed32(*v),
        (Primitive::FixedI32, Value::I32(v)) => bb.write_sfixed32(*v),
        (Primitive::FixedU64, Value::U64(v)) => bb.write_fixed64(*v),
        (Primitive::FixedI64, Value::I64(v)) => bb.write_sfixed64(*v),
        (Primitive::F32, Value::F32(v)) => bb.write_float(*v),
        (Primitive::F64, Value::F64(v)) => bb.write_double(*v),
        (Primitive::String, Value::String(v)) => bb.write_string(v),
        (Primitive::Bytes, Value::Bytes(v)) => bb.write_byte_array(v),
        (primitive, other) => return Err(mismatch(field, primitive.call().rust_type, other)),
    }
    Ok(())
}

fn read_primitive(primitive: Primitive, bb: &mut ByteBuffer<'_>) -> Result<Value, CodecError> {
    Ok(match primitive {
        Primitive::Bool => Value::Bool(bb.read_bool()?),
        Primitive::VarU32 => Value::U32(bb.read_var_uint()?),
        Primitive::VarU64 => Value::U64(bb.read_var_uint64()?),
        Primitive::VarI32 => Value::I32(bb.read_var_int()?),
        Primitive::VarI64 => Value::I64(bb.read_var_int64()?),
        Primitive::FixedU32 => Value::U32(bb.read_fixed32()?),
        Primitive::FixedI32 => Value::I32(bb.read_sfixed32()?),
        Primitive::FixedU64 => Value::U64(bb.read_fixed64()?),
        Primitive::FixedI64 => Value::I64(bb.read_sfixed64()?),
        Primitive::F32 => Value::F32(bb.read_float()?),
        Primitive::F64 => Value::F64(bb.read_double()?),
        Primitive::String => Value::String(bb.read_string()?),
        Primitive::Bytes => Value::Bytes(bb.read_byte_array()?),
    })
}

fn zero_value(primitive: Primitive) -> Value {
    match primitive {
        Primitive::Bool => Value::Bool(false),
        Primitive::VarU32 | Primitive::FixedU32 => Value::U32(0),
        Primitive::VarU64 | Primitive::FixedU64 => Value::U64(0),
        Primitive::VarI32 | Primitive::FixedI32 => Value::I32(0),
        Primitive::VarI64 | Primitive::FixedI64 => Value::I64(0),
        Primitive::F32 => Value::F32(0.0),
        Primitive::F64 => Value::F64(0.0),
        Primitive::String => Value::String(String::new()),
        Primitive::Bytes => Value::Bytes(Vec::new()),
    }
}

fn nested_plan(schema: &CompiledSchema, id: MessageId) -> Result<(&CompiledSchema, &CodecPlan), CodecError> {
    schema
        .message_plan(id)
        .ok_or_else(|| CodecError::UnknownMessage(format!("{:?}", id)))
}

/// The value a required step takes when it is missing.
fn default_value(schema: &CompiledSchema, step: ValueStep) -> Result<Value, CodecError> {
    match step {
        ValueStep::Scalar(primitive) => Ok(zero_value(primitive)),
        ValueStep::Enum(id) => Ok(Value::Enum(schema.enum_plan(id).map_or(0, |plan| plan.default_value()))),
        ValueStep::Nested(id) => {
            let (owner, plan) = nested_plan(schema, id)?;
            let mut fields = BTreeMap::new();
            for step in plan.steps.iter().filter(|step| !step.deprecated) {
                if let Some(value) = default_step(owner, step)? {
                    fields.insert(step.field.clone(), value);
                }
            }
            Ok(Value::Object(plan.name.clone(), fields))
        }
    }
}

fn default_step(schema: &CompiledSchema, step: &PlanStep) -> Result<Option<Value>, CodecError> {
    Ok(match step.shape {
        StepShape::Single(value) => Some(default_value(schema, value)?),
        StepShape::Optional(_) => None,
        StepShape::Repeated { .. } => Some(Value::Array(Vec::new())),
        StepShape::Map { .. } => Some(Value::Map(Vec::new())),
    })
}

fn encode_value(
    schema: &CompiledSchema,
    step: ValueStep,
    field: &str,
    value: &Value,
    bb: &mut ByteBufferMut,
) -> Result<(), CodecError> {
    match step {
        ValueStep::Scalar(primitive) => write_primitive(primitive, field, value, bb),
        ValueStep::Enum(_) => match value {
            Value::Enum(raw) => write_primitive(ENUM_PRIMITIVE, field, &Value::U32(*raw as u32), bb),
            other => Err(mismatch(field, "enum", other)),
        },
        ValueStep::Nested(id) => {
            let (owner, plan) = nested_plan(schema, id)?;
            let mut frame = ByteBufferMut::new();
            encode_message(owner, plan, field, value, &mut frame)?;
            bb.write_byte_array(&frame.data());
            Ok(())
        }
    }
}

fn encode_sequence<'v>(
    schema: &CompiledSchema,
    length: SequenceLength,
    count: usize,
    items: impl Iterator<Item = (ValueStep, &'v Value)>,
    field: &str,
    bb: &mut ByteBufferMut,
) -> Result<(), CodecError> {
    match length {
        SequenceLength::Elements => {
            bb.write_len(count);
            for (step, item) in items {
                encode_value(schema, step, field, item, bb)?;
            }
        }
        SequenceLength::Bytes => {
            let mut frame = ByteBufferMut::new();
            for (step, item) in items {
                encode_value(schema, step, field, item, &mut frame)?;
            }
            bb.write_byte_array(&frame.data());
        }
    }
    Ok(())
}

fn encode_step(schema: &CompiledSchema, step: &PlanStep, value: Option<&Value>, bb: &mut ByteBufferMut) -> Result<(), CodecError> {
    let field = step.field.as_str();
    match (step.shape, value) {
        (StepShape::Single(v), Some(value)) => encode_value(schema, v, field, value, bb),
        (StepShape::Single(v), None) => encode_value(schema, v, field, &default_value(schema, v)?, bb),
        (StepShape::Optional(v), Some(value)) => {
            bb.write_bool(true);
            encode_value(schema, v, field, value, bb)
        }
        (StepShape::Optional(_), None) => {
            bb.write_bool(false);
            Ok(())
        }
        (StepShape::Repeated { element, length }, value) => {
            let items: &[Value] = match value {
                Some(Value::Array(items)) => items,
                Some(other) => return Err(mismatch(field, "array", other)),
                None => &[],
            };
            encode_sequence(schema, length, items.len(), items.iter().map(|item| (element, item)), field, bb)
        }
        (StepShape::Map { key, value: value_step, length }, value) => {
            let pairs: &[(Value, Value)] = match value {
                Some(Value::Map(pairs)) => pairs,
                Some(other) => return Err(mismatch(field, "map", other)),
                None => &[],
            };
            let items = pairs.iter().flat_map(|(k, v)| [(key, k), (value_step, v)]);
            encode_sequence(schema, length, pairs.len(), items, field, bb)
        }
    }
}

fn encode_message(
    schema: &CompiledSchema,
    plan: &CodecPlan,
    field: &str,
    value: &Value,
    bb: &mut ByteBufferMut,
) -> Result<(), CodecError> {
    let fields = match value {
        Value::Object(name, fields) if *name == plan.name => fields,
        Value::Object(name, _) => {
            return Err(CodecError::TypeMismatch {
                field:    field.to_owned(),
                expected: plan.name.clone(),
                found:    name.clone(),
            })
        }
        other => return Err(mismatch(field, &plan.name, other)),
    };
    if let Some(unknown) = fields.keys().find(|key| plan.step(key).is_none()) {
        return Err(CodecError::TypeMismatch {
            field:    unknown.clone(),
            expected: format!("a field of {}", plan.name),
            found:    "unknown field".to_owned(),
        });
    }
    for step in &plan.steps {
        encode_step(schema, step, fields.get(&step.field), bb)?;
    }
    Ok(())
}

fn decode_value(schema: &CompiledSchema, step: ValueStep, bb: &mut ByteBuffer<'_>) -> Result<Value, CodecError> {
    match step {
        ValueStep::Scalar(primitive) => read_primitive(primitive, bb),
        ValueStep::Enum(_) => match read_primitive(ENUM_PRIMITIVE, bb)? {
            Value::U32(raw) => Ok(Value::Enum(raw as i32)),
            other => Err(mismatch("", "enum", &other)),
        },
        ValueStep::Nested(id) => {
            let (owner, plan) = nested_plan(schema, id)?;
            decode_message(owner, plan, &mut bb.read_message_frame()?)
        }
    }
}

fn decode_sequence(
    schema: &CompiledSchema,
    length: SequenceLength,
    bb: &mut ByteBuffer<'_>,
    mut read_one: impl FnMut(&CompiledSchema, &mut ByteBuffer<'_>) -> Result<(), CodecError>,
) -> Result<(), CodecError> {
    match length {
        SequenceLength::Elements => {
            let count = bb.read_len()?;
            for _ in 0..count {
                read_one(schema, bb)?;
            }
        }
        SequenceLength::Bytes => {
            let mut frame = bb.read_frame()?;
            while !frame.is_empty() {
                read_one(schema, &mut frame)?;
            }
        }
    }
    Ok(())
}

fn decode_step(schema: &CompiledSchema, step: &PlanStep, bb: &mut ByteBuffer<'_>) -> Result<Option<Value>, CodecError> {
    match step.shape {
        StepShape::Single(v) => Ok(Some(decode_value(schema, v, bb)?)),
        StepShape::Optional(v) => {
            if bb.read_bool()? {
                Ok(Some(decode_value(schema, v, bb)?))
            } else {
                Ok(None)
            }
        }
        StepShape::Repeated { element, length } => {
            let mut items = Vec::new();
            decode_sequence(schema, length, bb, |schema, bb| {
                items.push(decode_value(schema, element, bb)?);
                Ok(())
            })?;
            Ok(Some(Value::Array(items)))
        }
        StepShape::Map { key, value, length } => {
            let mut pairs = Vec::new();
            decode_sequence(schema, length, bb, |schema, bb| {
                let k = decode_value(schema, key, bb)?;
                let v = decode_value(schema, value, bb)?;
                pairs.push((k, v));
                Ok(())
            })?;
            Ok(Some(Value::Map(pairs)))
        }
    }
}

fn decode_message(schema: &CompiledSchema, plan: &CodecPlan, bb: &mut ByteBuffer<'_>) -> Result<Value, CodecError> {
    let mut fields = BTreeMap::new();
    for step in &plan.steps {
        if bb.is_empty() {
            // An older writer stopped here; the rest keep their defaults.
            if !step.deprecated {
                if let Some(value) = default_step(schema, step)? {
                    fields.insert(step.field.clone(), value);
                }
            }
            continue;
        }
        if step.deprecated {
            step.skip(bb)?;
            continue;
        }
        if let Some(value) = decode_step(schema, step, bb)? {
            fields.insert(step.field.clone(), value);
        }
    }
    Ok(Value::Object(plan.name.clone(), fields))
}

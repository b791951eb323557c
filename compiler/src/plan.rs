//! Codec plans: the ordered, language-neutral read/write steps of a message.

use polyglot_schema::{ByteBuffer, Primitive, SequenceLength, WireError, WireKind};
use serde::Serialize;

/// Enums are written as their integer value with this primitive.
pub const ENUM_PRIMITIVE: Primitive = Primitive::VarU32;

/// Which schema a type id points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Local,
    /// Index into the importing schema's `imports`.
    Import(usize),
}

/// Stable identity of a message: its origin plus declaration index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MessageId {
    pub origin: Origin,
    pub index:  usize,
}

impl MessageId {
    pub fn local(index: usize) -> Self {
        MessageId { origin: Origin::Local, index }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EnumId {
    pub origin: Origin,
    pub index:  usize,
}

impl EnumId {
    pub fn local(index: usize) -> Self {
        EnumId { origin: Origin::Local, index }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    Required,
    Optional,
    Repeated,
    Map,
}

/// How a single value is read or written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueStep {
    Scalar(Primitive),
    Enum(EnumId),
    /// Defers to the nested message's own plan.
    Nested(MessageId),
}

impl ValueStep {
    pub fn wire_kind(self) -> WireKind {
        match self {
            ValueStep::Scalar(primitive) => primitive.wire_kind(),
            ValueStep::Enum(_) => ENUM_PRIMITIVE.wire_kind(),
            ValueStep::Nested(_) => WireKind::LengthDelimitedNested,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepShape {
    Single(ValueStep),
    /// One presence byte, then the value when present.
    Optional(ValueStep),
    Repeated {
        element: ValueStep,
        length:  SequenceLength,
    },
    Map {
        key:    ValueStep,
        value:  ValueStep,
        length: SequenceLength,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanStep {
    pub field:      String,
    pub number:     u32,
    pub presence:   Presence,
    pub shape:      StepShape,
    /// An absent value writes nothing but the presence flag.
    pub skippable:  bool,
    /// Still written, but skipped over on decode.
    pub deprecated: bool,
}

impl PlanStep {
    /// Advances `bb` past this step's encoded bytes without materializing them.
    pub fn skip(&self, bb: &mut ByteBuffer<'_>) -> Result<(), WireError> {
        match self.shape {
            StepShape::Single(value) => bb.skip(value.wire_kind()),
            StepShape::Optional(value) => {
                if bb.read_bool()? {
                    bb.skip(value.wire_kind())?;
                }
                Ok(())
            }
            StepShape::Repeated { length: SequenceLength::Bytes, .. }
            | StepShape::Map { length: SequenceLength::Bytes, .. } => {
                bb.skip(WireKind::LengthDelimitedBytes)
            }
            StepShape::Repeated { element, length: SequenceLength::Elements } => {
                let count = bb.read_len()?;
                for _ in 0..count {
                    bb.skip(element.wire_kind())?;
                }
                Ok(())
            }
            StepShape::Map { key, value, length: SequenceLength::Elements } => {
                let count = bb.read_len()?;
                for _ in 0..count {
                    bb.skip(key.wire_kind())?;
                    bb.skip(value.wire_kind())?;
                }
                Ok(())
            }
        }
    }

    /// Every value step in this shape, keys first.
    pub fn values(&self) -> Vec<ValueStep> {
        match self.shape {
            StepShape::Single(value) | StepShape::Optional(value) => vec![value],
            StepShape::Repeated { element, .. } => vec![element],
            StepShape::Map { key, value, .. } => vec![key, value],
        }
    }
}

/// The encode/decode plan of one message. Steps follow field declaration
/// order; that order is the wire order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodecPlan {
    pub id:    MessageId,
    pub name:  String,
    pub steps: Vec<PlanStep>,
}

impl CodecPlan {
    pub fn step(&self, field: &str) -> Option<&PlanStep> {
        self.steps.iter().find(|step| step.field == field)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumSymbol {
    pub name:  String,
    pub value: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumPlan {
    pub id:     EnumId,
    pub name:   String,
    pub values: Vec<EnumSymbol>,
}

impl EnumPlan {
    pub fn symbol(&self, value: i32) -> Option<&str> {
        self.values.iter().find(|v| v.value == value).map(|v| v.name.as_str())
    }

    pub fn value_of(&self, symbol: &str) -> Option<i32> {
        self.values.iter().find(|v| v.name == symbol).map(|v| v.value)
    }

    /// The first declared value; enums are never empty once verified.
    pub fn default_value(&self) -> i32 {
        self.values.first().map_or(0, |v| v.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServicePlan {
    pub name:    String,
    pub methods: Vec<MethodPlan>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodPlan {
    pub name:   String,
    pub input:  MessageId,
    pub output: MessageId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyglot_schema::ByteBufferMut;

    fn step(shape: StepShape) -> PlanStep {
        PlanStep {
            field: "f".into(),
            number: 1,
            presence: Presence::Required,
            shape,
            skippable: false,
            deprecated: true,
        }
    }

    #[test]
    fn skips_counted_sequences() {
        let mut out = ByteBufferMut::new();
        out.write_len(3);
        out.write_var_int(-1);
        out.write_var_int(300);
        out.write_var_int(0);
        out.write_byte(0xaa);
        let data = out.data();

        let mut bb = ByteBuffer::new(&data);
        let repeated = step(StepShape::Repeated {
            element: ValueStep::Scalar(Primitive::VarI32),
            length:  SequenceLength::Elements,
        });
        repeated.skip(&mut bb).unwrap();
        assert_eq!(bb.read_byte(), Ok(0xaa));
    }

    #[test]
    fn skips_framed_maps_and_optionals() {
        let mut out = ByteBufferMut::new();
        out.write_frame(|bb| {
            bb.write_var_uint(1);
            bb.write_string("one");
        });
        out.write_bool(true);
        out.write_fixed64(9);
        out.write_bool(false);
        out.write_byte(0xbb);
        let data = out.data();

        let mut bb = ByteBuffer::new(&data);
        step(StepShape::Map {
            key:    ValueStep::Scalar(Primitive::VarU32),
            value:  ValueStep::Scalar(Primitive::String),
            length: SequenceLength::Bytes,
        })
        .skip(&mut bb)
        .unwrap();
        let optional = step(StepShape::Optional(ValueStep::Scalar(Primitive::FixedU64)));
        optional.skip(&mut bb).unwrap();
        optional.skip(&mut bb).unwrap();
        assert_eq!(bb.read_byte(), Ok(0xbb));
    }

    #[test]
    fn enum_default_is_first_declared() {
        let plan = EnumPlan {
            id:     EnumId::local(0),
            name:   "Level".into(),
            values: vec![
                EnumSymbol { name: "HIGH".into(), value: 7 },
                EnumSymbol { name: "LOW".into(), value: 0 },
            ],
        };
        assert_eq!(plan.default_value(), 7);
        assert_eq!(plan.symbol(0), Some("LOW"));
        assert_eq!(plan.value_of("HIGH"), Some(7));
        assert_eq!(plan.symbol(3), None);
    }
}

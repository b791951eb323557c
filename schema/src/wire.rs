//! Wire kinds and the primitive call table.
//!
//! Every byte-level decision of the format is made here. The compiler, the
//! plan interpreter and generated code all look primitives up in
//! [`PRIMITIVE_CALLS`], so encoders and decoders cannot disagree on layout.

use serde::{Deserialize, Serialize};

/// The on-wire encoding category of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireKind {
    SignedVarint,
    UnsignedVarint,
    Fixed32,
    Fixed64,
    LengthDelimitedBytes,
    LengthDelimitedNested,
}

impl WireKind {
    /// True for kinds written as a varint byte length followed by a payload.
    pub fn is_length_delimited(self) -> bool {
        matches!(self, WireKind::LengthDelimitedBytes | WireKind::LengthDelimitedNested)
    }

    /// Map keys must be varint or fixed width.
    pub fn is_map_key_capable(self) -> bool {
        !self.is_length_delimited()
    }

    /// Size in bytes of fixed-width kinds.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            WireKind::Fixed32 => Some(4),
            WireKind::Fixed64 => Some(8),
            _ => None,
        }
    }
}

/// How the length prefix of a repeated or map field is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceLength {
    /// Varint element (or pair) count followed by the elements.
    Elements,
    /// Varint byte length of the whole sequence payload.
    Bytes,
}

impl SequenceLength {
    /// The one rule for sequence prefixes: length-delimited elements are
    /// framed by total byte length, everything else is counted.
    pub fn for_element(kind: WireKind) -> SequenceLength {
        if kind.is_length_delimited() {
            SequenceLength::Bytes
        } else {
            SequenceLength::Elements
        }
    }
}

/// Protobuf scalar types as they appear in a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
}

pub const SCALAR_TYPES: [ScalarType; 15] = [
    ScalarType::Double,
    ScalarType::Float,
    ScalarType::Int32,
    ScalarType::Int64,
    ScalarType::Uint32,
    ScalarType::Uint64,
    ScalarType::Sint32,
    ScalarType::Sint64,
    ScalarType::Fixed32,
    ScalarType::Fixed64,
    ScalarType::Sfixed32,
    ScalarType::Sfixed64,
    ScalarType::Bool,
    ScalarType::String,
    ScalarType::Bytes,
];

impl ScalarType {
    pub fn proto_name(self) -> &'static str {
        match self {
            ScalarType::Double   => "double",
            ScalarType::Float    => "float",
            ScalarType::Int32    => "int32",
            ScalarType::Int64    => "int64",
            ScalarType::Uint32   => "uint32",
            ScalarType::Uint64   => "uint64",
            ScalarType::Sint32   => "sint32",
            ScalarType::Sint64   => "sint64",
            ScalarType::Fixed32  => "fixed32",
            ScalarType::Fixed64  => "fixed64",
            ScalarType::Sfixed32 => "sfixed32",
            ScalarType::Sfixed64 => "sfixed64",
            ScalarType::Bool     => "bool",
            ScalarType::String   => "string",
            ScalarType::Bytes    => "bytes",
        }
    }

    pub fn from_proto_name(name: &str) -> Option<ScalarType> {
        SCALAR_TYPES.iter().copied().find(|s| s.proto_name() == name)
    }

    /// The read/write primitive for this scalar, chosen by bit width and
    /// signedness.
    pub fn primitive(self) -> Primitive {
        match self {
            ScalarType::Int32 | ScalarType::Sint32 => Primitive::VarI32,
            ScalarType::Int64 | ScalarType::Sint64 => Primitive::VarI64,
            ScalarType::Uint32                     => Primitive::VarU32,
            ScalarType::Uint64                     => Primitive::VarU64,
            ScalarType::Fixed32                    => Primitive::FixedU32,
            ScalarType::Sfixed32                   => Primitive::FixedI32,
            ScalarType::Fixed64                    => Primitive::FixedU64,
            ScalarType::Sfixed64                   => Primitive::FixedI64,
            ScalarType::Float                      => Primitive::F32,
            ScalarType::Double                     => Primitive::F64,
            ScalarType::Bool                       => Primitive::Bool,
            ScalarType::String                     => Primitive::String,
            ScalarType::Bytes                      => Primitive::Bytes,
        }
    }

    pub fn wire_kind(self) -> WireKind {
        self.primitive().wire_kind()
    }

    pub fn is_float(self) -> bool {
        matches!(self, ScalarType::Float | ScalarType::Double)
    }
}

/// A concrete read/write call family. The discriminant indexes
/// [`PRIMITIVE_CALLS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Primitive {
    Bool = 0,
    VarU32,
    VarU64,
    VarI32,
    VarI64,
    FixedU32,
    FixedI32,
    FixedU64,
    FixedI64,
    F32,
    F64,
    String,
    Bytes,
}

/// One row of the primitive table.
#[derive(Debug, PartialEq, Eq)]
pub struct PrimitiveCall {
    pub primitive: Primitive,
    pub wire_kind: WireKind,
    /// `ByteBufferMut` method that writes the value.
    pub write:     &'static str,
    /// `ByteBuffer` method that reads the value.
    pub read:      &'static str,
    /// Rust type produced by `read` and consumed by `write`.
    pub rust_type: &'static str,
    /// Whether `write` borrows its argument instead of taking it by value.
    pub by_ref:    bool,
}

const fn call(
    primitive: Primitive,
    wire_kind: WireKind,
    write: &'static str,
    read: &'static str,
    rust_type: &'static str,
    by_ref: bool,
) -> PrimitiveCall {
    PrimitiveCall { primitive, wire_kind, write, read, rust_type, by_ref }
}

pub const PRIMITIVE_CALLS: [PrimitiveCall; 13] = [
    call(Primitive::Bool,     WireKind::UnsignedVarint,       "write_bool",       "read_bool",       "bool",    false),
    call(Primitive::VarU32,   WireKind::UnsignedVarint,       "write_var_uint",   "read_var_uint",   "u32",     false),
    call(Primitive::VarU64,   WireKind::UnsignedVarint,       "write_var_uint64", "read_var_uint64", "u64",     false),
    call(Primitive::VarI32,   WireKind::SignedVarint,         "write_var_int",    "read_var_int",    "i32",     false),
    call(Primitive::VarI64,   WireKind::SignedVarint,         "write_var_int64",  "read_var_int64",  "i64",     false),
    call(Primitive::FixedU32, WireKind::Fixed32,              "write_fixed32",    "read_fixed32",    "u32",     false),
    call(Primitive::FixedI32, WireKind::Fixed32,              "write_sfixed32",   "read_sfixed32",   "i32",     false),
    call(Primitive::FixedU64, WireKind::Fixed64,              "write_fixed64",    "read_fixed64",    "u64",     false),
    call(Primitive::FixedI64, WireKind::Fixed64,              "write_sfixed64",   "read_sfixed64",   "i64",     false),
    call(Primitive::F32,      WireKind::Fixed32,              "write_float",      "read_float",      "f32",     false),
    call(Primitive::F64,      WireKind::Fixed64,              "write_double",     "read_double",     "f64",     false),
    call(Primitive::String,   WireKind::LengthDelimitedBytes, "write_string",     "read_string",     "String",  true),
    call(Primitive::Bytes,    WireKind::LengthDelimitedBytes, "write_byte_array", "read_byte_array", "Vec<u8>", true),
];

impl Primitive {
    pub fn call(self) -> &'static PrimitiveCall {
        &PRIMITIVE_CALLS[self as usize]
    }

    pub fn wire_kind(self) -> WireKind {
        self.call().wire_kind
    }
}

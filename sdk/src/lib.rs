//! polyglot
//!
//! The crate generated code depends on. It re-exports the wire runtime at its
//! root (`ByteBuffer`, `ByteBufferMut`, `Encode`, `Decode`, `WireError`, …)
//! and the compiler under [`compiler`].

pub use polyglot_schema::*;

pub use polyglot_compiler as compiler;
pub use polyglot_compiler::{CodecError, CompileError, CompiledSchema, ImportTable, Value};

/// Parses a JSON IR document and compiles it against `imports`.
pub fn compile_json(text: &str, imports: &ImportTable) -> Result<CompiledSchema, CompileError> {
    let schema = polyglot_compiler::Schema::from_json(text)?;
    polyglot_compiler::compile(&schema, imports)
}

/// Pretty-printed JSON of a compiled schema's plans and mapping decisions.
pub fn plans_to_json(schema: &CompiledSchema) -> Result<String, CompileError> {
    Ok(serde_json::to_string_pretty(schema)?)
}

pub mod error {
    pub use polyglot_compiler::error::{CodecError, CompileError};
    pub use polyglot_schema::WireError;
}

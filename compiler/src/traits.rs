use crate::{compiler::CompiledSchema, error::CompileError};

/// A back end that renders compiled plans as target-language source.
pub trait Emitter {
    /// File the output for `schema` should be written to, relative to the
    /// output directory.
    fn file_name(&self, schema: &CompiledSchema) -> String;

    fn emit(&self, schema: &CompiledSchema) -> Result<String, CompileError>;
}

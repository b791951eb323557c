use polyglot_schema::WireError;
use thiserror::Error;

/// Everything that can stop a schema from compiling or a plan from emitting.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Unresolved type \"{type_name}\" referenced by \"{message}.{field}\"")]
    UnresolvedType {
        message:   String,
        field:     String,
        type_name: String,
    },

    #[error("Field \"{message}.{field}\" uses \"{key_type}\" as a map key; keys must be integers or bool")]
    MapKeyType {
        message:  String,
        field:    String,
        key_type: String,
    },

    #[error("Message \"{message}\" contains itself by value through field \"{field}\" ({})", .cycle.join(" -> "))]
    InvalidRecursion {
        message: String,
        field:   String,
        cycle:   Vec<String>,
    },

    #[error("Inconsistent IR in {context}: {reason}")]
    IrConsistency {
        context: String,
        reason:  String,
    },

    #[error("Schema \"{schema}\" imports \"{import}\", which has not been compiled")]
    UnresolvedImport {
        schema: String,
        import: String,
    },

    #[error("Emit error: {0}")]
    Emit(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid IR document: {0}")]
    Json(#[from] serde_json::Error),
}

impl CompileError {
    pub(crate) fn consistency(context: impl Into<String>, reason: impl Into<String>) -> Self {
        CompileError::IrConsistency { context: context.into(), reason: reason.into() }
    }
}

/// Failures of the plan interpreter in [`crate::value`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error("Wire error: {0}")]
    Wire(#[from] WireError),

    #[error("Field \"{field}\" expects {expected} but got {found}")]
    TypeMismatch {
        field:    String,
        expected: String,
        found:    String,
    },

    #[error("Unknown message {0}")]
    UnknownMessage(String),
}

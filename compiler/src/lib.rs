//! polyglot-compiler
//!
//! Turns a resolved schema IR into codec plans and target-language code:
//!  1) the IR types and their JSON form (`types`) plus structural checks (`verifier`),
//!  2) the Type Mapper (`mapper`), which fixes every wire decision per field,
//!  3) the Codec Synthesizer (`codec`), which builds ordered encode/decode plans (`plan`),
//!  4) the Dependency Resolver (`resolver`), which rejects value recursion and orders
//!     declarations and schemas,
//!  5) a plan interpreter over dynamic values (`value`) and the Rust back end (`gen_rust`).

pub mod codec;
pub mod compiler;
pub mod error;
pub mod gen_rust;
pub mod mapper;
pub mod plan;
pub mod resolver;
pub mod traits;
pub mod types;
pub mod utils;
pub mod value;
pub mod verifier;

pub use compiler::{compile, compile_set, CompiledSchema, ImportTable};
pub use error::{CodecError, CompileError};
pub use gen_rust::{compile_schema_to_rust, RustEmitter, RustOptions};
pub use traits::Emitter;
pub use types::Schema;
pub use value::Value;

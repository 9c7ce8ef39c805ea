//! lightproto-compiler
//!
//! This crate implements:
//!  1) A schema reader (comment stripping, `import` and `package` directives),
//!  2) A line-oriented structural tokenizer and stack-based parser producing a `SchemaUnit`,
//!  3) A Rust emitter (`compile_schema_to_rust` → `String`) that declares the
//!     types and a reflection table per message for the `lightproto` runtime,
//!  4) File-level helpers (`compile_file`, `write_ir`) and the `CompileError` type.

pub mod error;
pub mod types;
pub mod utils;
pub mod reader;
pub mod tokenizer;
pub mod parser;
pub mod type_table;
pub mod options;
pub mod gen_rust;
pub mod compiler;

pub use compiler::{compile_file, compile_schema, write_ir, Compiled};
pub use error::CompileError;
pub use gen_rust::compile_schema_to_rust;
pub use options::EmitOptions;
pub use parser::parse_schema;
pub use type_table::TypeTable;
pub use types::SchemaUnit;

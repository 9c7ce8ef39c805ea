use std::{fs, io::Write, path::Path};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::{
    error::CompileError,
    gen_rust::compile_schema_to_rust,
    options::EmitOptions,
    parser::parse_schema,
    type_table::TypeTable,
    types::SchemaUnit,
};

/// Output of one pipeline run.
#[derive(Debug)]
pub struct Compiled {
    pub unit: SchemaUnit,
    pub code: String,
}

/// Runs read → parse → emit over schema text held in memory.
///
/// Never fails; unsupported input is skipped (see [`parse_schema`]).
pub fn compile_schema(text: &str, options: &EmitOptions) -> Compiled {
    let unit = parse_schema(text);

    let mut table = TypeTable::new();
    table.register_enums(&unit);

    let code = compile_schema_to_rust(&unit, &table, options);
    debug!(bytes = code.len(), "emitted Rust source");
    Compiled { unit, code }
}

/// Compiles the schema at `input` and writes the generated source to `output`.
///
/// The output is only replaced once generation has finished, so an error
/// never leaves a truncated file behind.
pub fn compile_file(input: &Path, output: &Path, options: &EmitOptions) -> Result<SchemaUnit, CompileError> {
    if !input.exists() {
        return Err(CompileError::InputNotFound(input.to_path_buf()));
    }
    let text = fs::read_to_string(input)?;
    let Compiled { unit, code } = compile_schema(&text, options);

    write_atomic(output, code.as_bytes())?;
    info!(
        input = %input.display(),
        output = %output.display(),
        messages = unit.messages.len(),
        enums = unit.enums.len(),
        "compiled schema"
    );
    Ok(unit)
}

/// Writes the parsed IR as pretty-printed JSON.
pub fn write_ir(unit: &SchemaUnit, path: &Path) -> Result<(), CompileError> {
    let json = serde_json::to_string_pretty(unit)?;
    write_atomic(path, json.as_bytes())
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), CompileError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    file.persist(path).map_err(|e| CompileError::Persist {
        path:   path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

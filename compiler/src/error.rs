use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("failed to write {}: {source}", path.display())]
    Persist {
        path:   PathBuf,
        source: std::io::Error,
    },

    #[error("IR dump error: {0}")]
    IrDump(#[from] serde_json::Error),
}

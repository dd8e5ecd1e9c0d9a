//! Bridge-specific error types

use shared::SharedError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge is already running")]
    AlreadyRunning,

    #[error("No companion sources found in {path}")]
    NoSources { path: String },

    #[error("No usable C++ toolchain found")]
    ToolchainMissing,

    #[error("Companion compilation failed: {output}")]
    CompilationFailed { output: String },

    #[error("Failed to spawn companion process: {message}")]
    SpawnFailed { message: String },

    #[error("Shared component error")]
    SharedError(#[from] SharedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type BridgeResult<T> = Result<T, BridgeError>;

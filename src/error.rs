use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SentenceRnnError {
    // --- I/O ---
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    // --- Data ---
    #[error("Malformed cache {path}: {reason}")]
    CacheCorrupt { path: PathBuf, reason: String },

    #[error("Split `{split}` has no batches")]
    DatasetEmpty { split: String },

    #[error("Data integrity fault: {0}")]
    DataIntegrity(String),

    #[error("Batch source failed: {0}")]
    BatchSource(String),

    // --- Model ---
    #[error("Shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: String, got: String },

    #[error("Checkpoint save failed: {0}")]
    CheckpointSave(String),

    #[error("Checkpoint load failed: {0}")]
    CheckpointLoad(String),

    // --- Config ---
    #[error("Invalid config: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, SentenceRnnError>;

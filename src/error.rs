//! Error types for the bibliography sorter

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for bibliography sorter operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the bibliography sorter
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Source folder does not exist or is not a directory: {path}")]
    SourceDir { path: PathBuf },

    #[error("No API key provided (pass --api-key or set OPENROUTER_API_KEY)")]
    MissingApiKey,

    #[error("Cache file error: {0}")]
    CacheFile(String),

    #[error("Resume journal error: {0}")]
    JournalFile(String),

    #[error("Invalid plan file {path}: {message}")]
    PlanFile { path: PathBuf, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Directory traversal error: {0}")]
    WalkDir(#[from] walkdir::Error),
}

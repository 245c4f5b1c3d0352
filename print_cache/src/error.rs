//! Error types for print_cache

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for print_cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    /// File I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse a JSON payload or bulk file
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// HTTP request failed (network error, timeout, etc.)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP error status code after retries were exhausted
    #[error("HTTP error: {0}")]
    HttpStatus(reqwest::StatusCode),
    /// Bulk file does not exist on disk
    #[error("File not found: {}", .0.display())]
    MissingFile(PathBuf),
    /// Bulk file parsed, but is not a JSON array
    #[error("Expected a JSON array in {}", .0.display())]
    NotAnArray(PathBuf),
    /// Bulk dataset kind not listed in the bulk index
    #[error("Bulk dataset '{0}' not found")]
    DatasetNotFound(String),
    /// Bulk dataset listed without a download location
    #[error("No download_uri for bulk dataset '{0}'")]
    NoDownloadUri(String),
}

/// Result alias for print_cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

//! Error types for accatalog

use std::path::PathBuf;

/// Errors raised while loading or addressing the catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Cannot read catalog manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid catalog manifest: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Catalog manifest contains no audiobook")]
    Empty,

    #[error("Invalid catalog entry #{index}: {reason}")]
    InvalidItem { index: usize, reason: String },

    #[error("Catalog index {index} out of range (catalog has {len} items)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Result alias for accatalog
pub type Result<T> = std::result::Result<T, CatalogError>;

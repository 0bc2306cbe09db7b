//! Export error types.

use coreops_shared::AppError;
use thiserror::Error;

/// Export storage errors.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Export root cannot be used.
    #[error("export storage configuration error: {0}")]
    Configuration(String),

    /// Relative path is empty, absolute, or climbs out with `..`.
    #[error("invalid export path: {0}")]
    InvalidPath(String),

    /// Path resolves outside the export root.
    #[error("export path escapes the export root: {0}")]
    OutsideRoot(String),

    /// No artifact at the path.
    #[error("export not found: {0}")]
    NotFound(String),

    /// Too many rows for one artifact.
    #[error("export exceeds {max} rows")]
    TooManyRows {
        /// Configured limit.
        max: u64,
    },

    /// OpenDAL operation error.
    #[error("export storage operation failed: {0}")]
    Storage(#[from] opendal::Error),

    /// Filesystem error while resolving a path.
    #[error("export filesystem error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::InvalidPath(_) | ExportError::OutsideRoot(_) => {
                Self::Forbidden("Invalid export path".to_string())
            }
            ExportError::NotFound(_) => Self::NotFound("Export not found".to_string()),
            ExportError::TooManyRows { max } => {
                Self::Validation(format!("Export is limited to {max} rows; narrow the filters"))
            }
            ExportError::Configuration(_) | ExportError::Storage(_) | ExportError::Io(_) => {
                Self::internal(err)
            }
        }
    }
}

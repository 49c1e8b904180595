//! Error types for export rendering.

use thiserror::Error;

/// Result type for render operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur while encoding an export artifact.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The design snapshot cannot be rendered (bad dimensions, unknown
    /// format).
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Encoding to the target format failed.
    #[error("export failed: {0}")]
    Export(String),
}

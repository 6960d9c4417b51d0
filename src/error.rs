//! Error types for the rendering pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for rendering operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while rendering a diagram
#[derive(Error, Debug)]
pub enum Error {
    /// The input path does not exist
    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// The input failed the structural sanity check
    #[error("Invalid BPMN document: {0}")]
    InvalidDocument(String),

    /// The diagram toolkit rejected the document during import
    #[error("Failed to import diagram: {0}")]
    ImportError(String),

    /// Vector-to-pixel conversion failed
    #[error("Rasterization failed: {0}")]
    RasterizationError(String),

    /// The encoded image could not be written
    #[error("Failed to write {}: {source}", path.display())]
    OutputWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A headless environment is already installed in this process
    #[error("A headless graphics environment is already installed in this process")]
    EnvironmentBusy,

    /// Reading the input failed for a reason other than absence
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

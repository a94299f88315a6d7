use std::path::PathBuf;

use futures::channel::oneshot::Canceled;
use thiserror::Error;

/// Errors that can occur while reading or writing the persisted drawing
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid drawing data: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Failed to serialize drawing: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to start persistence worker: {0}")]
    Worker(#[source] std::io::Error),

    #[error("Persistence worker stopped before replying")]
    Interrupted(#[from] Canceled),
}

/// Result type for persistence operations
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Errors that can occur while flattening or handing an image to the photo library
#[derive(Debug, Error)]
pub enum ExportError {
    /// The sink's own error, passed through verbatim
    #[error("{0}")]
    Library(String),

    #[error("Failed to encode image: {0}")]
    Encode(#[from] image::ImageError),

    #[error("Failed to write image: {0}")]
    Io(#[from] std::io::Error),

    #[error("No background image to composite with")]
    MissingBackground,

    #[error("Failed to start export worker: {0}")]
    Worker(#[source] std::io::Error),

    #[error("Export worker stopped before replying")]
    Interrupted(#[from] Canceled),
}

/// Reasons the session refuses a command outright
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("Another operation is still in progress")]
    OperationInFlight,

    #[error("The session has been closed")]
    Terminated,

    /// Placeholder for features that are not there yet
    #[error("Sorry!!\nNot implement yet...")]
    NotImplemented,
}

/// Errors that keep the drawing surface from opening
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

//! Error types for the mdtree library.

use std::io;
use thiserror::Error;

/// Result type alias for mdtree operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring a render or talking to a content store.
///
/// Malformed node trees are not represented here: they violate the node model
/// contract and abort the render with a panic.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Rejected render configuration (negative width, unknown selector, ...).
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The content store answered with an error or an unusable payload.
    #[error("Content store error: {0}")]
    Store(String),

    /// Transport-level failure reaching the content store.
    #[cfg(feature = "store")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A render did not finish within the caller's time limit.
    #[cfg(feature = "async")]
    #[error("Render timed out after {0:?}")]
    Timeout(std::time::Duration),
}

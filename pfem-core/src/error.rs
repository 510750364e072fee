//! Error types for pfem operations.

use thiserror::Error;

/// Result type alias using pfem Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during mesh processing and assembly.
#[derive(Error, Debug)]
pub enum Error {
    /// Mesh topology or connectivity errors.
    #[error("mesh error: {0}")]
    Mesh(String),

    /// Dense matrix input that cannot be represented as a mesh.
    #[error("mesh format not supported: {0}")]
    Format(String),

    /// Assembly errors (mismatched bases, wrong displacement size).
    #[error("assembly error: {0}")]
    Assembly(String),

    /// Model identifier not known to the dispatcher (strict policy only).
    #[error("unknown assembler model: {0}")]
    UnknownModel(String),

    /// Invalid material or model parameters.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Surface sampling errors.
    #[error("sampling error: {0}")]
    Sampling(String),

    /// Malformed parameter set.
    #[error("parameter parse error: {0}")]
    Json(#[from] serde_json::Error),
}

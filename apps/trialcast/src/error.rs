//! Errors surfaced by the binary.

use std::path::PathBuf;
use thiserror::Error;
use trialcast_core::{ArtifactError, InputError, PredictError};

/// Everything a command can fail with.
#[derive(Debug, Error)]
pub enum AppError {
    /// Artifacts missing, unreadable, or inconsistent. Fatal at startup.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    /// A field failed validation.
    #[error(transparent)]
    Input(#[from] InputError),

    /// The preprocessor or classifier rejected a valid record.
    #[error(transparent)]
    Predict(#[from] PredictError),

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Usage(String),

    /// Binding or running the HTTP server failed.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

use std::path::PathBuf;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by an image codec
#[derive(Debug, Error)]
pub enum CodecError {
    /// Input could not be decoded or the encoder rejected it
    #[error("{0}")]
    Rejected(String),
    /// The codec could not be run at all
    #[error("codec unavailable: {0}")]
    Unavailable(String),
    #[error("codec I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which stage of a conversion failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Unusable path, unreadable file or bad buffer name
    Input,
    /// The codec refused or failed on the input
    Codec,
    /// The converted file could not be written
    OutputWrite,
}

/// Per-item conversion failure, captured into that item's result
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Invalid file path")]
    InvalidPath,
    #[error("Failed to read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("Failed to write {}: {source}", path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConvertError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ConvertError::InvalidPath | ConvertError::Unreadable { .. } => FailureKind::Input,
            ConvertError::Codec(_) => FailureKind::Codec,
            ConvertError::OutputWrite { .. } => FailureKind::OutputWrite,
        }
    }
}

/// Failure persisting a metadata sidecar
#[derive(Debug, Error)]
pub enum SidecarError {
    #[error("Failed to write sidecar {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize sidecar: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failure deleting a converted output
#[derive(Debug, Error)]
pub enum DeleteError {
    #[error("Failed to delete {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

//! Camera error types

use std::path::PathBuf;

use contracts::ContractError;
use thiserror::Error;

/// Camera specific error
#[derive(Debug, Error)]
pub enum CameraError {
    /// Source path missing from the configuration
    #[error("camera source '{source_kind}' needs a path")]
    MissingPath { source_kind: &'static str },

    /// Recording directory holds no decodable images
    #[error("no images found in recording '{}'", path.display())]
    EmptyRecording { path: PathBuf },

    /// Path could not be opened
    #[error("failed to open '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Worker thread could not be started
    #[error("failed to spawn acquisition thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// Synthetic renderer setup failed
    #[error("synthetic source setup failed: {0}")]
    Synthetic(#[from] vision::VisionError),

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl CameraError {
    pub fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }
}

impl From<CameraError> for ContractError {
    fn from(e: CameraError) -> Self {
        match e {
            CameraError::Contract(inner) => inner,
            other => ContractError::source_unavailable("camera", other.to_string()),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, CameraError>;

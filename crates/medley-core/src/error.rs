//! Error taxonomy shared by both retrieval engines

use std::path::PathBuf;
use thiserror::Error;

use crate::media::MediaKind;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("{} is not a supported {expected} file", path.display())]
    WrongMediaKind { path: PathBuf, expected: MediaKind },

    #[error("no usable media found in {}", .0.display())]
    EmptyDataset(PathBuf),

    #[error(
        "cannot fit {components} components from {samples} samples of dimension {dimension}"
    )]
    InsufficientData {
        samples: usize,
        dimension: usize,
        components: usize,
    },

    #[error("index has not been fitted")]
    NotFitted,

    #[error("similarity is undefined for a zero-norm vector")]
    IndeterminateSimilarity,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub(crate) fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether a multi-file fit may skip the offending file and continue.
    pub fn is_recoverable_per_file(&self) -> bool {
        matches!(self, Error::Decode { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

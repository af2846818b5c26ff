//! Error taxonomy for replace operations

use std::path::PathBuf;
use thiserror::Error;

/// Why a replace operation failed.
///
/// These never leave the library as `Err`: every public operation converts
/// them into a failed [`OperationResult`](super::OperationResult).
#[derive(Error, Debug)]
pub enum ReplaceError {
    /// Required input missing or malformed; rejected before any I/O.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The registry does not know the project, or its directory is gone.
    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    /// The registry itself failed.
    #[error("Project registry error: {0:#}")]
    Registry(anyhow::Error),

    /// No scanned file contains the search key.
    #[error("Text not found in any project files")]
    NoCandidates,

    /// Candidates existed but none of them matched precisely.
    #[error("{message} ({candidates} candidate file(s) checked)")]
    NoMatch { message: String, candidates: usize },

    /// Strict single-file mode found more than one file to rewrite.
    #[error(
        "Text matched in {} files ({}); refusing to rewrite more than one",
        .files.len(),
        .files.join(", ")
    )]
    Ambiguous { files: Vec<String> },

    /// Reading or writing a single file failed.
    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ReplaceError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

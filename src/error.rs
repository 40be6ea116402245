//! Error taxonomy for the recipe lifecycle.

use std::path::{Path, PathBuf};

/// Failures the orchestrator can tell apart.
///
/// These travel inside `anyhow::Error`; callers recover them with
/// `downcast_ref::<RecipeError>()`.
#[derive(Debug)]
pub enum RecipeError {
    /// The archive download did not complete (non-2xx, connection failure, timeout)
    Network { url: String, message: String },
    /// The downloaded file is not a usable zip archive
    Archive { path: PathBuf, message: String },
    /// The unpacked source directory is missing at package time
    NotFound(PathBuf),
    /// A source file could not be read or a destination could not be written
    Io { path: PathBuf, message: String },
}

impl RecipeError {
    pub fn network(url: &str, message: impl Into<String>) -> Self {
        RecipeError::Network {
            url: url.to_string(),
            message: message.into(),
        }
    }

    pub fn archive(path: &Path, message: impl Into<String>) -> Self {
        RecipeError::Archive {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    /// Wrap an underlying error as an I/O failure on `path`, keeping its full cause chain.
    pub fn io(path: &Path, err: impl std::fmt::Display) -> Self {
        RecipeError::Io {
            path: path.to_path_buf(),
            message: format!("{:#}", err),
        }
    }
}

impl std::fmt::Display for RecipeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecipeError::Network { url, message } => {
                write!(f, "Network error downloading {}: {}", url, message)
            }
            RecipeError::Archive { path, message } => {
                write!(f, "Archive error in {}: {}", path.display(), message)
            }
            RecipeError::NotFound(path) => {
                write!(
                    f,
                    "Source directory not found: {}. Run fetch first, or check that the archive version matches.",
                    path.display()
                )
            }
            RecipeError::Io { path, message } => {
                write!(f, "I/O error on {}: {}", path.display(), message)
            }
        }
    }
}

impl std::error::Error for RecipeError {}

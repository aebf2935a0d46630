//! Model reference addressing.

use crate::error::{EmbedderError, Result};
use std::fmt;
use std::path::PathBuf;

/// Identifies the model artifact to load.
///
/// Exactly one addressing mode is active per instance: a direct
/// filesystem path, or a repository/filename pair resolved against the
/// configured endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelReference {
    /// A model file already on disk.
    Local(PathBuf),
    /// A file within a Hugging Face style repository, fetched on first
    /// use and cached locally.
    HuggingFace {
        /// Repository identifier, e.g. `leliuga/all-MiniLM-L6-v2-GGUF`.
        repository: String,
        /// File within the repository, e.g. `all-MiniLM-L6-v2.Q4_0.gguf`.
        filename: String,
    },
}

impl ModelReference {
    /// Creates a reference to a local model file.
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self::Local(path.into())
    }

    /// Creates a reference to a file in a remote repository.
    pub fn hugging_face(repository: impl Into<String>, filename: impl Into<String>) -> Self {
        Self::HuggingFace {
            repository: repository.into(),
            filename: filename.into(),
        }
    }

    /// Whether resolving this reference may require a network fetch.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::HuggingFace { .. })
    }

    /// Repository and filename for a remote reference.
    pub(crate) fn remote_parts(&self) -> Option<(&str, &str)> {
        match self {
            Self::Local(_) => None,
            Self::HuggingFace {
                repository,
                filename,
            } => Some((repository, filename)),
        }
    }

    /// Rejects malformed references before any I/O happens.
    ///
    /// Remote filenames must be plain names: no traversal components and
    /// no absolute paths, since they are joined under the cache root.
    pub(crate) fn validate(&self) -> Result<()> {
        match self {
            Self::Local(path) => {
                if path.as_os_str().is_empty() {
                    return Err(EmbedderError::Resolution(
                        "local model path is empty".to_string(),
                    ));
                }
                Ok(())
            }
            Self::HuggingFace {
                repository,
                filename,
            } => {
                if repository.is_empty() {
                    return Err(EmbedderError::Resolution(
                        "repository identifier is empty".to_string(),
                    ));
                }
                if filename.is_empty() {
                    return Err(EmbedderError::Resolution(
                        "model filename is empty".to_string(),
                    ));
                }
                if repository.starts_with('/') || repository.contains("..") {
                    return Err(EmbedderError::Resolution(format!(
                        "repository identifier {repository:?} is not a plain org/name path"
                    )));
                }
                if filename.contains("..") || filename.starts_with('/') || filename.contains('\\')
                {
                    return Err(EmbedderError::Resolution(format!(
                        "model filename {filename:?} must not contain traversal components"
                    )));
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for ModelReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::HuggingFace {
                repository,
                filename,
            } => write!(f, "{repository}/{filename}"),
        }
    }
}

//! Cache path resolution for model artifacts.

use crate::error::{EmbedderError, Result};
use crate::model::ModelReference;
use std::path::{Path, PathBuf};

/// Where a reference resolves to on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedArtifact {
    /// A local reference, passed through unchanged. Existence is checked
    /// by the engine loader, not here.
    Local(PathBuf),
    /// A remote reference whose cached copy already exists; no fetch is
    /// needed.
    Cached(PathBuf),
    /// A remote reference that must be fetched to `destination` first.
    Absent {
        /// Canonical cache path the artifact will be written to.
        destination: PathBuf,
    },
}

impl ResolvedArtifact {
    /// The on-disk path this resolution refers to.
    pub fn path(&self) -> &Path {
        match self {
            Self::Local(path) | Self::Cached(path) => path,
            Self::Absent { destination } => destination,
        }
    }
}

/// Computes canonical cache locations for remote artifacts.
///
/// Pure path computation plus an existence probe; the locator never
/// creates or modifies files.
#[derive(Debug, Clone)]
pub struct ArtifactLocator {
    cache_dir: PathBuf,
}

impl ArtifactLocator {
    /// Creates a locator rooted at `cache_dir`.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// The cache root this locator resolves into.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Resolves a reference to its on-disk location.
    ///
    /// Remote references map to `<cache-root>/<basename(filename)>`; the
    /// basename keeps repository subdirectories out of the cache layout.
    pub fn resolve(&self, reference: &ModelReference) -> Result<ResolvedArtifact> {
        reference.validate()?;
        match reference {
            ModelReference::Local(path) => Ok(ResolvedArtifact::Local(path.clone())),
            ModelReference::HuggingFace { filename, .. } => {
                let base = Path::new(filename).file_name().ok_or_else(|| {
                    EmbedderError::Resolution(format!(
                        "model filename {filename:?} has no base name"
                    ))
                })?;
                let destination = self.cache_dir.join(base);
                if destination.exists() {
                    Ok(ResolvedArtifact::Cached(destination))
                } else {
                    Ok(ResolvedArtifact::Absent { destination })
                }
            }
        }
    }
}

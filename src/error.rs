//! Error types for model acquisition and embedding.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors produced while obtaining a model or computing embeddings.
///
/// The enum is `Clone` (sources are wrapped in `Arc`) so that callers
/// waiting on a shared initialization receive the same terminal error as
/// the caller that triggered it.
#[derive(Debug, Clone, Error)]
pub enum EmbedderError {
    /// The model reference is malformed: empty fields, path traversal in
    /// a remote filename, or an unparseable endpoint.
    #[error("invalid model reference: {0}")]
    Resolution(String),

    /// The remote repository answered with a non-success HTTP status.
    #[error("model fetch failed: HTTP {status}")]
    Fetch { status: u16 },

    /// The fetch failed below the HTTP layer (DNS, TLS, reset stream).
    #[error("model fetch failed: {0}")]
    Transport(#[source] Arc<reqwest::Error>),

    /// Reading or writing the local cache failed.
    #[error("cache I/O failed: {0}")]
    Io(#[source] Arc<std::io::Error>),

    /// The fetch did not complete within the configured time budget.
    #[error("model fetch timed out after {0:?}")]
    Timeout(Duration),

    /// The artifact exists but an engine could not be built from it.
    #[error("failed to construct embedding engine: {0}")]
    Construction(String),

    /// A request-time failure from the embedding engine. Does not affect
    /// the initialization state.
    #[error("embedding request failed: {0}")]
    Engine(String),
}

/// Result type for embedder operations.
pub type Result<T> = std::result::Result<T, EmbedderError>;

impl From<reqwest::Error> for EmbedderError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(Arc::new(err))
    }
}

impl From<std::io::Error> for EmbedderError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

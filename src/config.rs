//! Embedder configuration types.
//!
//! All parameters are fixed at construction time; changing the pooling
//! strategy or normalization mode requires building a new
//! [`Embedder`](crate::Embedder).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default remote model repository endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://huggingface.co";

/// Default model cache directory, relative to the process working
/// directory.
pub const DEFAULT_CACHE_DIR: &str = "models";

/// Environment variable consulted for a bearer credential when none is
/// set explicitly.
pub const TOKEN_ENV_VAR: &str = "HF_TOKEN";

/// Strategy for reducing per-token vectors to a single embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pooling {
    /// No reduction; kept for parity with engines that emit per-token
    /// output. The bundled GGUF backend rejects it at request time.
    None,
    /// Average over all token vectors.
    #[default]
    Mean,
    /// The class-token (first) vector.
    Cls,
    /// The last token's vector.
    Last,
}

/// Post-processing applied to an embedding vector before it is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Return raw vectors.
    None,
    /// Scale so the largest absolute component maps into int16 range.
    MaxAbsInt16,
    /// Divide by the L1 norm.
    Taxicab,
    /// Divide by the L2 norm (unit length).
    #[default]
    Euclidean,
}

/// Immutable parameters the engine is constructed with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Token-to-embedding reduction strategy.
    pub pooling: Pooling,
    /// Default normalization applied to returned vectors.
    pub normalization: Normalization,
}

/// Full facade configuration.
///
/// `token` falls back to the [`TOKEN_ENV_VAR`] environment variable at
/// build time when left unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedderConfig {
    /// Engine construction parameters.
    pub engine: EngineOptions,
    /// Directory remote artifacts are cached in.
    pub cache_dir: PathBuf,
    /// Base URL of the remote model repository.
    pub endpoint: String,
    /// Optional bearer credential for the remote repository.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub token: Option<String>,
    /// Upper bound on a single artifact fetch. A slower fetch fails
    /// with a timeout error; `None` leaves the fetch unbounded.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub fetch_timeout: Option<Duration>,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            engine: EngineOptions::default(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            token: None,
            fetch_timeout: None,
        }
    }
}

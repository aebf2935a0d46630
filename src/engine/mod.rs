//! Embedding engine seam.
//!
//! The engine is an opaque capability: it accepts raw text plus a
//! normalization mode and returns vectors, and it can describe the model
//! it was built from. [`EmbeddingEngine`] is that boundary;
//! [`EngineLoader`] constructs one from an on-disk artifact. The default
//! GGUF-backed implementation lives in [`gguf`].

pub mod gguf;

pub use gguf::{GgufEngine, GgufLoader};

use crate::config::{EngineOptions, Normalization, Pooling};
use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Structured description of a loaded model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelMetadata {
    /// Model architecture, e.g. `bert`.
    pub architecture: Option<String>,
    /// Human-readable model name.
    pub model_name: Option<String>,
    /// Embedding dimensionality.
    pub embedding_dim: Option<usize>,
    /// Tokenizer vocabulary size.
    pub vocab_size: Option<usize>,
    /// Pooling strategy the engine was constructed with.
    pub pooling: Pooling,
    /// Raw key/value pairs from the model container, stringified. Large
    /// arrays are summarized rather than expanded.
    pub entries: BTreeMap<String, String>,
}

/// The embedding capability consumed by the facade.
///
/// Implementations must be cheap to call concurrently through `&self`;
/// the facade shares one instance across all callers.
pub trait EmbeddingEngine: Send + Sync {
    /// Embeds each text, preserving input order. Output vector `i`
    /// corresponds to input text `i`.
    fn embed(&self, texts: &[String], normalization: Normalization) -> Result<Vec<Vec<f32>>>;

    /// Describes the loaded model.
    fn metadata(&self) -> ModelMetadata;
}

/// Constructs an embedding engine from a fully written artifact.
///
/// Construction is atomic from the caller's perspective: it either
/// yields a usable engine or fails, never a partially constructed one.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EngineLoader: Send + Sync {
    /// Builds an engine over the artifact at `artifact`.
    async fn load(
        &self,
        artifact: &Path,
        options: &EngineOptions,
    ) -> Result<Box<dyn EmbeddingEngine>>;
}

/// Owns the constructed engine for the lifetime of the facade.
///
/// Holds no state beyond the engine instance; callers reach it only
/// after the initialization gate reports ready.
pub struct EngineHandle {
    engine: Box<dyn EmbeddingEngine>,
}

impl EngineHandle {
    pub(crate) fn new(engine: Box<dyn EmbeddingEngine>) -> Self {
        Self { engine }
    }

    /// Embeds each text with the given normalization mode.
    pub fn embed(&self, texts: &[String], normalization: Normalization) -> Result<Vec<Vec<f32>>> {
        self.engine.embed(texts, normalization)
    }

    /// Describes the loaded model.
    pub fn metadata(&self) -> ModelMetadata {
        self.engine.metadata()
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle").finish_non_exhaustive()
    }
}

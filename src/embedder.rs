//! Lazy-initializing embedding facade.
//!
//! [`Embedder`] hides whether its model is already on disk or still
//! needs a one-time download: the first call that needs the engine
//! resolves, fetches, and constructs it through the initialization
//! gate, and every later call reuses the constructed engine.

use crate::config::{EmbedderConfig, Normalization, Pooling, TOKEN_ENV_VAR};
use crate::engine::gguf::GgufLoader;
use crate::engine::{EngineHandle, EngineLoader, ModelMetadata};
use crate::error::{EmbedderError, Result};
use crate::gate::{InitGate, InitState};
use crate::model::{ArtifactLocator, ModelFetcher, ModelReference, ResolvedArtifact};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Text-embedding facade over a lazily acquired model.
///
/// All public operations are async and safe to call concurrently
/// through `&self`. Initialization is single-flight: concurrent first
/// calls cooperate on one fetch and one engine construction, and a
/// failed initialization is terminal for this instance.
pub struct Embedder {
    reference: ModelReference,
    config: EmbedderConfig,
    locator: ArtifactLocator,
    fetcher: ModelFetcher,
    loader: Box<dyn EngineLoader>,
    gate: InitGate<Arc<EngineHandle>>,
}

impl Embedder {
    /// Starts building an embedder over a local model file.
    pub fn local(path: impl Into<PathBuf>) -> EmbedderBuilder {
        EmbedderBuilder::new(ModelReference::local(path))
    }

    /// Starts building an embedder over a remote repository file.
    pub fn hugging_face(
        repository: impl Into<String>,
        filename: impl Into<String>,
    ) -> EmbedderBuilder {
        EmbedderBuilder::new(ModelReference::hugging_face(repository, filename))
    }

    /// Starts building an embedder over an explicit reference.
    pub fn builder(reference: ModelReference) -> EmbedderBuilder {
        EmbedderBuilder::new(reference)
    }

    /// Embeds each text, preserving input order.
    ///
    /// Triggers initialization on first use; repeat calls reuse the
    /// already constructed engine.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let handle = self.engine().await?;
        handle.embed(texts, self.config.engine.normalization)
    }

    /// Describes the loaded model.
    ///
    /// Triggers initialization on first use, exactly as [`Embedder::embed`]
    /// does.
    pub async fn metadata(&self) -> Result<ModelMetadata> {
        let handle = self.engine().await?;
        Ok(handle.metadata())
    }

    /// Current initialization state.
    pub fn state(&self) -> InitState {
        self.gate.state()
    }

    /// The reference this embedder was built over.
    pub fn reference(&self) -> &ModelReference {
        &self.reference
    }

    /// The configuration this embedder was built with.
    pub fn config(&self) -> &EmbedderConfig {
        &self.config
    }

    async fn engine(&self) -> Result<Arc<EngineHandle>> {
        self.gate.get_or_init(|| self.initialize()).await
    }

    async fn initialize(&self) -> Result<Arc<EngineHandle>> {
        let artifact = self.obtain_artifact().await?;
        info!(artifact = %artifact.display(), "constructing embedding engine");
        let engine = self.loader.load(&artifact, &self.config.engine).await?;
        Ok(Arc::new(EngineHandle::new(engine)))
    }

    async fn obtain_artifact(&self) -> Result<PathBuf> {
        match self.locator.resolve(&self.reference)? {
            ResolvedArtifact::Local(path) => Ok(path),
            ResolvedArtifact::Cached(path) => {
                debug!(path = %path.display(), "model already cached, skipping fetch");
                Ok(path)
            }
            ResolvedArtifact::Absent { destination } => {
                let (repository, filename) = self.reference.remote_parts().ok_or_else(|| {
                    EmbedderError::Resolution(
                        "local reference has no artifact on disk to fetch".to_string(),
                    )
                })?;
                self.gate.mark_fetching();
                self.fetcher
                    .fetch(
                        repository,
                        filename,
                        &destination,
                        self.config.token.as_deref(),
                    )
                    .await?;
                Ok(destination)
            }
        }
    }
}

impl std::fmt::Debug for Embedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Embedder")
            .field("reference", &self.reference)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Embedder`].
pub struct EmbedderBuilder {
    reference: ModelReference,
    config: EmbedderConfig,
    client: Option<reqwest::Client>,
    loader: Option<Box<dyn EngineLoader>>,
}

impl EmbedderBuilder {
    /// Creates a builder with default configuration.
    pub fn new(reference: ModelReference) -> Self {
        Self {
            reference,
            config: EmbedderConfig::default(),
            client: None,
            loader: None,
        }
    }

    /// Sets the pooling strategy. Defaults to mean pooling.
    pub fn pooling(mut self, pooling: Pooling) -> Self {
        self.config.engine.pooling = pooling;
        self
    }

    /// Sets the normalization mode. Defaults to euclidean.
    pub fn normalization(mut self, normalization: Normalization) -> Self {
        self.config.engine.normalization = normalization;
        self
    }

    /// Overrides the cache directory remote artifacts are stored in.
    pub fn cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.config.cache_dir = cache_dir.into();
        self
    }

    /// Overrides the remote repository endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    /// Sets the bearer credential for the remote repository. When unset,
    /// the `HF_TOKEN` environment variable is consulted at build time.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config.token = Some(token.into());
        self
    }

    /// Bounds each artifact fetch; a slower fetch fails with
    /// [`EmbedderError::Timeout`].
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.config.fetch_timeout = Some(timeout);
        self
    }

    /// Overrides the HTTP client used for fetching.
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Replaces the default GGUF engine loader with a custom backend.
    pub fn engine_loader(mut self, loader: Box<dyn EngineLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Starts from an existing configuration.
    pub fn config(mut self, config: EmbedderConfig) -> Self {
        self.config = config;
        self
    }

    /// Validates the reference and assembles the embedder. No I/O
    /// happens here; the model is acquired on first use.
    pub fn build(self) -> Result<Embedder> {
        self.reference.validate()?;

        let mut config = self.config;
        if config.token.is_none() {
            config.token = std::env::var(TOKEN_ENV_VAR)
                .ok()
                .filter(|token| !token.is_empty());
        }

        let endpoint = Url::parse(&config.endpoint).map_err(|err| {
            EmbedderError::Resolution(format!(
                "invalid repository endpoint {:?}: {err}",
                config.endpoint
            ))
        })?;

        let locator = ArtifactLocator::new(config.cache_dir.clone());
        let fetcher = ModelFetcher::new(
            self.client.unwrap_or_default(),
            endpoint,
            config.fetch_timeout,
        );

        Ok(Embedder {
            reference: self.reference,
            config,
            locator,
            fetcher,
            loader: self.loader.unwrap_or_else(|| Box::new(GgufLoader)),
            gate: InitGate::new(),
        })
    }
}

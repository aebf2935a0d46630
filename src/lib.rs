//! gist - text embeddings from GGUF models with lazy, single-flight
//! model acquisition.
//!
//! An [`Embedder`] is built over a model reference: either a local GGUF
//! file, or a file in a Hugging Face style repository that is downloaded
//! once into a local cache on first use. Embedding and metadata requests
//! made before the model is ready simply wait for the one in-flight
//! initialization; they never trigger a second download or a second
//! engine construction. The cache is guarded per instance, not across
//! processes: separate processes sharing one cache directory may race
//! on the same artifact path.
//!
//! ```no_run
//! use gist::{Embedder, Pooling};
//!
//! # async fn run() -> gist::Result<()> {
//! let embedder = Embedder::hugging_face(
//!     "leliuga/all-MiniLM-L6-v2-GGUF",
//!     "all-MiniLM-L6-v2.Q4_0.gguf",
//! )
//! .pooling(Pooling::Mean)
//! .build()?;
//!
//! let vectors = embedder
//!     .embed(&["hello, world".to_string()])
//!     .await?;
//! let info = embedder.metadata().await?;
//! println!("{} dims: {:?}", vectors[0].len(), info.embedding_dim);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod model;

mod embedder;
mod gate;

pub use config::{EmbedderConfig, EngineOptions, Normalization, Pooling};
pub use embedder::{Embedder, EmbedderBuilder};
pub use engine::{EmbeddingEngine, EngineHandle, EngineLoader, ModelMetadata};
pub use error::{EmbedderError, Result};
pub use gate::InitState;
pub use model::ModelReference;

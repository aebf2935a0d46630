//! Model addressing, cache resolution, and artifact acquisition.
//!
//! A [`ModelReference`] names what to load. The [`ArtifactLocator`] maps
//! it to an on-disk location and reports whether a remote artifact still
//! needs fetching; the [`ModelFetcher`] performs the one-time download.

mod fetcher;
mod locator;
mod reference;

pub use fetcher::ModelFetcher;
pub use locator::{ArtifactLocator, ResolvedArtifact};
pub use reference::ModelReference;

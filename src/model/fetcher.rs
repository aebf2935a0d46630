//! Streaming download of remote model artifacts.

use crate::error::{EmbedderError, Result};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use url::Url;

/// Downloads artifacts from a Hugging Face style repository endpoint.
///
/// The body is streamed to a `.part` sibling of the destination and
/// renamed into place once fully written, so the destination path never
/// holds a partially written file. The fetcher does not probe for an
/// existing destination; callers skip the fetch on a cache hit.
#[derive(Debug, Clone)]
pub struct ModelFetcher {
    client: reqwest::Client,
    endpoint: Url,
    timeout: Option<Duration>,
}

impl ModelFetcher {
    /// Creates a fetcher against `endpoint` with an optional per-fetch
    /// time budget.
    pub fn new(client: reqwest::Client, endpoint: Url, timeout: Option<Duration>) -> Self {
        Self {
            client,
            endpoint,
            timeout,
        }
    }

    /// Streams `<endpoint>/<repository>/resolve/main/<filename>` to
    /// `destination`, creating parent directories as needed.
    ///
    /// A non-2xx response fails with [`EmbedderError::Fetch`] before
    /// anything is written. Any error or timeout removes the partial
    /// download.
    pub async fn fetch(
        &self,
        repository: &str,
        filename: &str,
        destination: &Path,
        token: Option<&str>,
    ) -> Result<()> {
        let url = self.artifact_url(repository, filename)?;
        info!(
            url = %url,
            destination = %destination.display(),
            "downloading model artifact"
        );

        let transfer = self.transfer(&url, destination, token);
        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, transfer).await {
                Ok(outcome) => outcome,
                Err(_) => Err(EmbedderError::Timeout(limit)),
            },
            None => transfer.await,
        };

        if outcome.is_err() {
            Self::remove_partial(&Self::part_path(destination)).await;
        }
        outcome
    }

    /// Builds the resolve URL for an artifact.
    pub(crate) fn artifact_url(&self, repository: &str, filename: &str) -> Result<Url> {
        self.endpoint
            .join(&format!("{repository}/resolve/main/{filename}"))
            .map_err(|err| {
                EmbedderError::Resolution(format!(
                    "cannot build artifact URL for {repository}/{filename}: {err}"
                ))
            })
    }

    async fn transfer(&self, url: &Url, destination: &Path, token: Option<&str>) -> Result<()> {
        let mut request = self.client.get(url.clone());
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(EmbedderError::Fetch {
                status: status.as_u16(),
            });
        }

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let part = Self::part_path(destination);
        let mut file = tokio::fs::File::create(&part).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&part, destination).await?;
        info!(
            bytes = written,
            destination = %destination.display(),
            "model artifact downloaded"
        );
        Ok(())
    }

    fn part_path(destination: &Path) -> PathBuf {
        let mut name = destination
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".part");
        destination.with_file_name(name)
    }

    async fn remove_partial(part: &Path) {
        if let Err(err) = tokio::fs::remove_file(part).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    path = %part.display(),
                    error = %err,
                    "failed to remove partial download"
                );
            }
        }
    }
}

//! Satisfies byte-range reads by fetching whole-file content at HEAD.

use std::sync::Arc;

use bytes::Bytes;
use svn_remote::{RemoteError, RemoteRepo};
use thiserror::Error;
use tracing::{instrument, trace};

use super::pcache::PathCache;
use super::reconcile::{Reconciler, ResolveError, normalize};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("path not found upstream")]
    NotFound,

    #[error("no versioned content at path")]
    MissingContent,

    #[error("path is a directory")]
    IsDirectory,

    #[error("remote fetch failed")]
    Io(#[source] RemoteError),
}

impl From<ResolveError> for FetchError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::NotFound => Self::NotFound,
            ResolveError::Io(inner) => Self::Io(inner),
        }
    }
}

/// Answers reads from the remote store. No content is cached; every read
/// refetches the whole file.
pub struct ContentFetcher {
    remote: Arc<dyn RemoteRepo>,
    cache: Arc<PathCache>,
    reconciler: Arc<Reconciler>,
}

impl ContentFetcher {
    pub fn new(
        remote: Arc<dyn RemoteRepo>,
        cache: Arc<PathCache>,
        reconciler: Arc<Reconciler>,
    ) -> Self {
        Self {
            remote,
            cache,
            reconciler,
        }
    }

    /// Read up to `max_len` bytes at `offset`.
    ///
    /// An offset at or beyond the cached size yields zero bytes, not an
    /// error. The returned window is additionally clamped to the actually
    /// fetched length in case the file shrank upstream since the cache was
    /// last reconciled.
    #[instrument(skip(self))]
    pub async fn read(&self, path: &str, offset: u64, max_len: u32) -> Result<Bytes, FetchError> {
        let path = normalize(path);

        let entry = match self.cache.lookup(path) {
            Some(entry) => entry,
            None => self.reconciler.resolve(path).await?,
        };

        if offset >= entry.size {
            trace!(path, offset, size = entry.size, "read past end of file");
            return Ok(Bytes::new());
        }

        let content = self.remote.fetch_content(path).await.map_err(|e| match e {
            RemoteError::NotFound | RemoteError::MissingContent => FetchError::MissingContent,
            RemoteError::IsDirectory => FetchError::IsDirectory,
            other => FetchError::Io(other),
        })?;

        let window = (entry.size - offset).min(u64::from(max_len));
        let start = usize::try_from(offset)
            .unwrap_or(content.len())
            .min(content.len());
        let end = start
            .saturating_add(usize::try_from(window).unwrap_or(usize::MAX))
            .min(content.len());
        trace!(path, start, end, fetched = content.len(), "sliced read window");
        Ok(content.slice(start..end))
    }
}

//! Reconciles remote directory listings into the path cache.

use std::sync::Arc;

use svn_remote::models::NodeKind;
use svn_remote::{RemoteError, RemoteRepo};
use thiserror::Error;
use tracing::{instrument, trace};

use crate::fs::DirEntryType;

use super::attr::AttrResolver;
use super::pcache::{CacheEntry, EntryAttrs, PathCache};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("path not found upstream")]
    NotFound,

    #[error("remote listing failed")]
    Io(#[source] RemoteError),
}

impl From<RemoteError> for ResolveError {
    fn from(e: RemoteError) -> Self {
        match e {
            RemoteError::NotFound => Self::NotFound,
            other => Self::Io(other),
        }
    }
}

/// Strip trailing separators; an empty result is the root.
pub(super) fn normalize(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

/// Join a parent path and a relative child name with exactly one separator.
pub(super) fn join_child(parent: &str, rel: &str) -> String {
    let rel = rel.trim_matches('/');
    if parent == "/" {
        format!("/{rel}")
    } else {
        format!("{parent}/{rel}")
    }
}

/// Drives a remote listing and upserts every returned child into the cache.
pub struct Reconciler {
    remote: Arc<dyn RemoteRepo>,
    attrs: AttrResolver,
    cache: Arc<PathCache>,
}

impl Reconciler {
    pub fn new(remote: Arc<dyn RemoteRepo>, attrs: AttrResolver, cache: Arc<PathCache>) -> Self {
        Self {
            remote,
            attrs,
            cache,
        }
    }

    /// Refresh the cache from one remote listing of `path` and return the
    /// entry for `path` itself.
    ///
    /// The queried path appears in its own listing as the empty-rel
    /// self-entry, so after a successful pass the entry is normally the one
    /// upserted during it; a cache fallback covers remotes that omit the
    /// self-entry.
    #[instrument(skip(self))]
    pub async fn resolve(&self, path: &str) -> Result<CacheEntry, ResolveError> {
        let path = normalize(path);
        let target = self.reconcile(path).await?;
        target
            .or_else(|| self.cache.lookup(path))
            .ok_or(ResolveError::NotFound)
    }

    /// Refresh the cache entries for all children of `path`.
    #[instrument(skip(self))]
    pub async fn populate_children(&self, path: &str) -> Result<(), ResolveError> {
        let path = normalize(path);
        self.reconcile(path).await?;
        Ok(())
    }

    /// One reconciliation pass: list `path` remotely, upsert every reported
    /// entry, and return the upserted entry matching `path` itself (if the
    /// listing reported one).
    async fn reconcile(&self, path: &str) -> Result<Option<CacheEntry>, ResolveError> {
        let listing = self.remote.list_children(path).await?;
        trace!(path, count = listing.len(), "reconciling listing");

        let mut target = None;
        for dirent in listing {
            let full_path = if dirent.rel_name.is_empty() {
                // The queried path's own self-entry. The root is synthetic
                // and never cached.
                if path == "/" {
                    continue;
                }
                path.to_owned()
            } else {
                join_child(path, &dirent.rel_name)
            };

            let kind = match dirent.kind {
                NodeKind::File => DirEntryType::RegularFile,
                NodeKind::Dir => DirEntryType::Directory,
            };
            let ownership = self.attrs.resolve(&full_path).await;
            let entry = self.cache.upsert(
                &full_path,
                EntryAttrs {
                    kind,
                    perm: ownership.perm,
                    size: dirent.size,
                    mtime: dirent.mtime,
                    uid: ownership.uid,
                    gid: ownership.gid,
                },
            );

            if entry.path == path {
                target = Some(entry);
            }
        }
        Ok(target)
    }
}

//! The trait every remote repository backend implements.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::RemoteError;
use crate::models::Dirent;

/// A remote, versioned hierarchical store, always queried at HEAD.
///
/// Paths are absolute within the repository namespace (`/`-prefixed, no
/// trailing slash except the root itself).
#[async_trait]
pub trait RemoteRepo: Send + Sync {
    /// List the immediate children of `path`.
    ///
    /// The result includes a self-entry with an empty `rel_name` describing
    /// the queried path itself. Listing a file path yields only that
    /// self-entry.
    async fn list_children(&self, path: &str) -> Result<Vec<Dirent>, RemoteError>;

    /// Fetch the entire content of the file at `path`.
    async fn fetch_content(&self, path: &str) -> Result<Bytes, RemoteError>;

    /// Read the named property of `path`. Absence is `Ok(None)`.
    async fn read_property(&self, path: &str, name: &str)
    -> Result<Option<String>, RemoteError>;
}

//! Error taxonomy for remote repository calls.

use std::time::Duration;

use thiserror::Error;

/// A failure reported by the remote repository.
///
/// `NotFound`, `MissingContent` and `IsDirectory` are distinct, matchable
/// conditions; everything else collapses into the generic variants and is
/// surfaced as an I/O error at the filesystem boundary.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("path not found in repository")]
    NotFound,

    #[error("no versioned content at path")]
    MissingContent,

    #[error("path refers to a directory")]
    IsDirectory,

    #[error("remote call timed out after {0:?}")]
    TimedOut(Duration),

    #[error("malformed listing output: {0}")]
    MalformedListing(String),

    #[error("svn client failed (exit {code:?}): {stderr}")]
    Client {
        code: Option<i32>,
        stderr: String,
    },

    #[error("failed to run svn client")]
    Io(#[from] std::io::Error),
}

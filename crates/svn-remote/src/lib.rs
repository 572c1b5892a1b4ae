//! Remote Subversion repository client for svn-fs.
//!
//! Exposes the small slice of the Subversion model the filesystem needs:
//! listing the children of a path, fetching whole-file content, and reading
//! a named property, all at the HEAD revision. The production backend shells
//! out to the `svn` command-line client; everything else talks to the
//! [`RemoteRepo`] trait so tests can script responses.

mod backends;
mod client;
pub mod error;
pub mod models;

pub use backends::CommandRepo;
pub use client::RemoteRepo;
pub use error::RemoteError;

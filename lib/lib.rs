//! svn-fs shared library.

/// Filesystem abstractions, the svn-backed implementation, and the FUSE
/// adapter.
pub mod fs;

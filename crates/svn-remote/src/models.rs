//! Data model for remote listing results.

use std::time::SystemTime;

/// Kind of a node in the repository tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    File,
    Dir,
}

/// One entry returned by a directory listing.
///
/// `rel_name` is relative to the queried path. An empty `rel_name` denotes
/// the queried path's own self-entry rather than a child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dirent {
    pub rel_name: String,
    pub kind: NodeKind,
    /// Byte length for files; zero for directories.
    pub size: u64,
    /// Timestamp of the last commit that touched this node.
    pub mtime: SystemTime,
}

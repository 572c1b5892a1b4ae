//! The path → metadata cache.
//!
//! Records every path the reconciler has ever observed, keyed by normalized
//! absolute path. Entries are never removed: a path that vanishes upstream
//! stays resolvable until the process restarts.

use std::time::SystemTime;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::fs::{DirEntryType, Permissions};

/// Cached POSIX metadata for one discovered path.
///
/// `path` is immutable once set; every other field may be overwritten in
/// place by a later reconciliation pass for the same path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub path: String,
    pub kind: DirEntryType,
    pub perm: Permissions,
    /// Byte length as last reported upstream. Informational for directories.
    pub size: u64,
    pub mtime: SystemTime,
    pub uid: u32,
    pub gid: u32,
}

impl CacheEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == DirEntryType::Directory
    }

    /// The final path segment.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// The mutable fields of a [`CacheEntry`], as produced by one reconciliation
/// pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryAttrs {
    pub kind: DirEntryType,
    pub perm: Permissions,
    pub size: u64,
    pub mtime: SystemTime,
    pub uid: u32,
    pub gid: u32,
}

/// Keyed path cache.
///
/// A hash map keyed by normalized path. The lock is only ever held for the
/// duration of a single map operation; remote calls happen outside it.
#[derive(Debug, Default)]
pub struct PathCache {
    entries: RwLock<FxHashMap<String, CacheEntry>>,
}

impl PathCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new entry for `path`, or overwrite the mutable fields of the
    /// existing one. Returns a snapshot of the resulting entry.
    pub fn upsert(&self, path: &str, attrs: EntryAttrs) -> CacheEntry {
        debug_assert!(path.starts_with('/'), "upsert of non-absolute path {path}");
        debug_assert!(
            path == "/" || !path.ends_with('/'),
            "upsert of non-normalized path {path}"
        );

        let mut entries = self.entries.write();
        let entry = entries
            .entry(path.to_owned())
            .or_insert_with(|| CacheEntry {
                path: path.to_owned(),
                kind: attrs.kind,
                perm: attrs.perm,
                size: attrs.size,
                mtime: attrs.mtime,
                uid: attrs.uid,
                gid: attrs.gid,
            });
        entry.kind = attrs.kind;
        entry.perm = attrs.perm;
        entry.size = attrs.size;
        entry.mtime = attrs.mtime;
        entry.uid = attrs.uid;
        entry.gid = attrs.gid;
        entry.clone()
    }

    /// Exact-match lookup.
    #[must_use]
    pub fn lookup(&self, path: &str) -> Option<CacheEntry> {
        self.entries.read().get(path).cloned()
    }

    /// All entries whose path has `path` as its direct parent, in name-sorted
    /// order. Grandchildren are excluded. For the root this is every
    /// single-segment path.
    #[must_use]
    pub fn children_of(&self, path: &str) -> Vec<CacheEntry> {
        let entries = self.entries.read();
        let mut children: Vec<CacheEntry> = entries
            .values()
            .filter(|e| is_direct_child(path, &e.path))
            .cloned()
            .collect();
        drop(entries);
        children.sort_by(|a, b| a.path.cmp(&b.path));
        children
    }

    /// Number of distinct cached paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// True when `candidate` is exactly one segment below `parent`.
fn is_direct_child(parent: &str, candidate: &str) -> bool {
    let rest = if parent == "/" {
        candidate.strip_prefix('/')
    } else {
        candidate
            .strip_prefix(parent)
            .and_then(|r| r.strip_prefix('/'))
    };
    match rest {
        Some(r) => !r.is_empty() && !r.contains('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(kind: DirEntryType, size: u64) -> EntryAttrs {
        EntryAttrs {
            kind,
            perm: Permissions::from_bits_truncate(0o775),
            size,
            mtime: SystemTime::UNIX_EPOCH,
            uid: 0,
            gid: 0,
        }
    }

    #[test]
    fn direct_child_under_root() {
        assert!(is_direct_child("/", "/a"));
        assert!(!is_direct_child("/", "/a/b"));
        assert!(!is_direct_child("/", "/"));
    }

    #[test]
    fn direct_child_under_nested_parent() {
        assert!(is_direct_child("/a", "/a/b"));
        assert!(!is_direct_child("/a", "/a/b/c"));
        assert!(!is_direct_child("/a", "/ab"));
        assert!(!is_direct_child("/a", "/a"));
    }

    #[test]
    fn upsert_preserves_path_identity() {
        let cache = PathCache::new();
        cache.upsert("/a", attrs(DirEntryType::RegularFile, 1));
        let updated = cache.upsert("/a", attrs(DirEntryType::RegularFile, 2));
        assert_eq!(updated.path, "/a");
        assert_eq!(updated.size, 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn entry_name_is_final_segment() {
        let cache = PathCache::new();
        let e = cache.upsert("/docs/readme.txt", attrs(DirEntryType::RegularFile, 42));
        assert_eq!(e.name(), "readme.txt");
    }
}

//! A read-only filesystem over a remote Subversion repository at HEAD.
//!
//! The core of the crate is a monotonic path-to-metadata cache fed by remote
//! directory listings. Repository properties map onto POSIX ownership, and a
//! content fetcher answers byte range reads. [`SvnFs`] glues those onto the
//! inode-addressed [`Fs`] trait via a path/inode bridge.

use std::ffi::OsStr;
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use svn_remote::RemoteRepo;
use tracing::{instrument, trace, warn};

use crate::fs::{
    CommonFileAttr, DirEntry, DirEntryType, FileAttr, FileHandle, FilesystemStats, Fs, Inode,
    OpenFile, OpenFlags, Permissions,
};

pub mod accounts;
pub mod attr;
mod common;
pub mod content;
pub mod pcache;
pub mod reconcile;

pub use accounts::{AccountResolver, NativeAccounts};
pub use attr::{AttrResolver, FileOwnership};
pub use common::{GetAttrError, LookupError, OpenError, ReadDirError, ReadError, ReleaseError};
pub use content::{ContentFetcher, FetchError};
pub use pcache::{CacheEntry, EntryAttrs, PathCache};
pub use reconcile::{Reconciler, ResolveError};

use reconcile::join_child;

/// The parent of a normalized absolute path; the root's parent is itself.
fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &path[..idx],
    }
}

pub fn blocks_of_size(block_size: u32, size: u64) -> u64 {
    size.div_ceil(u64::from(block_size))
}

/// Inode ⇄ path translation plus file handle bookkeeping.
///
/// Monotonic like the path cache: an inode, once handed to the kernel, keeps
/// its path for the process lifetime.
struct BridgeState {
    paths: FxHashMap<Inode, String>,
    inodes: FxHashMap<String, Inode>,
    next_ino: Inode,
    next_fh: FileHandle,
    open_files: FxHashMap<FileHandle, Inode>,
}

/// The svn-backed filesystem.
pub struct SvnFs {
    fs_owner: (u32, u32),
    mount_time: SystemTime,

    cache: Arc<PathCache>,
    reconciler: Arc<Reconciler>,
    fetcher: ContentFetcher,

    bridge: RwLock<BridgeState>,
}

impl SvnFs {
    pub const ROOT_INO: Inode = 1;
    const BLOCK_SIZE: u32 = 4096;
    const ROOT_PERM: u16 = 0o755;

    pub fn new(
        remote: Arc<dyn RemoteRepo>,
        accounts: Arc<dyn AccountResolver>,
        fs_owner: (u32, u32),
    ) -> Self {
        let cache = Arc::new(PathCache::new());
        let attrs = AttrResolver::new(Arc::clone(&remote), accounts);
        let reconciler = Arc::new(Reconciler::new(
            Arc::clone(&remote),
            attrs,
            Arc::clone(&cache),
        ));
        let fetcher = ContentFetcher::new(remote, Arc::clone(&cache), Arc::clone(&reconciler));

        let mut paths = FxHashMap::default();
        paths.insert(Self::ROOT_INO, "/".to_owned());
        let mut inodes = FxHashMap::default();
        inodes.insert("/".to_owned(), Self::ROOT_INO);

        Self {
            fs_owner,
            mount_time: SystemTime::now(),
            cache,
            reconciler,
            fetcher,
            bridge: RwLock::new(BridgeState {
                paths,
                inodes,
                next_ino: Self::ROOT_INO + 1,
                next_fh: 1,
                open_files: FxHashMap::default(),
            }),
        }
    }

    fn path_of(&self, ino: Inode) -> Option<String> {
        self.bridge.read().paths.get(&ino).cloned()
    }

    /// The inode for `path`, allocating one on first sight.
    fn ino_for(&self, path: &str) -> Inode {
        let mut bridge = self.bridge.write();
        if let Some(&ino) = bridge.inodes.get(path) {
            return ino;
        }
        let ino = bridge.next_ino;
        bridge.next_ino += 1;
        bridge.inodes.insert(path.to_owned(), ino);
        bridge.paths.insert(ino, path.to_owned());
        ino
    }

    /// The root is synthetic: always a `0755` directory owned by the mount
    /// owner, answered without consulting the remote store, never cached.
    fn root_attr(&self) -> FileAttr {
        FileAttr::Directory {
            common: CommonFileAttr {
                ino: Self::ROOT_INO,
                atime: self.mount_time,
                mtime: self.mount_time,
                ctime: self.mount_time,
                perm: Permissions::from_bits_truncate(Self::ROOT_PERM),
                nlink: 2,
                uid: self.fs_owner.0,
                gid: self.fs_owner.1,
                blksize: Self::BLOCK_SIZE,
            },
        }
    }

    fn attr_of(&self, ino: Inode, entry: &CacheEntry) -> FileAttr {
        let common = CommonFileAttr {
            ino,
            atime: entry.mtime,
            mtime: entry.mtime,
            ctime: entry.mtime,
            perm: entry.perm,
            nlink: 1,
            uid: entry.uid,
            gid: entry.gid,
            blksize: Self::BLOCK_SIZE,
        };
        match entry.kind {
            DirEntryType::RegularFile => FileAttr::RegularFile {
                common,
                size: entry.size,
                blocks: blocks_of_size(Self::BLOCK_SIZE, entry.size),
            },
            DirEntryType::Directory => FileAttr::Directory { common },
        }
    }

    /// Cache hit, or a reconciliation pass on miss.
    async fn entry_for(&self, path: &str) -> Result<CacheEntry, ResolveError> {
        if let Some(entry) = self.cache.lookup(path) {
            return Ok(entry);
        }
        self.reconciler.resolve(path).await
    }
}

#[async_trait]
impl Fs for SvnFs {
    type LookupError = LookupError;
    type GetAttrError = GetAttrError;
    type OpenError = OpenError;
    type ReadError = ReadError;
    type ReaddirError = ReadDirError;
    type ReleaseError = ReleaseError;

    #[instrument(skip(self))]
    async fn lookup(&self, parent: Inode, name: &OsStr) -> Result<FileAttr, LookupError> {
        let parent_path = self.path_of(parent).ok_or(LookupError::InodeNotFound)?;
        // Upstream paths are UTF-8; a name that isn't cannot exist there.
        let name = name.to_str().ok_or(ResolveError::NotFound)?;
        let path = join_child(&parent_path, name);

        let entry = self.entry_for(&path).await?;
        let ino = self.ino_for(&path);
        trace!(ino, path, "resolved path");
        Ok(self.attr_of(ino, &entry))
    }

    #[instrument(skip(self))]
    async fn getattr(
        &self,
        ino: Inode,
        _fh: Option<FileHandle>,
    ) -> Result<FileAttr, GetAttrError> {
        if ino == Self::ROOT_INO {
            return Ok(self.root_attr());
        }
        let path = self.path_of(ino).ok_or_else(|| {
            warn!(ino, "getattr on unknown inode");
            GetAttrError::InodeNotFound
        })?;
        let entry = self.entry_for(&path).await?;
        Ok(self.attr_of(ino, &entry))
    }

    #[instrument(skip(self))]
    async fn readdir(&self, ino: Inode) -> Result<Vec<DirEntry>, ReadDirError> {
        let path = self.path_of(ino).ok_or(ReadDirError::InodeNotFound)?;

        self.reconciler.populate_children(&path).await?;

        if path != "/" {
            match self.cache.lookup(&path) {
                Some(entry) if !entry.is_dir() => return Err(ReadDirError::NotADirectory),
                _ => {}
            }
        }

        let children = self.cache.children_of(&path);
        trace!(ino, path, count = children.len(), "listing directory");

        let mut entries = Vec::with_capacity(children.len() + 2);
        entries.push(DirEntry {
            ino,
            name: ".".into(),
            kind: DirEntryType::Directory,
        });
        entries.push(DirEntry {
            ino: self.ino_for(parent_of(&path)),
            name: "..".into(),
            kind: DirEntryType::Directory,
        });
        for child in children {
            entries.push(DirEntry {
                ino: self.ino_for(&child.path),
                name: child.name().into(),
                kind: child.kind,
            });
        }
        Ok(entries)
    }

    #[instrument(skip(self))]
    async fn open(&self, ino: Inode, _flags: OpenFlags) -> Result<OpenFile, OpenError> {
        if ino == Self::ROOT_INO {
            return Err(OpenError::IsDirectory);
        }
        let path = self.path_of(ino).ok_or_else(|| {
            warn!(ino, "open on unknown inode");
            OpenError::InodeNotFound
        })?;
        let entry = self.entry_for(&path).await?;
        if entry.is_dir() {
            return Err(OpenError::IsDirectory);
        }

        let mut bridge = self.bridge.write();
        let fh = bridge.next_fh;
        bridge.next_fh += 1;
        bridge.open_files.insert(fh, ino);
        trace!(ino, fh, path, "assigned file handle");
        Ok(OpenFile { handle: fh })
    }

    #[instrument(skip(self))]
    async fn read(
        &self,
        ino: Inode,
        fh: FileHandle,
        offset: u64,
        size: u32,
    ) -> Result<Bytes, ReadError> {
        let file_ino = self
            .bridge
            .read()
            .open_files
            .get(&fh)
            .copied()
            .ok_or_else(|| {
                warn!(fh, "read on unknown file handle");
                ReadError::FileNotOpen
            })?;
        debug_assert!(
            file_ino == ino,
            "read: file handle {fh} maps to inode {file_ino}, but caller passed inode {ino}"
        );

        let path = self.path_of(ino).ok_or(ReadError::InodeNotFound)?;
        Ok(self.fetcher.read(&path, offset, size).await?)
    }

    #[instrument(skip(self))]
    async fn release(&self, ino: Inode, fh: FileHandle) -> Result<(), ReleaseError> {
        let released = self.bridge.write().open_files.remove(&fh);
        let released_ino = released.ok_or_else(|| {
            warn!(fh, "release on unknown file handle");
            ReleaseError::FileNotOpen
        })?;
        debug_assert!(
            released_ino == ino,
            "release: file handle {fh} mapped to inode {released_ino}, but caller passed inode {ino}"
        );
        trace!(ino = released_ino, fh, "closed file handle");
        Ok(())
    }

    async fn forget(&self, ino: Inode, nlookups: u64) {
        // The bridge and the cache are both monotonic; nothing to evict.
        trace!(ino, nlookups, "forget ignored");
    }

    async fn statfs(&self) -> Result<FilesystemStats, std::io::Error> {
        Ok(FilesystemStats {
            block_size: Self::BLOCK_SIZE,
            fragment_size: Self::BLOCK_SIZE,
            total_blocks: 0,
            free_blocks: 0,
            available_blocks: 0,
            total_inodes: self.cache.len() as u64,
            free_inodes: 0,
            max_filename_length: 255,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_of_nested_path() {
        assert_eq!(parent_of("/a/b/c"), "/a/b");
        assert_eq!(parent_of("/a"), "/");
        assert_eq!(parent_of("/"), "/");
    }

    #[test]
    fn blocks_round_up() {
        assert_eq!(blocks_of_size(4096, 0), 0);
        assert_eq!(blocks_of_size(4096, 1), 1);
        assert_eq!(blocks_of_size(4096, 4096), 1);
        assert_eq!(blocks_of_size(4096, 4097), 2);
    }
}

//! Generic filesystem abstractions.
//!
//! This is a slightly cleaner interface than directly using fuser. The whole
//! point of it is to keep fuser-specific details out of the filesystem
//! implementations.

use std::ffi::{OsStr, OsString};
use std::time::SystemTime;

use async_trait::async_trait;
use bitflags::bitflags;
use bytes::Bytes;

/// FUSE adapter: maps [`fuser::Filesystem`] callbacks to [`Fs`].
pub mod fuser;
/// The svn-backed filesystem implementation.
pub mod svn;

/// Type representing an inode.
pub type Inode = u64;

/// Type representing a file handle.
pub type FileHandle = u64;

bitflags! {
    /// Unix permission bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Permissions: u16 {
        // Other
        const OTHER_EXECUTE = 1 << 0;
        const OTHER_WRITE   = 1 << 1;
        const OTHER_READ    = 1 << 2;

        // Group
        const GROUP_EXECUTE = 1 << 3;
        const GROUP_WRITE   = 1 << 4;
        const GROUP_READ    = 1 << 5;

        // Owner
        const OWNER_EXECUTE = 1 << 6;
        const OWNER_WRITE   = 1 << 7;
        const OWNER_READ    = 1 << 8;

        // Special bits
        const STICKY        = 1 << 9;
        const SETGID        = 1 << 10;
        const SETUID        = 1 << 11;
    }
}

bitflags! {
    /// The open(2) flags a read-only filesystem cares about. Write-oriented
    /// flags are truncated away at the FUSE boundary; the kernel already
    /// rejects writes on an RO mount.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpenFlags: i32 {
        const RDONLY = libc::O_RDONLY;
        const NONBLOCK = libc::O_NONBLOCK;
        const NOFOLLOW = libc::O_NOFOLLOW;
        const CLOEXEC = libc::O_CLOEXEC;
        const DIRECTORY = libc::O_DIRECTORY;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommonFileAttr {
    pub ino: Inode,
    pub atime: SystemTime,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
    pub perm: Permissions,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub blksize: u32,
}

/// POSIX attributes of one filesystem node.
///
/// The repository only ever reports regular files and directories, so those
/// are the only two kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileAttr {
    RegularFile {
        common: CommonFileAttr,
        size: u64,
        blocks: u64,
    },
    Directory {
        common: CommonFileAttr,
    },
}

impl FileAttr {
    pub fn common(&self) -> &CommonFileAttr {
        match self {
            Self::RegularFile { common, .. } | Self::Directory { common } => common,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirEntryType {
    RegularFile,
    Directory,
}

impl From<FileAttr> for DirEntryType {
    fn from(attr: FileAttr) -> Self {
        match attr {
            FileAttr::RegularFile { .. } => Self::RegularFile,
            FileAttr::Directory { .. } => Self::Directory,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DirEntry {
    pub ino: Inode,
    pub name: OsString,
    pub kind: DirEntryType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpenFile {
    pub handle: FileHandle,
}

/// The statvfs-shaped subset fuser can actually report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilesystemStats {
    pub block_size: u32,
    pub fragment_size: u32,
    pub total_blocks: u64,
    pub free_blocks: u64,
    pub available_blocks: u64,
    pub total_inodes: u64,
    pub free_inodes: u64,
    pub max_filename_length: u32,
}

/// A read-only filesystem.
///
/// Methods take `&self`; implementations guard their own state so that calls
/// for independent paths may run concurrently.
#[async_trait]
pub trait Fs: Send + Sync {
    type LookupError: std::error::Error;
    type GetAttrError: std::error::Error;
    type OpenError: std::error::Error;
    type ReadError: std::error::Error;
    type ReaddirError: std::error::Error;
    type ReleaseError: std::error::Error;

    /// Resolve a child of `parent` by name.
    async fn lookup(&self, parent: Inode, name: &OsStr) -> Result<FileAttr, Self::LookupError>;

    /// Can be called in two contexts -- the file is not open (in which case
    /// `fh` is `None`), or the file is open (in which case `fh` is `Some`).
    async fn getattr(
        &self,
        ino: Inode,
        fh: Option<FileHandle>,
    ) -> Result<FileAttr, Self::GetAttrError>;

    /// Read the contents of a directory, including the synthetic `.` and
    /// `..` entries.
    async fn readdir(&self, ino: Inode) -> Result<Vec<DirEntry>, Self::ReaddirError>;

    /// Open a file for reading. Existence and type check only; content is
    /// fetched per read.
    async fn open(&self, ino: Inode, flags: OpenFlags) -> Result<OpenFile, Self::OpenError>;

    /// Read data from an open file.
    async fn read(
        &self,
        ino: Inode,
        fh: FileHandle,
        offset: u64,
        size: u32,
    ) -> Result<Bytes, Self::ReadError>;

    /// Called when the kernel closes a file handle.
    async fn release(&self, ino: Inode, fh: FileHandle) -> Result<(), Self::ReleaseError>;

    /// Called when the kernel is done with an inode.
    async fn forget(&self, ino: Inode, nlookups: u64);

    /// Get filesystem statistics.
    async fn statfs(&self) -> Result<FilesystemStats, std::io::Error>;
}

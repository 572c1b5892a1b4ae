//! Adapter from [`fuser::Filesystem`] callbacks onto an [`Fs`].

use std::ffi::OsStr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tracing::{debug, instrument, trace};

use crate::fs::{FileAttr, Fs, OpenFlags};

/// Attribute TTL handed to the kernel. Kept short so that upstream changes
/// become visible without an invalidation channel.
const ATTR_TTL: Duration = Duration::from_secs(1);

fn fuse_attr(attr: FileAttr) -> fuser::FileAttr {
    let common = *attr.common();
    let (kind, size, blocks) = match attr {
        FileAttr::RegularFile { size, blocks, .. } => {
            (fuser::FileType::RegularFile, size, blocks)
        }
        FileAttr::Directory { .. } => (fuser::FileType::Directory, 0, 0),
    };
    fuser::FileAttr {
        ino: common.ino,
        size,
        blocks,
        atime: common.atime,
        mtime: common.mtime,
        ctime: common.ctime,
        crtime: SystemTime::UNIX_EPOCH,
        kind,
        perm: common.perm.bits(),
        nlink: common.nlink,
        uid: common.uid,
        gid: common.gid,
        rdev: 0,
        blksize: common.blksize,
        flags: 0,
    }
}

impl From<crate::fs::DirEntryType> for fuser::FileType {
    fn from(val: crate::fs::DirEntryType) -> Self {
        match val {
            crate::fs::DirEntryType::RegularFile => Self::RegularFile,
            crate::fs::DirEntryType::Directory => Self::Directory,
        }
    }
}

/// Bridges the synchronous fuser callback surface onto the async [`Fs`] via
/// a tokio runtime handle. Each callback spawns a task and replies from it;
/// typed errors become raw errnos at this boundary.
pub struct FuserAdapter<F> {
    fs: Arc<F>,
    runtime: tokio::runtime::Handle,
}

impl<F: Fs> FuserAdapter<F> {
    pub fn new(fs: F, runtime: tokio::runtime::Handle) -> Self {
        Self {
            fs: Arc::new(fs),
            runtime,
        }
    }
}

impl<F: Fs + 'static> fuser::Filesystem for FuserAdapter<F>
where
    F::LookupError: Into<i32>,
    F::GetAttrError: Into<i32>,
    F::OpenError: Into<i32>,
    F::ReadError: Into<i32>,
    F::ReaddirError: Into<i32>,
    F::ReleaseError: Into<i32>,
{
    #[instrument(name = "FuserAdapter::lookup", skip(self, _req, reply))]
    fn lookup(
        &mut self,
        _req: &fuser::Request<'_>,
        parent: u64,
        name: &OsStr,
        reply: fuser::ReplyEntry,
    ) {
        let fs = Arc::clone(&self.fs);
        let name = name.to_owned();
        self.runtime.spawn(async move {
            match fs.lookup(parent, &name).await {
                Ok(attr) => {
                    trace!(ino = attr.common().ino, "lookup hit");
                    reply.entry(&ATTR_TTL, &fuse_attr(attr), 0);
                }
                Err(e) => {
                    debug!(error = %e, "lookup failed");
                    reply.error(e.into());
                }
            }
        });
    }

    #[instrument(name = "FuserAdapter::getattr", skip(self, _req, fh, reply))]
    fn getattr(
        &mut self,
        _req: &fuser::Request<'_>,
        ino: u64,
        fh: Option<u64>,
        reply: fuser::ReplyAttr,
    ) {
        let fs = Arc::clone(&self.fs);
        self.runtime.spawn(async move {
            match fs.getattr(ino, fh).await {
                Ok(attr) => reply.attr(&ATTR_TTL, &fuse_attr(attr)),
                Err(e) => {
                    debug!(error = %e, "getattr failed");
                    reply.error(e.into());
                }
            }
        });
    }

    #[instrument(name = "FuserAdapter::readdir", skip(self, _req, _fh, reply))]
    fn readdir(
        &mut self,
        _req: &fuser::Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: fuser::ReplyDirectory,
    ) {
        let fs = Arc::clone(&self.fs);
        self.runtime.spawn(async move {
            let entries = match fs.readdir(ino).await {
                Ok(entries) => entries,
                Err(e) => {
                    debug!(error = %e, "readdir failed");
                    reply.error(e.into());
                    return;
                }
            };

            // The kernel resumes with the offset of the last entry it
            // consumed; entry i is reported at offset i + 1.
            let skip = usize::try_from(offset).unwrap_or_default();
            for (i, entry) in entries.iter().enumerate().skip(skip) {
                let Ok(next_offset) = i64::try_from(i + 1) else {
                    debug!(index = i, "directory too large for fuser offsets");
                    reply.error(libc::EIO);
                    return;
                };
                if reply.add(entry.ino, next_offset, entry.kind.into(), &entry.name) {
                    trace!(sent = i - skip, "readdir buffer full");
                    break;
                }
            }
            reply.ok();
        });
    }

    #[instrument(name = "FuserAdapter::open", skip(self, _req, reply))]
    fn open(&mut self, _req: &fuser::Request<'_>, ino: u64, flags: i32, reply: fuser::ReplyOpen) {
        let fs = Arc::clone(&self.fs);
        let flags = OpenFlags::from_bits_truncate(flags);
        self.runtime.spawn(async move {
            match fs.open(ino, flags).await {
                Ok(open_file) => {
                    trace!(fh = open_file.handle, "opened");
                    reply.opened(open_file.handle, 0);
                }
                Err(e) => {
                    debug!(error = %e, "open failed");
                    reply.error(e.into());
                }
            }
        });
    }

    #[instrument(
        name = "FuserAdapter::read",
        skip(self, _req, _flags, _lock_owner, reply)
    )]
    fn read(
        &mut self,
        _req: &fuser::Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: fuser::ReplyData,
    ) {
        let fs = Arc::clone(&self.fs);
        self.runtime.spawn(async move {
            match fs.read(ino, fh, offset.cast_unsigned(), size).await {
                Ok(data) => {
                    trace!(bytes = data.len(), "read complete");
                    reply.data(&data);
                }
                Err(e) => {
                    debug!(error = %e, "read failed");
                    reply.error(e.into());
                }
            }
        });
    }

    #[instrument(name = "FuserAdapter::release", skip(self, _req, _lock_owner, reply))]
    fn release(
        &mut self,
        _req: &fuser::Request<'_>,
        ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: fuser::ReplyEmpty,
    ) {
        let fs = Arc::clone(&self.fs);
        self.runtime.spawn(async move {
            match fs.release(ino, fh).await {
                Ok(()) => reply.ok(),
                Err(e) => {
                    debug!(error = %e, "release failed");
                    reply.error(e.into());
                }
            }
        });
    }

    #[instrument(name = "FuserAdapter::forget", skip(self, _req))]
    fn forget(&mut self, _req: &fuser::Request<'_>, ino: u64, nlookup: u64) {
        let fs = Arc::clone(&self.fs);
        self.runtime.spawn(async move {
            fs.forget(ino, nlookup).await;
        });
    }

    #[instrument(name = "FuserAdapter::statfs", skip(self, _req, _ino, reply))]
    fn statfs(&mut self, _req: &fuser::Request<'_>, _ino: u64, reply: fuser::ReplyStatfs) {
        let fs = Arc::clone(&self.fs);
        self.runtime.spawn(async move {
            match fs.statfs().await {
                Ok(stats) => reply.statfs(
                    stats.total_blocks,
                    stats.free_blocks,
                    stats.available_blocks,
                    stats.total_inodes,
                    stats.free_inodes,
                    stats.block_size,
                    stats.max_filename_length,
                    stats.fragment_size,
                ),
                Err(e) => {
                    debug!(error = %e, "statfs failed");
                    reply.error(e.raw_os_error().unwrap_or(libc::EIO));
                }
            }
        });
    }
}

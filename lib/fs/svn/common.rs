//! Per-operation error types and their errno mappings.

use thiserror::Error;

use super::content::FetchError;
use super::reconcile::ResolveError;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("inode not found")]
    InodeNotFound,

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

#[derive(Debug, Error)]
pub enum GetAttrError {
    #[error("inode not found")]
    InodeNotFound,

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

#[derive(Debug, Error)]
pub enum OpenError {
    #[error("inode not found")]
    InodeNotFound,

    #[error("open target is a directory")]
    IsDirectory,

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("file not open")]
    FileNotOpen,

    #[error("inode not found")]
    InodeNotFound,

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

#[derive(Debug, Error)]
pub enum ReadDirError {
    #[error("inode not found")]
    InodeNotFound,

    #[error("inode is not a directory")]
    NotADirectory,

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("file not open")]
    FileNotOpen,
}

fn resolve_errno(e: &ResolveError) -> i32 {
    match e {
        ResolveError::NotFound => libc::ENOENT,
        ResolveError::Io(_) => libc::EIO,
    }
}

impl From<LookupError> for i32 {
    fn from(e: LookupError) -> Self {
        match e {
            LookupError::InodeNotFound => libc::ENOENT,
            LookupError::Resolve(r) => resolve_errno(&r),
        }
    }
}

impl From<GetAttrError> for i32 {
    fn from(e: GetAttrError) -> Self {
        match e {
            GetAttrError::InodeNotFound => libc::ENOENT,
            GetAttrError::Resolve(r) => resolve_errno(&r),
        }
    }
}

impl From<OpenError> for i32 {
    fn from(e: OpenError) -> Self {
        match e {
            OpenError::InodeNotFound => libc::ENOENT,
            OpenError::IsDirectory => libc::EISDIR,
            OpenError::Resolve(r) => resolve_errno(&r),
        }
    }
}

impl From<ReadError> for i32 {
    fn from(e: ReadError) -> Self {
        match e {
            ReadError::FileNotOpen => libc::EBADF,
            ReadError::InodeNotFound => libc::ENOENT,
            // Missing content is distinct from a plain upstream not-found in
            // the taxonomy, but both surface as ENOENT to the kernel.
            ReadError::Fetch(FetchError::NotFound | FetchError::MissingContent) => libc::ENOENT,
            ReadError::Fetch(FetchError::IsDirectory) => libc::EISDIR,
            ReadError::Fetch(FetchError::Io(_)) => libc::EIO,
        }
    }
}

impl From<ReadDirError> for i32 {
    fn from(e: ReadDirError) -> Self {
        match e {
            ReadDirError::InodeNotFound => libc::ENOENT,
            ReadDirError::NotADirectory => libc::ENOTDIR,
            ReadDirError::Resolve(r) => resolve_errno(&r),
        }
    }
}

impl From<ReleaseError> for i32 {
    fn from(e: ReleaseError) -> Self {
        match e {
            ReleaseError::FileNotOpen => libc::EBADF,
        }
    }
}

#[cfg(test)]
mod tests {
    use svn_remote::RemoteError;

    use super::*;

    #[test]
    fn upstream_not_found_maps_to_enoent() {
        let errno: i32 = LookupError::Resolve(ResolveError::NotFound).into();
        assert_eq!(errno, libc::ENOENT);
    }

    #[test]
    fn remote_failure_maps_to_eio() {
        let errno: i32 = GetAttrError::Resolve(ResolveError::Io(RemoteError::Client {
            code: Some(1),
            stderr: String::new(),
        }))
        .into();
        assert_eq!(errno, libc::EIO);
    }

    #[test]
    fn missing_content_maps_to_enoent_not_eexist() {
        // Absent content is a distinct error kind but surfaces as ENOENT,
        // never EEXIST.
        let errno: i32 = ReadError::Fetch(FetchError::MissingContent).into();
        assert_eq!(errno, libc::ENOENT);
    }

    #[test]
    fn directory_read_maps_to_eisdir() {
        let errno: i32 = ReadError::Fetch(FetchError::IsDirectory).into();
        assert_eq!(errno, libc::EISDIR);
    }
}

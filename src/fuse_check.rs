//! FUSE availability preflight.

#[cfg(any(target_os = "linux", target_os = "macos"))]
use std::path::Path;

/// Errors that can occur when verifying FUSE availability.
#[derive(Debug, thiserror::Error)]
pub enum FuseCheckError {
    #[cfg(target_os = "linux")]
    #[error(
        "/dev/fuse is missing. svn-fs requires the fuse kernel module; \
         try 'modprobe fuse' or install the fuse package."
    )]
    DeviceMissing,

    #[cfg(target_os = "macos")]
    #[error(
        "macFUSE is not installed. svn-fs requires macFUSE to mount filesystems.\n\
         Install it from: https://macfuse.github.io/"
    )]
    NotInstalled,
}

/// Verify that FUSE is installed and usable on the current platform.
#[cfg(target_os = "linux")]
pub fn ensure_fuse() -> Result<(), FuseCheckError> {
    if Path::new("/dev/fuse").exists() {
        Ok(())
    } else {
        Err(FuseCheckError::DeviceMissing)
    }
}

/// Verify that FUSE is installed and usable on the current platform.
#[cfg(target_os = "macos")]
pub fn ensure_fuse() -> Result<(), FuseCheckError> {
    if Path::new("/Library/Filesystems/macfuse.fs").is_dir()
        || Path::new("/Library/Filesystems/osxfuse.fs").is_dir()
    {
        Ok(())
    } else {
        Err(FuseCheckError::NotInstalled)
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
pub fn ensure_fuse() -> Result<(), FuseCheckError> {
    Ok(())
}

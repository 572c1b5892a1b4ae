use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use nix::errno::Errno;
use svn_fs::fs::fuser::FuserAdapter;
use svn_fs::fs::svn::{NativeAccounts, SvnFs};
use svn_remote::CommandRepo;
use tokio::select;
use tracing::{debug, info, warn};

use crate::app_config;

/// Holds the live FUSE session and force-unmounts the mount point when
/// dropped. fuser itself only attempts a regular unmount on drop, which
/// fails whenever something still has the mount busy; we retry with a
/// forced/lazy unmount so the mount point is not left dangling.
struct MountGuard {
    mount_point: PathBuf,
    session: Option<fuser::BackgroundSession>,
}

impl MountGuard {
    const UNMOUNT_RETRIES: usize = 10;
    const UNMOUNT_RETRY_DELAY: Duration = Duration::from_millis(10);

    fn mount(
        config: &app_config::Config,
        fs: SvnFs,
        handle: tokio::runtime::Handle,
    ) -> Result<Self, std::io::Error> {
        let adapter = FuserAdapter::new(fs, handle);
        let opts = [
            fuser::MountOption::FSName("svn-fs".to_owned()),
            fuser::MountOption::RO,
            fuser::MountOption::NoDev,
            fuser::MountOption::AutoUnmount,
            fuser::MountOption::DefaultPermissions,
        ];
        let session = fuser::spawn_mount2(adapter, &config.mount_point, &opts)?;
        Ok(Self {
            mount_point: config.mount_point.clone(),
            session: Some(session),
        })
    }

    fn force_unmount(&self) -> Result<(), Errno> {
        #[cfg(target_os = "macos")]
        return nix::mount::unmount(&self.mount_point, nix::mount::MntFlags::MNT_FORCE);

        #[cfg(target_os = "linux")]
        return nix::mount::umount2(&self.mount_point, nix::mount::MntFlags::MNT_DETACH);
    }
}

impl Drop for MountGuard {
    fn drop(&mut self) {
        // End the fuser session first so its regular unmount gets a chance.
        drop(self.session.take());

        debug!(mount_point = ?self.mount_point, "verifying unmount");
        for attempt in 1..=Self::UNMOUNT_RETRIES {
            match self.force_unmount() {
                Ok(()) => {
                    debug!(attempt, "unmounted");
                    return;
                }
                Err(Errno::EBUSY) => {
                    debug!(attempt, "mount still busy, retrying");
                    std::thread::sleep(Self::UNMOUNT_RETRY_DELAY);
                }
                Err(Errno::EINVAL | Errno::ENOENT) => {
                    debug!(attempt, "already unmounted");
                    return;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "unable to unmount");
                    return;
                }
            }
        }
        warn!(mount_point = ?self.mount_point, "mount stayed busy, giving up");
    }
}

/// Creates the mount point if absent; rejects a non-empty existing one.
async fn prepare_mount_point(mount_point: &Path) -> Result<(), std::io::Error> {
    match tokio::fs::read_dir(mount_point).await {
        Ok(mut entries) => match entries.next_entry().await? {
            Some(_) => Err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("mount point '{}' is not empty", mount_point.display()),
            )),
            None => Ok(()),
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tokio::fs::create_dir_all(mount_point).await?;
            info!(path = %mount_point.display(), "created mount point");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

async fn wait_for_exit() -> Result<(), std::io::Error> {
    use tokio::signal;
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    let mut sighup = signal::unix::signal(signal::unix::SignalKind::hangup())?;
    select! {
        _ = signal::ctrl_c() => debug!("interrupted, shutting down"),
        _ = sigterm.recv() => debug!("terminated, shutting down"),
        _ = sighup.recv() => debug!("hangup, shutting down"),
    }
    Ok(())
}

/// Mounts the filesystem and serves it until a shutdown signal arrives.
pub async fn run(
    config: app_config::Config,
    repository: String,
    handle: tokio::runtime::Handle,
) -> Result<(), std::io::Error> {
    prepare_mount_point(&config.mount_point).await?;

    let remote = Arc::new(CommandRepo::new(
        repository,
        config.remote.svn_binary.clone(),
        config.remote.timeout(),
    ));
    let fs = SvnFs::new(remote, Arc::new(NativeAccounts), (config.uid, config.gid));

    info!("Mounting filesystem at {}.", config.mount_point.display());
    let guard = MountGuard::mount(&config, fs, handle)?;
    info!("svn-fs is running. Press Ctrl+C to stop.");

    let result = wait_for_exit().await;
    drop(guard);
    result
}

pub fn spawn(config: app_config::Config, repository: String) -> Result<(), std::io::Error> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let handle = runtime.handle().clone();
    runtime.block_on(run(config, repository, handle))
}

//! Account name → numeric id resolution.

use tracing::warn;

/// Resolves textual owner/group names to numeric ids.
///
/// Failures of any kind map to `None`; a bad name must never abort the
/// caller's listing.
pub trait AccountResolver: Send + Sync {
    fn user_id(&self, name: &str) -> Option<u32>;
    fn group_id(&self, name: &str) -> Option<u32>;
}

/// [`AccountResolver`] backed by the system account database via `nix`
/// (getpwnam/getgrnam).
#[derive(Debug, Default)]
pub struct NativeAccounts;

impl AccountResolver for NativeAccounts {
    fn user_id(&self, name: &str) -> Option<u32> {
        match nix::unistd::User::from_name(name) {
            Ok(user) => user.map(|u| u.uid.as_raw()),
            Err(e) => {
                warn!(name, error = %e, "user lookup failed");
                None
            }
        }
    }

    fn group_id(&self, name: &str) -> Option<u32> {
        match nix::unistd::Group::from_name(name) {
            Ok(group) => group.map(|g| g.gid.as_raw()),
            Err(e) => {
                warn!(name, error = %e, "group lookup failed");
                None
            }
        }
    }
}

//! Derives POSIX ownership metadata from repository properties.

use std::sync::Arc;

use svn_remote::RemoteRepo;
use tracing::{debug, warn};

use crate::fs::Permissions;

use super::accounts::AccountResolver;

/// Property carrying the permission bits as an octal string, e.g. `"0644"`.
pub const PROP_MODE: &str = "owner-mode";
/// Property carrying the textual owner name.
pub const PROP_USER: &str = "owner-user";
/// Property carrying the textual group name.
pub const PROP_GROUP: &str = "owner-group";

const DEFAULT_PERM: u16 = 0o775;

/// Resolved ownership metadata for one path. The type bit is composed by
/// the caller from the listing's entry kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileOwnership {
    pub perm: Permissions,
    pub uid: u32,
    pub gid: u32,
}

/// Reads the ownership properties of a path and translates names to ids.
///
/// Each call issues up to three property reads and up to two account
/// lookups; nothing is cached across calls. Every failure degrades to the
/// documented default (`0775`, uid 0, gid 0) so one bad property never
/// fails an entire directory listing.
pub struct AttrResolver {
    remote: Arc<dyn RemoteRepo>,
    accounts: Arc<dyn AccountResolver>,
}

impl AttrResolver {
    pub fn new(remote: Arc<dyn RemoteRepo>, accounts: Arc<dyn AccountResolver>) -> Self {
        Self { remote, accounts }
    }

    pub async fn resolve(&self, path: &str) -> FileOwnership {
        FileOwnership {
            perm: Permissions::from_bits_truncate(self.resolve_perm(path).await),
            uid: self
                .resolve_account(path, PROP_USER, |name| self.accounts.user_id(name))
                .await,
            gid: self
                .resolve_account(path, PROP_GROUP, |name| self.accounts.group_id(name))
                .await,
        }
    }

    async fn resolve_perm(&self, path: &str) -> u16 {
        let raw = match self.remote.read_property(path, PROP_MODE).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return DEFAULT_PERM,
            Err(e) => {
                debug!(path, error = %e, "mode property read failed, using default");
                return DEFAULT_PERM;
            }
        };
        match u16::from_str_radix(raw.trim(), 8) {
            Ok(mode) => mode,
            Err(e) => {
                warn!(path, raw, error = %e, "mode property is not octal, using default");
                DEFAULT_PERM
            }
        }
    }

    async fn resolve_account(
        &self,
        path: &str,
        prop: &str,
        lookup: impl Fn(&str) -> Option<u32>,
    ) -> u32 {
        let name = match self.remote.read_property(path, prop).await {
            Ok(Some(name)) => name,
            Ok(None) => return 0,
            Err(e) => {
                debug!(path, prop, error = %e, "ownership property read failed, using 0");
                return 0;
            }
        };
        let name = name.trim();
        lookup(name).unwrap_or_else(|| {
            debug!(path, prop, name, "account name did not resolve, using 0");
            0
        })
    }
}

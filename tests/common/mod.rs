#![allow(dead_code, missing_docs, clippy::unwrap_used)]

pub mod remote_mocks;

use std::collections::HashMap;

use svn_fs::fs::svn::AccountResolver;

/// An [`AccountResolver`] over a fixed name → id table.
#[derive(Debug, Default)]
pub struct StaticAccounts {
    users: HashMap<String, u32>,
    groups: HashMap<String, u32>,
}

impl StaticAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, name: &str, uid: u32) -> Self {
        self.users.insert(name.to_owned(), uid);
        self
    }

    pub fn with_group(mut self, name: &str, gid: u32) -> Self {
        self.groups.insert(name.to_owned(), gid);
        self
    }
}

impl AccountResolver for StaticAccounts {
    fn user_id(&self, name: &str) -> Option<u32> {
        self.users.get(name).copied()
    }

    fn group_id(&self, name: &str) -> Option<u32> {
        self.groups.get(name).copied()
    }
}

#![allow(dead_code, missing_docs, clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use bytes::Bytes;
use svn_remote::models::{Dirent, NodeKind};
use svn_remote::{RemoteError, RemoteRepo};

/// A fixed timestamp so attribute assertions are deterministic.
pub fn stamp(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

/// The self-entry a listing reports for the queried path itself.
pub fn self_entry(kind: NodeKind, size: u64) -> Dirent {
    Dirent {
        rel_name: String::new(),
        kind,
        size,
        mtime: stamp(1_000),
    }
}

pub fn file_entry(rel_name: &str, size: u64) -> Dirent {
    Dirent {
        rel_name: rel_name.to_owned(),
        kind: NodeKind::File,
        size,
        mtime: stamp(1_000),
    }
}

pub fn dir_entry(rel_name: &str) -> Dirent {
    Dirent {
        rel_name: rel_name.to_owned(),
        kind: NodeKind::Dir,
        size: 0,
        mtime: stamp(1_000),
    }
}

/// A [`RemoteRepo`] over fixed in-memory tables, recording every listing
/// request it receives.
#[derive(Debug, Default)]
pub struct ScriptedRepo {
    listings: HashMap<String, Vec<Dirent>>,
    contents: HashMap<String, Bytes>,
    properties: HashMap<(String, String), String>,
    /// When set, every property read fails.
    fail_properties: bool,

    listed_paths: Mutex<Vec<String>>,
    fetched_paths: Mutex<Vec<String>>,
}

impl ScriptedRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listing(mut self, path: &str, entries: Vec<Dirent>) -> Self {
        self.listings.insert(path.to_owned(), entries);
        self
    }

    pub fn with_content(mut self, path: &str, content: &[u8]) -> Self {
        self.contents
            .insert(path.to_owned(), Bytes::copy_from_slice(content));
        self
    }

    pub fn with_property(mut self, path: &str, name: &str, value: &str) -> Self {
        self.properties
            .insert((path.to_owned(), name.to_owned()), value.to_owned());
        self
    }

    pub fn with_failing_properties(mut self) -> Self {
        self.fail_properties = true;
        self
    }

    /// Paths passed to `list_children`, in call order.
    pub fn listed_paths(&self) -> Vec<String> {
        self.listed_paths.lock().unwrap().clone()
    }

    pub fn list_call_count(&self) -> usize {
        self.listed_paths.lock().unwrap().len()
    }

    pub fn fetch_call_count(&self) -> usize {
        self.fetched_paths.lock().unwrap().len()
    }
}

#[async_trait]
impl RemoteRepo for ScriptedRepo {
    async fn list_children(&self, path: &str) -> Result<Vec<Dirent>, RemoteError> {
        self.listed_paths.lock().unwrap().push(path.to_owned());
        self.listings
            .get(path)
            .cloned()
            .ok_or(RemoteError::NotFound)
    }

    async fn fetch_content(&self, path: &str) -> Result<Bytes, RemoteError> {
        self.fetched_paths.lock().unwrap().push(path.to_owned());
        if let Some(entries) = self.listings.get(path) {
            if entries
                .iter()
                .any(|e| e.rel_name.is_empty() && e.kind == NodeKind::Dir)
            {
                return Err(RemoteError::IsDirectory);
            }
        }
        self.contents
            .get(path)
            .cloned()
            .ok_or(RemoteError::MissingContent)
    }

    async fn read_property(
        &self,
        path: &str,
        name: &str,
    ) -> Result<Option<String>, RemoteError> {
        if self.fail_properties {
            return Err(RemoteError::Client {
                code: Some(175_002),
                stderr: "scripted property failure".to_owned(),
            });
        }
        Ok(self
            .properties
            .get(&(path.to_owned(), name.to_owned()))
            .cloned())
    }
}

//! Backend that shells out to the `svn` command-line client.

use std::path::PathBuf;
use std::process::Output;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::client::RemoteRepo;
use crate::error::RemoteError;
use crate::models::{Dirent, NodeKind};

use super::list_xml::parse_list_xml;

/// A [`RemoteRepo`] that spawns `svn` for every call.
///
/// All invocations run at the HEAD revision (svn's default for URL targets)
/// and are bounded by a single per-call timeout.
pub struct CommandRepo {
    repo_url: String,
    svn_binary: PathBuf,
    timeout: Duration,
}

impl CommandRepo {
    pub fn new(
        repo_url: impl Into<String>,
        svn_binary: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        let mut repo_url = repo_url.into();
        while repo_url.ends_with('/') {
            repo_url.pop();
        }
        Self {
            repo_url,
            svn_binary: svn_binary.into(),
            timeout,
        }
    }

    /// Join the repository URL and a filesystem path with exactly one `/`.
    fn url_for(&self, path: &str) -> String {
        let rel = path.trim_matches('/');
        if rel.is_empty() {
            self.repo_url.clone()
        } else {
            format!("{}/{rel}", self.repo_url)
        }
    }

    async fn run(&self, args: &[&str]) -> Result<Output, RemoteError> {
        trace!(?args, "invoking svn");
        let fut = Command::new(&self.svn_binary)
            .arg("--non-interactive")
            .args(args)
            .output();
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| RemoteError::TimedOut(self.timeout))?
            .map_err(RemoteError::Io)
    }

    async fn run_ok(&self, args: &[&str]) -> Result<Vec<u8>, RemoteError> {
        let output = self.run(args).await?;
        if output.status.success() {
            return Ok(output.stdout);
        }
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        debug!(code = ?output.status.code(), %stderr, "svn reported an error");
        Err(classify_stderr(output.status.code(), stderr))
    }
}

/// Map svn's stderr to a [`RemoteError`] by the error codes it prints.
///
/// E160013/W160013: no such path in HEAD. E200009: target exists but is not
/// versioned. E195007: `cat` on a directory.
fn classify_stderr(code: Option<i32>, stderr: String) -> RemoteError {
    if stderr.contains("E160013") || stderr.contains("W160013") {
        RemoteError::NotFound
    } else if stderr.contains("E200009") {
        RemoteError::MissingContent
    } else if stderr.contains("E195007") {
        RemoteError::IsDirectory
    } else {
        RemoteError::Client { code, stderr }
    }
}

#[async_trait]
impl RemoteRepo for CommandRepo {
    async fn list_children(&self, path: &str) -> Result<Vec<Dirent>, RemoteError> {
        let url = self.url_for(path);

        // The queried path's own record. `--depth empty` returns exactly one
        // entry: "." for a directory, the basename for a file. Either way it
        // becomes the empty-rel self-entry.
        let stdout = self
            .run_ok(&["list", "--xml", "--depth", "empty", &url])
            .await?;
        let text = String::from_utf8_lossy(&stdout);
        let own = parse_list_xml(&text)?
            .pop()
            .ok_or_else(|| RemoteError::MalformedListing("empty self listing".to_owned()))?;

        let mut dirents = vec![Dirent {
            rel_name: String::new(),
            kind: own.kind,
            size: own.size,
            mtime: own.mtime,
        }];

        if own.kind == NodeKind::Dir {
            let stdout = self.run_ok(&["list", "--xml", &url]).await?;
            let text = String::from_utf8_lossy(&stdout);
            for entry in parse_list_xml(&text)? {
                if entry.name == "." || entry.name.is_empty() {
                    continue;
                }
                dirents.push(Dirent {
                    rel_name: entry.name,
                    kind: entry.kind,
                    size: entry.size,
                    mtime: entry.mtime,
                });
            }
        }

        trace!(path, count = dirents.len(), "listed children");
        Ok(dirents)
    }

    async fn fetch_content(&self, path: &str) -> Result<Bytes, RemoteError> {
        let url = self.url_for(path);
        let stdout = self.run_ok(&["cat", &url]).await?;
        trace!(path, bytes = stdout.len(), "fetched content");
        Ok(Bytes::from(stdout))
    }

    async fn read_property(
        &self,
        path: &str,
        name: &str,
    ) -> Result<Option<String>, RemoteError> {
        let url = self.url_for(path);
        let output = self.run(&["propget", "--strict", name, &url]).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            // E200017: property not set on this target.
            if stderr.contains("E200017") {
                return Ok(None);
            }
            return Err(classify_stderr(output.status.code(), stderr));
        }
        let value = String::from_utf8_lossy(&output.stdout).into_owned();
        if value.is_empty() {
            Ok(None)
        } else {
            Ok(Some(value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> CommandRepo {
        CommandRepo::new(
            "svn://example.org/repo///",
            "svn",
            Duration::from_secs(5),
        )
    }

    #[test]
    fn trailing_slashes_are_stripped_from_repo_url() {
        assert_eq!(repo().repo_url, "svn://example.org/repo");
    }

    #[test]
    fn url_for_root_is_bare_repo_url() {
        assert_eq!(repo().url_for("/"), "svn://example.org/repo");
    }

    #[test]
    fn url_for_joins_with_single_separator() {
        assert_eq!(
            repo().url_for("/docs/readme.txt"),
            "svn://example.org/repo/docs/readme.txt"
        );
        assert_eq!(
            repo().url_for("/docs/"),
            "svn://example.org/repo/docs"
        );
    }

    #[test]
    fn classify_not_found() {
        let err = classify_stderr(
            Some(1),
            "svn: warning: W160013: Path 'x' not found".to_owned(),
        );
        assert!(matches!(err, RemoteError::NotFound));

        let err = classify_stderr(
            Some(1),
            "svn: E160013: File not found: revision 31, path '/x'".to_owned(),
        );
        assert!(matches!(err, RemoteError::NotFound));
    }

    #[test]
    fn classify_missing_content() {
        let err = classify_stderr(
            Some(1),
            "svn: E200009: Could not cat all targets because some targets are not versioned"
                .to_owned(),
        );
        assert!(matches!(err, RemoteError::MissingContent));
    }

    #[test]
    fn classify_is_directory() {
        let err = classify_stderr(
            Some(1),
            "svn: E195007: URL 'svn://x/docs' refers to a directory".to_owned(),
        );
        assert!(matches!(err, RemoteError::IsDirectory));
    }

    #[test]
    fn classify_unknown_is_generic() {
        let err = classify_stderr(Some(1), "svn: E175002: Connection refused".to_owned());
        assert!(matches!(err, RemoteError::Client { code: Some(1), .. }));
    }
}

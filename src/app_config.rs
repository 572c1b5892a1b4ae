//! Module for application configuration settings.
//!
//! User configurations may be specified in a configuration file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

fn svnfs_runtime_dir() -> Option<PathBuf> {
    if let Some(path) = dirs::runtime_dir() {
        return Some(path.join("svn-fs"));
    }

    if let Some(path) = dirs::home_dir() {
        return Some(path.join(".local").join("share").join("svn-fs"));
    }

    None
}

fn default_pid_file() -> PathBuf {
    svnfs_runtime_dir().map_or_else(
        || PathBuf::from("/var/run/svn-fs.pid"),
        |rd| rd.join("svn-fs.pid"),
    )
}

fn default_mount_point() -> PathBuf {
    svnfs_runtime_dir().map_or_else(|| PathBuf::from("/tmp/svn-fs/mnt"), |rd| rd.join("mnt"))
}

fn current_uid() -> u32 {
    nix::unistd::Uid::current().as_raw()
}

fn current_gid() -> u32 {
    nix::unistd::Gid::current().as_raw()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_svn_binary() -> PathBuf {
    PathBuf::from("svn")
}

/// Settings for the remote svn client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RemoteConfig {
    /// Bound on every single svn invocation, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// The svn client binary to spawn.
    #[serde(default = "default_svn_binary")]
    pub svn_binary: PathBuf,
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            svn_binary: default_svn_binary(),
        }
    }
}

/// Daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DaemonConfig {
    /// The path to the PID file for the daemon.
    #[serde(default = "default_pid_file")]
    pub pid_file: PathBuf,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            pid_file: default_pid_file(),
        }
    }
}

/// Application configuration structure.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// URL of the Subversion repository to mount. May also be given as a
    /// command-line argument, which takes precedence.
    #[serde(default)]
    pub repository: Option<String>,

    /// The mount point for the filesystem.
    #[serde(default = "default_mount_point")]
    pub mount_point: PathBuf,

    /// The user to mount the filesystem as. Defaults to the current user.
    #[serde(default = "current_uid")]
    pub uid: u32,

    /// The group to mount the filesystem as. Defaults to the current group.
    #[serde(default = "current_gid")]
    pub gid: u32,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub daemon: DaemonConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repository: None,
            mount_point: default_mount_point(),
            uid: current_uid(),
            gid: current_gid(),
            remote: RemoteConfig::default(),
            daemon: DaemonConfig::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Deserialization error: {0}")]
    DeserializationError(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Config {
    /// Validate the correctness of the configuration.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.daemon.pid_file.parent().is_none() {
            errors.push(format!(
                "PID file path '{}' has no parent directory.",
                self.daemon.pid_file.display()
            ));
        }

        if self.remote.timeout_secs == 0 {
            errors.push("Remote timeout must be at least one second.".to_owned());
        }

        if let Some(repo) = &self.repository {
            if repo.trim_end_matches('/').is_empty() {
                errors.push("Repository URL must not be empty.".to_owned());
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Returns config file paths in descending priority order.
    /// On macOS, skips `dirs::config_dir()` (resolves to
    /// ~/Library/Application Support/).
    fn config_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        #[cfg(not(target_os = "macos"))]
        if let Some(xdg) = dirs::config_dir() {
            paths.push(xdg.join("svn-fs").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".config").join("svn-fs").join("config.toml"));
        }

        paths.push(PathBuf::from("/etc/svn-fs/config.toml"));

        paths
    }

    /// Finds the first existing config file from search paths.
    fn find_config_file() -> Option<PathBuf> {
        Self::config_search_paths().into_iter().find(|p| p.exists())
    }

    /// Loads config from a single TOML file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = ?path, "Loading configuration file.");
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Loads configuration from the first found config file, or the external
    /// path if given. Falls back to defaults when no file exists; errors when
    /// a file exists but is malformed.
    pub fn load(external_config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let loaded = if let Some(path) = external_config_path {
            Some(Self::load_from_file(path)?)
        } else {
            match Self::find_config_file() {
                Some(path) => Some(Self::load_from_file(&path)?),
                None => None,
            }
        };

        debug!("Loaded configuration successfully.");
        Ok(loaded.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut config = Config::default();
        config.remote.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_repository_url_is_rejected() {
        let mut config = Config::default();
        config.repository = Some("///".to_owned());
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_minimal_toml() {
        let config: Config = toml::from_str(
            r#"
            repository = "svn://example.org/repo"
            mount-point = "/mnt/svn"

            [remote]
            timeout-secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.repository.as_deref(), Some("svn://example.org/repo"));
        assert_eq!(config.mount_point, PathBuf::from("/mnt/svn"));
        assert_eq!(config.remote.timeout(), Duration::from_secs(5));
    }
}

//! Configuration management

use crate::core::error::{Error, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that selects the sandbox root
pub const ROOT_ENV: &str = "FILEDECK_ROOT";

/// Environment variable that overrides the filedeck home directory
pub const HOME_ENV: &str = "FILEDECK_HOME";

/// Global configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub sandbox: SandboxConfig,
    pub watch: WatchConfig,
    pub events: EventsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// Port to serve on
    pub port: u16,
    /// Allow cross-origin requests from any origin
    pub cors: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Explicit sandbox root
    pub root: Option<PathBuf>,
    /// Directory created under the working directory when no root is given
    pub dir_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Broadcast filesystem changes to realtime clients
    pub enabled: bool,
    /// Poll interval for backends without native events (seconds)
    pub poll_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Broadcast channel capacity; slower clients drop older events
    pub capacity: usize,
    /// SSE keep-alive interval (seconds)
    pub keep_alive_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9000,
            cors: true,
        }
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            root: None,
            dir_name: "user".to_string(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: 2,
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            keep_alive_secs: 15,
        }
    }
}

impl Config {
    /// Load configuration from default location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::home()?.join("config.toml"))
    }

    /// Get the filedeck home directory
    pub fn home() -> Result<PathBuf> {
        if let Ok(home) = std::env::var(HOME_ENV) {
            return Ok(PathBuf::from(home));
        }

        ProjectDirs::from("dev", "filedeck", "filedeck")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| Error::ConfigError {
                message: "Could not determine filedeck home directory".to_string(),
            })
    }

    /// Pick the sandbox root.
    ///
    /// First hit wins: the CLI flag, `FILEDECK_ROOT`, `sandbox.root` from the
    /// config file, then `<cwd>/<sandbox.dir_name>`.
    pub fn sandbox_root(&self, cli_root: Option<&Path>) -> Result<PathBuf> {
        let env_root = std::env::var(ROOT_ENV).ok();
        let cwd = std::env::current_dir()?;
        Ok(self.resolve_sandbox_root(cli_root, env_root.as_deref(), &cwd))
    }

    fn resolve_sandbox_root(
        &self,
        cli_root: Option<&Path>,
        env_root: Option<&str>,
        cwd: &Path,
    ) -> PathBuf {
        if let Some(root) = cli_root {
            return cwd.join(root);
        }
        if let Some(root) = env_root.filter(|r| !r.trim().is_empty()) {
            return cwd.join(root);
        }
        if let Some(root) = &self.sandbox.root {
            return cwd.join(root);
        }
        cwd.join(&self.sandbox.dir_name)
    }
}

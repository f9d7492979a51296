//! Client configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use lockerbox_common::{Error, Result};

/// Environment variable overriding the configured server URL.
pub const SERVER_ENV: &str = "LOCKERBOX_SERVER";

/// Settings for reaching the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Scheme, host and port of the service.
    pub server_url: String,
    /// Path of the API below the server URL.
    pub api_prefix: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080".to_string(),
            api_prefix: "/api".to_string(),
            timeout_secs: 30,
            user_agent: format!("lockerbox/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Default location of the configuration file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("lockerbox").join("config.json"))
    }

    /// Load configuration from `path`, or from the default location.
    ///
    /// A missing file yields the defaults; fields absent from the file keep
    /// their defaults.
    ///
    /// # Errors
    /// - The file exists but cannot be read
    /// - The file is not valid JSON for this structure
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(path) => path,
            None => return Ok(Self::default()),
        };
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Apply the environment and command-line overrides, the flag winning.
    pub fn with_overrides(mut self, env_server: Option<String>, flag_server: Option<String>) -> Self {
        if let Some(server) = flag_server.or(env_server) {
            self.server_url = server;
        }
        self
    }

    /// Apply overrides from the process environment and the `--server` flag.
    pub fn with_env(self, flag_server: Option<String>) -> Self {
        let env_server = std::env::var(SERVER_ENV).ok().filter(|s| !s.is_empty());
        self.with_overrides(env_server, flag_server)
    }

    /// Full URL of the API root.
    ///
    /// # Errors
    /// - The server URL does not parse or cannot carry a path
    pub fn api_base(&self) -> Result<Url> {
        let mut url = Url::parse(&self.server_url)
            .map_err(|e| Error::Config(format!("invalid server URL '{}': {}", self.server_url, e)))?;
        if url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "server URL '{}' cannot carry a path",
                self.server_url
            )));
        }

        let prefix = format!(
            "{}/{}",
            url.path().trim_end_matches('/'),
            self.api_prefix.trim_matches('/')
        );
        url.set_path(&prefix);
        Ok(url)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

//! TOML-based configuration for mergelens.
//!
//! Secrets are never written into the file. The GitHub token is referenced by
//! the name of an environment variable (`github.token_env`) and resolved at
//! runtime via [`AppConfig::resolve_env_vars`].

use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::conflict::DEFAULT_MAX_DIFF_COST;
use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
///
/// Every section is optional; an empty file yields the defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// GitHub API settings.
    #[serde(default)]
    pub github: GitHubConfig,

    /// Merge preview limits.
    #[serde(default)]
    pub merge: MergeConfig,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address (default `127.0.0.1:3000`).
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_listen() -> String {
    "127.0.0.1:3000".into()
}
fn default_log_level() -> String {
    "info".into()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            log_level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// GitHub
// ---------------------------------------------------------------------------

/// GitHub API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// GitHub API base URL (default `https://api.github.com`).
    #[serde(default = "default_github_api_url")]
    pub api_url: String,

    /// Environment variable holding the GitHub token.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Resolved token (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub token: Option<String>,
}

fn default_github_api_url() -> String {
    "https://api.github.com".into()
}
fn default_token_env() -> String {
    "GITHUB_TOKEN".into()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_github_api_url(),
            token_env: default_token_env(),
            token: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Limits applied by the merge preview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Maximum number of changed files merged per preview (default 30).
    /// Longer file lists are truncated and flagged.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Maximum number of files merged concurrently (default 8).
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Edit cost past which the differ stops searching for a minimal script
    /// and emits a single replacement for the span.
    #[serde(default = "default_max_diff_cost")]
    pub max_diff_cost: usize,

    /// Files with more lines than this on any side are reported as too large
    /// instead of being merged (default 20000).
    #[serde(default = "default_max_file_lines")]
    pub max_file_lines: usize,

    /// Timeout for fetching a single revision of a file (default 30).
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

fn default_max_files() -> usize {
    30
}
fn default_max_concurrency() -> usize {
    8
}
fn default_max_diff_cost() -> usize {
    DEFAULT_MAX_DIFF_COST
}
fn default_max_file_lines() -> usize {
    20_000
}
fn default_fetch_timeout() -> u64 {
    30
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            max_concurrency: default_max_concurrency(),
            max_diff_cost: default_max_diff_cost(),
            max_file_lines: default_max_file_lines(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load an [`AppConfig`] from a TOML file at the given path.
    ///
    /// This does **not** resolve environment variables -- call
    /// [`resolve_env_vars`](Self::resolve_env_vars) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Resolve `*_env` fields from the environment.
    ///
    /// A missing variable only logs a warning: the CLI works against local
    /// repositories without a token, and the HTTP API answers 401 instead.
    pub fn resolve_env_vars(&mut self) {
        self.github.token = resolve_optional_env(&self.github.token_env, "github.token_env");
    }

    /// Validate that all values are sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.listen.parse::<SocketAddr>().is_err() {
            return Err(invalid(
                "server.listen",
                format!("'{}' is not a socket address", self.server.listen),
            ));
        }
        if self.github.api_url.is_empty() {
            return Err(invalid("github.api_url", "GitHub API URL must not be empty"));
        }
        if !self.github.api_url.starts_with("http://") && !self.github.api_url.starts_with("https://")
        {
            return Err(invalid("github.api_url", "must start with http:// or https://"));
        }
        let limits = [
            ("merge.max_files", self.merge.max_files as u64),
            ("merge.max_concurrency", self.merge.max_concurrency as u64),
            ("merge.max_diff_cost", self.merge.max_diff_cost as u64),
            ("merge.max_file_lines", self.merge.max_file_lines as u64),
            ("merge.fetch_timeout_secs", self.merge.fetch_timeout_secs),
        ];
        for (field, value) in limits {
            if value == 0 {
                return Err(invalid(field, "must be > 0"));
            }
        }

        Ok(())
    }

    /// Convenience: load, resolve, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars();
        config.validate()?;
        Ok(config)
    }

    /// A commented default configuration, as written by `mergelens init`.
    pub fn template() -> String {
        let merge = MergeConfig::default();
        format!(
            r#"# mergelens configuration

[server]
listen = "{listen}"
log_level = "{log_level}"

[github]
api_url = "{api_url}"
# Name of the environment variable holding the API token.
token_env = "{token_env}"

[merge]
max_files = {max_files}
max_concurrency = {max_concurrency}
max_diff_cost = {max_diff_cost}
max_file_lines = {max_file_lines}
fetch_timeout_secs = {fetch_timeout_secs}
"#,
            listen = default_listen(),
            log_level = default_log_level(),
            api_url = default_github_api_url(),
            token_env = default_token_env(),
            max_files = merge.max_files,
            max_concurrency = merge.max_concurrency,
            max_diff_cost = merge.max_diff_cost,
            max_file_lines = merge.max_file_lines,
            fetch_timeout_secs = merge.fetch_timeout_secs,
        )
    }
}

fn invalid(field: &str, detail: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.into(),
        detail: detail.into(),
    }
}

/// Try to read an environment variable by name. Returns `Some(value)` on
/// success; logs a warning and returns `None` if the variable is unset.
fn resolve_optional_env(env_name: &str, field: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val)
        }
        Ok(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        Err(_) => {
            warn!(field, env_name, "env var not set");
            None
        }
    }
}

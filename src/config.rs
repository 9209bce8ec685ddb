//! Configuration file parser for ~/.config/connections-blogs/config.toml.
//!
//! The config file is optional — a missing file yields
//! `BlogsConfig::default()`. Unknown keys are ignored by serde (with
//! `deny_unknown_fields` off), though we log a warning when the file
//! contains potential typos. Environment variables override file values.
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// How requests authenticate against the deployment. All three values
/// map to the same (empty) URL path segment; the distinction only
/// matters for credential handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    #[default]
    Basic,
    Saml,
    Cookie,
}

/// Top-level client configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be
/// specified. Missing keys fall back to `Default::default()`.
///
/// Custom Debug impl masks `password` to prevent secret leakage in logs,
/// error messages, and debug output.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct BlogsConfig {
    /// Base URL of the Blogs application,
    /// e.g. `https://apps.na.collabserv.com/blogs/`.
    pub base_url: String,

    /// Authentication mechanism; defaults to basic.
    pub auth_type: AuthType,

    /// Username for basic auth (BLOGS requests are anonymous without
    /// both username and password).
    pub username: Option<String>,

    /// Password for basic auth (alternative to CONNECTIONS_PASSWORD
    /// env var; the env var takes precedence).
    pub password: Option<String>,

    /// Default page size for feed requests. The server caps this at 50.
    pub page_size: u32,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for BlogsConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            auth_type: AuthType::Basic,
            username: None,
            password: None,
            page_size: 10,
            timeout_secs: 30,
        }
    }
}

/// Mask password in Debug output to prevent secret leakage.
impl std::fmt::Debug for BlogsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlogsConfig")
            .field("base_url", &self.base_url)
            .field("auth_type", &self.auth_type)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("page_size", &self.page_size)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl BlogsConfig {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(BlogsConfig::default())`
    /// - Empty file → `Ok(BlogsConfig::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted (serde default behavior), logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Check file size before reading to bound memory.
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse the TOML content first as a raw table to detect unknown keys
        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = [
                "base_url",
                "auth_type",
                "username",
                "password",
                "page_size",
                "timeout_secs",
            ];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: BlogsConfig = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), base_url = %config.base_url, "Loaded configuration");
        Ok(config)
    }

    /// Applies `CONNECTIONS_BASE_URL`, `CONNECTIONS_USERNAME` and
    /// `CONNECTIONS_PASSWORD` over file values when set and non-empty.
    pub fn apply_env(&mut self) {
        if let Some(base_url) = env_non_empty("CONNECTIONS_BASE_URL") {
            self.base_url = base_url;
        }
        if let Some(username) = env_non_empty("CONNECTIONS_USERNAME") {
            self.username = Some(username);
        }
        if let Some(password) = env_non_empty("CONNECTIONS_PASSWORD") {
            self.password = Some(password);
        }
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

// ============================================================================
// Tests
// ============================================================================

//! Configuration file parser for ~/.config/fulltext/config.toml.
//!
//! The config file is optional: a missing or empty file yields `Config::default()`.
//! Unknown keys are ignored, with a warning so typos do not go unnoticed.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable overriding `database_path`.
pub const DATABASE_ENV: &str = "FULLTEXT_DATABASE";

/// User agent sent by the local scraper when the feed does not set one.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; fulltext/0.1)";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Process-wide settings for the enrichment pipeline.
///
/// Passed explicitly into [`crate::enrich::Enricher::new`]; nothing here is read
/// from ambient global state after loading.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database file. `None` means `<config dir>/fulltext.db`.
    pub database_path: Option<PathBuf>,

    /// User agent for the local scraper when a feed leaves it empty.
    pub default_user_agent: String,

    /// Per-request deadline for both the scraper and the remote API, in seconds.
    pub request_timeout_secs: u64,

    /// Upper bound on a fetched body (page or remote API response).
    pub max_content_bytes: usize,

    /// Allow the scraper to reach localhost and private address ranges.
    pub allow_private_hosts: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            default_user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: 20,
            max_content_bytes: 5 * 1024 * 1024,
            allow_private_hosts: false,
        }
    }
}

/// Deadline and size bounds applied to every outbound fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLimits {
    pub timeout: Duration,
    pub max_bytes: usize,
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 5] = [
        "database_path",
        "default_user_agent",
        "request_timeout_secs",
        "max_content_bytes",
        "allow_private_hosts",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
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
                // Deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        if config.request_timeout_secs == 0 {
            tracing::warn!("request_timeout_secs = 0 is not allowed, using 1 second");
        }
        tracing::info!(
            path = %path.display(),
            timeout_secs = config.request_timeout_secs,
            allow_private_hosts = config.allow_private_hosts,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Apply `FULLTEXT_DATABASE` on top of the file value.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(path) = std::env::var_os(DATABASE_ENV).filter(|p| !p.is_empty()) {
            self.database_path = Some(PathBuf::from(path));
        }
        self
    }

    /// Request deadline, never shorter than one second.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn fetch_limits(&self) -> FetchLimits {
        FetchLimits {
            timeout: self.request_timeout(),
            max_bytes: self.max_content_bytes,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(name: &str, content: &str) -> (PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(format!("fulltext_config_test_{name}"));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.database_path.is_none());
        assert_eq!(config.default_user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.request_timeout_secs, 20);
        assert_eq!(config.max_content_bytes, 5 * 1024 * 1024);
        assert!(!config.allow_private_hosts);
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/fulltext_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.request_timeout_secs, 20);
    }

    #[test]
    fn test_empty_file_returns_default() {
        let (dir, path) = write_config("empty", "   \n  ");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.default_user_agent, DEFAULT_USER_AGENT);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_full_config() {
        let (dir, path) = write_config(
            "full",
            r#"
database_path = "/var/lib/fulltext/entries.db"
default_user_agent = "TestAgent/1.0"
request_timeout_secs = 5
max_content_bytes = 1024
allow_private_hosts = true
"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.database_path.as_deref(),
            Some(Path::new("/var/lib/fulltext/entries.db"))
        );
        assert_eq!(config.default_user_agent, "TestAgent/1.0");
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(
            config.fetch_limits(),
            FetchLimits {
                timeout: Duration::from_secs(5),
                max_bytes: 1024
            }
        );
        assert!(config.allow_private_hosts);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let (dir, path) = write_config("partial", "allow_private_hosts = true\n");
        let config = Config::load(&path).unwrap();
        assert!(config.allow_private_hosts);
        assert_eq!(config.request_timeout_secs, 20);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let (dir, path) = write_config("invalid", "this is not [valid toml");
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let (dir, path) = write_config("unknown", "mercury = \"yes\"\nrequest_timeout_secs = 3\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.request_timeout_secs, 3);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_zero_timeout_clamped() {
        let config = Config {
            request_timeout_secs: 0,
            ..Config::default()
        };
        assert_eq!(config.request_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_too_large_file_rejected() {
        let (dir, path) = write_config("too_large", &"a".repeat(1_048_577));
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        std::fs::remove_dir_all(&dir).ok();
    }
}

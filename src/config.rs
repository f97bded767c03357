//! Configuration management for FARS Fetcher
//!
//! Settings are layered: built-in defaults, then a TOML config file, then
//! `FARS_*` environment variables, then command-line flags (applied by the
//! CLI). Every section is optional in the file; missing keys keep their
//! defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::{CacheConfig, ClientConfig};
use crate::constants::{cache, config as config_files, env, http, workers};
use crate::errors::{ConfigError, ConfigResult};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Cache location and fetch behaviour
    pub cache: CacheConfigToml,
    /// HTTP client settings
    pub client: ClientConfigToml,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// TOML-friendly cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfigToml {
    /// Cache directory (relative to `project_dir` when both are set)
    pub cache_root: Option<PathBuf>,
    /// Project directory; the cache defaults to `<project>/data/fars`
    pub project_dir: Option<PathBuf>,
    /// Registry manifest path; defaults to `<cache root>/registry.txt`
    pub registry: Option<PathBuf>,
    /// Verify files against registry hashes
    pub check_hash: bool,
    /// Show progress bars
    pub show_progress: bool,
    /// Concurrent fetches in range and full runs
    pub max_concurrent: usize,
}

impl Default for CacheConfigToml {
    fn default() -> Self {
        Self {
            cache_root: None,
            project_dir: None,
            registry: None,
            check_hash: cache::CHECK_HASH,
            show_progress: cache::SHOW_PROGRESS,
            max_concurrent: workers::DEFAULT_WORKER_COUNT,
        }
    }
}

/// TOML-friendly client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfigToml {
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Per-read timeout in seconds
    pub read_timeout_secs: u64,
    /// Maximum redirects followed per request
    pub max_redirects: usize,
    /// TCP keep-alive in seconds (None = disabled)
    pub tcp_keepalive_secs: Option<u64>,
    /// TCP nodelay setting
    pub tcp_nodelay: bool,
    /// Connection pool idle timeout in seconds (None = no timeout)
    pub pool_idle_timeout_secs: Option<u64>,
    /// Maximum idle connections per host
    pub pool_max_per_host: usize,
    /// Honour proxy environment variables
    pub use_system_proxy: bool,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        Self {
            connect_timeout_secs: http::CONNECT_TIMEOUT.as_secs(),
            read_timeout_secs: http::READ_TIMEOUT.as_secs(),
            max_redirects: http::MAX_REDIRECTS,
            tcp_keepalive_secs: Some(30),
            tcp_nodelay: true,
            pool_idle_timeout_secs: Some(http::POOL_IDLE_TIMEOUT.as_secs()),
            pool_max_per_host: http::POOL_MAX_PER_HOST,
            use_system_proxy: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level when no verbosity flag is given
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl AppConfig {
    /// Convert TOML-friendly configuration to runtime configuration
    pub fn to_runtime_config(&self) -> (CacheConfig, ClientConfig) {
        (
            self.cache.to_runtime_config(),
            self.client.to_runtime_config(),
        )
    }

    /// Load configuration with multi-source precedence:
    /// 1. Default values
    /// 2. Config file (explicit path, or the first one found)
    /// 3. Environment variables
    ///
    /// # Errors
    ///
    /// - `ConfigError::NotFound` if an explicit path does not exist
    /// - `ConfigError::InvalidFormat` if the file is not valid TOML
    /// - `ConfigError::InvalidValue` if an environment override cannot be parsed
    pub async fn load(config_file_override: Option<PathBuf>) -> ConfigResult<Self> {
        let config_path = match config_file_override {
            Some(path) => match tokio::fs::try_exists(&path).await {
                Ok(true) => Some(path),
                Ok(false) => return Err(ConfigError::NotFound { path }),
                Err(source) => return Err(ConfigError::Io { path, source }),
            },
            None => Self::find_config_file().await,
        };

        let mut config = match config_path {
            Some(path) => Self::load_from_file(&path).await?,
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `FARS_*` overrides from a variable lookup
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(env::CACHE_DIR) {
            self.cache.cache_root = Some(PathBuf::from(dir));
        }
        if let Some(dir) = lookup(env::PROJECT_DIR) {
            self.cache.project_dir = Some(PathBuf::from(dir));
        }
        if let Some(path) = lookup(env::REGISTRY) {
            self.cache.registry = Some(PathBuf::from(path));
        }
        if let Some(value) = lookup(env::CHECK_HASH) {
            self.cache.check_hash = parse_flag(env::CHECK_HASH, &value)?;
        }
        if let Some(value) = lookup(env::SHOW_PROGRESS) {
            self.cache.show_progress = parse_flag(env::SHOW_PROGRESS, &value)?;
        }
        Ok(())
    }

    /// Reject values the runtime cannot use
    pub fn validate(&self) -> ConfigResult<()> {
        let workers = self.cache.max_concurrent;
        if workers == 0 || workers > workers::MAX_WORKER_COUNT {
            return Err(ConfigError::InvalidValue {
                field: "cache.max_concurrent".to_string(),
                value: workers.to_string(),
                reason: format!("Must be between 1 and {}", workers::MAX_WORKER_COUNT),
            });
        }
        if self.client.connect_timeout_secs == 0 || self.client.read_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "client timeouts".to_string(),
                value: "0".to_string(),
                reason: "Timeouts must be at least one second".to_string(),
            });
        }
        Ok(())
    }

    /// Write the default configuration file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::AlreadyExists` if the file exists and `force` is false
    pub async fn write_default(path: &Path, force: bool) -> ConfigResult<()> {
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if !force && tokio::fs::try_exists(path).await.map_err(io_error)? {
            return Err(ConfigError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }
        tokio::fs::write(path, Self::generate_default_config_content())
            .await
            .map_err(io_error)?;

        info!("Wrote default configuration to {}", path.display());
        Ok(())
    }

    /// Per-user configuration file location
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| {
            dir.join(config_files::APP_DIR_NAME)
                .join(config_files::FILE_NAME)
        })
    }

    /// Find configuration file in standard locations
    async fn find_config_file() -> Option<PathBuf> {
        let search_paths = std::iter::once(PathBuf::from(config_files::LOCAL_FILE_NAME))
            .chain(Self::default_config_path());

        // Unreadable candidates are skipped like absent ones
        for path in search_paths {
            if let Ok(true) = tokio::fs::try_exists(&path).await {
                debug!("Found config file: {}", path.display());
                return Some(path);
            }
        }
        None
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let config: AppConfig =
            toml::from_str(&content).map_err(|source| ConfigError::InvalidFormat {
                path: path.to_path_buf(),
                source,
            })?;

        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Generate default configuration content with helpful comments
    fn generate_default_config_content() -> String {
        let defaults = ClientConfigToml::default();
        format!(
            r#"# FARS Fetcher Configuration
# Every setting is optional. Environment variables ({cache_env}, {project_env},
# {registry_env}, {check_env}, {progress_env}) and command-line flags override
# this file.

[cache]
# Cache directory (leave unset for the system cache directory)
# cache_root = "/path/to/fars/cache"

# Project directory; without cache_root the cache lives in <project>/data/fars
# project_dir = "/path/to/project"

# Registry manifest (defaults to <cache root>/{registry_file})
# registry = "/path/to/registry.txt"

# Verify cached and downloaded files against registry hashes
check_hash = {check_hash}

# Show progress bars
show_progress = {show_progress}

# Concurrent fetches for range and full runs (1-{max_workers})
max_concurrent = {workers}

[client]
connect_timeout_secs = {connect}
read_timeout_secs = {read}
max_redirects = {redirects}
tcp_keepalive_secs = 30
tcp_nodelay = true
pool_idle_timeout_secs = {idle}
pool_max_per_host = {per_host}
use_system_proxy = true

[logging]
# Level used without -v/-q: error, warn, info, debug, trace
level = "warn"
"#,
            cache_env = env::CACHE_DIR,
            project_env = env::PROJECT_DIR,
            registry_env = env::REGISTRY,
            check_env = env::CHECK_HASH,
            progress_env = env::SHOW_PROGRESS,
            registry_file = crate::constants::REGISTRY_FILE_NAME,
            check_hash = cache::CHECK_HASH,
            show_progress = cache::SHOW_PROGRESS,
            max_workers = workers::MAX_WORKER_COUNT,
            workers = workers::DEFAULT_WORKER_COUNT,
            connect = defaults.connect_timeout_secs,
            read = defaults.read_timeout_secs,
            redirects = defaults.max_redirects,
            idle = http::POOL_IDLE_TIMEOUT.as_secs(),
            per_host = defaults.pool_max_per_host,
        )
    }
}

impl CacheConfigToml {
    /// Convert to runtime CacheConfig
    pub fn to_runtime_config(&self) -> CacheConfig {
        CacheConfig {
            cache_root: self.cache_root.clone(),
            project_dir: self.project_dir.clone(),
            registry_path: self.registry.clone(),
            check_hash: self.check_hash,
            show_progress: self.show_progress,
            max_concurrent: self.max_concurrent,
        }
    }
}

impl ClientConfigToml {
    /// Convert to runtime ClientConfig
    pub fn to_runtime_config(&self) -> ClientConfig {
        ClientConfig {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            read_timeout: Duration::from_secs(self.read_timeout_secs),
            max_redirects: self.max_redirects,
            tcp_keepalive: self.tcp_keepalive_secs.map(Duration::from_secs),
            tcp_nodelay: self.tcp_nodelay,
            pool_idle_timeout: self.pool_idle_timeout_secs.map(Duration::from_secs),
            pool_max_per_host: self.pool_max_per_host,
            use_system_proxy: self.use_system_proxy,
            ..ClientConfig::default()
        }
    }
}

fn parse_flag(field: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: "Expected true/false, yes/no, on/off or 1/0".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.cache.max_concurrent, workers::DEFAULT_WORKER_COUNT);
        assert!(config.cache.check_hash);
        assert_eq!(config.logging.level, "warn");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_generated_file_parses_to_defaults() {
        let content = AppConfig::generate_default_config_content();
        let parsed: AppConfig = toml::from_str(&content).unwrap();

        assert_eq!(parsed, AppConfig::default());
        assert!(content.contains("# FARS Fetcher Configuration"));
        assert!(content.contains("[cache]"));
        assert!(content.contains("[client]"));
    }

    #[tokio::test]
    async fn test_explicit_missing_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let result = AppConfig::load(Some(temp_dir.path().join("nonexistent.toml"))).await;
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("fars.toml");
        tokio::fs::write(
            &path,
            "[cache]\nproject_dir = \"/work/study\"\nmax_concurrent = 2\n\n[logging]\nlevel = \"debug\"\n",
        )
        .await
        .unwrap();

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(config.cache.project_dir, Some(PathBuf::from("/work/study")));
        assert_eq!(config.cache.max_concurrent, 2);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.client, ClientConfigToml::default());
    }

    #[tokio::test]
    async fn test_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.toml");
        tokio::fs::write(&path, "[cache\nbroken").await.unwrap();

        let result = AppConfig::load(Some(path)).await;
        assert!(matches!(result, Err(ConfigError::InvalidFormat { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            (env::CACHE_DIR, "/env/cache"),
            (env::REGISTRY, "/env/registry.txt"),
            (env::CHECK_HASH, "false"),
            (env::SHOW_PROGRESS, "0"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config
            .apply_env_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.cache.cache_root, Some(PathBuf::from("/env/cache")));
        assert_eq!(
            config.cache.registry,
            Some(PathBuf::from("/env/registry.txt"))
        );
        assert_eq!(config.cache.project_dir, None);
        assert!(!config.cache.check_hash);
        assert!(!config.cache.show_progress);
    }

    #[test]
    fn test_env_override_rejects_garbage_flag() {
        let mut config = AppConfig::default();
        let result = config.apply_env_overrides(|key| {
            (key == env::CHECK_HASH).then(|| "maybe".to_string())
        });
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_validate_worker_bounds() {
        let mut config = AppConfig::default();
        config.cache.max_concurrent = 0;
        assert!(config.validate().is_err());
        config.cache.max_concurrent = workers::MAX_WORKER_COUNT + 1;
        assert!(config.validate().is_err());
        config.cache.max_concurrent = workers::MAX_WORKER_COUNT;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_to_runtime_config() {
        let mut config = AppConfig::default();
        config.cache.project_dir = Some(PathBuf::from("/p"));
        config.cache.registry = Some(PathBuf::from("/p/registry.txt"));
        config.client.read_timeout_secs = 5;

        let (cache_config, client_config) = config.to_runtime_config();
        assert_eq!(cache_config.project_dir, Some(PathBuf::from("/p")));
        assert_eq!(
            cache_config.registry_path,
            Some(PathBuf::from("/p/registry.txt"))
        );
        assert_eq!(client_config.read_timeout, Duration::from_secs(5));
        assert_eq!(client_config.user_agent, http::USER_AGENT);
    }

    #[tokio::test]
    async fn test_write_default_respects_force() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        AppConfig::write_default(&path, false).await.unwrap();
        assert!(path.exists());

        let again = AppConfig::write_default(&path, false).await;
        assert!(matches!(again, Err(ConfigError::AlreadyExists { .. })));

        tokio::fs::write(&path, "garbage").await.unwrap();
        AppConfig::write_default(&path, true).await.unwrap();
        let loaded = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(loaded, AppConfig::default());
    }
}

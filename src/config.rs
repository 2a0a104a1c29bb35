use garden_core::RepositoryPolicies;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Remote document store configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RemoteConfig {
    /// Base URL of the document store (e.g., "https://garden.example.com")
    pub base_url: Option<String>,
    /// API key for authentication
    pub api_key: Option<String>,
    /// Signed-in user; every record is scoped to it
    pub user_id: Option<String>,
}

impl RemoteConfig {
    /// Returns true if the remote store is configured (has base_url and api_key)
    pub fn is_configured(&self) -> bool {
        self.base_url.is_some() && self.api_key.is_some()
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Path to the SQLite cache database
    pub database_path: ConfigValue<PathBuf>,
    /// Directory holding plant and journal photos
    pub media_dir: ConfigValue<PathBuf>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    /// Remote store configuration
    pub remote: RemoteConfig,
    /// Deadline and retry policies for remote calls
    pub policies: RepositoryPolicies,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    database_path: Option<PathBuf>,
    media_dir: Option<PathBuf>,
    remote: Option<RemoteConfig>,
    policies: Option<RepositoryPolicies>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let data_dir = Self::default_data_dir();

        // Start with defaults
        let mut database_path =
            ConfigValue::new(data_dir.join("gardenlog.db"), ConfigSource::Default);
        let mut media_dir = ConfigValue::new(data_dir.join("media"), ConfigSource::Default);
        let mut config_file = None;
        let mut remote = RemoteConfig::default();
        let mut policies = RepositoryPolicies::default();

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(db_path) = file_config.database_path {
                database_path =
                    ConfigValue::new(resolve_relative(&path, db_path), ConfigSource::File);
            }
            if let Some(dir) = file_config.media_dir {
                media_dir = ConfigValue::new(resolve_relative(&path, dir), ConfigSource::File);
            }
            if let Some(remote_config) = file_config.remote {
                remote = remote_config;
            }
            if let Some(file_policies) = file_config.policies {
                policies = file_policies;
            }
        }

        // Apply environment variable overrides
        if let Ok(db_path) = std::env::var("GARDENLOG_DATABASE_PATH") {
            database_path = ConfigValue::new(PathBuf::from(db_path), ConfigSource::Environment);
        }
        if let Ok(dir) = std::env::var("GARDENLOG_MEDIA_DIR") {
            media_dir = ConfigValue::new(PathBuf::from(dir), ConfigSource::Environment);
        }
        if let Ok(url) = std::env::var("GARDENLOG_REMOTE_URL") {
            remote.base_url = Some(url);
        }
        if let Ok(key) = std::env::var("GARDENLOG_API_KEY") {
            remote.api_key = Some(key);
        }
        if let Ok(user) = std::env::var("GARDENLOG_USER_ID") {
            remote.user_id = Some(user);
        }

        Ok(Self {
            database_path,
            media_dir,
            config_file,
            remote,
            policies,
        })
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/gardenlog/
    /// - macOS: ~/Library/Application Support/gardenlog/
    /// - Windows: %APPDATA%/gardenlog/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gardenlog")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/gardenlog/
    /// - macOS: ~/Library/Application Support/gardenlog/
    /// - Windows: %APPDATA%/gardenlog/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gardenlog")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

/// Resolves a relative path against the config file's directory.
fn resolve_relative(config_path: &std::path::Path, path: PathBuf) -> PathBuf {
    if path.is_relative() {
        config_path
            .parent()
            .map(|p| p.join(&path))
            .unwrap_or(path)
    } else {
        path
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nonexistent.yaml");

        let config = Config::load(Some(config_path)).unwrap();
        assert!(config
            .database_path
            .value
            .to_string_lossy()
            .contains("gardenlog.db"));
        assert_eq!(config.database_path.source, ConfigSource::Default);
        assert_eq!(config.media_dir.source, ConfigSource::Default);
        assert!(config.config_file.is_none());
        assert_eq!(config.policies, RepositoryPolicies::default());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "database_path: /custom/path/garden.sqlite").unwrap();
        writeln!(file, "media_dir: photos").unwrap();
        writeln!(file, "remote:").unwrap();
        writeln!(file, "  base_url: https://garden.example.com").unwrap();
        writeln!(file, "  api_key: secret").unwrap();
        writeln!(file, "  user_id: gardener-1").unwrap();

        let config = Config::load(Some(config_path.clone())).unwrap();
        assert_eq!(
            config.database_path.value,
            PathBuf::from("/custom/path/garden.sqlite")
        );
        assert_eq!(config.database_path.source, ConfigSource::File);
        assert_eq!(config.media_dir.value, temp_dir.path().join("photos"));
        assert!(config.remote.is_configured());
        assert_eq!(config.remote.user_id.as_deref(), Some("gardener-1"));
        assert_eq!(config.config_file, Some(config_path));
    }

    #[test]
    fn test_load_policies_from_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "policies:").unwrap();
        writeln!(file, "  read:").unwrap();
        writeln!(file, "    timeout_ms: 3000").unwrap();
        writeln!(file, "    max_retries: 1").unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.policies.read.timeout_ms, 3000);
        assert_eq!(config.policies.read.max_retries, 1);
        assert!(config.policies.read.throw_on_timeout);
        assert!(!config.policies.metadata.throw_on_timeout);
    }

    #[test]
    #[ignore] // Run with --ignored; env vars can pollute parallel tests
    fn test_env_var_overrides_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "media_dir: /from/file").unwrap();

        // Set env var
        std::env::set_var("GARDENLOG_MEDIA_DIR", "/from/env");

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.media_dir.value, PathBuf::from("/from/env"));
        assert_eq!(config.media_dir.source, ConfigSource::Environment);

        // Clean up
        std::env::remove_var("GARDENLOG_MEDIA_DIR");
    }

    #[test]
    fn test_invalid_yaml_error() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "invalid: yaml: content: [").unwrap();

        let result = Config::load(Some(config_path));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}

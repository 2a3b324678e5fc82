//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::websocket::{FanoutMode, HubConfig, LanguageMatch};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub hub: HubConfig,

    #[serde(default)]
    pub translation: TranslationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allow cross-origin requests from anywhere
    #[serde(default = "default_cors_permissive")]
    pub cors_permissive: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_permissive() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_permissive: default_cors_permissive(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Translation provider credentials and limits.
///
/// Credentials have no defaults: the provider refuses to start without them.
#[derive(Clone, Deserialize)]
pub struct TranslationConfig {
    pub access_key_id: Option<String>,

    pub secret_access_key: Option<String>,

    pub region: Option<String>,

    /// Override the provider endpoint (defaults to the regional AWS one)
    pub endpoint: Option<String>,

    #[serde(default = "default_translation_timeout")]
    pub timeout_ms: u64,
}

fn default_translation_timeout() -> u64 {
    10_000
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            access_key_id: None,
            secret_access_key: None,
            region: None,
            endpoint: None,
            timeout_ms: default_translation_timeout(),
        }
    }
}

impl std::fmt::Debug for TranslationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationConfig")
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment.
    ///
    /// Only a missing file falls back to environment-only configuration; a
    /// file that exists but cannot be read or parsed is an error.
    pub fn load_default() -> Result<Self, ConfigError> {
        let config_paths: Vec<PathBuf> = [
            dirs::config_dir().map(|p| p.join("babelcast").join("config.toml")),
            Some(PathBuf::from("/etc/babelcast/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self::load_first(&config_paths)
    }

    /// Load the first existing file among `paths`, else environment only
    pub fn load_first(paths: &[PathBuf]) -> Result<Self, ConfigError> {
        match paths.iter().find(|path| path.exists()) {
            Some(path) => {
                let config = Self::load_with_env(path)?;
                tracing::info!("Loaded config from {:?}", path);
                Ok(config)
            }
            None => {
                tracing::info!("Using default config with environment overrides");
                Ok(Self::from_env())
            }
        }
    }

    /// Apply environment variable overrides to an existing config
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from any name -> value lookup
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server overrides
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            match port.parse() {
                Ok(p) => self.server.port = p,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid PORT"),
            }
        }

        // Hub overrides
        if let Some(mode) = lookup("RELAY_LANGUAGE_MATCH") {
            match mode.parse::<LanguageMatch>() {
                Ok(m) => self.hub.language_match = m,
                Err(e) => tracing::warn!("Ignoring RELAY_LANGUAGE_MATCH: {}", e),
            }
        }
        if let Some(mode) = lookup("RELAY_FANOUT") {
            match mode.parse::<FanoutMode>() {
                Ok(m) => self.hub.fanout = m,
                Err(e) => tracing::warn!("Ignoring RELAY_FANOUT: {}", e),
            }
        }
        if let Some(capacity) = lookup("RELAY_DELIVERY_QUEUE") {
            match capacity.parse::<usize>() {
                Ok(c) if c > 0 => self.hub.delivery_queue_capacity = c,
                _ => tracing::warn!(value = %capacity, "Ignoring invalid RELAY_DELIVERY_QUEUE"),
            }
        }

        // Translation provider credentials
        if let Some(key) = lookup("TRANSLATE_ACCESS_KEY_ID") {
            self.translation.access_key_id = Some(key);
        }
        if let Some(secret) = lookup("TRANSLATE_SECRET_ACCESS_KEY") {
            self.translation.secret_access_key = Some(secret);
        }
        if let Some(region) = lookup("TRANSLATE_REGION") {
            self.translation.region = Some(region);
        }
        if let Some(endpoint) = lookup("TRANSLATE_ENDPOINT") {
            self.translation.endpoint = Some(endpoint);
        }

        // Logging overrides
        if let Some(level) = lookup("RELAY_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("RELAY_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Babelcast Configuration
#
# Environment variables override these settings:
# - HOST, PORT
# - RELAY_LANGUAGE_MATCH, RELAY_FANOUT, RELAY_DELIVERY_QUEUE
# - TRANSLATE_ACCESS_KEY_ID, TRANSLATE_SECRET_ACCESS_KEY, TRANSLATE_REGION
# - TRANSLATE_ENDPOINT
# - RELAY_LOG_LEVEL, RELAY_LOG_FORMAT

[server]
# Server host
host = "0.0.0.0"

# Server port
port = 8080

# Allow cross-origin requests from any origin
cors_permissive = true

[hub]
# How listener languages are compared with the speaker's:
# "exact" (en-US != en) or "primary_subtag" (en-US == en)
language_match = "exact"

# "sequential" translates one target language at a time,
# "concurrent" runs all target languages of one utterance in parallel
fanout = "sequential"

# Pending hub events (registrations, utterances, disconnects)
event_queue_capacity = 1024

# Pending messages per listener before it is treated as too slow and dropped
delivery_queue_capacity = 64

# Keepalive ping interval in seconds (0 disables)
ping_interval_secs = 30

[translation]
# AWS credentials are required; the server refuses to start without them
# access_key_id = ""
# secret_access_key = ""
# region = "us-east-1"

# Optional endpoint override
# endpoint = "https://translate.us-east-1.amazonaws.com/"

# Per-request timeout in milliseconds
timeout_ms = 10000

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.addr(), "0.0.0.0:8080");
        assert_eq!(config.hub.language_match, LanguageMatch::Exact);
        assert_eq!(config.hub.fanout, FanoutMode::Sequential);
        assert!(config.translation.access_key_id.is_none());
        assert_eq!(config.translation.timeout_ms, 10_000);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_generated_config_parses() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.hub.delivery_queue_capacity, 64);
        assert_eq!(config.hub.ping_interval_secs, 30);
        assert!(config.translation.region.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9000

[hub]
language_match = "primary_subtag"
fanout = "concurrent"

[translation]
access_key_id = "AKID"
secret_access_key = "secret"
region = "eu-west-1"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.hub.language_match, LanguageMatch::PrimarySubtag);
        assert_eq!(config.hub.fanout, FanoutMode::Concurrent);
        assert_eq!(config.translation.region.as_deref(), Some("eu-west-1"));
    }

    #[test]
    fn test_load_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\nport = ").unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let err = Config::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_first_picks_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let present = dir.path().join("config.toml");
        std::fs::write(&present, "[server]\nport = 9100\n").unwrap();

        let config = Config::load_first(&[missing.clone(), present]).unwrap();
        assert_eq!(config.server.port, 9100);

        // nothing on disk: environment only
        assert!(Config::load_first(&[missing]).is_ok());
    }

    #[test]
    fn test_load_first_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("config.toml");
        let fallback = dir.path().join("other.toml");
        std::fs::write(&broken, "[server\nport = ").unwrap();
        std::fs::write(&fallback, "[server]\nport = 9100\n").unwrap();

        let err = Config::load_first(&[broken, fallback]).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("PORT", "3000"),
            ("RELAY_LANGUAGE_MATCH", "primary_subtag"),
            ("RELAY_DELIVERY_QUEUE", "0"),
            ("TRANSLATE_ACCESS_KEY_ID", "AKID"),
            ("TRANSLATE_SECRET_ACCESS_KEY", "secret"),
            ("TRANSLATE_REGION", "us-west-2"),
            ("RELAY_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.hub.language_match, LanguageMatch::PrimarySubtag);
        // zero is rejected, default kept
        assert_eq!(config.hub.delivery_queue_capacity, 64);
        assert_eq!(config.translation.access_key_id.as_deref(), Some("AKID"));
        assert_eq!(config.translation.region.as_deref(), Some("us-west-2"));
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_invalid_port_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|name| (name == "PORT").then(|| "http".to_string()));
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = TranslationConfig {
            secret_access_key: Some("hunter2".to_string()),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }
}

//! Configuration management for ForgeCred components

use forgecred_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Check discovery settings
    #[serde(default)]
    pub checks: ChecksConfig,

    /// Invocation settings
    #[serde(default)]
    pub invocation: InvocationConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::Configuration(format!("Failed to parse config: {}", e)))
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Merge with environment variables (FORGECRED_ prefix)
    pub fn merge_env(self) -> Self {
        self.merge_vars(|key| std::env::var(key).ok())
    }

    /// Merge overrides from any `FORGECRED_*` lookup
    pub fn merge_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(val) = var("FORGECRED_CHECKS_DIR") {
            self.checks.manifest_dir = Some(val);
        }
        if let Some(val) = var("FORGECRED_INCLUDE_BUILTIN") {
            if let Ok(b) = val.parse() {
                self.checks.include_builtin = b;
            }
        }

        if let Some(val) = var("FORGECRED_BUDGET_SECONDS") {
            if let Ok(n) = val.parse() {
                self.invocation.budget_seconds = Some(n);
            }
        }

        if let Some(val) = var("FORGECRED_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Some(val) = var("FORGECRED_LOG_FORMAT") {
            self.logging.format = val;
        }
        if let Some(val) = var("FORGECRED_LOG_SPANS") {
            if let Ok(b) = val.parse() {
                self.logging.spans = b;
            }
        }

        self
    }
}

/// Where checks are discovered from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecksConfig {
    /// Directory of YAML check manifests
    pub manifest_dir: Option<String>,

    /// Include the compiled-in checks
    #[serde(default = "default_true")]
    pub include_builtin: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            manifest_dir: None,
            include_builtin: true,
        }
    }
}

/// Per-invocation limits applied by the driver
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvocationConfig {
    /// Wall-clock budget for one check invocation (none = unbounded)
    pub budget_seconds: Option<u64>,
}

impl InvocationConfig {
    pub fn budget(&self) -> Option<Duration> {
        self.budget_seconds
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (pretty, json, compact)
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Emit span open/close events
    #[serde(default)]
    pub spans: bool,

    /// Include source file and line in each event
    #[serde(default)]
    pub file_lines: bool,
}

fn default_log_level() -> String {
    String::from("info")
}

fn default_log_format() -> String {
    String::from("pretty")
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            spans: false,
            file_lines: false,
        }
    }
}

/// Builder for constructing Config
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn manifest_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.checks.manifest_dir = Some(dir.into());
        self
    }

    pub fn include_builtin(mut self, include: bool) -> Self {
        self.config.checks.include_builtin = include;
        self
    }

    pub fn budget_seconds(mut self, seconds: u64) -> Self {
        self.config.invocation.budget_seconds = Some(seconds);
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_from_toml() {
        let toml = r#"
            [checks]
            manifest_dir = "/etc/forgecred/checks"
            include_builtin = false

            [invocation]
            budget_seconds = 30

            [logging]
            level = "debug"
            format = "json"
            file_lines = true
        "#;

        let config = Config::from_toml(toml).unwrap();
        assert_eq!(
            config.checks.manifest_dir.as_deref(),
            Some("/etc/forgecred/checks")
        );
        assert!(!config.checks.include_builtin);
        assert_eq!(config.invocation.budget(), Some(Duration::from_secs(30)));
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.file_lines);
        assert!(!config.logging.spans);
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_toml("").unwrap();
        assert!(config.checks.include_builtin);
        assert_eq!(config.invocation.budget(), None);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_invalid_toml_is_configuration_error() {
        let err = Config::from_toml("[checks\nmanifest_dir = 1").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("FORGECRED_CHECKS_DIR", "/opt/checks"),
            ("FORGECRED_BUDGET_SECONDS", "15"),
            ("FORGECRED_INCLUDE_BUILTIN", "false"),
            ("FORGECRED_LOG_LEVEL", "trace"),
            ("FORGECRED_LOG_SPANS", "true"),
        ]
        .into_iter()
        .collect();

        let config = Config::default().merge_vars(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.checks.manifest_dir.as_deref(), Some("/opt/checks"));
        assert_eq!(config.invocation.budget_seconds, Some(15));
        assert!(!config.checks.include_builtin);
        assert_eq!(config.logging.level, "trace");
        assert!(config.logging.spans);
    }

    #[test]
    fn test_config_builder() {
        let config = Config::builder()
            .manifest_dir("/tmp/checks")
            .budget_seconds(5)
            .log_level("warn")
            .build();

        assert_eq!(config.checks.manifest_dir.as_deref(), Some("/tmp/checks"));
        assert_eq!(config.invocation.budget(), Some(Duration::from_secs(5)));
        assert_eq!(config.logging.level, "warn");
    }
}

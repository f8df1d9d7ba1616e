//! # Configuration Management
//!
//! Centralized configuration for the codec and the `protodec` tool.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment overrides via `from_env()`
//!
//! ## Resource Limits
//! - `recursion_limit` bounds nesting depth (and therefore stack use) when
//!   decoding hostile input
//! - `max_message_size` bounds the size of a single encoded message

use crate::error::{CodecError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::Level;

/// Default maximum nesting depth of embedded messages
pub const DEFAULT_RECURSION_LIMIT: usize = 100;

/// Default maximum encoded message size (64 MiB)
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ProtowireConfig {
    /// Codec behaviour and limits
    #[serde(default)]
    pub codec: CodecConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ProtowireConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| CodecError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| CodecError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| CodecError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Defaults overridden by `PROTOWIRE_*` environment variables.
    ///
    /// Unlike TOML loading, a variable that is set but unparsable is an error
    /// rather than silently ignored.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Apply `PROTOWIRE_*` environment overrides on top of `self`
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(strict) = env_var("PROTOWIRE_STRICT") {
            self.codec.reject_unknown_fields = parse_bool(&strict)
                .ok_or_else(|| invalid_env("PROTOWIRE_STRICT", &strict))?;
        }

        if let Some(limit) = env_var("PROTOWIRE_RECURSION_LIMIT") {
            self.codec.recursion_limit = limit
                .parse()
                .map_err(|_| invalid_env("PROTOWIRE_RECURSION_LIMIT", &limit))?;
        }

        if let Some(size) = env_var("PROTOWIRE_MAX_MESSAGE_SIZE") {
            self.codec.max_message_size = size
                .parse()
                .map_err(|_| invalid_env("PROTOWIRE_MAX_MESSAGE_SIZE", &size))?;
        }

        if let Some(level) = env_var("PROTOWIRE_LOG_LEVEL") {
            self.logging.log_level = level
                .parse::<Level>()
                .map_err(|_| invalid_env("PROTOWIRE_LOG_LEVEL", &level))?;
        }

        Ok(())
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| CodecError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| CodecError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.codec.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(CodecError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Codec behaviour and resource limits
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Fail decoding with `SchemaMismatch` on tags the schema does not define
    pub reject_unknown_fields: bool,

    /// Maximum nesting depth of embedded messages
    pub recursion_limit: usize,

    /// Maximum size in bytes of one encoded message
    pub max_message_size: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            reject_unknown_fields: false,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl CodecConfig {
    /// Default limits with unknown fields rejected
    pub fn strict() -> Self {
        Self {
            reject_unknown_fields: true,
            ..Self::default()
        }
    }

    /// Validate codec configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.recursion_limit == 0 {
            errors.push("Recursion limit must be greater than 0".to_string());
        } else if self.recursion_limit > 10_000 {
            errors.push(format!(
                "Recursion limit too large: {} (maximum: 10000)",
                self.recursion_limit
            ));
        }

        if self.max_message_size == 0 {
            errors.push("Max message size must be greater than 0".to_string());
        } else if self.max_message_size > i32::MAX as usize {
            // lengths above 2 GiB are not representable by common decoders
            errors.push(format!(
                "Max message size too large: {} bytes (maximum: {} bytes)",
                self.max_message_size,
                i32::MAX
            ));
        }

        errors
    }

    /// Validate and return error if invalid
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(CodecError::ConfigError(format!(
                "Invalid codec configuration:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,

    /// Whether to include span/target details in log lines
    pub show_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("protowire"),
            log_level: Level::WARN,
            json_format: false,
            show_target: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn invalid_env(name: &str, value: &str) -> CodecError {
    CodecError::ConfigError(format!("Invalid value for {name}: '{value}'"))
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ProtowireConfig::default();
        assert!(config.validate().is_empty());
        assert_eq!(config.codec.recursion_limit, 100);
        assert_eq!(config.codec.max_message_size, 64 * 1024 * 1024);
        assert!(!config.codec.reject_unknown_fields);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = ProtowireConfig::from_toml(
            r#"
            [codec]
            reject_unknown_fields = true

            [logging]
            log_level = "debug"
            "#,
        )
        .unwrap();
        assert!(config.codec.reject_unknown_fields);
        assert_eq!(config.codec.recursion_limit, DEFAULT_RECURSION_LIMIT);
        assert_eq!(config.logging.log_level, Level::DEBUG);
        assert_eq!(config.logging.app_name, "protowire");
    }

    #[test]
    fn test_bad_log_level_rejected() {
        let result = ProtowireConfig::from_toml("[logging]\nlog_level = \"loud\"\n");
        assert!(matches!(result, Err(CodecError::ConfigError(_))));
    }

    #[test]
    fn test_validate_strict_lists_every_problem() {
        let config = ProtowireConfig::default_with_overrides(|c| {
            c.codec.recursion_limit = 0;
            c.codec.max_message_size = 0;
        });
        let err = config.validate_strict().unwrap_err().to_string();
        assert!(err.contains("Recursion limit"), "{err}");
        assert!(err.contains("Max message size"), "{err}");
    }

    #[test]
    fn test_example_config_parses() {
        let text = ProtowireConfig::example_config();
        let parsed = ProtowireConfig::from_toml(&text).unwrap();
        assert_eq!(parsed.codec, CodecConfig::default());
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}

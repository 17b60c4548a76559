// crates/iac-forge-config/src/config.rs
// ============================================================================
// Module: iac-forge Configuration
// Description: Configuration loading and validation for the iac-forge binary.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, thiserror, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The path comes from the caller, then `IAC_FORGE_CONFIG`, then
//! `iac-forge.toml` in the working directory. An explicit path that cannot be
//! read is an error; a missing default file yields [`IacForgeConfig::default`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "iac-forge.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "IAC_FORGE_CONFIG";
/// Maximum config file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum length of a whole path.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default cap on configuration tree input size.
pub const DEFAULT_MAX_INPUT_BYTES: usize = 16 * 1024 * 1024;
/// Hard ceiling for `limits.max_input_bytes`.
pub const MAX_INPUT_BYTES_CEILING: usize = 256 * 1024 * 1024;

// ============================================================================
// SECTION: Config Model
// ============================================================================

/// Top-level `iac-forge.toml` contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IacForgeConfig {
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Default generator paths.
    #[serde(default)]
    pub generator: GeneratorConfig,
    /// Input limits.
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Where a loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Read from the given file.
    File(PathBuf),
    /// No file was found at the default location.
    Defaults,
}

impl IacForgeConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_source(path).map(|(config, _)| config)
    }

    /// Loads configuration and reports which source supplied it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load_with_source(path: Option<&Path>) -> Result<(Self, ConfigSource), ConfigError> {
        let (resolved, explicit) = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = match fs::read(&resolved) {
            Ok(bytes) => bytes,
            Err(err) if !explicit && err.kind() == ErrorKind::NotFound => {
                return Ok((Self::default(), ConfigSource::Defaults));
            }
            Err(err) => return Err(ConfigError::Io(err.to_string())),
        };
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config = Self::from_toml(content)?;
        Ok((config, ConfigSource::File(resolved)))
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys and
    /// [`ConfigError::Invalid`] when a value is out of range.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.generator.validate()?;
        self.limits.validate()
    }
}

// ============================================================================
// SECTION: Logging
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Minimum level when `RUST_LOG` is unset.
    #[serde(default)]
    pub level: LogLevel,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

/// Minimum log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Everything.
    Trace,
    /// Per-mutation and per-section detail.
    Debug,
    /// Cascades and command summaries.
    Info,
    /// Only warnings and errors.
    #[default]
    Warn,
    /// Only errors.
    Error,
}

impl LogLevel {
    /// Filter directive for this level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Plain,
    /// One JSON object per line.
    Json,
}

// ============================================================================
// SECTION: Generator
// ============================================================================

/// Default paths for the generate and check commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Configuration tree read when `--input` is omitted.
    #[serde(default)]
    pub input: Option<PathBuf>,
    /// Terraform file written when `--out` is omitted.
    #[serde(default)]
    pub output: Option<PathBuf>,
}

impl GeneratorConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(input) = &self.input {
            validate_path_string("generator.input", &input.to_string_lossy())?;
        }
        if let Some(output) = &self.output {
            validate_path_string("generator.output", &output.to_string_lossy())?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Input size limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    /// Maximum configuration tree size in bytes.
    #[serde(default = "default_max_input_bytes")]
    pub max_input_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self { max_input_bytes: DEFAULT_MAX_INPUT_BYTES }
    }
}

const fn default_max_input_bytes() -> usize {
    DEFAULT_MAX_INPUT_BYTES
}

impl LimitsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_input_bytes == 0 {
            return Err(ConfigError::Invalid("limits.max_input_bytes must be greater than zero".to_string()));
        }
        if self.max_input_bytes > MAX_INPUT_BYTES_CEILING {
            return Err(ConfigError::Invalid(format!(
                "limits.max_input_bytes must be at most {MAX_INPUT_BYTES_CEILING}"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path and whether it was requested explicitly.
fn resolve_path(path: Option<&Path>) -> Result<(PathBuf, bool), ConfigError> {
    if let Some(path) = path {
        return Ok((path.to_path_buf(), true));
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok((PathBuf::from(env_path), true));
    }
    Ok((PathBuf::from(DEFAULT_CONFIG_NAME), false))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    if path.to_string_lossy().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a configured path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

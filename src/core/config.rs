//! Configuration resolution
//!
//! A [`LoggerConfig`] is built once from the environment in three passes:
//! built-in defaults, `LOG_*` variable overrides, then tier overrides keyed
//! by `APP_ENV`. Resolution never fails; anything malformed keeps its
//! default.

use super::log_level::LogLevel;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Fallback when a size string does not parse
pub const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;

pub const ENV_APP_ENV: &str = "APP_ENV";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
pub const ENV_LOG_ENABLED: &str = "LOG_ENABLED";
pub const ENV_LOG_TO_FILE: &str = "LOG_TO_FILE";
pub const ENV_LOG_DIR: &str = "LOG_DIR";
pub const ENV_LOG_FILE_PATH: &str = "LOG_FILE_PATH";
pub const ENV_LOG_TIMESTAMP: &str = "LOG_TIMESTAMP";
pub const ENV_LOG_COLORS: &str = "LOG_COLORS";
pub const ENV_LOG_MAX_SIZE: &str = "LOG_MAX_SIZE";
pub const ENV_LOG_MAX_FILES: &str = "LOG_MAX_FILES";
pub const ENV_LOG_COMPRESS: &str = "LOG_COMPRESS";
pub const ENV_LOG_JSON: &str = "LOG_JSON";

/// Deployment tier. Drives defaults only; nothing checks it at log time
/// except query redaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }

    pub fn is_production(&self) -> bool {
        *self == Environment::Production
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" | "local" => Ok(Environment::Development),
            "staging" | "stage" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(format!("Invalid environment: '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    pub enabled: bool,
    /// Multi-line human layout instead of one compact line
    pub fancy: bool,
    pub colors: bool,
    pub timestamps: bool,
    /// strftime pattern, rendered in local time
    pub date_format: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
    pub enabled: bool,
    pub directory: PathBuf,
    /// `<integer><b|k|m|g>`, e.g. `10m`
    pub max_size: String,
    /// Rotation files kept, the active one included. `0` keeps everything.
    pub max_files: usize,
    pub compress: bool,
    pub json_format: bool,
}

impl FileConfig {
    /// `max_size` in bytes; malformed sizes give [`DEFAULT_MAX_BYTES`]
    pub fn max_bytes(&self) -> u64 {
        parse_size(&self.max_size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Features {
    pub request_logging: bool,
    pub error_stack_traces: bool,
    pub performance_metrics: bool,
    pub memory_usage: bool,
}

/// Complete logger configuration. Immutable once a logger is built from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerConfig {
    pub level: LogLevel,
    pub environment: Environment,
    /// Label stamped on every event
    pub tag: String,
    pub console: ConsoleConfig,
    pub file: FileConfig,
    pub features: Features,
}

impl LoggerConfig {
    /// Built-in defaults for a tier, before any variable or tier override
    pub fn defaults_for(environment: Environment) -> Self {
        let production = environment.is_production();
        let development = environment == Environment::Development;

        Self {
            level: LogLevel::Info,
            environment,
            tag: "app".to_string(),
            console: ConsoleConfig {
                enabled: true,
                fancy: !production,
                colors: !production,
                timestamps: true,
                date_format: "%H:%M:%S".to_string(),
            },
            file: FileConfig {
                enabled: false,
                directory: PathBuf::from("logs"),
                max_size: "10m".to_string(),
                max_files: 30,
                compress: false,
                json_format: production,
            },
            features: Features {
                request_logging: true,
                error_stack_traces: true,
                performance_metrics: development,
                memory_usage: development,
            },
        }
    }

    /// Resolve from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve from an explicit variable map
    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    /// Resolve using `lookup` as the environment
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup(ENV_APP_ENV)
            .and_then(|v| v.parse().ok())
            .unwrap_or_default();

        let mut config = Self::defaults_for(environment);
        config.apply_variables(&lookup);
        config.apply_tier_overrides();
        config
    }

    fn apply_variables<F>(&mut self, lookup: &F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup(ENV_LOG_LEVEL).and_then(|v| v.parse().ok()) {
            self.level = level;
        }
        if let Some(enabled) = lookup(ENV_LOG_ENABLED).and_then(|v| parse_bool(&v)) {
            self.console.enabled = enabled;
        }
        if let Some(to_file) = lookup(ENV_LOG_TO_FILE).and_then(|v| parse_bool(&v)) {
            self.file.enabled = to_file;
        }
        if let Some(dir) = lookup(ENV_LOG_DIR)
            .or_else(|| lookup(ENV_LOG_FILE_PATH))
            .filter(|v| !v.trim().is_empty())
        {
            self.file.directory = PathBuf::from(dir);
        }
        if let Some(timestamps) = lookup(ENV_LOG_TIMESTAMP).and_then(|v| parse_bool(&v)) {
            self.console.timestamps = timestamps;
        }
        if let Some(colors) = lookup(ENV_LOG_COLORS).and_then(|v| parse_bool(&v)) {
            self.console.colors = colors;
        }
        if let Some(size) = lookup(ENV_LOG_MAX_SIZE) {
            // Kept verbatim; `max_bytes()` applies the soft fallback
            self.file.max_size = size.trim().to_string();
        }
        if let Some(max_files) = lookup(ENV_LOG_MAX_FILES).and_then(|v| v.trim().parse().ok()) {
            self.file.max_files = max_files;
        }
        if let Some(compress) = lookup(ENV_LOG_COMPRESS).and_then(|v| parse_bool(&v)) {
            self.file.compress = compress;
        }
        if let Some(json) = lookup(ENV_LOG_JSON).and_then(|v| parse_bool(&v)) {
            self.file.json_format = json;
        }
    }

    fn apply_tier_overrides(&mut self) {
        match self.environment {
            Environment::Production => {
                self.console.fancy = false;
                self.file.enabled = true;
                self.file.json_format = true;
                self.features.performance_metrics = false;
            }
            Environment::Development => {
                self.level = LogLevel::Debug;
                self.features.performance_metrics = true;
            }
            Environment::Staging => {}
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        let mut config = Self::defaults_for(Environment::Development);
        config.apply_tier_overrides();
        config
    }
}

/// Parse `<integer><b|k|m|g>` (case-insensitive) into bytes.
///
/// Anything else, including overflow, yields [`DEFAULT_MAX_BYTES`].
pub fn parse_size(size: &str) -> u64 {
    let size = size.trim();
    let Some(unit) = size.chars().last() else {
        return DEFAULT_MAX_BYTES;
    };
    let multiplier: u64 = match unit.to_ascii_lowercase() {
        'b' => 1,
        'k' => 1024,
        'm' => 1024 * 1024,
        'g' => 1024 * 1024 * 1024,
        _ => return DEFAULT_MAX_BYTES,
    };

    let digits = &size[..size.len() - unit.len_utf8()];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return DEFAULT_MAX_BYTES;
    }

    digits
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .unwrap_or(DEFAULT_MAX_BYTES)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

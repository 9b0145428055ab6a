//! Configuration service: string key/value pairs read as typed values.
//!
//! Keys compare case-insensitively. Files are either a YAML mapping of
//! scalars (`.yaml`/`.yml`) or `key=value` lines with `#` comments.

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

/// Keys read by the level-lifecycle core.
pub mod keys {
    pub const GAME_MODE: &str = "GameMode";
    pub const DIFFICULTY: &str = "Difficulty";
    pub const VIEW_DISTANCE: &str = "ViewDistance";
    pub const ENABLE_BLOCK_TICKING: &str = "EnableBlockTicking";
    pub const ENABLE_CHUNK_TICKING: &str = "EnableChunkTicking";
    pub const IS_WORLD_TIME_STARTED: &str = "IsWorldTimeStarted";
    pub const WORLD_PROVIDER: &str = "WorldProvider";
    pub const CALCULATE_LIGHTS: &str = "CalculateLights";
    pub const WORLD_FOLDER: &str = "WorldFolder";
    pub const SAVE_ENABLED: &str = "SaveEnabled";
    pub const SEED: &str = "Seed";
    pub const LEVEL_STRATEGY: &str = "LevelStrategy";
    pub const LEVEL_POOL_SIZE: &str = "LevelPoolSize";
}

/// Errors from loading configuration files.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("configuration root must be a mapping")]
    NotMapping,
    #[error("value of {0:?} must be a scalar")]
    NotScalar(String),
    #[error("line {line}: expected key=value, got {text:?}")]
    MalformedLine { line: usize, text: String },
}

/// Typed view over string configuration values.
#[derive(Debug, Clone, Default)]
pub struct Config {
    values: BTreeMap<String, String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from disk, choosing the format from the file extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml_str(&text)?,
            _ => Self::from_properties_str(&text)?,
        };
        tracing::info!(path = %path.display(), keys = config.len(), "configuration loaded");
        Ok(config)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let value: serde_yaml::Value = serde_yaml::from_str(text)?;
        let mut config = Self::new();
        let mapping = match value {
            serde_yaml::Value::Mapping(m) => m,
            serde_yaml::Value::Null => return Ok(config),
            _ => return Err(ConfigError::NotMapping),
        };
        for (key, value) in mapping {
            let key = scalar_string(&key).ok_or(ConfigError::NotMapping)?;
            match value {
                serde_yaml::Value::Null => {}
                other => {
                    let value = scalar_string(&other).ok_or_else(|| ConfigError::NotScalar(key.clone()))?;
                    config.set(&key, value);
                }
            }
        }
        Ok(config)
    }

    pub fn from_properties_str(text: &str) -> Result<Self, ConfigError> {
        let mut config = Self::new();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::MalformedLine {
                    line: index + 1,
                    text: raw.to_string(),
                });
            };
            config.set(key.trim(), value.trim());
        }
        Ok(config)
    }

    pub fn set(&mut self, key: &str, value: impl ToString) -> &mut Self {
        self.values.insert(key.to_lowercase(), value.to_string());
        self
    }

    /// Builder form of [`Config::set`].
    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    pub fn get_raw(&self, key: &str) -> Option<&str> {
        self.values.get(&key.to_lowercase()).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get_raw(key).is_some()
    }

    /// Read `key` as `T`, or `default` when absent. A value that does not
    /// parse logs a warning and also yields `default`.
    pub fn get<T: FromStr>(&self, key: &str, default: T) -> T {
        let Some(raw) = self.get_raw(key) else {
            return default;
        };
        let trimmed = raw.trim();
        if let Ok(value) = trimmed.parse() {
            return value;
        }
        if let Ok(value) = trimmed.to_ascii_lowercase().parse() {
            return value;
        }
        tracing::warn!(key, value = raw, "unparsable configuration value, using default");
        default
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn scalar_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub persistence: PersistenceConfig,

    #[serde(default)]
    pub viewport: ViewportConfig,

    #[serde(default)]
    pub keys: StorageKeys,

    #[serde(default)]
    pub execution: ExecutionConfig,
}

/// Snapshot persistence behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Quiet period after the last change before a snapshot is written
    #[serde(default = "default_save_debounce_ms")]
    pub save_debounce_ms: u64,

    /// Age after which a persisted snapshot is discarded
    #[serde(default = "default_state_ttl_secs")]
    pub state_ttl_secs: u64,

    /// Compress snapshot text when the build supports it
    #[serde(default = "default_true")]
    pub compression: bool,

    #[serde(default = "default_compression_level")]
    pub compression_level: i32,
}

fn default_save_debounce_ms() -> u64 {
    2500
}

fn default_state_ttl_secs() -> u64 {
    7 * 24 * 60 * 60 // 7 days
}

fn default_compression_level() -> i32 {
    3
}

fn default_true() -> bool {
    true
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            save_debounce_ms: default_save_debounce_ms(),
            state_ttl_secs: default_state_ttl_secs(),
            compression: true,
            compression_level: default_compression_level(),
        }
    }
}

impl PersistenceConfig {
    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }

    pub fn state_ttl(&self) -> Duration {
        Duration::from_secs(self.state_ttl_secs)
    }
}

/// Caret-following behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewportConfig {
    /// Lines kept between the caret and the top/bottom edge
    #[serde(default = "default_margin_lines")]
    pub margin_lines: f64,

    /// Minimum gap since the previous auto-scroll for a smooth scroll
    #[serde(default = "default_smooth_scroll_interval_ms")]
    pub smooth_scroll_interval_ms: u64,

    /// Line height used when neither line height nor font size is known
    #[serde(default = "default_fallback_line_height")]
    pub fallback_line_height: f64,

    /// Line height derived from font size when only the font size is known
    #[serde(default = "default_font_size_line_ratio")]
    pub font_size_line_ratio: f64,
}

fn default_margin_lines() -> f64 {
    2.0
}

fn default_smooth_scroll_interval_ms() -> u64 {
    120
}

fn default_fallback_line_height() -> f64 {
    24.0
}

fn default_font_size_line_ratio() -> f64 {
    1.5
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            margin_lines: default_margin_lines(),
            smooth_scroll_interval_ms: default_smooth_scroll_interval_ms(),
            fallback_line_height: default_fallback_line_height(),
            font_size_line_ratio: default_font_size_line_ratio(),
        }
    }
}

/// Storage key layout shared with other tabs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageKeys {
    #[serde(default = "default_session_id_key")]
    pub session_id: String,

    /// Prefix of the per-session snapshot keys
    #[serde(default = "default_state_prefix")]
    pub state_prefix: String,

    #[serde(default = "default_output_key")]
    pub output: String,

    #[serde(default = "default_fallback_key")]
    pub fallback: String,

    /// Single-key text store from the earlier schema
    #[serde(default = "default_legacy_key")]
    pub legacy: String,

    /// Durable key whose removal signals a logout
    #[serde(default = "default_auth_token_key")]
    pub auth_token: String,
}

fn default_session_id_key() -> String {
    "compiler:session-id".to_string()
}

fn default_state_prefix() -> String {
    "compiler:state:".to_string()
}

fn default_output_key() -> String {
    "compiler:output".to_string()
}

fn default_fallback_key() -> String {
    "compiler:code-fallback".to_string()
}

fn default_legacy_key() -> String {
    "compiler:code".to_string()
}

fn default_auth_token_key() -> String {
    "access_token".to_string()
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            session_id: default_session_id_key(),
            state_prefix: default_state_prefix(),
            output: default_output_key(),
            fallback: default_fallback_key(),
            legacy: default_legacy_key(),
            auth_token: default_auth_token_key(),
        }
    }
}

impl StorageKeys {
    /// Namespaced snapshot key for a session
    pub fn state_key(&self, session_id: &str) -> String {
        format!("{}{}", self.state_prefix, session_id)
    }
}

/// Remote execution service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    "http://localhost:5000/api/compiler/execute".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file. Missing fields take their defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let config: Config =
            serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        self.validate()?;

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path.as_ref(), contents).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.persistence.save_debounce_ms == 0 {
            return Err(ConfigError::ValidationError(
                "save_debounce_ms must be greater than 0".to_string(),
            ));
        }

        if self.persistence.state_ttl_secs == 0 {
            return Err(ConfigError::ValidationError(
                "state_ttl_secs must be greater than 0".to_string(),
            ));
        }

        let line_height = self.viewport.fallback_line_height;
        if !line_height.is_finite() || line_height <= 0.0 {
            return Err(ConfigError::ValidationError(
                "fallback_line_height must be a positive number".to_string(),
            ));
        }

        let ratio = self.viewport.font_size_line_ratio;
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(ConfigError::ValidationError(
                "font_size_line_ratio must be a positive number".to_string(),
            ));
        }

        if !self.viewport.margin_lines.is_finite() || self.viewport.margin_lines < 0.0 {
            return Err(ConfigError::ValidationError(
                "margin_lines must not be negative".to_string(),
            ));
        }

        let keys = &self.keys;
        if keys.state_prefix.is_empty() {
            return Err(ConfigError::ValidationError(
                "state_prefix must not be empty".to_string(),
            ));
        }

        // The sweep deletes everything under the prefix, so no flat key may live there
        for flat in [&keys.session_id, &keys.output, &keys.fallback, &keys.legacy] {
            if flat.starts_with(&keys.state_prefix) {
                return Err(ConfigError::ValidationError(format!(
                    "key '{flat}' collides with state_prefix '{}'",
                    keys.state_prefix
                )));
            }
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(msg) => write!(f, "IO error: {msg}"),
            ConfigError::ParseError(msg) => write!(f, "Parse error: {msg}"),
            ConfigError::SerializeError(msg) => write!(f, "Serialize error: {msg}"),
            ConfigError::ValidationError(msg) => write!(f, "Validation error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

//! Configuration file handling for storyforge.
//!
//! Loads configuration from `<config dir>/storyforge/config.toml` or a custom path.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::gemini::{
    CredentialStore, RetryPolicy, DEFAULT_BACKOFF_BASE, GEMINI_API_BASE_URL, ROTATION_ATTEMPTS,
};
use crate::studio::{
    default_media_dir, ModelSet, StudioSettings, DEFAULT_LANGUAGE, DEFAULT_VOICE,
};

/// Configuration file structure for storyforge.
/// Loaded from <config dir>/storyforge/config.toml (or custom path via --config).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub models: ModelSet,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub video: VideoConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CredentialsConfig {
    /// API keys, tried in order.
    #[serde(default)]
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts per API key.
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pause before each scene image request.
    #[serde(default = "default_scene_pacing_ms")]
    pub scene_pacing_ms: u64,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_voice")]
    pub voice: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scene_pacing_ms: default_scene_pacing_ms(),
            language: default_language(),
            voice: default_voice(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Give up after this many seconds. Unset waits indefinitely.
    #[serde(default)]
    pub max_wait_secs: Option<u64>,
    /// Where downloaded videos land (default: system temp dir).
    #[serde(default)]
    pub media_dir: Option<PathBuf>,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_wait_secs: None,
            media_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ApiConfig {
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_attempts() -> u32 {
    ROTATION_ATTEMPTS
}

fn default_base_delay_ms() -> u64 {
    DEFAULT_BACKOFF_BASE.as_millis() as u64
}

fn default_scene_pacing_ms() -> u64 {
    1000
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

fn default_voice() -> String {
    DEFAULT_VOICE.to_string()
}

fn default_poll_interval_ms() -> u64 {
    5000
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
                path: path.clone(),
                source: e,
            })?;
            let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.clone(),
                source: e,
            })?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Studio tunables described by this configuration.
    pub fn settings(&self) -> StudioSettings {
        StudioSettings {
            models: self.models.clone(),
            retry: RetryPolicy::new(
                self.retry.attempts,
                Duration::from_millis(self.retry.base_delay_ms),
            ),
            scene_pacing: Duration::from_millis(self.pipeline.scene_pacing_ms),
            poll_interval: Duration::from_millis(self.video.poll_interval_ms),
            max_wait: self.video.max_wait_secs.map(Duration::from_secs),
            language: self.pipeline.language.clone(),
            voice: self.pipeline.voice.clone(),
            media_dir: self
                .video
                .media_dir
                .clone()
                .unwrap_or_else(default_media_dir),
        }
    }

    /// Credential store holding the configured keys plus the environment fallback.
    pub fn credential_store(&self) -> CredentialStore {
        CredentialStore::configure(&self.credentials.keys)
    }

    pub fn base_url(&self) -> &str {
        self.api
            .base_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or(GEMINI_API_BASE_URL)
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError { path, source } => {
                write!(
                    f,
                    "Failed to read config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::ParseError { path, source } => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    source
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
        }
    }
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("storyforge").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/storyforge/config.toml")
        })
}

/// Commented template written by `config init`.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# storyforge configuration

[credentials]
# Gemini API keys, tried in order. When empty, GEMINI_API_KEY,
# GOOGLE_API_KEY or API_KEY from the environment is used.
keys = []

[models]
text = "gemini-2.5-flash"
image = "gemini-2.5-flash-image"
speech = "gemini-2.5-flash-preview-tts"
video = "veo-3.1-fast-generate-preview"

[retry]
# Attempts per API key for network failures and 502/503/504
attempts = 2
# Backoff grows linearly: base, 2 x base, ...
base_delay_ms = 2000

[pipeline]
# Pause before each scene image request
scene_pacing_ms = 1000
language = "Indonesian"
voice = "Kore"

[video]
poll_interval_ms = 5000
# max_wait_secs = 600
# media_dir = "/tmp/storyforge/videos"

[api]
# base_url = "https://generativelanguage.googleapis.com"
"#;

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

mod loader;

/// Example configuration embedded at compile time.
///
/// Holds every default value. Library users can write it out as a starter
/// config file.
pub const EXAMPLE_CONFIG: &str = include_str!("../../runpad.example.toml");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// HTTP client settings shared by every backend
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// User agent sent with every request
    pub user_agent: String,

    /// Default request timeout in seconds
    #[serde(default)]
    pub timeout: Option<f64>,
}

impl HttpConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs_f64)
    }
}

/// TIO endpoints and language resolution
#[derive(Debug, Clone, Deserialize)]
pub struct TioConfig {
    /// Endpoint accepting the compressed run payload
    pub run_url: String,

    /// Endpoint returning the language catalog as a JSON object
    pub languages_url: String,

    /// Seconds before the cached catalog is refetched (None: never)
    #[serde(default)]
    pub catalog_ttl: Option<f64>,

    /// Aliases added to the built-in table
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

impl TioConfig {
    pub fn catalog_ttl(&self) -> Option<Duration> {
        self.catalog_ttl.map(Duration::from_secs_f64)
    }
}

/// Piston API endpoint and execution defaults
#[derive(Debug, Clone, Deserialize)]
pub struct PistonConfig {
    /// Base URL ending in `/`; `runtimes` and `execute` are appended
    pub base_url: String,

    /// Compile step timeout in seconds
    pub compile_timeout: f64,

    /// Run step timeout in seconds
    pub run_timeout: f64,

    /// Compile step memory limit in bytes, -1 for none
    pub compile_memory_limit: i64,

    /// Run step memory limit in bytes, -1 for none
    pub run_memory_limit: i64,
}

/// Rust playground endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct PlaygroundConfig {
    /// Base URL ending in `/`
    pub base_url: String,
}

/// MystBin endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct MystBinConfig {
    /// Paste API endpoint
    pub api_url: String,

    /// Prefix of public paste URLs
    pub paste_url: String,

    /// Request timeout in seconds
    pub timeout: f64,
}

impl MystBinConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout)
    }
}

/// Limits for printing output inline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct OutputConfig {
    /// Maximum characters after sanitising
    pub max_chars: usize,

    /// Maximum number of newlines
    pub max_lines: usize,
}

/// Settings store location
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsConfig {
    pub path: PathBuf,
}

/// Config for runpad
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub http: HttpConfig,
    pub tio: TioConfig,
    pub piston: PistonConfig,
    pub playground: PlaygroundConfig,
    pub mystbin: MystBinConfig,
    pub output: OutputConfig,
    pub settings: SettingsConfig,
}

impl Config {
    /// Create a config holding the embedded defaults
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::parse_toml(EXAMPLE_CONFIG).expect("embedded default config should be valid")
    }
}

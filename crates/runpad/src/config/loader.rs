//! Configuration file loading for runpad
//!
//! Every source is layered over the embedded defaults, so a config file only
//! needs the values it changes.

use std::path::Path;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};

use crate::config::{Config, ConfigError, EXAMPLE_CONFIG};

/// Prefix of environment overrides, e.g. `RUNPAD__TIO__CATALOG_TTL`
const ENV_PREFIX: &str = "RUNPAD";
const ENV_SEPARATOR: &str = "__";

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = ConfigBuilder::builder()
            .add_source(File::from_str(EXAMPLE_CONFIG, FileFormat::Toml))
            .add_source(File::from(path.as_ref()))
            .build()?;

        Self::finish(config)
    }

    /// Parse configuration from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let config = ConfigBuilder::builder()
            .add_source(File::from_str(EXAMPLE_CONFIG, FileFormat::Toml))
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?;

        Self::finish(config)
    }

    /// Load defaults, then the optional file, then `RUNPAD__*` environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder =
            ConfigBuilder::builder().add_source(File::from_str(EXAMPLE_CONFIG, FileFormat::Toml));
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()?;

        Self::finish(config)
    }

    fn finish(config: config::Config) -> Result<Self, ConfigError> {
        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError> {
        let urls = [
            ("tio.run_url", &self.tio.run_url),
            ("tio.languages_url", &self.tio.languages_url),
            ("piston.base_url", &self.piston.base_url),
            ("playground.base_url", &self.playground.base_url),
            ("mystbin.api_url", &self.mystbin.api_url),
            ("mystbin.paste_url", &self.mystbin.paste_url),
        ];
        for (key, url) in urls {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid(format!(
                    "{key} must be an http(s) URL, got '{url}'"
                )));
            }
        }

        for (key, base) in [
            ("piston.base_url", &self.piston.base_url),
            ("playground.base_url", &self.playground.base_url),
            ("mystbin.paste_url", &self.mystbin.paste_url),
        ] {
            if !base.ends_with('/') {
                return Err(ConfigError::Invalid(format!("{key} must end with '/'")));
            }
        }

        let seconds = [
            ("http.timeout", self.http.timeout),
            ("tio.catalog_ttl", self.tio.catalog_ttl),
            ("piston.compile_timeout", Some(self.piston.compile_timeout)),
            ("piston.run_timeout", Some(self.piston.run_timeout)),
            ("mystbin.timeout", Some(self.mystbin.timeout)),
        ];
        for (key, value) in seconds {
            if let Some(value) = value
                && !(value.is_finite() && value > 0.0)
            {
                return Err(ConfigError::Invalid(format!(
                    "{key} must be a positive number of seconds, got {value}"
                )));
            }
        }

        if self.output.max_chars == 0 || self.output.max_lines == 0 {
            return Err(ConfigError::Invalid(
                "output limits must be greater than zero".to_owned(),
            ));
        }

        for (alias, target) in &self.tio.aliases {
            if alias.is_empty() || target.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "tio alias '{alias}' -> '{target}' has an empty side"
                )));
            }
        }

        if self.http.user_agent.is_empty() {
            return Err(ConfigError::Invalid("http.user_agent is empty".to_owned()));
        }

        Ok(())
    }
}

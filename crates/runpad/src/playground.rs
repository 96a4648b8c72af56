//! Client for the Rust playground (play.rust-lang.org)

use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::PlaygroundConfig;
use crate::transport::{HttpRequest, RequestBody, Transport, TransportError};
use crate::types::{PlaygroundSettings, RustEdition};

/// Matches a `fn main` that has a body, which makes the code a binary crate
static FN_MAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)fn\s+main\s*\([^)]*\)\s*(->\s*[^{]+\s*)?\{.*\}")
        .expect("fn main pattern should compile")
});

const TIMED_OUT: &str = "Timed out.";

#[derive(Debug, Error)]
pub enum PlaygroundError {
    #[error("{0}")]
    Http(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("invalid playground response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Response of the execute, clippy and macro expansion routes
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlaygroundResponse {
    pub success: bool,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
}

impl fmt::Display for PlaygroundResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.success {
            f.write_str(&self.stdout)
        } else {
            write!(f, "{}\n{}", self.stderr, self.stdout)
        }
    }
}

/// Response of the rustfmt route
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FormatResponse {
    pub success: bool,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    /// Formatted code
    #[serde(default)]
    pub code: String,
}

impl fmt::Display for FormatResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.success {
            return f.write_str(&self.code);
        }
        let joined = format!("{}\n{}\n{}", self.stdout, self.stderr, self.code);
        f.write_str(joined.trim_matches('\n'))
    }
}

/// `bin` when the code defines `fn main` with a body, `lib` otherwise
pub fn crate_type(code: &str) -> &'static str {
    if FN_MAIN.is_match(code) { "bin" } else { "lib" }
}

/// Client for the playground JSON API
#[derive(Debug, Clone)]
pub struct PlaygroundClient {
    transport: Arc<dyn Transport>,
    base_url: String,
}

impl PlaygroundClient {
    pub fn new(transport: Arc<dyn Transport>, config: &PlaygroundConfig) -> Self {
        Self {
            transport,
            base_url: config.base_url.clone(),
        }
    }

    /// Build and run `code`
    ///
    /// The playground answers 500 when the program exceeds its time limit.
    /// That case is returned as an unsuccessful response, not an error.
    #[instrument(skip(self, code))]
    pub async fn execute(
        &self,
        code: &str,
        settings: PlaygroundSettings,
    ) -> Result<PlaygroundResponse, PlaygroundError> {
        let payload = json!({
            "backtrace": false,
            "channel": settings.channel.as_str(),
            "code": code,
            "crateType": crate_type(code),
            "edition": settings.edition.as_str(),
            "mode": settings.mode.as_str(),
            "tests": false,
        });

        let url = format!("{}execute", self.base_url);
        let response = self
            .transport
            .send(HttpRequest::post(url, RequestBody::Json(payload)))
            .await?;

        if response.status == 500 {
            debug!("playground timed out");
            return Ok(PlaygroundResponse {
                success: false,
                stdout: String::new(),
                stderr: TIMED_OUT.to_owned(),
            });
        }
        if !response.is_success() {
            return Err(PlaygroundError::Http(response.describe()));
        }

        let response: PlaygroundResponse = response.json()?;
        debug!(success = response.success, "execution complete");
        Ok(response)
    }

    /// Run rustfmt over `code`
    #[instrument(skip(self, code))]
    pub async fn format(
        &self,
        code: &str,
        edition: RustEdition,
    ) -> Result<FormatResponse, PlaygroundError> {
        let payload = json!({
            "code": code,
            "edition": edition.as_str(),
        });
        self.post("format", payload).await
    }

    /// Run clippy over `code`
    #[instrument(skip(self, code))]
    pub async fn clippy(
        &self,
        code: &str,
        edition: RustEdition,
    ) -> Result<PlaygroundResponse, PlaygroundError> {
        let payload = json!({
            "code": code,
            "crateType": crate_type(code),
            "edition": edition.as_str(),
        });
        self.post("clippy", payload).await
    }

    /// Show `code` with macros expanded
    #[instrument(skip(self, code))]
    pub async fn expand_macros(
        &self,
        code: &str,
        edition: RustEdition,
    ) -> Result<PlaygroundResponse, PlaygroundError> {
        let payload = json!({
            "code": code,
            "edition": edition.as_str(),
        });
        self.post("macro-expansion", payload).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        route: &str,
        payload: Value,
    ) -> Result<T, PlaygroundError> {
        let url = format!("{}{route}", self.base_url);
        let response = self
            .transport
            .send(HttpRequest::post(url, RequestBody::Json(payload)))
            .await?;

        if !response.is_success() {
            return Err(PlaygroundError::Http(response.describe()));
        }
        Ok(response.json()?)
    }
}

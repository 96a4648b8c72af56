//! Client for the Piston execution API

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::config::PistonConfig;
use crate::transport::{HttpRequest, HttpResponse, RequestBody, Transport, TransportError};

/// Signal Piston reports when a stage hits its time or memory limit
const SIGKILL: &str = "SIGKILL";

#[derive(Debug, Error)]
pub enum PistonError {
    #[error("{0}")]
    Http(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("{0}")]
    RuntimeNotFound(String),

    #[error("invalid Piston response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Language runtime installed on the Piston instance
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PistonRuntime {
    pub language: String,
    pub version: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Underlying runtime when several languages share one (e.g. `node`)
    #[serde(default)]
    pub runtime: Option<String>,
}

/// Source file sent with an execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PistonFile {
    pub name: String,
    pub content: String,
}

impl PistonFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Output of one stage (compile or run)
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct PistonOutput {
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    /// stdout and stderr interleaved
    #[serde(default)]
    pub output: String,
    /// Exit code, absent when the process was killed by a signal
    #[serde(default)]
    pub code: Option<i32>,
    #[serde(default)]
    pub signal: Option<String>,
}

impl fmt::Display for PistonOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.output)
    }
}

/// How an execution ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The compile stage exited non-zero
    CompileError,
    /// The run stage was killed with SIGKILL, usually a timeout
    Killed,
    /// The run stage was terminated by another signal
    Signaled,
    /// The run stage exited non-zero
    RuntimeError,
    Success,
}

impl Outcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

/// Result of [`PistonClient::execute`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PistonResponse {
    pub runtime: PistonRuntime,
    pub run: PistonOutput,
    /// Present only for compiled languages
    pub compile: Option<PistonOutput>,
}

impl PistonResponse {
    fn failed_compile(&self) -> Option<&PistonOutput> {
        self.compile.as_ref().filter(|compile| compile.code != Some(0))
    }

    /// Compile output (if any) followed by run output
    pub fn output(&self) -> String {
        match &self.compile {
            Some(compile) => format!("{}\n{}", compile.output, self.run.output),
            None => self.run.output.clone(),
        }
    }

    /// Compile exit code when compilation failed, run exit code otherwise
    pub fn code(&self) -> Option<i32> {
        match self.failed_compile() {
            Some(compile) => compile.code,
            None => self.run.code,
        }
    }

    pub fn outcome(&self) -> Outcome {
        if self.failed_compile().is_some() {
            return Outcome::CompileError;
        }
        if self.run.signal.as_deref() == Some(SIGKILL) {
            return Outcome::Killed;
        }
        match self.run.code {
            None => Outcome::Signaled,
            Some(0) => Outcome::Success,
            Some(_) => Outcome::RuntimeError,
        }
    }
}

impl fmt::Display for PistonResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.output())
    }
}

/// Per-execution limits and inputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteOptions {
    pub stdin: String,
    pub args: Vec<String>,
    pub compile_timeout: Duration,
    pub run_timeout: Duration,
    /// Bytes, -1 for unlimited
    pub compile_memory_limit: i64,
    /// Bytes, -1 for unlimited
    pub run_memory_limit: i64,
}

impl ExecuteOptions {
    pub fn from_config(config: &PistonConfig) -> Self {
        Self {
            stdin: String::new(),
            args: Vec::new(),
            compile_timeout: Duration::from_secs_f64(config.compile_timeout),
            run_timeout: Duration::from_secs_f64(config.run_timeout),
            compile_memory_limit: config.compile_memory_limit,
            run_memory_limit: config.run_memory_limit,
        }
    }

    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = stdin.into();
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = timeout;
        self
    }
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            stdin: String::new(),
            args: Vec::new(),
            compile_timeout: Duration::from_secs(10),
            run_timeout: Duration::from_secs(5),
            compile_memory_limit: -1,
            run_memory_limit: -1,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExecuteBody {
    run: PistonOutput,
    #[serde(default)]
    compile: Option<PistonOutput>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Client for a Piston instance
#[derive(Debug)]
pub struct PistonClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    defaults: ExecuteOptions,
    runtimes: RwLock<Option<Arc<[PistonRuntime]>>>,
}

impl PistonClient {
    pub fn new(transport: Arc<dyn Transport>, config: &PistonConfig) -> Self {
        Self {
            transport,
            base_url: config.base_url.clone(),
            defaults: ExecuteOptions::from_config(config),
            runtimes: RwLock::new(None),
        }
    }

    /// Options filled from the configured limits
    pub fn default_options(&self) -> ExecuteOptions {
        self.defaults.clone()
    }

    /// Installed runtimes, fetched once and cached
    #[instrument(skip(self))]
    pub async fn runtimes(&self) -> Result<Arc<[PistonRuntime]>, PistonError> {
        if let Some(runtimes) = self.runtimes.read().await.as_ref() {
            return Ok(Arc::clone(runtimes));
        }

        let url = format!("{}runtimes", self.base_url);
        let response = self.transport.send(HttpRequest::get(url)).await?;
        if !response.is_success() {
            return Err(PistonError::Http(response.describe()));
        }

        let runtimes: Arc<[PistonRuntime]> = response.json::<Vec<PistonRuntime>>()?.into();
        debug!(count = runtimes.len(), "cached Piston runtimes");
        *self.runtimes.write().await = Some(Arc::clone(&runtimes));
        Ok(runtimes)
    }

    /// Find a runtime by language name or alias
    pub async fn get_runtime(&self, name: &str) -> Result<PistonRuntime, PistonError> {
        let name = name.to_lowercase();
        let runtimes = self.runtimes().await?;

        // The last listed runtime of a language shadows earlier versions
        let latest = |language: &str| runtimes.iter().rfind(|runtime| runtime.language == language);

        latest(name.as_str())
            .or_else(|| {
                runtimes
                    .iter()
                    .enumerate()
                    .filter(|(i, runtime)| {
                        !runtimes[..*i].iter().any(|earlier| earlier.language == runtime.language)
                    })
                    .filter_map(|(_, runtime)| latest(runtime.language.as_str()))
                    .find(|runtime| runtime.aliases.iter().any(|alias| *alias == name))
            })
            .cloned()
            .ok_or_else(|| PistonError::RuntimeNotFound(format!("Runtime '{name}' not found.")))
    }

    /// Execute `files` under `runtime`
    #[instrument(skip(self, runtime, files, options), fields(language = %runtime.language, version = %runtime.version))]
    pub async fn execute(
        &self,
        runtime: &PistonRuntime,
        files: &[PistonFile],
        options: &ExecuteOptions,
    ) -> Result<PistonResponse, PistonError> {
        let payload = json!({
            "language": runtime.language,
            "version": runtime.version,
            "files": files,
            "stdin": options.stdin,
            "args": options.args,
            "compile_timeout": options.compile_timeout.as_millis() as u64,
            "run_timeout": options.run_timeout.as_millis() as u64,
            "compile_memory_limit": options.compile_memory_limit,
            "run_memory_limit": options.run_memory_limit,
        });

        let url = format!("{}execute", self.base_url);
        let response = self
            .transport
            .send(HttpRequest::post(url, RequestBody::Json(payload)))
            .await?;

        let body = Self::execute_body(&response)?;
        let response = PistonResponse {
            runtime: runtime.clone(),
            run: body.run,
            compile: body.compile,
        };
        debug!(outcome = ?response.outcome(), code = ?response.code(), "execution complete");
        Ok(response)
    }

    fn execute_body(response: &HttpResponse) -> Result<ExecuteBody, PistonError> {
        // Piston answers 400 for unknown runtimes and versions
        if response.status == 400 {
            let message = match response.json::<ErrorBody>() {
                Ok(body) => body.message,
                Err(_) => response.describe(),
            };
            return Err(PistonError::RuntimeNotFound(message));
        }
        if !response.is_success() {
            return Err(PistonError::Http(response.describe()));
        }
        Ok(response.json()?)
    }
}

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::config::TioConfig;
use crate::tio::language::{AliasTable, LanguageCatalog, resolve};
use crate::tio::payload::ExecutionRequest;
use crate::tio::TioError;
use crate::transport::{HttpRequest, RequestBody, Transport};
use crate::types::ExecutionResult;

const FIELD_LANGUAGE: &str = "lang";
const FIELD_CODE: &str = ".code.tio";
const FIELD_INPUT: &str = ".input.tio";
const FIELD_COMPILER_FLAGS: &str = "TIO_CFLAGS";
const FIELD_OPTIONS: &str = "TIO_OPTIONS";
const FIELD_ARGS: &str = "args";

/// Optional inputs for a TIO run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Standard input for the program
    pub input: String,
    /// Compiler flags
    pub flags: Vec<String>,
    /// Interpreter options
    pub options: Vec<String>,
    /// Program arguments
    pub args: Vec<String>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = input.into();
        self
    }

    pub fn with_flags(mut self, flags: Vec<String>) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }
}

/// Client for the TIO run endpoint
#[derive(Debug, Clone)]
pub struct TioClient {
    transport: Arc<dyn Transport>,
    run_url: String,
    catalog: Arc<LanguageCatalog>,
    aliases: AliasTable,
}

impl TioClient {
    /// Create a client with its own catalog cache
    pub fn new(transport: Arc<dyn Transport>, config: &TioConfig) -> Self {
        let catalog = LanguageCatalog::new(&config.languages_url, config.catalog_ttl());
        Self::with_catalog(transport, config, Arc::new(catalog))
    }

    /// Create a client sharing an existing catalog cache
    pub fn with_catalog(
        transport: Arc<dyn Transport>,
        config: &TioConfig,
        catalog: Arc<LanguageCatalog>,
    ) -> Self {
        Self {
            transport,
            run_url: config.run_url.clone(),
            catalog,
            aliases: AliasTable::with_extra(&config.aliases),
        }
    }

    pub fn catalog(&self) -> &Arc<LanguageCatalog> {
        &self.catalog
    }

    /// Canonical language ids known to TIO (empty if the catalog is unavailable)
    pub async fn languages(&self) -> Arc<[String]> {
        self.catalog.languages(self.transport.as_ref()).await
    }

    /// Resolve a user-supplied language name to a canonical id
    pub async fn resolve_language(&self, language: &str) -> Result<String, TioError> {
        let catalog = self.languages().await;
        resolve(language, &catalog, &self.aliases)
    }

    /// Send an encoded request and return the decoded response body
    #[instrument(skip(self, request), fields(fields = request.len()))]
    pub async fn request(&self, request: &ExecutionRequest) -> Result<Vec<u8>, TioError> {
        let payload = request
            .encode()
            .compress()
            .map_err(TioError::Compression)?;
        debug!(bytes = payload.as_bytes().len(), "sending compressed payload");

        let response = self
            .transport
            .send(HttpRequest::post(
                &self.run_url,
                RequestBody::Bytes(payload.into_bytes()),
            ))
            .await?;

        if !response.is_success() {
            return Err(TioError::Http {
                status: response.status,
                reason: response.reason,
            });
        }

        Ok(response.body)
    }

    /// Run `code` under `language`
    #[instrument(skip(self, code, options))]
    pub async fn run(
        &self,
        code: &str,
        language: &str,
        options: &RunOptions,
    ) -> Result<ExecutionResult, TioError> {
        let language = self.resolve_language(language).await?;

        let request = ExecutionRequest::new()
            .with_field(FIELD_LANGUAGE, vec![language.clone()])
            .with_field(FIELD_CODE, code)
            .with_field(FIELD_INPUT, options.input.as_str())
            .with_field(FIELD_COMPILER_FLAGS, options.flags.clone())
            .with_field(FIELD_OPTIONS, options.options.clone())
            .with_field(FIELD_ARGS, options.args.clone());

        let body = self.request(&request).await?;
        let result = ExecutionResult::parse_bytes(&body, &language)?;

        debug!(
            language = %result.language,
            exit_code = result.exit_code,
            real_time = result.real_time,
            "run complete"
        );

        Ok(result)
    }
}

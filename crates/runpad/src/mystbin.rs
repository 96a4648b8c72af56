//! Client for the MystBin paste service

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::MystBinConfig;
use crate::transport::{FormPart, HttpRequest, RequestBody, Transport, TransportError};

#[derive(Debug, Error)]
pub enum MystBinError {
    #[error("MystBin paste with ID '{}' does not exist.", truncate_id(.0))]
    PasteNotFound(String),

    #[error("{0}")]
    Http(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("invalid MystBin response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("MystBin response did not include a paste id")]
    MissingId,
}

fn truncate_id(id: &str) -> String {
    id.chars().take(16).collect()
}

/// A paste fetched from or uploaded to MystBin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MystBinPaste {
    pub id: String,
    pub content: String,
    pub syntax: Option<String>,
}

impl MystBinPaste {
    /// Public URL of the paste under `base`, with the syntax as extension
    pub fn url(&self, base: &str) -> String {
        match self.syntax.as_deref() {
            Some(syntax) if !syntax.is_empty() => format!("{base}{}.{syntax}", self.id),
            _ => format!("{base}{}", self.id),
        }
    }

    /// Content wrapped in a fenced code block
    pub fn to_codeblock(&self) -> String {
        match self.syntax.as_deref() {
            Some(syntax) if !syntax.is_empty() => format!("```{syntax}\n{}```", self.content),
            _ => format!("```{}```", self.content),
        }
    }
}

/// Remove the whitespace prefix shared by every non-blank line
///
/// Lines holding only spaces and tabs are emptied and do not count towards
/// the shared prefix.
pub fn dedent(text: &str) -> String {
    let is_blank = |line: &str| line.bytes().all(|b| b == b' ' || b == b'\t');
    let indent = |line: &str| -> usize {
        line.bytes().take_while(|b| *b == b' ' || *b == b'\t').count()
    };

    let margin = text
        .split('\n')
        .filter(|line| !is_blank(*line))
        .map(|line| &line[..indent(line)])
        .reduce(|common, next| {
            let shared = common
                .bytes()
                .zip(next.bytes())
                .take_while(|(a, b)| a == b)
                .count();
            &common[..shared]
        })
        .unwrap_or("");

    text.split('\n')
        .map(|line| {
            if is_blank(line) {
                ""
            } else {
                &line[margin.len()..]
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Deserialize)]
struct PasteBody {
    data: String,
    #[serde(default)]
    syntax: Option<String>,
}

#[derive(Deserialize)]
struct CreatedPaste {
    id: String,
}

#[derive(Deserialize)]
struct CreateBody {
    pastes: Vec<CreatedPaste>,
}

/// Client for the MystBin API
#[derive(Debug, Clone)]
pub struct MystBinClient {
    transport: Arc<dyn Transport>,
    api_url: String,
    paste_url: String,
    timeout: Duration,
}

impl MystBinClient {
    pub fn new(transport: Arc<dyn Transport>, config: &MystBinConfig) -> Self {
        Self {
            transport,
            api_url: config.api_url.clone(),
            paste_url: config.paste_url.clone(),
            timeout: config.timeout(),
        }
    }

    /// Public URL of `paste`
    pub fn url_for(&self, paste: &MystBinPaste) -> String {
        paste.url(&self.paste_url)
    }

    /// Fetch a paste by id, dedenting its content
    #[instrument(skip(self))]
    pub async fn get_paste(&self, id: &str) -> Result<MystBinPaste, MystBinError> {
        let url = format!("{}/{id}", self.api_url);
        let response = self
            .transport
            .send(HttpRequest::get(url).with_timeout(self.timeout))
            .await?;

        if response.status == 404 {
            return Err(MystBinError::PasteNotFound(id.to_owned()));
        }
        if !response.is_success() {
            return Err(MystBinError::Http(response.describe()));
        }

        let body: PasteBody = response.json()?;
        Ok(MystBinPaste {
            id: id.to_owned(),
            content: dedent(&body.data),
            syntax: body.syntax,
        })
    }

    /// Upload `content` as a new paste
    #[instrument(skip(self, content), fields(bytes = content.len()))]
    pub async fn create_paste(
        &self,
        content: &str,
        syntax: Option<&str>,
    ) -> Result<MystBinPaste, MystBinError> {
        let meta = json!({ "meta": [{ "index": 0, "syntax": syntax }] });
        let form = vec![FormPart::text("data", content), FormPart::json("meta", &meta)];

        let response = self
            .transport
            .send(
                HttpRequest::post(&self.api_url, RequestBody::Multipart(form))
                    .with_timeout(self.timeout),
            )
            .await?;

        if !response.is_success() {
            return Err(MystBinError::Http(response.describe()));
        }

        let body: CreateBody = response.json()?;
        let id = body
            .pastes
            .into_iter()
            .next()
            .map(|paste| paste.id)
            .ok_or(MystBinError::MissingId)?;
        debug!(%id, "created paste");

        Ok(MystBinPaste {
            id,
            content: content.to_owned(),
            syntax: syntax.map(str::to_owned),
        })
    }
}

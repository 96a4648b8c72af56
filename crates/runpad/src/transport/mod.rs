//! HTTP boundary shared by every backend client
//!
//! Clients never talk to `reqwest` directly. They build an [`HttpRequest`],
//! hand it to a [`Transport`] and interpret the [`HttpResponse`]. This keeps
//! the protocol code independent of the network and lets tests substitute a
//! canned transport.

use std::fmt;
use std::string::FromUtf8Error;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;

pub use crate::transport::http::ReqwestTransport;

mod http;

/// Errors raised before a response status is available
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to build request: {0}")]
    Build(String),

    #[error("connection unavailable: {0}")]
    Unavailable(String),
}

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

/// One text part of a multipart form
#[derive(Debug, Clone, PartialEq)]
pub struct FormPart {
    pub name: String,
    pub value: String,
    /// MIME type of the part, `text/plain` when unset
    pub content_type: Option<String>,
}

impl FormPart {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            content_type: None,
        }
    }

    pub fn json(name: impl Into<String>, value: &serde_json::Value) -> Self {
        Self {
            name: name.into(),
            value: value.to_string(),
            content_type: Some("application/json".to_owned()),
        }
    }
}

/// Request body variants the backends need
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Bytes(Vec<u8>),
    Json(serde_json::Value),
    Multipart(Vec<FormPart>),
}

/// Outbound request
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub body: RequestBody,
    /// Overrides the transport's default timeout
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            body: RequestBody::Empty,
            timeout: None,
        }
    }

    pub fn post(url: impl Into<String>, body: RequestBody) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            body,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Response with the body fully read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Canonical reason phrase, empty when the status has none
    pub reason: String,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, reason: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            reason: reason.into(),
            body: body.into(),
        }
    }

    /// Check for a 2xx status
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as UTF-8
    pub fn text(&self) -> Result<String, FromUtf8Error> {
        String::from_utf8(self.body.clone())
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// `"<status> <reason>"`, followed by `": <body>"` when the body is non-empty
    pub fn describe(&self) -> String {
        let mut fmt = format!("{} {}", self.status, self.reason);
        let body = String::from_utf8_lossy(&self.body);
        if !body.is_empty() {
            fmt.push_str(": ");
            fmt.push_str(&body);
        }
        fmt
    }
}

/// Sends requests to the network (or anywhere else)
#[async_trait]
pub trait Transport: fmt::Debug + Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

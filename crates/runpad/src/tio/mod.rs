//! Client for the TIO (tio.run) execution service
//!
//! TIO does not speak JSON. Requests are a NUL-delimited field stream sent
//! as raw deflate, and responses are plain text with fixed-offset status
//! lines. See [`payload`] and [`response`] for the two formats.

use thiserror::Error;

pub use crate::tio::client::{RunOptions, TioClient};
pub use crate::tio::language::{
    AliasTable, DEFAULT_ALIASES, LanguageCatalog, MAX_SUGGESTIONS, resolve,
};
pub use crate::tio::payload::{CompressedPayload, EncodedPayload, ExecutionRequest, FieldValue};
pub use crate::tio::response::{ProtocolError, TOKEN_LEN};
use crate::transport::TransportError;

mod client;
pub mod language;
pub mod payload;
pub mod response;

/// Errors that occur while talking to TIO
#[derive(Debug, Error)]
pub enum TioError {
    #[error("{status}: {reason}")]
    Http { status: u16, reason: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("{}", unavailable_message(query, close_matches))]
    LanguageUnavailable {
        query: String,
        close_matches: Vec<String>,
    },

    #[error("malformed TIO response: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("failed to compress request: {0}")]
    Compression(#[source] std::io::Error),
}

fn unavailable_message(query: &str, close_matches: &[String]) -> String {
    let shown: String = query.chars().take(24).collect();
    let mut message = format!("Language `{shown}` is not available.");
    if !close_matches.is_empty() {
        let first = close_matches
            .iter()
            .take(3)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("`, `");
        message.push_str(&format!("\nDid you mean: `{first}`?"));
    }
    message
}

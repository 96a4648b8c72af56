//! Extracting source code from user input
//!
//! Input can be a fenced code block, a MystBin link, or bare code.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::mystbin::{MystBinClient, MystBinError};

static CODEBLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\s*```((?P<language>[a-zA-Z0-9]+)\s*\n)?(?P<code>.+)```")
        .expect("code block pattern should compile")
});

static PASTE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\Ahttps?://mystb\.in/(?P<id>[A-Za-z]{3,64})(\.(?P<syntax>[A-Za-z0-9]+))?/?\z")
        .expect("paste link pattern should compile")
});

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Please supply a block of code.")]
    Empty,

    #[error(transparent)]
    Paste(#[from] MystBinError),
}

/// Source code with its language tag, if one was given
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub language: Option<String>,
    pub code: String,
}

/// Classified user input, before any paste is fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceInput {
    /// Link to a MystBin paste
    Paste { id: String, syntax: Option<String> },
    /// Fenced code block
    Codeblock { language: Option<String>, code: String },
    /// Anything else, taken verbatim
    Plain(String),
}

impl SourceInput {
    /// Classify `input`
    pub fn parse(input: &str) -> Result<Self, SourceError> {
        if input.trim().is_empty() {
            return Err(SourceError::Empty);
        }

        if let Some(link) = Self::paste_link(input.trim()) {
            return Ok(link);
        }

        if let Some(captures) = CODEBLOCK.captures(input) {
            let language = captures.name("language").map(|m| m.as_str().to_owned());
            let code = captures
                .name("code")
                .map_or("", |m| m.as_str())
                .trim_matches('\n');

            // A link wrapped in a code block still points at a paste
            if let Some(link) = Self::paste_link(code.trim()) {
                return Ok(link);
            }

            return Ok(SourceInput::Codeblock {
                language,
                code: code.to_owned(),
            });
        }

        Ok(SourceInput::Plain(input.to_owned()))
    }

    fn paste_link(text: &str) -> Option<Self> {
        PASTE_LINK.captures(text).map(|captures| SourceInput::Paste {
            id: captures["id"].to_owned(),
            syntax: captures.name("syntax").map(|m| m.as_str().to_owned()),
        })
    }

    /// Produce the source, fetching the paste if the input links to one
    pub async fn resolve(self, mystbin: &MystBinClient) -> Result<Source, SourceError> {
        let source = match self {
            SourceInput::Paste { id, syntax } => {
                debug!(%id, "fetching source from paste");
                let paste = mystbin.get_paste(&id).await?;
                Source {
                    language: syntax.or(paste.syntax).filter(|s| !s.is_empty()),
                    code: paste.content,
                }
            }
            SourceInput::Codeblock { language, code } => Source { language, code },
            SourceInput::Plain(code) => Source {
                language: None,
                code,
            },
        };

        if source.code.trim().is_empty() {
            return Err(SourceError::Empty);
        }
        Ok(source)
    }
}

//! Rendering program output for chat display
//!
//! Short output is printed inline in a fenced code block. Anything longer
//! is uploaded to MystBin and replaced by a link.

use std::fmt;

use tracing::debug;

use crate::config::OutputConfig;
use crate::mystbin::{MystBinClient, MystBinError};

const FENCE: &str = "```";
const ESCAPED_FENCE: &str = "`\u{200b}``";

/// Break up code fences so output cannot close the surrounding block
pub fn sanitize(output: &str) -> String {
    output.replace(FENCE, ESCAPED_FENCE)
}

/// Check whether `output` can be printed inline under `limits`
pub fn fits_inline(output: &str, limits: &OutputConfig) -> bool {
    let chars = sanitize(output).chars().count();
    let lines = output.matches('\n').count();
    chars <= limits.max_chars && lines <= limits.max_lines
}

/// Rendered output, ready to display
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    /// Fenced code block holding the sanitised output
    Inline(String),
    /// Output was uploaded as a paste
    Paste { url: String },
}

impl fmt::Display for Rendered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rendered::Inline(block) => f.write_str(block),
            Rendered::Paste { url } => write!(f, "Output can be viewed at <{url}>"),
        }
    }
}

/// Render `output` inline, or as a paste when it exceeds `limits`
pub async fn render(
    output: &str,
    syntax: &str,
    limits: &OutputConfig,
    mystbin: &MystBinClient,
) -> Result<Rendered, MystBinError> {
    if fits_inline(output, limits) {
        return Ok(Rendered::Inline(format!(
            "{FENCE}{syntax}\n{}{FENCE}",
            sanitize(output)
        )));
    }

    debug!(chars = output.chars().count(), "output too long, uploading paste");
    let paste = mystbin.create_paste(output, Some(syntax)).await?;
    Ok(Rendered::Paste {
        url: mystbin.url_for(&paste),
    })
}

//! TIO response parsing
//!
//! A response body looks like this (`<token>` is 16 random characters):
//!
//! ```text
//! <token><program output>
//! <token>
//! Real time: 0.048 s
//! User time: 0.036 s
//! Sys. time: 0.012 s
//! CPU share: 98.53 %
//! Exit code: 0<token>
//! ```
//!
//! Status lines carry an 11 character label. Metric values are followed by
//! a 2 character unit suffix.

use thiserror::Error;
use tracing::warn;

use crate::types::ExecutionResult;

/// Length of the correlation token at both ends of the body
pub const TOKEN_LEN: usize = 16;
/// Width of the `Real time: ` style label
const LABEL_WIDTH: usize = 11;
/// Width of the ` s` / ` %` unit suffix
const UNIT_WIDTH: usize = 2;
/// Four metric lines and the exit code line
const STATUS_LINES: usize = 5;

const METRIC_NAMES: [&str; 4] = ["real time", "user time", "system time", "cpu share"];

/// Response body did not match the expected layout
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("response is {0} characters long, too short to hold both tokens")]
    Truncated(usize),

    #[error("response has {0} lines, expected at least 5 status lines")]
    MissingStatusLines(usize),

    #[error("malformed {name} line: {line:?}")]
    InvalidMetric { name: &'static str, line: String },

    #[error("response body is not valid UTF-8")]
    InvalidUtf8,
}

/// Byte offset of the `n`th character, or the string length when `n` is the char count
fn char_offset(s: &str, n: usize) -> Option<usize> {
    if n == 0 {
        return Some(0);
    }
    s.char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(s.len()))
        .nth(n)
}

/// Characters `[from..len - trim_end]` of `line`
fn char_slice(line: &str, from: usize, trim_end: usize) -> Option<&str> {
    let count = line.chars().count();
    let to = count.checked_sub(trim_end)?;
    if from > to {
        return None;
    }
    Some(&line[char_offset(line, from)?..char_offset(line, to)?])
}

fn parse_metric(name: &'static str, line: &str) -> Result<f64, ProtocolError> {
    char_slice(line, LABEL_WIDTH, UNIT_WIDTH)
        .and_then(|value| value.trim().parse().ok())
        .ok_or_else(|| ProtocolError::InvalidMetric {
            name,
            line: line.to_owned(),
        })
}

fn parse_exit_code(line: &str) -> i32 {
    let value = char_slice(line, LABEL_WIDTH, 0).unwrap_or_default();
    match value.trim().parse() {
        Ok(code) => code,
        Err(_) => {
            warn!(line, "unreadable exit code line, assuming exit code 0");
            0
        }
    }
}

/// Strip the separator token the backend prints between program output and
/// the status block
fn strip_separator(mut output: String, token: &str) -> String {
    if !token.is_empty()
        && let Some(at) = output.rfind(token)
    {
        output.replace_range(at..at + token.len(), "");
    }
    if output.ends_with('\n') {
        output.pop();
    }
    output
}

impl ExecutionResult {
    /// Parse the decoded body of a successful run response
    pub fn parse(raw: &str, language: &str) -> Result<Self, ProtocolError> {
        let count = raw.chars().count();
        if count < TOKEN_LEN * 2 {
            return Err(ProtocolError::Truncated(count));
        }

        let start = char_offset(raw, TOKEN_LEN).ok_or(ProtocolError::Truncated(count))?;
        let end = char_offset(raw, count - TOKEN_LEN).ok_or(ProtocolError::Truncated(count))?;
        let token = &raw[..start];
        let body = &raw[start..end];

        let lines: Vec<&str> = body.split('\n').collect();
        if lines.len() < STATUS_LINES {
            return Err(ProtocolError::MissingStatusLines(lines.len()));
        }

        let (output_lines, status) = lines.split_at(lines.len() - STATUS_LINES);

        let mut metrics = [0.0; 4];
        for ((slot, name), line) in metrics.iter_mut().zip(METRIC_NAMES).zip(status) {
            *slot = parse_metric(name, line)?;
        }
        let [real_time, user_time, sys_time, cpu_share] = metrics;
        let exit_code = parse_exit_code(status[STATUS_LINES - 1]);

        let output = strip_separator(output_lines.join("\n"), token);

        Ok(Self {
            language: language.to_owned(),
            token: token.to_owned(),
            output,
            real_time,
            user_time,
            sys_time,
            cpu_share,
            exit_code,
        })
    }

    /// Parse a raw response body, rejecting invalid UTF-8
    pub fn parse_bytes(raw: &[u8], language: &str) -> Result<Self, ProtocolError> {
        let text = std::str::from_utf8(raw).map_err(|_| ProtocolError::InvalidUtf8)?;
        Self::parse(text, language)
    }
}

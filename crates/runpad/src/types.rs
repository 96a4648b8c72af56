use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result of a TIO run
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    /// Canonical TIO language identifier the code ran under
    pub language: String,

    /// Opaque 16 character correlation token echoed by the backend
    pub token: String,

    /// Combined program output
    pub output: String,

    /// Wall clock time in seconds
    pub real_time: f64,

    /// User CPU time in seconds
    pub user_time: f64,

    /// System CPU time in seconds
    pub sys_time: f64,

    /// CPU share in percent
    pub cpu_share: f64,

    /// Exit code reported by the backend (0 when it was unreadable)
    pub exit_code: i32,
}

impl ExecutionResult {
    /// Check if the program exited with code 0
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.output)
    }
}

/// Error returned when parsing a Rust channel, edition or mode
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} '{value}', expected one of: {expected}")]
pub struct ParseChoiceError {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}

/// Release channel of the Rust toolchain on the playground
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RustChannel {
    Stable,
    Beta,
    #[default]
    Nightly,
}

impl RustChannel {
    pub const ALL: [RustChannel; 3] =
        [RustChannel::Stable, RustChannel::Beta, RustChannel::Nightly];

    pub fn as_str(&self) -> &'static str {
        match self {
            RustChannel::Stable => "stable",
            RustChannel::Beta => "beta",
            RustChannel::Nightly => "nightly",
        }
    }
}

/// Rust edition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RustEdition {
    #[serde(rename = "2015")]
    E2015,
    #[default]
    #[serde(rename = "2018")]
    E2018,
    #[serde(rename = "2021")]
    E2021,
}

impl RustEdition {
    pub const ALL: [RustEdition; 3] = [RustEdition::E2015, RustEdition::E2018, RustEdition::E2021];

    /// Edition year as the playground expects it
    pub fn as_str(&self) -> &'static str {
        match self {
            RustEdition::E2015 => "2015",
            RustEdition::E2018 => "2018",
            RustEdition::E2021 => "2021",
        }
    }
}

/// Build profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RustMode {
    #[default]
    Debug,
    Release,
}

impl RustMode {
    pub const ALL: [RustMode; 2] = [RustMode::Debug, RustMode::Release];

    pub fn as_str(&self) -> &'static str {
        match self {
            RustMode::Debug => "debug",
            RustMode::Release => "release",
        }
    }
}

macro_rules! choice_impls {
    ($ty:ty, $kind:literal, $expected:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ParseChoiceError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let lowered = s.trim().to_lowercase();
                <$ty>::ALL
                    .into_iter()
                    .find(|choice| choice.as_str() == lowered)
                    .ok_or_else(|| ParseChoiceError {
                        kind: $kind,
                        value: s.to_owned(),
                        expected: $expected,
                    })
            }
        }
    };
}

choice_impls!(RustChannel, "channel", "stable, beta, nightly");
choice_impls!(RustEdition, "edition", "2015, 2018, 2021");
choice_impls!(RustMode, "mode", "debug, release");

/// Channel, edition and mode for a playground run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlaygroundSettings {
    pub channel: RustChannel,
    pub edition: RustEdition,
    pub mode: RustMode,
}

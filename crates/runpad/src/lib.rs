//! Clients for remote code execution backends.
//!
//! Runpad speaks the TIO (tio.run) wire protocol and wraps the Piston API,
//! the Rust playground and the MystBin paste service behind one async API.
//!
//! # Features
//!
//! - **TIO protocol**: NUL-delimited request encoding, raw deflate compression and status-line response parsing.
//! - **Language resolution**: cached catalog lookup with an alias table and "did you mean" suggestions.
//! - **Piston and playground**: typed requests and responses for both JSON APIs.
//! - **Output handling**: inline rendering with a MystBin fallback for long output.
//! - **TOML configuration**: every endpoint and limit is configurable.
//! - **Pluggable transport**: all network I/O goes through the [`Transport`] trait.

pub use config::{Config, ConfigError, EXAMPLE_CONFIG};
pub use mystbin::{MystBinClient, MystBinError, MystBinPaste};
pub use output::{Rendered, render, sanitize};
pub use piston::{
    ExecuteOptions, Outcome, PistonClient, PistonError, PistonFile, PistonOutput, PistonResponse,
    PistonRuntime,
};
pub use playground::{FormatResponse, PlaygroundClient, PlaygroundError, PlaygroundResponse};
pub use settings::{
    FileSettingsStore, MemorySettingsStore, RustSettingsUpdate, SettingsEntry, SettingsError,
    SettingsStore,
};
pub use source::{Source, SourceError, SourceInput};
pub use tio::{RunOptions, TioClient, TioError};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError};
pub use types::{
    ExecutionResult, ParseChoiceError, PlaygroundSettings, RustChannel, RustEdition, RustMode,
};

pub mod config;
pub mod mystbin;
pub mod output;
pub mod piston;
pub mod playground;
pub mod settings;
pub mod source;
pub mod tio;
pub mod transport;
pub mod types;

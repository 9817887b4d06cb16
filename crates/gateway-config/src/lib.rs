#![allow(clippy::must_use_candidate)]

pub mod auth;
pub mod bedrock;
mod duration;
mod env;
pub mod llm;
mod loader;
pub mod server;
pub mod telemetry;

use serde::Deserialize;

pub use auth::*;
pub use bedrock::*;
pub use llm::*;
pub use server::*;
pub use telemetry::{OtlpExporter, OtlpProtocol, TelemetryConfig, TraceSettings};

/// Top-level gateway configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// API key authentication
    #[serde(default)]
    pub auth: AuthConfig,
    /// Bedrock runtime connection
    #[serde(default)]
    pub bedrock: BedrockConfig,
    /// Model table, defaults and invocation policy
    #[serde(default)]
    pub llm: LlmConfig,
    /// Span export and payload logging
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}

use std::time::Duration;

use indexmap::IndexMap;
use serde::Deserialize;

/// Model table, defaults and invocation policy
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    /// Chat model used when a request leaves `model` empty
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Embedding model used when a request leaves `model` empty
    #[serde(default = "default_embedding_model")]
    pub default_embedding_model: String,
    /// What to do with OpenAI parameters a model family cannot express
    #[serde(default)]
    pub unsupported_parameters: ParameterPolicy,
    /// Download `http(s)` image URLs and inline them as base64
    #[serde(default = "default_fetch_remote_images")]
    pub fetch_remote_images: bool,
    #[serde(default)]
    pub retry: RetryConfig,
    /// Additional or overriding model table entries keyed by model id
    #[serde(default)]
    pub models: IndexMap<String, ModelEntryConfig>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            default_embedding_model: default_embedding_model(),
            unsupported_parameters: ParameterPolicy::default(),
            fetch_remote_images: default_fetch_remote_images(),
            retry: RetryConfig::default(),
            models: IndexMap::new(),
        }
    }
}

/// Handling of request parameters without a native equivalent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterPolicy {
    /// Log and omit the parameter
    #[default]
    Drop,
    /// Fail the request with a 400
    Reject,
}

/// Retry policy for transport failures
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts, the first one included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry, doubled for each further one
    #[serde(default = "default_backoff", deserialize_with = "crate::duration::deserialize")]
    pub backoff: Duration,
    /// Retry-After reported on throttling when Bedrock does not send one
    #[serde(default = "default_throttle_retry_after", deserialize_with = "crate::duration::deserialize")]
    pub throttle_retry_after: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff: default_backoff(),
            throttle_retry_after: default_throttle_retry_after(),
        }
    }
}

/// One entry of the model table
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelEntryConfig {
    /// Native request schema the model speaks
    pub provider: ProviderFamily,
    /// Display name returned by the model listing
    #[serde(default)]
    pub name: Option<String>,
    /// Geos with an inference profile for this model, in preference order
    #[serde(default)]
    pub cross_region: Vec<String>,
}

/// Native Bedrock request/response schema of a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderFamily {
    /// Anthropic Claude 2.x and Instant, messages API without tool use
    Claude,
    /// Anthropic Claude 3 and later, messages API with tool use
    Claude3,
    /// Meta Llama 2 chat
    Llama2,
    /// Meta Llama 3 instruct
    Llama3,
    /// Mistral and Mixtral instruct
    Mistral,
    /// Cohere Command R
    CohereCommand,
    /// Custom model import (Llama-style generation body)
    CustomImport,
    /// Cohere Embed v3
    CohereEmbed,
    /// Amazon Titan text embeddings
    TitanEmbed,
}

/// Endpoint family a model can serve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Chat,
    Embedding,
}

impl ProviderFamily {
    pub const fn capability(self) -> Capability {
        match self {
            Self::CohereEmbed | Self::TitanEmbed => Capability::Embedding,
            _ => Capability::Chat,
        }
    }
}

fn default_model() -> String {
    "anthropic.claude-3-sonnet-20240229-v1:0".to_owned()
}

fn default_embedding_model() -> String {
    "cohere.embed-multilingual-v3".to_owned()
}

const fn default_fetch_remote_images() -> bool {
    true
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_backoff() -> Duration {
    Duration::from_millis(200)
}

const fn default_throttle_retry_after() -> Duration {
    Duration::from_secs(1)
}

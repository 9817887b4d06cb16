//! Wire format types for the inbound `OpenAI` API and the native Bedrock schemas
//!
//! Each module holds plain serde structs matching one JSON format. They are
//! only used at the boundary; translation goes through the canonical types.

pub mod anthropic;
pub mod cohere;
pub mod meta;
pub mod mistral;
pub mod openai;
pub mod titan;

/// Usage block Bedrock appends to the last chunk of every response stream
#[derive(Debug, Clone, Copy, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationMetrics {
    pub input_token_count: u32,
    pub output_token_count: u32,
}

/// Key under which [`InvocationMetrics`] appear in a chunk
pub const INVOCATION_METRICS: &str = "amazon-bedrock-invocationMetrics";

//! Cohere Command R chat and Cohere Embed formats

use serde::{Deserialize, Serialize};

// -- Command R --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohereChatRequest {
    /// Latest user turn
    pub message: String,
    pub chat_history: Vec<CohereHistoryEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preamble: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
}

/// Earlier turn with role `USER` or `CHATBOT`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohereHistoryEntry {
    pub role: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CohereChatResponse {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub meta: Option<CohereMeta>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CohereMeta {
    #[serde(default)]
    pub billed_units: Option<CohereBilledUnits>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct CohereBilledUnits {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

/// Stream chunk; `stream-end` carries the finish reason and the full response
#[derive(Debug, Clone, Deserialize)]
pub struct CohereStreamChunk {
    #[serde(default)]
    pub event_type: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub response: Option<CohereChatResponse>,
}

// -- Embed --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohereEmbedRequest {
    pub texts: Vec<String>,
    pub input_type: String,
    pub truncate: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CohereEmbedResponse {
    pub embeddings: Vec<Vec<f32>>,
}

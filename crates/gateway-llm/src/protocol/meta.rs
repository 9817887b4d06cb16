//! Prompt-completion format shared by Llama and custom imported models

use serde::{Deserialize, Serialize};

/// Llama request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlamaRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_gen_len: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
}

/// Custom imported model request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportedModelRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub stop: Vec<String>,
}

/// Response body, and the shape of every stream chunk
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerationChunk {
    #[serde(default)]
    pub generation: Option<String>,
    #[serde(default)]
    pub prompt_token_count: Option<u32>,
    #[serde(default)]
    pub generation_token_count: Option<u32>,
    #[serde(default)]
    pub stop_reason: Option<String>,
}

//! Mistral and Mixtral text completion format

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MistralRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

/// Response body and stream chunk
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MistralResponse {
    #[serde(default)]
    pub outputs: Vec<MistralOutput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MistralOutput {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub stop_reason: Option<String>,
}

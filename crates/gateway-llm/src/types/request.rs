use super::message::Message;
use super::tool::{ToolChoice, ToolDefinition};

/// Sampling and output parameters exactly as the client sent them
///
/// Codecs read only what their family maps; the parameter policy clears or
/// rejects the rest before encoding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionParams {
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    /// `max_completion_tokens` wins over the legacy `max_tokens`
    pub max_tokens: Option<u32>,
    pub stop: Option<Vec<String>>,
    pub frequency_penalty: Option<f64>,
    pub presence_penalty: Option<f64>,
    pub seed: Option<u64>,
    pub n: Option<u32>,
    pub logprobs: Option<bool>,
    pub response_format: Option<serde_json::Value>,
    /// Never forwarded
    pub user: Option<String>,
}

/// A chat completion request after decoding and validation
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Empty selects the configured default model
    pub model: String,
    /// Never empty
    pub messages: Vec<Message>,
    pub params: CompletionParams,
    pub tools: Option<Vec<ToolDefinition>>,
    pub tool_choice: Option<ToolChoice>,
    pub stream: bool,
    /// Emit a usage chunk before the stream terminator
    pub include_usage: bool,
}

impl CompletionRequest {
    /// At least one tool is offered
    pub fn uses_tools(&self) -> bool {
        self.tools.as_ref().is_some_and(|tools| !tools.is_empty())
    }
}

use super::message::ToolCall;

/// Why generation ended, in `OpenAI` vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
}

impl FinishReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Length => "length",
            Self::ToolCalls => "tool_calls",
            Self::ContentFilter => "content_filter",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub const fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// What one non-streaming invocation produced
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: FinishReason,
    pub usage: Usage,
}

/// A finished chat completion, always a single choice
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    /// `chatcmpl-` followed by the request id
    pub id: String,
    /// Model id as the client asked for it
    pub model: String,
    /// Unix seconds
    pub created: u64,
    pub generation: Generation,
}

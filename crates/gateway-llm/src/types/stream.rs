use super::response::{FinishReason, Usage};

/// One decoded unit of a response stream
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Text, a tool call fragment or the finish reason
    Delta(StreamDelta),
    /// Token counts for the whole request
    Usage(Usage),
    /// Terminator, rendered as `[DONE]`
    Done,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamDelta {
    pub content: Option<String>,
    pub tool_call: Option<StreamToolCall>,
    /// Set on the last delta of a stream only
    pub finish_reason: Option<FinishReason>,
}

impl StreamDelta {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn finish(reason: FinishReason) -> Self {
        Self {
            finish_reason: Some(reason),
            ..Self::default()
        }
    }

    pub const fn tool_call(call: StreamToolCall) -> Self {
        Self {
            content: None,
            tool_call: Some(call),
            finish_reason: None,
        }
    }
}

/// Fragment of the tool call at `index`
///
/// The first fragment of a call carries its id and function name; later ones
/// only append argument text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamToolCall {
    pub index: u32,
    pub id: Option<String>,
    pub function: Option<StreamFunctionCall>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFunctionCall {
    pub name: Option<String>,
    /// Partial JSON to append
    pub arguments: Option<String>,
}

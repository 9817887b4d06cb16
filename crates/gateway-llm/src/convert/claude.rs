//! Anthropic Claude models via the Bedrock messages format

use serde_json::Value;

use super::{ChatCodec, Param, StreamDecoder, from_native, invocation_metrics, reject_tools, to_native};
use crate::error::LlmError;
use crate::images::parse_data_uri;
use crate::protocol::anthropic::{
    ANTHROPIC_VERSION, ClaudeContentBlock, ClaudeImageSource, ClaudeMessage, ClaudeRequest, ClaudeResponse,
    ClaudeResponseBlock, ClaudeStreamBlock, ClaudeStreamDelta, ClaudeStreamEvent, ClaudeTool, ClaudeToolChoice,
};
use crate::types::{
    CompletionRequest, Content, ContentPart, FinishReason, Generation, Message, Role, StreamDelta, StreamEvent,
    StreamFunctionCall, StreamToolCall, ToolCall, ToolChoice, ToolDefinition, Usage,
};

/// Bedrock requires `max_tokens` for Claude
const DEFAULT_MAX_TOKENS: u32 = 2048;

const PARAMS: &[Param] = &[Param::Temperature, Param::TopP, Param::MaxTokens, Param::Stop];

/// Codec for Claude; only Claude 3 and later take tool definitions and images
#[derive(Debug, Clone, Copy)]
pub(crate) struct ClaudeCodec {
    pub native_tools: bool,
}

impl ChatCodec for ClaudeCodec {
    fn supported_params(&self) -> &'static [Param] {
        PARAMS
    }

    fn encode(&self, request: &CompletionRequest) -> Result<Value, LlmError> {
        if !self.native_tools {
            reject_tools(request)?;
            if request.messages.iter().any(|m| m.content.has_images()) {
                return Err(LlmError::UnsupportedContent(format!(
                    "model {} only accepts text content",
                    request.model
                )));
            }
        }

        let mut system: Vec<String> = Vec::new();
        let mut messages: Vec<ClaudeMessage> = Vec::new();

        for message in &request.messages {
            if message.role == Role::System {
                system.push(message.content.as_text());
                continue;
            }
            let converted = convert_message(message)?;
            match messages.last_mut() {
                Some(previous) if previous.role == converted.role => previous.content.extend(converted.content),
                _ => messages.push(converted),
            }
        }

        let offer_tools = self.native_tools
            && request.uses_tools()
            && request.tool_choice != Some(ToolChoice::None);

        let tools = if offer_tools {
            request.tools.as_ref().map(|tools| tools.iter().map(convert_tool).collect())
        } else {
            None
        };
        let tool_choice = if offer_tools {
            request.tool_choice.as_ref().and_then(convert_tool_choice)
        } else {
            None
        };

        to_native(&ClaudeRequest {
            anthropic_version: ANTHROPIC_VERSION.to_owned(),
            max_tokens: request.params.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system: (!system.is_empty()).then(|| system.join("\n")),
            messages,
            temperature: request.params.temperature,
            top_p: request.params.top_p,
            stop_sequences: request.params.stop.clone().filter(|stop| !stop.is_empty()),
            tools,
            tool_choice,
        })
    }

    fn decode(&self, body: Value) -> Result<Generation, LlmError> {
        let metrics = invocation_metrics(&body);
        let response: ClaudeResponse = from_native(body, "claude response")?;

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        for block in response.content {
            match block {
                ClaudeResponseBlock::Text { text: part } => text.push_str(&part),
                ClaudeResponseBlock::ToolUse { id, name, input } => tool_calls.push(ToolCall {
                    id,
                    name,
                    arguments: input.to_string(),
                }),
                ClaudeResponseBlock::Other => {}
            }
        }

        let content = if text.is_empty() && !tool_calls.is_empty() {
            None
        } else {
            Some(text)
        };

        Ok(Generation {
            content,
            tool_calls,
            finish_reason: finish_reason(response.stop_reason.as_deref()),
            usage: metrics.unwrap_or_else(|| Usage::new(response.usage.input_tokens, response.usage.output_tokens)),
        })
    }

    fn stream_decoder(&self) -> Box<dyn StreamDecoder> {
        Box::new(ClaudeStreamDecoder::default())
    }
}

fn finish_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("max_tokens") => FinishReason::Length,
        Some("tool_use") => FinishReason::ToolCalls,
        _ => FinishReason::Stop,
    }
}

fn convert_message(message: &Message) -> Result<ClaudeMessage, LlmError> {
    if message.role == Role::Tool {
        let tool_use_id = message
            .tool_call_id
            .clone()
            .ok_or_else(|| LlmError::InvalidRequest("tool messages require tool_call_id".to_owned()))?;
        return Ok(ClaudeMessage {
            role: "user".to_owned(),
            content: vec![ClaudeContentBlock::ToolResult {
                tool_use_id,
                content: message.content.as_text(),
            }],
        });
    }

    let mut content = match &message.content {
        Content::Text(text) if text.is_empty() => Vec::new(),
        Content::Text(text) => vec![ClaudeContentBlock::Text { text: text.clone() }],
        Content::Parts(parts) => parts.iter().map(convert_part).collect::<Result<Vec<_>, _>>()?,
    };

    for call in message.tool_calls.iter().flatten() {
        let input: Value = serde_json::from_str(&call.arguments).map_err(|e| {
            LlmError::InvalidRequest(format!("tool call {} has invalid JSON arguments: {e}", call.id))
        })?;
        content.push(ClaudeContentBlock::ToolUse {
            id: call.id.clone(),
            name: call.name.clone(),
            input,
        });
    }

    let role = if message.role == Role::Assistant { "assistant" } else { "user" };

    Ok(ClaudeMessage {
        role: role.to_owned(),
        content,
    })
}

fn convert_part(part: &ContentPart) -> Result<ClaudeContentBlock, LlmError> {
    match part {
        ContentPart::Text { text } => Ok(ClaudeContentBlock::Text { text: text.clone() }),
        ContentPart::Image { url, .. } => {
            let (media_type, data) = parse_data_uri(url).ok_or_else(|| {
                LlmError::UnsupportedContent("images must be base64 data URIs for this model".to_owned())
            })?;
            Ok(ClaudeContentBlock::Image {
                source: ClaudeImageSource {
                    source_type: "base64".to_owned(),
                    media_type: media_type.to_owned(),
                    data: data.to_owned(),
                },
            })
        }
    }
}

fn convert_tool(tool: &ToolDefinition) -> ClaudeTool {
    ClaudeTool {
        name: tool.name.clone(),
        description: tool.description.clone(),
        input_schema: tool
            .parameters
            .clone()
            .unwrap_or_else(|| serde_json::json!({"type": "object", "properties": {}})),
    }
}

fn convert_tool_choice(choice: &ToolChoice) -> Option<ClaudeToolChoice> {
    let (choice_type, name) = match choice {
        ToolChoice::None => return None,
        ToolChoice::Auto => ("auto", None),
        ToolChoice::Required => ("any", None),
        ToolChoice::Function(name) => ("tool", Some(name.clone())),
    };
    Some(ClaudeToolChoice {
        choice_type: choice_type.to_owned(),
        name,
    })
}

/// Tracks token counts and tool call numbering across stream events
#[derive(Debug, Default)]
struct ClaudeStreamDecoder {
    input_tokens: u32,
    output_tokens: u32,
    /// Position of the tool call currently streaming in `tool_calls`
    current_tool_call: u32,
    tool_calls_seen: u32,
}

impl StreamDecoder for ClaudeStreamDecoder {
    fn decode_chunk(&mut self, chunk: Value) -> Result<Vec<StreamEvent>, LlmError> {
        let metrics = invocation_metrics(&chunk);
        let event: ClaudeStreamEvent = from_native(chunk, "claude stream event")?;

        let events = match event {
            ClaudeStreamEvent::MessageStart { message } => {
                if let Some(usage) = message.usage {
                    self.input_tokens = usage.input_tokens;
                    self.output_tokens = usage.output_tokens;
                }
                Vec::new()
            }
            ClaudeStreamEvent::ContentBlockStart {
                content_block: ClaudeStreamBlock::Text { text },
                ..
            } if !text.is_empty() => vec![StreamEvent::Delta(StreamDelta::text(text))],
            ClaudeStreamEvent::ContentBlockStart {
                content_block: ClaudeStreamBlock::ToolUse { id, name },
                ..
            } => {
                // Block indices count text blocks too; tool calls are numbered separately
                self.current_tool_call = self.tool_calls_seen;
                self.tool_calls_seen += 1;
                vec![StreamEvent::Delta(StreamDelta::tool_call(StreamToolCall {
                    index: self.current_tool_call,
                    id: Some(id),
                    function: Some(StreamFunctionCall {
                        name: Some(name),
                        arguments: Some(String::new()),
                    }),
                }))]
            }
            ClaudeStreamEvent::ContentBlockDelta {
                delta: ClaudeStreamDelta::TextDelta { text },
                ..
            } => vec![StreamEvent::Delta(StreamDelta::text(text))],
            ClaudeStreamEvent::ContentBlockDelta {
                delta: ClaudeStreamDelta::InputJsonDelta { partial_json },
                ..
            } => vec![StreamEvent::Delta(StreamDelta::tool_call(StreamToolCall {
                index: self.current_tool_call,
                id: None,
                function: Some(StreamFunctionCall {
                    name: None,
                    arguments: Some(partial_json),
                }),
            }))],
            ClaudeStreamEvent::MessageDelta { delta, usage } => {
                if let Some(usage) = usage {
                    self.output_tokens = usage.output_tokens;
                }
                delta
                    .stop_reason
                    .map(|reason| StreamEvent::Delta(StreamDelta::finish(finish_reason(Some(&reason)))))
                    .into_iter()
                    .collect()
            }
            ClaudeStreamEvent::MessageStop => {
                let usage = metrics.unwrap_or_else(|| Usage::new(self.input_tokens, self.output_tokens));
                vec![StreamEvent::Usage(usage)]
            }
            ClaudeStreamEvent::ContentBlockStart { .. }
            | ClaudeStreamEvent::ContentBlockDelta { .. }
            | ClaudeStreamEvent::ContentBlockStop { .. }
            | ClaudeStreamEvent::Ping
            | ClaudeStreamEvent::Other => Vec::new(),
        };

        Ok(events)
    }
}

//! Conversion between canonical types and the `OpenAI` wire format

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use gateway_core::HttpError;

use crate::error::LlmError;
use crate::protocol::openai::{
    OpenAiChoice, OpenAiChoiceMessage, OpenAiContent, OpenAiContentPart, OpenAiEmbedding, OpenAiEmbeddingResponse,
    OpenAiEmbeddingUsage, OpenAiEmbeddingVector, OpenAiErrorDetail, OpenAiErrorResponse, OpenAiFunctionCall,
    OpenAiMessage, OpenAiRequest, OpenAiResponse, OpenAiStreamChoice, OpenAiStreamChunk, OpenAiStreamDelta,
    OpenAiStreamFunctionCall, OpenAiStreamToolCall, OpenAiTool, OpenAiToolCall, OpenAiUsage,
};
use crate::types::{
    CompletionParams, CompletionRequest, CompletionResponse, Content, ContentPart, EncodingFormat, Message, Role,
    StreamDelta, ToolCall, ToolChoice, ToolDefinition, Usage,
};

// -- Inbound: OpenAI wire format -> canonical types --

impl TryFrom<OpenAiRequest> for CompletionRequest {
    type Error = LlmError;

    fn try_from(req: OpenAiRequest) -> Result<Self, Self::Error> {
        if req.messages.is_empty() {
            return Err(LlmError::InvalidRequest("messages must contain at least one message".to_owned()));
        }

        let messages = req
            .messages
            .into_iter()
            .map(Message::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let tool_choice = req.tool_choice.map(|value| parse_tool_choice(&value)).transpose()?;

        Ok(Self {
            model: req.model,
            messages,
            params: CompletionParams {
                temperature: req.temperature,
                top_p: req.top_p,
                max_tokens: req.max_completion_tokens.or(req.max_tokens),
                stop: req.stop.map(crate::protocol::openai::OpenAiStop::into_vec),
                frequency_penalty: req.frequency_penalty,
                presence_penalty: req.presence_penalty,
                seed: req.seed,
                n: req.n,
                logprobs: req.logprobs,
                response_format: req.response_format,
                user: req.user,
            },
            tools: req.tools.map(|tools| tools.into_iter().map(Into::into).collect()),
            tool_choice,
            stream: req.stream.unwrap_or(false),
            include_usage: req.stream_options.is_some_and(|options| options.include_usage),
        })
    }
}

impl TryFrom<OpenAiMessage> for Message {
    type Error = LlmError;

    fn try_from(msg: OpenAiMessage) -> Result<Self, Self::Error> {
        let role = match msg.role.as_str() {
            "system" | "developer" => Role::System,
            "user" => Role::User,
            "assistant" => Role::Assistant,
            "tool" => Role::Tool,
            other => return Err(LlmError::InvalidRequest(format!("unknown message role '{other}'"))),
        };

        let content = match msg.content {
            Some(OpenAiContent::Text(text)) => Content::Text(text),
            Some(OpenAiContent::Parts(parts)) => Content::Parts(
                parts
                    .into_iter()
                    .map(ContentPart::try_from)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            None => Content::Text(String::new()),
        };

        let tool_calls = msg.tool_calls.map(|calls| {
            calls
                .into_iter()
                .map(|call| ToolCall {
                    id: call.id,
                    name: call.function.name,
                    arguments: call.function.arguments,
                })
                .collect()
        });

        Ok(Self {
            role,
            content,
            tool_calls,
            tool_call_id: msg.tool_call_id,
        })
    }
}

impl TryFrom<OpenAiContentPart> for ContentPart {
    type Error = LlmError;

    fn try_from(part: OpenAiContentPart) -> Result<Self, Self::Error> {
        match part {
            OpenAiContentPart::Text { text } => Ok(Self::Text { text }),
            OpenAiContentPart::ImageUrl { image_url } => Ok(Self::Image {
                url: image_url.url,
                detail: image_url.detail,
            }),
            OpenAiContentPart::Unsupported => Err(LlmError::UnsupportedContent(
                "only text and image_url content parts are supported".to_owned(),
            )),
        }
    }
}

impl From<OpenAiTool> for ToolDefinition {
    fn from(tool: OpenAiTool) -> Self {
        Self {
            name: tool.function.name,
            description: tool.function.description,
            parameters: tool.function.parameters,
        }
    }
}

/// `"none"`, `"auto"`, `"required"` or `{"type": "function", "function": {"name": ...}}`
fn parse_tool_choice(value: &serde_json::Value) -> Result<ToolChoice, LlmError> {
    let choice = match value {
        serde_json::Value::String(mode) => match mode.as_str() {
            "none" => Some(ToolChoice::None),
            "auto" => Some(ToolChoice::Auto),
            "required" => Some(ToolChoice::Required),
            _ => None,
        },
        serde_json::Value::Object(object) => object
            .get("function")
            .and_then(|function| function.get("name"))
            .and_then(serde_json::Value::as_str)
            .map(|name| ToolChoice::Function(name.to_owned())),
        _ => None,
    };

    choice.ok_or_else(|| LlmError::InvalidRequest(format!("invalid tool_choice: {value}")))
}

// -- Outbound: canonical types -> OpenAI wire format --

impl From<CompletionResponse> for OpenAiResponse {
    fn from(response: CompletionResponse) -> Self {
        let generation = response.generation;
        let tool_calls = if generation.tool_calls.is_empty() {
            None
        } else {
            Some(generation.tool_calls.into_iter().map(Into::into).collect())
        };

        Self {
            id: response.id,
            object: "chat.completion".to_owned(),
            created: response.created,
            model: response.model,
            choices: vec![OpenAiChoice {
                index: 0,
                message: OpenAiChoiceMessage {
                    role: Role::Assistant.as_str().to_owned(),
                    content: generation.content,
                    tool_calls,
                },
                finish_reason: Some(generation.finish_reason.as_str().to_owned()),
            }],
            usage: Some(generation.usage.into()),
        }
    }
}

impl From<ToolCall> for OpenAiToolCall {
    fn from(call: ToolCall) -> Self {
        Self {
            id: call.id,
            tool_type: "function".to_owned(),
            function: OpenAiFunctionCall {
                name: call.name,
                arguments: call.arguments,
            },
        }
    }
}

impl From<Usage> for OpenAiUsage {
    fn from(usage: Usage) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}

// -- Stream chunks --

/// Identity shared by every chunk of one response stream
#[derive(Debug, Clone)]
pub struct ChunkHeader {
    pub id: String,
    pub model: String,
    pub created: u64,
}

impl ChunkHeader {
    fn chunk(&self, choices: Vec<OpenAiStreamChoice>, usage: Option<OpenAiUsage>) -> OpenAiStreamChunk {
        OpenAiStreamChunk {
            id: self.id.clone(),
            object: "chat.completion.chunk".to_owned(),
            created: self.created,
            model: self.model.clone(),
            choices,
            usage,
        }
    }

    /// Chunk carrying one delta; `first` adds the assistant role
    pub fn delta(&self, delta: &StreamDelta, first: bool) -> OpenAiStreamChunk {
        let tool_calls = delta.tool_call.as_ref().map(|call| {
            vec![OpenAiStreamToolCall {
                index: call.index,
                id: call.id.clone(),
                tool_type: call.id.as_ref().map(|_| "function".to_owned()),
                function: call.function.as_ref().map(|function| OpenAiStreamFunctionCall {
                    name: function.name.clone(),
                    arguments: function.arguments.clone(),
                }),
            }]
        });

        self.chunk(
            vec![OpenAiStreamChoice {
                index: 0,
                delta: OpenAiStreamDelta {
                    role: first.then(|| "assistant".to_owned()),
                    content: delta.content.clone(),
                    tool_calls,
                },
                finish_reason: delta.finish_reason.map(|reason| reason.as_str().to_owned()),
            }],
            None,
        )
    }

    /// Trailing usage chunk with an empty `choices` array
    pub fn usage(&self, usage: Usage) -> OpenAiStreamChunk {
        self.chunk(Vec::new(), Some(usage.into()))
    }
}

// -- Embeddings --

/// Build the embeddings response, encoding vectors as requested
pub fn embedding_response(
    vectors: Vec<Vec<f32>>,
    model: String,
    prompt_tokens: u32,
    format: EncodingFormat,
) -> OpenAiEmbeddingResponse {
    let data = vectors
        .into_iter()
        .enumerate()
        .map(|(index, vector)| OpenAiEmbedding {
            object: "embedding".to_owned(),
            embedding: match format {
                EncodingFormat::Float => OpenAiEmbeddingVector::Float(vector),
                EncodingFormat::Base64 => OpenAiEmbeddingVector::Base64(encode_vector(&vector)),
            },
            index,
        })
        .collect();

    OpenAiEmbeddingResponse {
        object: "list".to_owned(),
        data,
        model,
        usage: OpenAiEmbeddingUsage {
            prompt_tokens,
            total_tokens: prompt_tokens,
        },
    }
}

// -- Errors --

/// Error body shared by every endpoint and by terminal stream events
pub fn error_body<E: HttpError + ?Sized>(error: &E) -> OpenAiErrorResponse {
    OpenAiErrorResponse {
        error: OpenAiErrorDetail {
            kind: error.kind().to_owned(),
            message: error.client_message(),
            error_type: error.error_type().to_owned(),
            code: Some(error.status_code().as_u16()),
        },
    }
}

/// Base64 of the vector's little-endian `f32` bytes
fn encode_vector(vector: &[f32]) -> String {
    let bytes: Vec<u8> = vector.iter().flat_map(|value| value.to_le_bytes()).collect();
    STANDARD.encode(bytes)
}

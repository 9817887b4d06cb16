//! Canonical request/response types shared by every provider family
//!
//! Inbound `OpenAI` requests are converted into these types once; each
//! provider codec then encodes from and decodes into them.

pub mod embedding;
pub mod message;
pub mod request;
pub mod response;
pub mod stream;
pub mod tool;

pub use embedding::{EmbeddingInput, EmbeddingRequest, EncodingFormat};
pub use message::{Content, ContentPart, Message, Role, ToolCall};
pub use request::{CompletionParams, CompletionRequest};
pub use response::{CompletionResponse, FinishReason, Generation, Usage};
pub use stream::{StreamDelta, StreamEvent, StreamFunctionCall, StreamToolCall};
pub use tool::{ToolChoice, ToolDefinition};

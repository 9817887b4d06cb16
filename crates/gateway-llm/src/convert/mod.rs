//! Translation between canonical types and native Bedrock payloads
//!
//! Every chat family implements [`ChatCodec`]; every embedding family an
//! [`EmbeddingCodec`]. Codecs are stateless and shared, stream decoding state
//! lives in the per-request [`StreamDecoder`].

mod claude;
mod cohere;
mod custom;
mod embedding;
mod llama;
mod mistral;
pub mod openai;
pub mod params;
mod prompt;

use gateway_config::ProviderFamily;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use embedding::{EmbeddingCodec, EmbeddingOutput, embedding_codec};
pub use params::Param;

use crate::error::LlmError;
use crate::protocol::{INVOCATION_METRICS, InvocationMetrics};
use crate::types::{CompletionRequest, FinishReason, Generation, StreamEvent, Usage};

/// Encoder and decoder for one chat provider family
pub trait ChatCodec: Send + Sync {
    /// Parameters this family maps into its native body
    fn supported_params(&self) -> &'static [Param];

    /// Build the native request body
    fn encode(&self, request: &CompletionRequest) -> Result<Value, LlmError>;

    /// Decode a complete native response body
    fn decode(&self, body: Value) -> Result<Generation, LlmError>;

    /// Fresh decoder for one response stream
    fn stream_decoder(&self) -> Box<dyn StreamDecoder>;
}

/// Stateful per-stream translator of native chunks
///
/// Decoders emit content and finish reasons as separate deltas, and usage as
/// [`StreamEvent::Usage`]. The end of the stream is signalled by the backend,
/// never by the decoder.
pub trait StreamDecoder: Send {
    fn decode_chunk(&mut self, chunk: Value) -> Result<Vec<StreamEvent>, LlmError>;
}

/// Codec for a chat family, `None` for embedding families
pub fn chat_codec(family: ProviderFamily) -> Option<&'static dyn ChatCodec> {
    match family {
        ProviderFamily::Claude => Some(&claude::ClaudeCodec { native_tools: false }),
        ProviderFamily::Claude3 => Some(&claude::ClaudeCodec { native_tools: true }),
        ProviderFamily::Llama2 => Some(&llama::LlamaCodec::V2),
        ProviderFamily::Llama3 => Some(&llama::LlamaCodec::V3),
        ProviderFamily::Mistral => Some(&mistral::MistralCodec),
        ProviderFamily::CohereCommand => Some(&cohere::CohereCommandCodec),
        ProviderFamily::CustomImport => Some(&custom::CustomImportCodec),
        ProviderFamily::CohereEmbed | ProviderFamily::TitanEmbed => None,
    }
}

/// Usage reported under `amazon-bedrock-invocationMetrics`, if present
pub fn invocation_metrics(chunk: &Value) -> Option<Usage> {
    let metrics = chunk.get(INVOCATION_METRICS)?;
    let metrics: InvocationMetrics = serde_json::from_value(metrics.clone()).ok()?;
    Some(Usage::new(metrics.input_token_count, metrics.output_token_count))
}

/// Deserialize a native document, reporting shape mismatches as internal errors
pub(crate) fn from_native<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, LlmError> {
    serde_json::from_value(value).map_err(|e| LlmError::Internal(anyhow::anyhow!("malformed {what}: {e}")))
}

/// Finish reason for the stop strings of prompt-completion families
pub(crate) fn text_finish_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("length" | "max_tokens") => FinishReason::Length,
        _ => FinishReason::Stop,
    }
}

/// Serialize a native request body
pub(crate) fn to_native<T: serde::Serialize>(body: &T) -> Result<Value, LlmError> {
    serde_json::to_value(body).map_err(|e| LlmError::Internal(e.into()))
}

/// Reject tools and tool messages for families without tool support
pub(crate) fn reject_tools(request: &CompletionRequest) -> Result<(), LlmError> {
    use crate::types::Role;

    let has_tool_messages = request
        .messages
        .iter()
        .any(|m| m.role == Role::Tool || m.tool_calls.is_some());
    if request.uses_tools() {
        return Err(LlmError::UnsupportedFeature {
            feature: "tool use".to_owned(),
            model: request.model.clone(),
        });
    }
    if has_tool_messages {
        return Err(LlmError::UnsupportedFeature {
            feature: "tool messages".to_owned(),
            model: request.model.clone(),
        });
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn every_chat_family_has_a_codec() {
        for family in [
            ProviderFamily::Claude,
            ProviderFamily::Claude3,
            ProviderFamily::Llama2,
            ProviderFamily::Llama3,
            ProviderFamily::Mistral,
            ProviderFamily::CohereCommand,
            ProviderFamily::CustomImport,
        ] {
            assert!(chat_codec(family).is_some(), "{family:?}");
        }
        assert!(chat_codec(ProviderFamily::TitanEmbed).is_none());
        assert!(chat_codec(ProviderFamily::CohereEmbed).is_none());
    }

    #[test]
    fn invocation_metrics_are_read_from_the_last_chunk() {
        let chunk = json!({
            "type": "message_stop",
            "amazon-bedrock-invocationMetrics": {
                "inputTokenCount": 12,
                "outputTokenCount": 30,
                "invocationLatency": 900,
                "firstByteLatency": 300
            }
        });
        assert_eq!(invocation_metrics(&chunk), Some(Usage::new(12, 30)));
        assert_eq!(invocation_metrics(&json!({"type": "ping"})), None);
    }

    #[test]
    fn unknown_stop_strings_finish_normally() {
        assert_eq!(text_finish_reason(Some("length")), FinishReason::Length);
        assert_eq!(text_finish_reason(Some("stop")), FinishReason::Stop);
        assert_eq!(text_finish_reason(Some("something-new")), FinishReason::Stop);
        assert_eq!(text_finish_reason(None), FinishReason::Stop);
    }
}

//! Cohere Command R chat models

use serde_json::Value;

use super::{ChatCodec, Param, StreamDecoder, from_native, invocation_metrics, prompt, reject_tools, to_native};
use crate::error::LlmError;
use crate::protocol::cohere::{CohereChatRequest, CohereChatResponse, CohereHistoryEntry, CohereStreamChunk};
use crate::types::{CompletionRequest, FinishReason, Generation, Role, StreamDelta, StreamEvent, Usage};

const PARAMS: &[Param] = &[Param::Temperature, Param::TopP, Param::MaxTokens, Param::Stop];

#[derive(Debug, Clone, Copy)]
pub(crate) struct CohereCommandCodec;

impl ChatCodec for CohereCommandCodec {
    fn supported_params(&self) -> &'static [Param] {
        PARAMS
    }

    fn encode(&self, request: &CompletionRequest) -> Result<Value, LlmError> {
        reject_tools(request)?;

        let Some((last, earlier)) = request.messages.split_last() else {
            return Err(LlmError::InvalidRequest("messages must not be empty".to_owned()));
        };
        if last.role != Role::User {
            return Err(LlmError::InvalidRequest(
                "the last message must be a user message for this model".to_owned(),
            ));
        }

        let mut preamble: Vec<String> = Vec::new();
        let mut chat_history = Vec::with_capacity(earlier.len());
        for message in earlier {
            let text = prompt::text_of(message, &request.model)?;
            match message.role {
                Role::System => preamble.push(text),
                Role::User => chat_history.push(CohereHistoryEntry {
                    role: "USER".to_owned(),
                    message: text,
                }),
                Role::Assistant | Role::Tool => chat_history.push(CohereHistoryEntry {
                    role: "CHATBOT".to_owned(),
                    message: text,
                }),
            }
        }

        to_native(&CohereChatRequest {
            message: prompt::text_of(last, &request.model)?,
            chat_history,
            preamble: (!preamble.is_empty()).then(|| preamble.join("\n")),
            max_tokens: request.params.max_tokens,
            temperature: request.params.temperature,
            p: request.params.top_p,
            stop_sequences: request.params.stop.clone().filter(|stop| !stop.is_empty()),
        })
    }

    fn decode(&self, body: Value) -> Result<Generation, LlmError> {
        let metrics = invocation_metrics(&body);
        let response: CohereChatResponse = from_native(body, "cohere response")?;

        Ok(Generation {
            finish_reason: finish_reason(response.finish_reason.as_deref()),
            usage: metrics.unwrap_or_else(|| billed_usage(&response)),
            content: Some(response.text),
            tool_calls: Vec::new(),
        })
    }

    fn stream_decoder(&self) -> Box<dyn StreamDecoder> {
        Box::new(CohereStreamDecoder)
    }
}

fn finish_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("MAX_TOKENS") => FinishReason::Length,
        Some("ERROR_TOXIC") => FinishReason::ContentFilter,
        _ => FinishReason::Stop,
    }
}

fn billed_usage(response: &CohereChatResponse) -> Usage {
    let billed = response
        .meta
        .as_ref()
        .and_then(|meta| meta.billed_units)
        .unwrap_or_default();
    Usage::new(billed.input_tokens, billed.output_tokens)
}

struct CohereStreamDecoder;

impl StreamDecoder for CohereStreamDecoder {
    fn decode_chunk(&mut self, chunk: Value) -> Result<Vec<StreamEvent>, LlmError> {
        let metrics = invocation_metrics(&chunk);
        let chunk: CohereStreamChunk = from_native(chunk, "cohere chunk")?;
        let mut events = Vec::new();

        match chunk.event_type.as_str() {
            "text-generation" => {
                if let Some(text) = chunk.text.filter(|text| !text.is_empty()) {
                    events.push(StreamEvent::Delta(StreamDelta::text(text)));
                }
            }
            "stream-end" => {
                events.push(StreamEvent::Delta(StreamDelta::finish(finish_reason(
                    chunk.finish_reason.as_deref(),
                ))));
                let usage = metrics.or_else(|| chunk.response.as_ref().map(billed_usage));
                if let Some(usage) = usage {
                    events.push(StreamEvent::Usage(usage));
                }
            }
            // stream-start, search and citation events carry no text
            _ => {}
        }

        Ok(events)
    }
}

//! Meta Llama 2 and Llama 3 instruct models

use serde_json::Value;

use super::{
    ChatCodec, Param, StreamDecoder, from_native, invocation_metrics, prompt, reject_tools, text_finish_reason,
    to_native,
};
use crate::error::LlmError;
use crate::protocol::meta::{GenerationChunk, LlamaRequest};
use crate::types::{CompletionRequest, Generation, StreamDelta, StreamEvent, Usage};

const PARAMS: &[Param] = &[Param::Temperature, Param::TopP, Param::MaxTokens];

#[derive(Debug, Clone, Copy)]
pub(crate) enum LlamaCodec {
    V2,
    V3,
}

impl ChatCodec for LlamaCodec {
    fn supported_params(&self) -> &'static [Param] {
        PARAMS
    }

    fn encode(&self, request: &CompletionRequest) -> Result<Value, LlmError> {
        reject_tools(request)?;
        let prompt = match self {
            Self::V2 => prompt::instruct(request, true)?,
            Self::V3 => prompt::llama3(request)?,
        };
        to_native(&LlamaRequest {
            prompt,
            max_gen_len: request.params.max_tokens,
            temperature: request.params.temperature,
            top_p: request.params.top_p,
        })
    }

    fn decode(&self, body: Value) -> Result<Generation, LlmError> {
        decode_generation(body, "llama response")
    }

    fn stream_decoder(&self) -> Box<dyn StreamDecoder> {
        Box::new(GenerationStreamDecoder::default())
    }
}

/// Decode a `{generation, stop_reason, ...}` document
pub(crate) fn decode_generation(body: Value, what: &str) -> Result<Generation, LlmError> {
    let metrics = invocation_metrics(&body);
    let chunk: GenerationChunk = from_native(body, what)?;
    let usage = metrics.unwrap_or_else(|| {
        Usage::new(
            chunk.prompt_token_count.unwrap_or_default(),
            chunk.generation_token_count.unwrap_or_default(),
        )
    });

    Ok(Generation {
        content: Some(chunk.generation.unwrap_or_default()),
        tool_calls: Vec::new(),
        finish_reason: text_finish_reason(chunk.stop_reason.as_deref()),
        usage,
    })
}

/// Stream decoder for `{generation, stop_reason}` chunks
#[derive(Debug, Default)]
pub(crate) struct GenerationStreamDecoder {
    prompt_tokens: u32,
    generation_tokens: u32,
}

impl StreamDecoder for GenerationStreamDecoder {
    fn decode_chunk(&mut self, chunk: Value) -> Result<Vec<StreamEvent>, LlmError> {
        let metrics = invocation_metrics(&chunk);
        let chunk: GenerationChunk = from_native(chunk, "generation chunk")?;
        let mut events = Vec::new();

        if let Some(count) = chunk.prompt_token_count {
            self.prompt_tokens = count;
        }
        if let Some(count) = chunk.generation_token_count {
            self.generation_tokens = count;
        }
        if let Some(text) = chunk.generation.filter(|text| !text.is_empty()) {
            events.push(StreamEvent::Delta(StreamDelta::text(text)));
        }
        if let Some(reason) = chunk.stop_reason {
            events.push(StreamEvent::Delta(StreamDelta::finish(text_finish_reason(Some(&reason)))));
            let usage = metrics.unwrap_or_else(|| Usage::new(self.prompt_tokens, self.generation_tokens));
            events.push(StreamEvent::Usage(usage));
        } else if let Some(usage) = metrics {
            events.push(StreamEvent::Usage(usage));
        }

        Ok(events)
    }
}

//! Models brought in through Bedrock custom model import

use serde_json::Value;

use super::llama::{GenerationStreamDecoder, decode_generation};
use super::{ChatCodec, Param, StreamDecoder, prompt, reject_tools, to_native};
use crate::error::LlmError;
use crate::protocol::meta::ImportedModelRequest;
use crate::types::{CompletionRequest, Generation};

const PARAMS: &[Param] = &[Param::Temperature, Param::TopP, Param::MaxTokens, Param::Stop];

const DEFAULT_MAX_TOKENS: u32 = 512;
const DEFAULT_TEMPERATURE: f64 = 0.5;
const DEFAULT_TOP_P: f64 = 0.9;
const TOP_K: u32 = 200;

#[derive(Debug, Clone, Copy)]
pub(crate) struct CustomImportCodec;

impl ChatCodec for CustomImportCodec {
    fn supported_params(&self) -> &'static [Param] {
        PARAMS
    }

    fn encode(&self, request: &CompletionRequest) -> Result<Value, LlmError> {
        reject_tools(request)?;
        let params = &request.params;
        to_native(&ImportedModelRequest {
            prompt: prompt::role_tagged(request)?,
            max_tokens: params.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: params.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            top_p: params.top_p.unwrap_or(DEFAULT_TOP_P),
            top_k: TOP_K,
            stop: params.stop.clone().unwrap_or_default(),
        })
    }

    fn decode(&self, body: Value) -> Result<Generation, LlmError> {
        decode_generation(body, "imported model response")
    }

    fn stream_decoder(&self) -> Box<dyn StreamDecoder> {
        Box::new(GenerationStreamDecoder::default())
    }
}

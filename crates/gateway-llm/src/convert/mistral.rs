//! Mistral and Mixtral instruct models

use serde_json::Value;

use super::{
    ChatCodec, Param, StreamDecoder, from_native, invocation_metrics, prompt, reject_tools, text_finish_reason,
    to_native,
};
use crate::error::LlmError;
use crate::protocol::mistral::{MistralRequest, MistralResponse};
use crate::types::{CompletionRequest, Generation, StreamDelta, StreamEvent};

const PARAMS: &[Param] = &[Param::Temperature, Param::TopP, Param::MaxTokens, Param::Stop];

#[derive(Debug, Clone, Copy)]
pub(crate) struct MistralCodec;

impl ChatCodec for MistralCodec {
    fn supported_params(&self) -> &'static [Param] {
        PARAMS
    }

    fn encode(&self, request: &CompletionRequest) -> Result<Value, LlmError> {
        reject_tools(request)?;
        to_native(&MistralRequest {
            prompt: prompt::instruct(request, false)?,
            max_tokens: request.params.max_tokens,
            temperature: request.params.temperature,
            top_p: request.params.top_p,
            stop: request.params.stop.clone().filter(|stop| !stop.is_empty()),
        })
    }

    fn decode(&self, body: Value) -> Result<Generation, LlmError> {
        // Mistral reports no token counts of its own
        let usage = invocation_metrics(&body).unwrap_or_default();
        let response: MistralResponse = from_native(body, "mistral response")?;
        let output = response.outputs.into_iter().next().unwrap_or_default();

        Ok(Generation {
            content: Some(output.text),
            tool_calls: Vec::new(),
            finish_reason: text_finish_reason(output.stop_reason.as_deref()),
            usage,
        })
    }

    fn stream_decoder(&self) -> Box<dyn StreamDecoder> {
        Box::new(MistralStreamDecoder)
    }
}

struct MistralStreamDecoder;

impl StreamDecoder for MistralStreamDecoder {
    fn decode_chunk(&mut self, chunk: Value) -> Result<Vec<StreamEvent>, LlmError> {
        let metrics = invocation_metrics(&chunk);
        let response: MistralResponse = from_native(chunk, "mistral chunk")?;
        let mut events = Vec::new();

        for output in response.outputs {
            if !output.text.is_empty() {
                events.push(StreamEvent::Delta(StreamDelta::text(output.text)));
            }
            if let Some(reason) = output.stop_reason {
                events.push(StreamEvent::Delta(StreamDelta::finish(text_finish_reason(Some(&reason)))));
            }
        }
        if let Some(usage) = metrics {
            events.push(StreamEvent::Usage(usage));
        }

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::convert::test_support::{message, request, streamed_text};
    use crate::types::{FinishReason, Role, Usage};

    #[test]
    fn encodes_prompt_and_stop_sequences() {
        let mut req = request(vec![message(Role::System, "Be brief."), message(Role::User, "Hi")]);
        req.params.stop = Some(vec!["###".to_owned()]);
        req.params.max_tokens = Some(100);

        let body = MistralCodec.encode(&req).unwrap();

        assert_eq!(
            body,
            json!({
                "prompt": "<s>[INST] \nBe brief.\nHi [/INST] ",
                "max_tokens": 100,
                "stop": ["###"]
            })
        );
    }

    #[test]
    fn decodes_first_output_without_usage() {
        let generation = MistralCodec
            .decode(json!({"outputs": [{"text": "Bonjour", "stop_reason": "length"}]}))
            .unwrap();

        assert_eq!(generation.content.as_deref(), Some("Bonjour"));
        assert_eq!(generation.finish_reason, FinishReason::Length);
        assert_eq!(generation.usage, Usage::default());
    }

    #[test]
    fn stream_reassembles_to_the_full_text() {
        let full = MistralCodec
            .decode(json!({"outputs": [{"text": "Bonjour le monde", "stop_reason": "stop"}]}))
            .unwrap();

        let mut decoder = MistralCodec.stream_decoder();
        let mut events = Vec::new();
        for chunk in [
            json!({"outputs": [{"text": "Bonjour", "stop_reason": null}]}),
            json!({"outputs": [{"text": " le monde", "stop_reason": null}]}),
            json!({
                "outputs": [{"text": "", "stop_reason": "stop"}],
                "amazon-bedrock-invocationMetrics": {"inputTokenCount": 11, "outputTokenCount": 4}
            }),
        ] {
            events.extend(decoder.decode_chunk(chunk).unwrap());
        }

        assert_eq!(Some(streamed_text(&events)), full.content);
        assert!(events.contains(&StreamEvent::Delta(StreamDelta::finish(FinishReason::Stop))));
        assert_eq!(events.last(), Some(&StreamEvent::Usage(Usage::new(11, 4))));
    }
}

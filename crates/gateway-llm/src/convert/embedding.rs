//! Cohere Embed and Titan Embeddings codecs

use std::sync::OnceLock;

use gateway_config::ProviderFamily;
use serde_json::Value;
use tiktoken_rs::CoreBPE;

use super::{from_native, to_native};
use crate::error::LlmError;
use crate::protocol::cohere::{CohereEmbedRequest, CohereEmbedResponse};
use crate::protocol::titan::{TitanEmbedRequest, TitanEmbedResponse};
use crate::types::EmbeddingInput;

/// Vectors in input order plus the prompt tokens Bedrock counted
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingOutput {
    pub vectors: Vec<Vec<f32>>,
    pub prompt_tokens: u32,
}

/// Encoder and decoder for one embedding provider family
pub trait EmbeddingCodec: Send + Sync {
    /// Largest number of inputs one invocation accepts
    fn max_batch(&self) -> usize;

    fn encode(&self, texts: &[String]) -> Result<Value, LlmError>;

    fn decode(&self, body: Value) -> Result<EmbeddingOutput, LlmError>;

    /// Turn the request input into texts and enforce the batch limit
    fn prepare(&self, input: EmbeddingInput) -> Result<Vec<String>, LlmError> {
        let texts = input_texts(input)?;
        if texts.is_empty() {
            return Err(LlmError::InvalidRequest("input must not be empty".to_owned()));
        }
        if texts.len() > self.max_batch() {
            return Err(LlmError::BatchTooLarge {
                limit: self.max_batch(),
                got: texts.len(),
            });
        }
        Ok(texts)
    }
}

/// Codec for an embedding family, `None` for chat families
pub fn embedding_codec(family: ProviderFamily) -> Option<&'static dyn EmbeddingCodec> {
    match family {
        ProviderFamily::CohereEmbed => Some(&CohereEmbedCodec),
        ProviderFamily::TitanEmbed => Some(&TitanEmbedCodec),
        _ => None,
    }
}

/// Texts of an embedding input, decoding token ids with `cl100k_base`
fn input_texts(input: EmbeddingInput) -> Result<Vec<String>, LlmError> {
    match input {
        EmbeddingInput::Text(text) => Ok(vec![text]),
        EmbeddingInput::Texts(texts) => Ok(texts),
        EmbeddingInput::Tokens(tokens) => Ok(vec![detokenize(tokens)?]),
        EmbeddingInput::TokenBatches(batches) => batches.into_iter().map(detokenize).collect(),
    }
}

fn detokenize(tokens: Vec<u32>) -> Result<String, LlmError> {
    static ENCODER: OnceLock<CoreBPE> = OnceLock::new();

    let encoder = match ENCODER.get() {
        Some(encoder) => encoder,
        None => {
            let loaded = tiktoken_rs::cl100k_base().map_err(LlmError::Internal)?;
            ENCODER.get_or_init(|| loaded)
        }
    };

    encoder
        .decode(tokens)
        .map_err(|e| LlmError::InvalidRequest(format!("input tokens are not valid cl100k_base ids: {e}")))
}

struct CohereEmbedCodec;

/// Cohere accepts at most 96 texts per call
const COHERE_MAX_BATCH: usize = 96;

impl EmbeddingCodec for CohereEmbedCodec {
    fn max_batch(&self) -> usize {
        COHERE_MAX_BATCH
    }

    fn encode(&self, texts: &[String]) -> Result<Value, LlmError> {
        to_native(&CohereEmbedRequest {
            texts: texts.to_vec(),
            input_type: "search_document".to_owned(),
            truncate: "END".to_owned(),
        })
    }

    fn decode(&self, body: Value) -> Result<EmbeddingOutput, LlmError> {
        let response: CohereEmbedResponse = from_native(body, "cohere embed response")?;
        // Cohere Embed reports no token counts
        Ok(EmbeddingOutput {
            vectors: response.embeddings,
            prompt_tokens: 0,
        })
    }
}

struct TitanEmbedCodec;

impl EmbeddingCodec for TitanEmbedCodec {
    fn max_batch(&self) -> usize {
        1
    }

    fn encode(&self, texts: &[String]) -> Result<Value, LlmError> {
        let [text] = texts else {
            return Err(LlmError::BatchTooLarge {
                limit: 1,
                got: texts.len(),
            });
        };
        to_native(&TitanEmbedRequest {
            input_text: text.clone(),
        })
    }

    fn decode(&self, body: Value) -> Result<EmbeddingOutput, LlmError> {
        let response: TitanEmbedResponse = from_native(body, "titan embed response")?;
        Ok(EmbeddingOutput {
            vectors: vec![response.embedding],
            prompt_tokens: response.input_text_token_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn texts(count: usize) -> EmbeddingInput {
        EmbeddingInput::Texts((0..count).map(|i| format!("text {i}")).collect())
    }

    fn cohere() -> &'static dyn EmbeddingCodec {
        embedding_codec(ProviderFamily::CohereEmbed).unwrap()
    }

    fn titan() -> &'static dyn EmbeddingCodec {
        embedding_codec(ProviderFamily::TitanEmbed).unwrap()
    }

    #[test]
    fn cohere_accepts_exactly_96_inputs() {
        assert_eq!(cohere().prepare(texts(96)).unwrap().len(), 96);

        let err = cohere().prepare(texts(97)).unwrap_err();
        assert!(matches!(err, LlmError::BatchTooLarge { limit: 96, got: 97 }));
    }

    #[test]
    fn titan_accepts_a_single_input() {
        assert_eq!(titan().prepare(texts(1)).unwrap(), vec!["text 0".to_owned()]);

        let err = titan().prepare(texts(2)).unwrap_err();
        assert!(matches!(err, LlmError::BatchTooLarge { limit: 1, got: 2 }));
    }

    #[test]
    fn empty_input_is_invalid() {
        assert!(matches!(cohere().prepare(texts(0)), Err(LlmError::InvalidRequest(_))));
    }

    #[test]
    fn token_inputs_are_decoded_with_cl100k() {
        // "hello world" in cl100k_base
        let prepared = cohere().prepare(EmbeddingInput::Tokens(vec![15339, 1917])).unwrap();
        assert_eq!(prepared, vec!["hello world".to_owned()]);

        let batches = cohere()
            .prepare(EmbeddingInput::TokenBatches(vec![vec![15339], vec![1917]]))
            .unwrap();
        assert_eq!(batches, vec!["hello".to_owned(), " world".to_owned()]);
    }

    #[test]
    fn encodes_native_bodies() {
        let input = vec!["hi".to_owned()];

        assert_eq!(
            cohere().encode(&input).unwrap(),
            json!({"texts": ["hi"], "input_type": "search_document", "truncate": "END"})
        );
        assert_eq!(titan().encode(&input).unwrap(), json!({"inputText": "hi"}));
    }

    #[test]
    fn decodes_native_responses() {
        let cohere_output = cohere()
            .decode(json!({"id": "e", "embeddings": [[0.5, -0.25], [1.0, 0.0]], "texts": ["a", "b"]}))
            .unwrap();
        assert_eq!(cohere_output.vectors, vec![vec![0.5, -0.25], vec![1.0, 0.0]]);
        assert_eq!(cohere_output.prompt_tokens, 0);

        let titan_output = titan()
            .decode(json!({"embedding": [0.125, 0.5], "inputTextTokenCount": 4}))
            .unwrap();
        assert_eq!(
            titan_output,
            EmbeddingOutput {
                vectors: vec![vec![0.125, 0.5]],
                prompt_tokens: 4,
            }
        );
    }
}

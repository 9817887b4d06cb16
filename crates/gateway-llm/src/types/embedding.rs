use serde::Deserialize;

/// Embedding input in any of the shapes `OpenAI` accepts
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EmbeddingInput {
    Text(String),
    Texts(Vec<String>),
    /// One input given as `cl100k_base` token ids
    Tokens(Vec<u32>),
    /// Several inputs given as `cl100k_base` token ids
    TokenBatches(Vec<Vec<u32>>),
}

impl EmbeddingInput {
    /// Number of separate inputs in the batch
    pub fn len(&self) -> usize {
        match self {
            Self::Text(_) | Self::Tokens(_) => 1,
            Self::Texts(texts) => texts.len(),
            Self::TokenBatches(batches) => batches.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Wire encoding of returned vectors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingFormat {
    #[default]
    Float,
    /// Little-endian `f32` bytes, base64 encoded
    Base64,
}

/// Embedding request following the `OpenAI` API format
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingRequest {
    pub input: EmbeddingInput,
    /// Requested model id, empty for the configured default
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub encoding_format: EncodingFormat,
    /// Output size; no supported Bedrock model accepts it
    #[serde(default)]
    pub dimensions: Option<u32>,
    #[serde(default)]
    pub user: Option<String>,
}

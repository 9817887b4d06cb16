//! Invocation of native payloads against Bedrock

mod bedrock;

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::Stream;
use serde_json::Value;
use thiserror::Error;

pub use bedrock::BedrockBackend;

use crate::error::LlmError;
use crate::resolver::ModelRoute;

/// Native response chunks in arrival order; dropping it cancels the invocation
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Value, InvokeError>> + Send>>;

/// Failure of one invocation, classified for retry and status mapping
#[derive(Debug, Clone, Error)]
pub enum InvokeError {
    /// Connection-level failure; `retryable` when nothing reached Bedrock
    #[error("{message}")]
    Transport { message: String, retryable: bool },

    /// Throttling or exhausted service quota
    #[error("throttled, retry after {}ms", .retry_after.as_millis())]
    Throttled { retry_after: Duration },

    /// Bedrock rejected the payload or the model id
    #[error("{0}")]
    Validation(String),

    /// Bedrock or the model failed while serving
    #[error("{0}")]
    Internal(String),

    /// Response body was not valid JSON
    #[error("undecodable response: {0}")]
    Decode(String),
}

impl From<InvokeError> for LlmError {
    fn from(error: InvokeError) -> Self {
        match error {
            InvokeError::Transport { message, retryable } => Self::Transport { message, retryable },
            InvokeError::Throttled { retry_after } => Self::Throttled { retry_after },
            InvokeError::Validation(message) => Self::BackendValidation(message),
            InvokeError::Internal(message) => Self::BackendInternal(message),
            InvokeError::Decode(message) => Self::Internal(anyhow::anyhow!("undecodable bedrock response: {message}")),
        }
    }
}

/// Synchronous and streaming model invocation
#[async_trait]
pub trait InvocationBackend: Send + Sync {
    /// Invoke the route's model and return the full response document
    async fn invoke(&self, route: &ModelRoute, payload: Value) -> Result<Value, InvokeError>;

    /// Invoke the route's model with a response stream
    ///
    /// Errors before the first chunk are returned directly; later failures
    /// arrive as an `Err` item that ends the stream.
    async fn invoke_stream(&self, route: &ModelRoute, payload: Value) -> Result<ChunkStream, InvokeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoke_errors_map_to_gateway_errors() {
        let transport: LlmError = InvokeError::Transport {
            message: "connection reset".to_owned(),
            retryable: true,
        }
        .into();
        assert!(transport.is_retryable());

        let throttled: LlmError = InvokeError::Throttled {
            retry_after: Duration::from_secs(2),
        }
        .into();
        assert_eq!(throttled.retry_after(), Some(Duration::from_secs(2)));

        assert!(matches!(
            LlmError::from(InvokeError::Validation("bad".to_owned())),
            LlmError::BackendValidation(_)
        ));
        assert!(matches!(
            LlmError::from(InvokeError::Internal("boom".to_owned())),
            LlmError::BackendInternal(_)
        ));
        assert!(matches!(
            LlmError::from(InvokeError::Decode("eof".to_owned())),
            LlmError::Internal(_)
        ));
    }
}

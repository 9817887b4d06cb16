use std::time::Duration;

use gateway_core::HttpError;
use http::StatusCode;
use thiserror::Error;

/// Errors that can occur while serving a chat or embedding request
#[derive(Debug, Error)]
pub enum LlmError {
    /// Requested model is not in the model table and is not a fully-qualified id
    #[error("model not found: {model}")]
    ModelNotFound { model: String },

    /// Client sent a malformed or invalid request
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A message part the target model cannot accept
    #[error("unsupported content: {0}")]
    UnsupportedContent(String),

    /// A capability (tool use, tool messages) the target model lacks
    #[error("{feature} is not supported by model {model}")]
    UnsupportedFeature { feature: String, model: String },

    /// An `OpenAI` parameter with no native equivalent under the reject policy
    #[error("parameter '{parameter}' is not supported by model {model}")]
    UnsupportedParameter { parameter: String, model: String },

    /// Embedding input exceeds the provider's batch limit
    #[error("embedding batch of {got} inputs exceeds the limit of {limit} for this model")]
    BatchTooLarge { limit: usize, got: usize },

    /// Connection-level failure talking to Bedrock
    #[error("bedrock transport error: {message}")]
    Transport { message: String, retryable: bool },

    /// Bedrock throttled the request
    #[error("bedrock throttled the request")]
    Throttled { retry_after: Duration },

    /// Bedrock rejected the payload
    #[error("bedrock rejected the request: {0}")]
    BackendValidation(String),

    /// Bedrock failed while serving the request
    #[error("bedrock error: {0}")]
    BackendInternal(String),

    /// The request exceeded its time budget
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// A response stream failed after it had started
    #[error("stream terminated early: {0}")]
    StreamTerminatedEarly(String),

    /// Unexpected internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl LlmError {
    /// Whether a fresh attempt of the same invocation may succeed
    ///
    /// Only connection failures that happened before anything was sent qualify;
    /// throttling is surfaced to the client with its retry hint instead.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { retryable: true, .. })
    }

    /// Suggested client backoff, for throttling errors
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Throttled { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

impl HttpError for LlmError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ModelNotFound { .. } => StatusCode::NOT_FOUND,
            Self::InvalidRequest(_)
            | Self::UnsupportedContent(_)
            | Self::UnsupportedFeature { .. }
            | Self::UnsupportedParameter { .. }
            | Self::BatchTooLarge { .. }
            | Self::BackendValidation(_) => StatusCode::BAD_REQUEST,
            Self::Throttled { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Transport { .. } | Self::BackendInternal(_) | Self::StreamTerminatedEarly(_) => {
                StatusCode::BAD_GATEWAY
            }
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::ModelNotFound { .. } => "not_found_error",
            Self::InvalidRequest(_)
            | Self::UnsupportedContent(_)
            | Self::UnsupportedFeature { .. }
            | Self::UnsupportedParameter { .. }
            | Self::BatchTooLarge { .. }
            | Self::BackendValidation(_) => "invalid_request_error",
            Self::Throttled { .. } => "rate_limit_error",
            Self::Timeout(_) => "timeout_error",
            Self::Transport { .. } | Self::BackendInternal(_) | Self::StreamTerminatedEarly(_) => "upstream_error",
            Self::Internal(_) => "internal_error",
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::ModelNotFound { .. } => "ModelNotFound",
            Self::InvalidRequest(_) => "InvalidRequest",
            Self::UnsupportedContent(_) => "UnsupportedContent",
            Self::UnsupportedFeature { .. } => "UnsupportedFeature",
            Self::UnsupportedParameter { .. } => "UnsupportedParameter",
            Self::BatchTooLarge { .. } => "BatchTooLarge",
            Self::Transport { retryable: true, .. } => "RetryableTransport",
            Self::Transport { retryable: false, .. } => "FatalTransport",
            Self::Throttled { .. } => "BackendThrottled",
            Self::BackendValidation(_) => "BackendValidationRejected",
            Self::BackendInternal(_) => "BackendInternalError",
            Self::Timeout(_) => "Timeout",
            Self::StreamTerminatedEarly(_) => "StreamTerminatedEarly",
            Self::Internal(_) => "Internal",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Internal(_) => "an internal error occurred".to_owned(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pre_send_transport_errors_are_retryable() {
        let retryable = LlmError::Transport {
            message: "connection refused".to_owned(),
            retryable: true,
        };
        let fatal = LlmError::Transport {
            message: "connection reset".to_owned(),
            retryable: false,
        };
        let throttled = LlmError::Throttled {
            retry_after: Duration::from_secs(2),
        };

        assert!(retryable.is_retryable());
        assert!(!fatal.is_retryable());
        assert!(!throttled.is_retryable());
        assert_eq!(throttled.retry_after(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn translation_errors_are_client_errors() {
        let errors = [
            LlmError::UnsupportedContent("image".to_owned()),
            LlmError::UnsupportedFeature {
                feature: "tool use".to_owned(),
                model: "meta.llama3-8b-instruct-v1:0".to_owned(),
            },
            LlmError::BatchTooLarge { limit: 96, got: 97 },
            LlmError::BackendValidation("bad body".to_owned()),
        ];

        for error in errors {
            assert_eq!(error.status_code(), StatusCode::BAD_REQUEST, "{error}");
        }
    }

    #[test]
    fn kinds_are_stable() {
        assert_eq!(
            LlmError::ModelNotFound {
                model: "x".to_owned()
            }
            .kind(),
            "ModelNotFound"
        );
        assert_eq!(
            LlmError::Transport {
                message: String::new(),
                retryable: false
            }
            .kind(),
            "FatalTransport"
        );
        assert_eq!(LlmError::Timeout(Duration::from_secs(1)).kind(), "Timeout");
    }

    #[test]
    fn internal_details_are_hidden_from_clients() {
        let error = LlmError::Internal(anyhow::anyhow!("secret stack detail"));
        assert_eq!(error.client_message(), "an internal error occurred");
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

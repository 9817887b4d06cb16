use std::time::Duration;

use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_sdk_bedrockruntime::Client as BedrockClient;
use aws_sdk_bedrockruntime::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_bedrockruntime::types::ResponseStream;
use aws_smithy_runtime_api::client::orchestrator::HttpResponse;
use aws_smithy_types::Blob;
use aws_smithy_types::error::display::DisplayErrorContext;
use gateway_config::BedrockConfig;
use secrecy::ExposeSecret;
use serde_json::Value;

use super::{ChunkStream, InvocationBackend, InvokeError};
use crate::resolver::ModelRoute;

const JSON: &str = "application/json";

/// Bedrock Runtime client speaking the native `InvokeModel` APIs
pub struct BedrockBackend {
    client: BedrockClient,
    throttle_retry_after: Duration,
}

impl BedrockBackend {
    /// Build a client for the configured region and credentials
    ///
    /// Static credentials are used when both halves are configured, otherwise
    /// the AWS default provider chain applies. SDK-level retries are disabled.
    pub async fn new(config: &BedrockConfig, throttle_retry_after: Duration) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .retry_config(RetryConfig::disabled());

        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint.as_str());
        }

        if let (Some(access_key), Some(secret_key)) = (&config.access_key_id, &config.secret_access_key) {
            let credentials = aws_credential_types::Credentials::new(
                access_key.expose_secret(),
                secret_key.expose_secret(),
                None,
                None,
                "bedrock-gateway-config",
            );
            loader = loader.credentials_provider(credentials);
        }

        let sdk_config = loader.load().await;

        Self {
            client: BedrockClient::new(&sdk_config),
            throttle_retry_after,
        }
    }

    fn classify<E, R>(&self, error: SdkError<E, R>, retry_after: impl FnOnce(&R) -> Option<Duration>) -> InvokeError
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
        R: std::fmt::Debug,
    {
        match error {
            SdkError::ServiceError(context) => {
                let message = context
                    .err()
                    .message()
                    .map_or_else(|| DisplayErrorContext(context.err()).to_string(), str::to_owned);

                match ServiceFault::from_code(context.err().code()) {
                    ServiceFault::Throttled => InvokeError::Throttled {
                        retry_after: retry_after(context.raw()).unwrap_or(self.throttle_retry_after),
                    },
                    ServiceFault::Validation => InvokeError::Validation(message),
                    ServiceFault::Internal => InvokeError::Internal(message),
                }
            }
            dispatch @ SdkError::DispatchFailure(_) => InvokeError::Transport {
                message: DisplayErrorContext(&dispatch).to_string(),
                retryable: true,
            },
            other => InvokeError::Transport {
                message: DisplayErrorContext(&other).to_string(),
                retryable: false,
            },
        }
    }
}

#[async_trait]
impl InvocationBackend for BedrockBackend {
    async fn invoke(&self, route: &ModelRoute, payload: Value) -> Result<Value, InvokeError> {
        let body = encode_body(&payload)?;

        let output = self
            .client
            .invoke_model()
            .model_id(&route.model_id)
            .content_type(JSON)
            .accept(JSON)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                tracing::debug!(model_id = %route.model_id, "InvokeModel failed: {}", DisplayErrorContext(&e));
                self.classify(e, header_retry_after)
            })?;

        serde_json::from_slice(output.body().as_ref()).map_err(|e| InvokeError::Decode(e.to_string()))
    }

    async fn invoke_stream(&self, route: &ModelRoute, payload: Value) -> Result<ChunkStream, InvokeError> {
        let body = encode_body(&payload)?;

        let output = self
            .client
            .invoke_model_with_response_stream()
            .model_id(&route.model_id)
            .content_type(JSON)
            .accept(JSON)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                tracing::debug!(
                    model_id = %route.model_id,
                    "InvokeModelWithResponseStream failed: {}",
                    DisplayErrorContext(&e)
                );
                self.classify(e, header_retry_after)
            })?;

        let throttle_retry_after = self.throttle_retry_after;

        // Receiver is dropped with the stream, which closes the response stream
        let stream = futures_util::stream::unfold(Some(output.body), move |receiver| async move {
            let mut receiver = receiver?;

            loop {
                match receiver.recv().await {
                    Ok(Some(ResponseStream::Chunk(part))) => {
                        let Some(bytes) = part.bytes() else {
                            continue;
                        };

                        let chunk = serde_json::from_slice::<Value>(bytes.as_ref())
                            .map_err(|e| InvokeError::Decode(e.to_string()));

                        return Some((chunk, Some(receiver)));
                    }
                    Ok(Some(_)) => {}
                    Ok(None) => return None,
                    Err(e) => {
                        let error = match e {
                            SdkError::ServiceError(context) => {
                                let message = context.err().message().unwrap_or("model stream failed").to_owned();

                                match ServiceFault::from_code(context.err().code()) {
                                    ServiceFault::Throttled => InvokeError::Throttled {
                                        retry_after: throttle_retry_after,
                                    },
                                    ServiceFault::Validation => InvokeError::Validation(message),
                                    ServiceFault::Internal => InvokeError::Internal(message),
                                }
                            }
                            other => InvokeError::Transport {
                                message: DisplayErrorContext(&other).to_string(),
                                retryable: false,
                            },
                        };

                        // Terminal: nothing is pulled after an error
                        return Some((Err(error), None));
                    }
                }
            }
        });

        Ok(Box::pin(stream))
    }
}

fn encode_body(payload: &Value) -> Result<Blob, InvokeError> {
    serde_json::to_vec(payload)
        .map(Blob::new)
        .map_err(|e| InvokeError::Internal(format!("unable to encode payload: {e}")))
}

fn header_retry_after(response: &HttpResponse) -> Option<Duration> {
    response
        .headers()
        .get("retry-after")
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// How a modeled Bedrock exception is surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServiceFault {
    Throttled,
    Validation,
    Internal,
}

impl ServiceFault {
    fn from_code(code: Option<&str>) -> Self {
        match code {
            Some("ThrottlingException" | "ServiceQuotaExceededException" | "TooManyRequestsException") => {
                Self::Throttled
            }
            Some(
                "ValidationException"
                | "ResourceNotFoundException"
                | "AccessDeniedException"
                | "ModelNotReadyException",
            ) => Self::Validation,
            _ => Self::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exception_codes_classify() {
        assert_eq!(
            ServiceFault::from_code(Some("ThrottlingException")),
            ServiceFault::Throttled
        );
        assert_eq!(
            ServiceFault::from_code(Some("ServiceQuotaExceededException")),
            ServiceFault::Throttled
        );
        assert_eq!(
            ServiceFault::from_code(Some("ValidationException")),
            ServiceFault::Validation
        );
        assert_eq!(
            ServiceFault::from_code(Some("AccessDeniedException")),
            ServiceFault::Validation
        );
        assert_eq!(
            ServiceFault::from_code(Some("ModelNotReadyException")),
            ServiceFault::Validation
        );
        assert_eq!(
            ServiceFault::from_code(Some("ModelStreamErrorException")),
            ServiceFault::Internal
        );
        assert_eq!(ServiceFault::from_code(None), ServiceFault::Internal);
    }

    #[test]
    fn payload_is_encoded_as_json_bytes() {
        let blob = encode_body(&serde_json::json!({"prompt": "hi"})).unwrap();
        assert_eq!(blob.as_ref(), br#"{"prompt":"hi"}"#);
    }
}

//! Request orchestration: resolve, translate, invoke, translate back

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures_util::{Stream, StreamExt, stream};
use gateway_config::{Capability, Config, ParameterPolicy, ProviderFamily, RetryConfig};
use gateway_core::RequestContext;
use serde_json::Value;
use tokio::time::Instant;

use crate::backend::{BedrockBackend, ChunkStream, InvocationBackend, InvokeError};
use crate::convert::{self, ChatCodec, EmbeddingOutput, StreamDecoder, params};
use crate::error::LlmError;
use crate::images::ImageFetcher;
use crate::resolver::{ModelInfo, ModelResolver, ModelRoute};
use crate::types::{
    CompletionRequest, CompletionResponse, EmbeddingRequest, FinishReason, StreamDelta, StreamEvent, Usage,
};

/// Canonical stream events of one chat completion
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send>>;

/// Shared state for the chat, embedding and model routes
#[derive(Clone)]
pub struct LlmState {
    pub(crate) inner: Arc<LlmStateInner>,
}

pub(crate) struct LlmStateInner {
    pub(crate) resolver: ModelResolver,
    backend: Arc<dyn InvocationBackend>,
    images: ImageFetcher,
    policy: ParameterPolicy,
    retry: RetryConfig,
    request_timeout: Duration,
    debug: bool,
}

impl LlmState {
    /// Build state backed by the Bedrock Runtime client described in `config`
    pub async fn from_config(config: &Config) -> Result<Self, LlmError> {
        let backend = BedrockBackend::new(&config.bedrock, config.llm.retry.throttle_retry_after).await;

        tracing::info!(
            region = %config.bedrock.region,
            cross_region_inference = config.bedrock.cross_region_inference,
            "bedrock runtime client ready"
        );

        Self::with_backend(config, Arc::new(backend))
    }

    /// Build state over an arbitrary invocation backend
    pub fn with_backend(config: &Config, backend: Arc<dyn InvocationBackend>) -> Result<Self, LlmError> {
        Ok(Self {
            inner: Arc::new(LlmStateInner {
                resolver: ModelResolver::new(&config.llm, &config.bedrock),
                backend,
                images: ImageFetcher::new(config.llm.fetch_remote_images)?,
                policy: config.llm.unsupported_parameters,
                retry: config.llm.retry.clone(),
                request_timeout: config.server.request_timeout,
                debug: config.telemetry.as_ref().is_some_and(|telemetry| telemetry.debug),
            }),
        })
    }

    /// Serve a non-streaming chat completion
    pub async fn complete(
        &self,
        mut request: CompletionRequest,
        context: &RequestContext,
    ) -> Result<CompletionResponse, LlmError> {
        let timeout = self.inner.request_timeout;

        let work = async {
            let (route, codec, payload) = self.prepare_chat(&mut request).await?;

            let body = self
                .with_retry(&route, || self.inner.backend.invoke(&route, payload.clone()))
                .await
                .inspect_err(|e| log_failure(&route, "invoke", e))?;

            if self.inner.debug {
                tracing::debug!(model_id = %route.model_id, response = %body, "bedrock response");
            }

            let generation = codec.decode(body).inspect_err(|e| log_failure(&route, "decode", e))?;

            Ok::<_, LlmError>(CompletionResponse {
                id: completion_id(context),
                model: route.requested,
                created: unix_timestamp(),
                generation,
            })
        };

        tokio::time::timeout(timeout, work)
            .await
            .map_err(|_| LlmError::Timeout(timeout))?
    }

    /// Serve a streaming chat completion
    ///
    /// Returns the model id to report and the event stream. Every successful
    /// stream carries exactly one finish reason and ends with
    /// [`StreamEvent::Done`]; a failure ends it with a single `Err` item.
    pub async fn complete_stream(
        &self,
        mut request: CompletionRequest,
        context: &RequestContext,
    ) -> Result<(String, EventStream), LlmError> {
        let timeout = self.inner.request_timeout;
        let deadline = Instant::now() + timeout;

        let start = async {
            let (route, codec, payload) = self.prepare_chat(&mut request).await?;

            let chunks = self
                .with_retry(&route, || self.open_stream(&route, payload.clone()))
                .await
                .inspect_err(|e| log_failure(&route, "invoke", e))?;

            Ok::<_, LlmError>((route, codec, chunks))
        };

        let (route, codec, chunks) = tokio::time::timeout_at(deadline, start)
            .await
            .map_err(|_| LlmError::Timeout(timeout))??;

        tracing::debug!(request_id = %context.request_id, model_id = %route.model_id, "stream started");

        let adapter = StreamAdapter {
            chunks,
            decoder: codec.stream_decoder(),
            pending: VecDeque::new(),
            finished: false,
            usage: None,
            include_usage: request.include_usage,
            deadline,
            timeout,
            debug: self.inner.debug,
            model_id: route.model_id.clone(),
            done: false,
        };

        let stream = stream::unfold(adapter, |mut adapter| async move {
            let item = adapter.next_event().await?;
            Some((item, adapter))
        });

        Ok((route.requested, Box::pin(stream)))
    }

    /// Embed the request input; returns the model id to report and the vectors
    pub async fn embed(
        &self,
        mut request: EmbeddingRequest,
        context: &RequestContext,
    ) -> Result<(String, EmbeddingOutput), LlmError> {
        let timeout = self.inner.request_timeout;

        let work = async {
            let route = self.inner.resolver.resolve(&request.model, Capability::Embedding)?;
            let codec = convert::embedding_codec(route.provider).ok_or_else(|| LlmError::ModelNotFound {
                model: route.requested.clone(),
            })?;

            params::apply_embedding(&mut request, self.inner.policy, &route.requested)?;
            let texts = codec.prepare(request.input)?;
            let payload = codec.encode(&texts)?;

            tracing::debug!(
                request_id = %context.request_id,
                model_id = %route.model_id,
                inputs = texts.len(),
                "invoking embedding model"
            );

            let body = self
                .with_retry(&route, || self.inner.backend.invoke(&route, payload.clone()))
                .await
                .inspect_err(|e| log_failure(&route, "invoke", e))?;

            let output = codec.decode(body).inspect_err(|e| log_failure(&route, "decode", e))?;

            Ok::<_, LlmError>((route.requested, output))
        };

        tokio::time::timeout(timeout, work)
            .await
            .map_err(|_| LlmError::Timeout(timeout))?
    }

    /// Models in the table, configured overrides included
    pub fn models(&self) -> impl Iterator<Item = &ModelInfo> {
        self.inner.resolver.list()
    }

    /// Look up one model of the table
    pub fn model(&self, id: &str) -> Result<&ModelInfo, LlmError> {
        self.inner
            .resolver
            .get(id)
            .ok_or_else(|| LlmError::ModelNotFound { model: id.to_owned() })
    }

    /// Resolve the route and build the native payload of a chat request
    async fn prepare_chat(
        &self,
        request: &mut CompletionRequest,
    ) -> Result<(ModelRoute, &'static dyn ChatCodec, Value), LlmError> {
        let route = self.inner.resolver.resolve(&request.model, Capability::Chat)?;
        let codec = convert::chat_codec(route.provider).ok_or_else(|| LlmError::ModelNotFound {
            model: route.requested.clone(),
        })?;

        params::apply(
            &mut request.params,
            codec.supported_params(),
            self.inner.policy,
            &route.requested,
        )?;

        if route.provider == ProviderFamily::Claude3 {
            self.inner.images.inline(request).await?;
        }

        let payload = codec.encode(request).inspect_err(|e| log_failure(&route, "translate", e))?;

        if self.inner.debug {
            tracing::debug!(model_id = %route.model_id, payload = %payload, "bedrock request");
        }

        Ok((route, codec, payload))
    }

    /// Open a backend stream and wait for its first chunk
    ///
    /// Nothing has reached the client yet, so a failed first chunk is returned
    /// as the invocation's error and gets the same retry and status handling.
    async fn open_stream(&self, route: &ModelRoute, payload: Value) -> Result<ChunkStream, InvokeError> {
        let mut chunks = self.inner.backend.invoke_stream(route, payload).await?;

        match chunks.next().await {
            Some(Ok(first)) => Ok(Box::pin(stream::once(async move { Ok(first) }).chain(chunks))),
            Some(Err(e)) => Err(e),
            None => Ok(chunks),
        }
    }

    /// Run an invocation, retrying transport failures that happened before sending
    ///
    /// The delay starts at the configured backoff and doubles per retry. Once
    /// attempts are exhausted the failure is reported as fatal.
    async fn with_retry<T, F, Fut>(&self, route: &ModelRoute, mut attempt: F) -> Result<T, LlmError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, InvokeError>>,
    {
        let max_attempts = self.inner.retry.max_attempts.max(1);
        let mut delay = self.inner.retry.backoff;
        let mut tried = 1;

        loop {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(InvokeError::Transport {
                    message,
                    retryable: true,
                }) if tried < max_attempts => {
                    tracing::warn!(
                        model_id = %route.model_id,
                        attempt = tried,
                        max_attempts,
                        "transport failure before send, retrying: {message}"
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                    tried += 1;
                }
                Err(InvokeError::Transport { message, .. }) => {
                    return Err(LlmError::Transport {
                        message,
                        retryable: false,
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Pulls native chunks lazily and turns them into canonical events
struct StreamAdapter {
    chunks: ChunkStream,
    decoder: Box<dyn StreamDecoder>,
    pending: VecDeque<StreamEvent>,
    finished: bool,
    usage: Option<Usage>,
    include_usage: bool,
    deadline: Instant,
    timeout: Duration,
    debug: bool,
    model_id: String,
    done: bool,
}

impl StreamAdapter {
    async fn next_event(&mut self) -> Option<Result<StreamEvent, LlmError>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }
            if self.done {
                return None;
            }

            let chunk = match tokio::time::timeout_at(self.deadline, self.chunks.next()).await {
                Err(_) => return Some(Err(self.fail(LlmError::Timeout(self.timeout)))),
                Ok(None) => {
                    self.finish();
                    continue;
                }
                Ok(Some(Err(e))) => {
                    let error = LlmError::StreamTerminatedEarly(e.to_string());
                    return Some(Err(self.fail(error)));
                }
                Ok(Some(Ok(chunk))) => chunk,
            };

            if self.debug {
                tracing::debug!(model_id = %self.model_id, chunk = %chunk, "bedrock stream chunk");
            }

            match self.decoder.decode_chunk(chunk) {
                Ok(events) => self.absorb(events),
                Err(e) => return Some(Err(self.fail(e))),
            }
        }
    }

    fn absorb(&mut self, events: Vec<StreamEvent>) {
        for event in events {
            match event {
                StreamEvent::Delta(delta) => {
                    self.finished |= delta.finish_reason.is_some();
                    self.pending.push_back(StreamEvent::Delta(delta));
                }
                StreamEvent::Usage(usage) => self.usage = Some(usage),
                StreamEvent::Done => {}
            }
        }
    }

    /// Queue the tail of a stream the backend closed normally
    fn finish(&mut self) {
        if !self.finished {
            self.pending
                .push_back(StreamEvent::Delta(StreamDelta::finish(FinishReason::Stop)));
        }
        if self.include_usage {
            self.pending
                .push_back(StreamEvent::Usage(self.usage.take().unwrap_or_default()));
        }
        self.pending.push_back(StreamEvent::Done);
        self.done = true;
    }

    fn fail(&mut self, error: LlmError) -> LlmError {
        tracing::warn!(model_id = %self.model_id, stage = "stream", error = %error, "stream failed");
        self.pending.clear();
        self.done = true;
        error
    }
}

impl Drop for StreamAdapter {
    fn drop(&mut self) {
        if !self.done {
            tracing::debug!(model_id = %self.model_id, "client went away, cancelling bedrock stream");
        }
    }
}

fn log_failure(route: &ModelRoute, stage: &str, error: &LlmError) {
    tracing::warn!(
        model = %route.requested,
        model_id = %route.model_id,
        provider = ?route.provider,
        stage,
        error = %error,
        "request failed"
    );
}

/// Response id shared by a completion and all of its chunks
pub(crate) fn completion_id(context: &RequestContext) -> String {
    format!("chatcmpl-{}", context.request_id.simple())
}

pub(crate) fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

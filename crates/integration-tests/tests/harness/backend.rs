//! Scripted invocation backend standing in for Bedrock

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use gateway_llm::{ChunkStream, InvocationBackend, InvokeError, ModelRoute};
use serde_json::{Value, json};

/// One recorded call
#[derive(Debug, Clone)]
pub struct Invocation {
    pub model_id: String,
    pub payload: Value,
    pub streaming: bool,
}

/// Scripted stream: chunks released one by one after `interval`
pub struct ScriptedStream {
    pub chunks: Vec<Result<Value, InvokeError>>,
    pub interval: Duration,
}

impl ScriptedStream {
    pub fn immediate(chunks: Vec<Result<Value, InvokeError>>) -> Self {
        Self {
            chunks,
            interval: Duration::ZERO,
        }
    }
}

/// Backend replaying canned outcomes and recording what it was asked
#[derive(Default)]
pub struct ScriptedBackend {
    responses: Mutex<VecDeque<Result<Value, InvokeError>>>,
    streams: Mutex<VecDeque<ScriptedStream>>,
    invocations: Mutex<Vec<Invocation>>,
    /// Stream chunks handed out so far
    produced: Arc<AtomicUsize>,
    /// Set when a stream is dropped before its last chunk
    cancelled: Arc<AtomicBool>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_response(&self, response: Result<Value, InvokeError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn push_stream(&self, stream: ScriptedStream) {
        self.streams.lock().unwrap().push_back(stream);
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn produced(&self) -> usize {
        self.produced.load(Ordering::SeqCst)
    }

    pub fn cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn record(&self, route: &ModelRoute, payload: Value, streaming: bool) {
        self.invocations.lock().unwrap().push(Invocation {
            model_id: route.model_id.clone(),
            payload,
            streaming,
        });
    }
}

#[async_trait]
impl InvocationBackend for ScriptedBackend {
    async fn invoke(&self, route: &ModelRoute, payload: Value) -> Result<Value, InvokeError> {
        self.record(route, payload, false);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(InvokeError::Internal("no scripted response".to_owned())))
    }

    async fn invoke_stream(&self, route: &ModelRoute, payload: Value) -> Result<ChunkStream, InvokeError> {
        self.record(route, payload, true);
        let Some(script) = self.streams.lock().unwrap().pop_front() else {
            return Err(InvokeError::Internal("no scripted stream".to_owned()));
        };

        let state = StreamState {
            chunks: script.chunks.into(),
            interval: script.interval,
            produced: Arc::clone(&self.produced),
            cancelled: Arc::clone(&self.cancelled),
        };

        let stream = futures_util::stream::unfold(state, |mut state| async move {
            if !state.interval.is_zero() {
                tokio::time::sleep(state.interval).await;
            }
            let chunk = state.chunks.pop_front()?;
            state.produced.fetch_add(1, Ordering::SeqCst);
            Some((chunk, state))
        });

        Ok(Box::pin(stream))
    }
}

struct StreamState {
    chunks: VecDeque<Result<Value, InvokeError>>,
    interval: Duration,
    produced: Arc<AtomicUsize>,
    cancelled: Arc<AtomicBool>,
}

impl Drop for StreamState {
    fn drop(&mut self) {
        if !self.chunks.is_empty() {
            self.cancelled.store(true, Ordering::SeqCst);
        }
    }
}

// -- Native payload builders --

pub fn claude_text(text: &str) -> Value {
    json!({
        "id": "msg_01",
        "type": "message",
        "role": "assistant",
        "content": [{"type": "text", "text": text}],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 12, "output_tokens": 4}
    })
}

pub fn claude_tool_use(name: &str, input: Value) -> Value {
    json!({
        "id": "msg_02",
        "type": "message",
        "role": "assistant",
        "content": [{"type": "tool_use", "id": "toolu_01", "name": name, "input": input}],
        "stop_reason": "tool_use",
        "usage": {"input_tokens": 30, "output_tokens": 10}
    })
}

pub fn claude_delta(text: &str) -> Result<Value, InvokeError> {
    Ok(json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": text}}))
}

pub fn claude_stop(reason: &str) -> Result<Value, InvokeError> {
    Ok(json!({"type": "message_delta", "delta": {"stop_reason": reason}, "usage": {"output_tokens": 3}}))
}

pub fn claude_message_stop(input_tokens: u32, output_tokens: u32) -> Result<Value, InvokeError> {
    Ok(json!({
        "type": "message_stop",
        "amazon-bedrock-invocationMetrics": {
            "inputTokenCount": input_tokens,
            "outputTokenCount": output_tokens
        }
    }))
}

pub fn llama_generation(text: &str) -> Value {
    json!({
        "generation": text,
        "prompt_token_count": 8,
        "generation_token_count": 2,
        "stop_reason": "stop"
    })
}

pub fn cohere_embeddings(count: usize) -> Value {
    json!({"embeddings": vec![vec![0.25_f32, -0.5]; count]})
}

pub fn titan_embedding() -> Value {
    json!({"embedding": [0.125_f32, 0.5], "inputTextTokenCount": 3})
}

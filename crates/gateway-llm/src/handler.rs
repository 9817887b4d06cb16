//! Axum route handlers for the OpenAI-compatible endpoints

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::HeaderValue;
use axum::http::header::RETRY_AFTER;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json, Router, routing};
use futures_util::{Stream, StreamExt};
use gateway_core::{HttpError, RequestContext};

use crate::convert::openai::{ChunkHeader, embedding_response, error_body};
use crate::error::LlmError;
use crate::protocol::openai::{OpenAiModel, OpenAiModelList, OpenAiRequest, OpenAiResponse};
use crate::resolver::ModelInfo;
use crate::state::{EventStream, LlmState, completion_id, unix_timestamp};
use crate::types::{CompletionRequest, EmbeddingRequest, StreamEvent};

/// Build the router for chat, embeddings and models
///
/// Every route answers under both `/v1` and `/api/v1`.
pub fn llm_router(state: LlmState) -> Router {
    let api = Router::new()
        .route("/chat/completions", routing::post(chat_completions))
        .route("/embeddings", routing::post(embeddings))
        .route("/models", routing::get(list_models))
        .route("/models/{*model}", routing::get(get_model))
        .with_state(state);

    Router::new().nest("/v1", api.clone()).nest("/api/v1", api)
}

/// Handle `POST /v1/chat/completions`
async fn chat_completions(
    State(state): State<LlmState>,
    Extension(context): Extension<RequestContext>,
    body: Result<Json<OpenAiRequest>, JsonRejection>,
) -> Response {
    let request = match parse_chat(body) {
        Ok(request) => request,
        Err(e) => return error_response(&e),
    };

    if request.stream {
        match state.complete_stream(request, &context).await {
            Ok((model, stream)) => {
                let header = ChunkHeader {
                    id: completion_id(&context),
                    model,
                    created: unix_timestamp(),
                };
                stream_response(stream, header).into_response()
            }
            Err(e) => error_response(&e),
        }
    } else {
        match state.complete(request, &context).await {
            Ok(response) => Json(OpenAiResponse::from(response)).into_response(),
            Err(e) => error_response(&e),
        }
    }
}

fn parse_chat(body: Result<Json<OpenAiRequest>, JsonRejection>) -> Result<CompletionRequest, LlmError> {
    let Json(wire) = body.map_err(|rejection| LlmError::InvalidRequest(rejection.body_text()))?;
    CompletionRequest::try_from(wire)
}

/// Handle `POST /v1/embeddings`
async fn embeddings(
    State(state): State<LlmState>,
    Extension(context): Extension<RequestContext>,
    body: Result<Json<EmbeddingRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => return error_response(&LlmError::InvalidRequest(rejection.body_text())),
    };
    let format = request.encoding_format;

    match state.embed(request, &context).await {
        Ok((model, output)) => {
            Json(embedding_response(output.vectors, model, output.prompt_tokens, format)).into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// Handle `GET /v1/models`
async fn list_models(State(state): State<LlmState>) -> Response {
    let created = unix_timestamp();

    let response = OpenAiModelList {
        object: "list".to_owned(),
        data: state.models().map(|info| wire_model(info, created)).collect(),
    };

    Json(response).into_response()
}

/// Handle `GET /v1/models/{model}`
async fn get_model(State(state): State<LlmState>, Path(model): Path<String>) -> Response {
    match state.model(&model) {
        Ok(info) => Json(wire_model(info, unix_timestamp())).into_response(),
        Err(e) => error_response(&e),
    }
}

fn wire_model(info: &ModelInfo, created: u64) -> OpenAiModel {
    OpenAiModel {
        id: info.id.clone(),
        object: "model".to_owned(),
        created,
        owned_by: info.owned_by().to_owned(),
    }
}

/// Build the SSE response for a chat completion stream
///
/// A failure becomes one terminal `{"error": ...}` event and the stream
/// closes without `[DONE]`.
fn stream_response(stream: EventStream, header: ChunkHeader) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let mut first = true;

    let events = stream.map(move |result| {
        let data = match result {
            Ok(StreamEvent::Delta(delta)) => {
                let chunk = header.delta(&delta, first);
                first = false;
                serde_json::to_string(&chunk)
            }
            Ok(StreamEvent::Usage(usage)) => serde_json::to_string(&header.usage(usage)),
            Ok(StreamEvent::Done) => Ok("[DONE]".to_owned()),
            Err(e) => serde_json::to_string(&error_body(&e)),
        };

        data.map(|data| Event::default().data(data)).map_err(axum::Error::new)
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

/// Render an error as an `OpenAI`-style JSON body
///
/// Throttling adds a `Retry-After` header in whole seconds.
pub fn error_response(error: &LlmError) -> Response {
    let mut response = (error.status_code(), Json(error_body(error))).into_response();

    if let Some(retry_after) = error.retry_after() {
        let seconds = retry_after.as_secs().max(1);
        response
            .headers_mut()
            .insert(RETRY_AFTER, HeaderValue::from(seconds));
    }

    response
}

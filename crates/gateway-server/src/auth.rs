use axum::Json;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use gateway_auth::{AuthError, CredentialGuard};
use gateway_core::{HttpError, RequestContext};
use gateway_llm::convert::openai::error_body;

/// Reject requests whose bearer key does not match the expected key
///
/// Paths in `public_paths` (the health probe) pass through untouched.
pub async fn auth_middleware(
    guard: CredentialGuard,
    public_paths: Vec<String>,
    request: Request,
    next: Next,
) -> Response {
    if public_paths.iter().any(|path| request.uri().path() == path) {
        return next.run(request).await;
    }

    let presented = request
        .extensions()
        .get::<RequestContext>()
        .and_then(|context| context.api_key.clone());

    match guard.authorize(presented.as_ref()).await {
        Ok(()) => next.run(request).await,
        Err(e) => {
            match &e {
                AuthError::Unauthorized => {
                    tracing::warn!(path = %request.uri().path(), "rejected request with invalid API key");
                }
                AuthError::SecretUnavailable { .. } => {
                    tracing::error!(error = %e, "unable to verify API key");
                }
            }
            (e.status_code(), Json(error_body(&e))).into_response()
        }
    }
}

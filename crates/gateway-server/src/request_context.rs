use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use gateway_core::RequestContext;

/// Middleware that attaches a [`RequestContext`] to every request
///
/// Runs before authentication so the guard and the handlers see the same
/// request id and bearer key.
pub async fn request_context_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();

    let context = RequestContext::from_parts(parts.clone());
    tracing::debug!(request_id = %context.request_id, path = %parts.uri.path(), "request received");

    let mut request = Request::from_parts(parts, body);
    request.extensions_mut().insert(context);

    next.run(request).await
}

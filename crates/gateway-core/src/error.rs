use http::StatusCode;

/// An error that knows how it should look on the wire
///
/// Feature crates implement this for their error enums; handlers turn it
/// into a `{"error": {...}}` body without the error type depending on axum.
pub trait HttpError: std::error::Error {
    /// Response status
    fn status_code(&self) -> StatusCode;

    /// OpenAI-style error type (e.g. `invalid_request_error`)
    fn error_type(&self) -> &str;

    /// Stable, machine-readable failure kind (e.g. `ModelNotFound`)
    fn kind(&self) -> &'static str;

    /// Text shown to the caller; never includes backend internals
    fn client_message(&self) -> String;
}

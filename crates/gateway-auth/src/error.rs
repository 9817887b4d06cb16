use gateway_core::HttpError;
use http::StatusCode;

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Missing or mismatched API key
    #[error("invalid or missing API key")]
    Unauthorized,

    /// The expected key could not be read from its source
    #[error("secret source '{source_name}' unavailable: {reason}")]
    SecretUnavailable {
        /// Source description, never the secret itself
        source_name: String,
        reason: String,
    },
}

impl HttpError for AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::SecretUnavailable { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::Unauthorized => "authentication_error",
            Self::SecretUnavailable { .. } => "api_error",
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized => "Unauthorized",
            Self::SecretUnavailable { .. } => "SecretUnavailable",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Unauthorized => self.to_string(),
            // Source details stay in the logs
            Self::SecretUnavailable { .. } => "credential store unavailable".to_owned(),
        }
    }
}

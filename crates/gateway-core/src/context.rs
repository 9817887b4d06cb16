use secrecy::SecretString;
use uuid::Uuid;

/// Per-request state shared between middleware and handlers
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// HTTP request parts (method, URI, headers, extensions)
    pub parts: http::request::Parts,
    /// Identifier used in logs and in generated response ids
    pub request_id: Uuid,
    /// Bearer key presented by the client, if any
    pub api_key: Option<SecretString>,
}

impl RequestContext {
    /// Build a context from incoming request parts
    ///
    /// Extracts the bearer key from the `Authorization` header when present.
    pub fn from_parts(parts: http::request::Parts) -> Self {
        let api_key = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .map(|token| SecretString::from(token.to_owned()));

        Self {
            parts,
            request_id: Uuid::new_v4(),
            api_key,
        }
    }

    /// Access request headers
    pub fn headers(&self) -> &http::HeaderMap {
        &self.parts.headers
    }
}

/// Strip the `Bearer` scheme from an authorization value
///
/// The scheme is matched case-insensitively; empty tokens are treated as absent.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    fn parts_with_auth(value: Option<&str>) -> http::request::Parts {
        let mut builder = http::Request::builder().uri("/v1/chat/completions");
        if let Some(value) = value {
            builder = builder.header(http::header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn extracts_bearer_key() {
        let ctx = RequestContext::from_parts(parts_with_auth(Some("Bearer sk-test")));
        assert_eq!(ctx.api_key.unwrap().expose_secret(), "sk-test");
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        let ctx = RequestContext::from_parts(parts_with_auth(Some("bearer sk-test")));
        assert!(ctx.api_key.is_some());
    }

    #[test]
    fn missing_or_malformed_header_has_no_key() {
        assert!(RequestContext::from_parts(parts_with_auth(None)).api_key.is_none());
        assert!(RequestContext::from_parts(parts_with_auth(Some("Basic abc"))).api_key.is_none());
        assert!(RequestContext::from_parts(parts_with_auth(Some("Bearer "))).api_key.is_none());
    }

    #[test]
    fn each_context_gets_a_fresh_request_id() {
        let a = RequestContext::from_parts(parts_with_auth(None));
        let b = RequestContext::from_parts(parts_with_auth(None));
        assert_ne!(a.request_id, b.request_id);
    }
}

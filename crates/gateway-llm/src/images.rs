//! Inlining of image URLs for the multimodal Claude families

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;

use crate::error::LlmError;
use crate::types::{CompletionRequest, Content, ContentPart};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Media type assumed when a server does not label the image
const FALLBACK_MEDIA_TYPE: &str = "image/jpeg";

/// Split a `data:image/<type>;base64,<data>` URI into media type and payload
pub fn parse_data_uri(url: &str) -> Option<(&str, &str)> {
    let rest = url.strip_prefix("data:")?;
    let (header, data) = rest.split_once(',')?;
    let media_type = header.strip_suffix(";base64")?;
    media_type.starts_with("image/").then(|| (media_type, data.trim_start()))
}

/// Replaces remote image URLs in a request with base64 data URIs
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: Client,
    enabled: bool,
}

impl ImageFetcher {
    /// Create a fetcher; when `enabled` is false remote URLs are refused
    pub fn new(enabled: bool) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| LlmError::Internal(e.into()))?;

        Ok(Self { client, enabled })
    }

    /// Inline every remote image of the request in place
    pub async fn inline(&self, request: &mut CompletionRequest) -> Result<(), LlmError> {
        for message in &mut request.messages {
            let Content::Parts(parts) = &mut message.content else {
                continue;
            };
            for part in parts {
                let ContentPart::Image { url, .. } = part else {
                    continue;
                };
                if parse_data_uri(url).is_some() {
                    continue;
                }
                if !self.enabled {
                    return Err(LlmError::UnsupportedContent(
                        "remote image URLs are disabled; send images as base64 data URIs".to_owned(),
                    ));
                }
                *url = self.fetch(url).await?;
            }
        }

        Ok(())
    }

    async fn fetch(&self, url: &str) -> Result<String, LlmError> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(LlmError::UnsupportedContent(format!(
                "image URL must be a data URI or an http(s) URL: {url}"
            )));
        }

        tracing::debug!(url, "fetching remote image");

        let fetch_failed =
            |reason: String| LlmError::UnsupportedContent(format!("unable to fetch image {url}: {reason}"));

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(fetch_failed(format!("status {}", response.status())));
        }

        let media_type = response
            .headers()
            .get(http::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.split(';').next().unwrap_or(value).trim().to_owned())
            .filter(|value| value.starts_with("image/"))
            .unwrap_or_else(|| FALLBACK_MEDIA_TYPE.to_owned());

        let bytes = response.bytes().await.map_err(|e| fetch_failed(e.to_string()))?;

        Ok(format!("data:{media_type};base64,{}", STANDARD.encode(&bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::test_support::{message, request};
    use crate::types::Role;

    fn image_request(url: &str) -> CompletionRequest {
        let mut req = request(vec![message(Role::User, "")]);
        req.messages[0].content = Content::Parts(vec![
            ContentPart::Text {
                text: "What is this?".to_owned(),
            },
            ContentPart::Image {
                url: url.to_owned(),
                detail: None,
            },
        ]);
        req
    }

    #[test]
    fn parses_image_data_uris() {
        assert_eq!(
            parse_data_uri("data:image/png;base64,iVBORw0KGgo="),
            Some(("image/png", "iVBORw0KGgo="))
        );
        assert_eq!(parse_data_uri("data:text/plain;base64,aGk="), None);
        assert_eq!(parse_data_uri("data:image/png,raw"), None);
        assert_eq!(parse_data_uri("https://example.com/cat.png"), None);
    }

    #[tokio::test]
    async fn data_uris_are_left_alone() {
        let fetcher = ImageFetcher::new(false).unwrap();
        let mut req = image_request("data:image/gif;base64,R0lGOD==");

        fetcher.inline(&mut req).await.unwrap();

        let Content::Parts(parts) = &req.messages[0].content else {
            panic!("content changed shape");
        };
        assert!(matches!(&parts[1], ContentPart::Image { url, .. } if url == "data:image/gif;base64,R0lGOD=="));
    }

    #[tokio::test]
    async fn remote_urls_are_refused_when_fetching_is_disabled() {
        let fetcher = ImageFetcher::new(false).unwrap();
        let mut req = image_request("https://example.com/cat.png");

        let err = fetcher.inline(&mut req).await.unwrap_err();

        assert!(matches!(err, LlmError::UnsupportedContent(_)));
    }

    #[tokio::test]
    async fn non_http_urls_are_refused() {
        let fetcher = ImageFetcher::new(true).unwrap();
        let mut req = image_request("file:///etc/passwd");

        let err = fetcher.inline(&mut req).await.unwrap_err();

        assert!(matches!(err, LlmError::UnsupportedContent(_)));
    }
}

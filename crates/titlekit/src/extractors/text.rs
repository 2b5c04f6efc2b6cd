//! Plain text title extractor

use super::{decode_text, Extraction, Extractor};
use crate::body::read_body;
use crate::error::FetchError;
use crate::http::Response;
use async_trait::async_trait;

/// Uses the first line of a plain text document as its title
#[derive(Debug, Clone)]
pub struct PlainTextExtractor {
    /// Maximum number of bytes downloaded per document
    pub max_download_bytes: usize,
}

impl PlainTextExtractor {
    pub fn new() -> Self {
        Self {
            max_download_bytes: 8 * 1024,
        }
    }
}

impl Default for PlainTextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Extractor for PlainTextExtractor {
    fn name(&self) -> &'static str {
        "text"
    }

    fn content_types(&self) -> &'static [&'static str] {
        &["text/plain"]
    }

    async fn extract(&self, response: Response) -> Result<Extraction, FetchError> {
        let charset = response.charset();
        let content = read_body(response.into_body(), Some(self.max_download_bytes)).await;
        let decoded = decode_text(&content, charset.as_deref());
        Ok(match decoded.lines().next() {
            Some(line) if !line.trim().is_empty() => Extraction::Title(line.to_string()),
            _ => Extraction::NoTitle,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Body, Request};
    use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
    use reqwest::StatusCode;

    async fn extract(content_type: &'static str, body: &'static [u8]) -> Extraction {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        let response = Response::new(
            Request::get(url::Url::parse("http://foo.test/notes.txt").unwrap()),
            StatusCode::OK,
            headers,
            Body::from(body.to_vec()),
        );
        PlainTextExtractor::new().extract(response).await.unwrap()
    }

    #[tokio::test]
    async fn test_simple() {
        assert_eq!(
            extract("text/plain", b"hello world\r\nsecond line\n").await,
            Extraction::Title("hello world".to_string())
        );
    }

    #[tokio::test]
    async fn test_bad_encoding() {
        assert_eq!(
            extract("text/plain; charset=bogus-8", b"hello world\n").await,
            Extraction::Title("hello world".to_string())
        );
    }

    #[tokio::test]
    async fn test_latin1() {
        assert_eq!(
            extract("text/plain; charset=ISO-8859-1", b"na\xefve\n").await,
            Extraction::Title("na\u{ef}ve".to_string())
        );
    }

    #[tokio::test]
    async fn test_empty() {
        assert_eq!(extract("text/plain", b"").await, Extraction::NoTitle);
        assert_eq!(extract("text/plain", b"\nlater").await, Extraction::NoTitle);
    }
}

//! HTML title extractor

use super::{decode_text, Extraction, Extractor, SoftRedirect};
use crate::body::read_body;
use crate::error::FetchError;
use crate::http::{parse_header, Response};
use async_trait::async_trait;
use scraper::{Html, Selector};

/// Extracts `<title>` text and follows short `<meta>` refreshes
#[derive(Debug, Clone)]
pub struct HtmlExtractor {
    /// Maximum number of bytes downloaded per document
    pub max_download_bytes: usize,
    /// Longest `<meta>` refresh delay still treated as a redirect, in
    /// seconds. Pages that reload themselves every minute are not
    /// redirects.
    pub max_refresh_delay: i64,
}

impl HtmlExtractor {
    pub fn new() -> Self {
        Self {
            max_download_bytes: 64 * 1024,
            max_refresh_delay: 15,
        }
    }
}

impl Default for HtmlExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Extractor for HtmlExtractor {
    fn name(&self) -> &'static str {
        "html"
    }

    fn content_types(&self) -> &'static [&'static str] {
        &["text/html", "application/xhtml+xml"]
    }

    async fn extract(&self, response: Response) -> Result<Extraction, FetchError> {
        let charset = response.charset();
        let content = read_body(response.into_body(), Some(self.max_download_bytes)).await;
        let html = decode_text(&content, charset.as_deref());
        Ok(summarize(&html, self.max_refresh_delay))
    }
}

fn summarize(html: &str, max_refresh_delay: i64) -> Extraction {
    let document = Html::parse_document(html);

    if let Some(location) = meta_refresh(&document, max_refresh_delay) {
        return Extraction::Redirect(SoftRedirect::new(location));
    }

    if let Ok(selector) = Selector::parse("title") {
        if let Some(title) = document.select(&selector).next() {
            let text = title.text().collect::<String>();
            let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if !collapsed.is_empty() {
                return Extraction::Title(collapsed);
            }
        }
    }

    Extraction::NoTitle
}

/// Target of the first short enough `<meta http-equiv="refresh">`
fn meta_refresh(document: &Html, max_refresh_delay: i64) -> Option<String> {
    let selector = Selector::parse("meta[http-equiv][content]").ok()?;
    document.select(&selector).find_map(|meta| {
        let element = meta.value();
        let http_equiv = element.attr("http-equiv")?;
        if !http_equiv.to_ascii_lowercase().contains("refresh") {
            return None;
        }
        let (delay, params) = parse_header(element.attr("content")?);
        // Not a valid number; treat it as immediate
        let delay = delay.parse::<i64>().unwrap_or(0);
        if delay > max_refresh_delay {
            return None;
        }
        params
            .into_iter()
            .find(|(name, _)| name == "url")
            .map(|(_, url)| url)
            .filter(|url| !url.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Body, Request};
    use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
    use reqwest::StatusCode;

    async fn extract(content_type: &'static str, body: Vec<u8>) -> Extraction {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        let response = Response::new(
            Request::get(url::Url::parse("http://foo.test/").unwrap()),
            StatusCode::OK,
            headers,
            Body::from(body),
        );
        HtmlExtractor::new().extract(response).await.unwrap()
    }

    #[tokio::test]
    async fn test_simple() {
        let html = b"<!DOCTYPE html><html><head><title>hello world</title></head></html>";
        assert_eq!(
            extract("text/html", html.to_vec()).await,
            Extraction::Title("hello world".to_string())
        );
    }

    #[tokio::test]
    async fn test_whitespace_collapsed() {
        let html = b"<title>\n   hello\n\t big   world  </title>";
        assert_eq!(
            extract("text/html", html.to_vec()).await,
            Extraction::Title("hello big world".to_string())
        );
    }

    #[tokio::test]
    async fn test_meta_refresh() {
        let html = br#"<html><head>
            <meta http-equiv="Refresh" content="0; url=http://foo.test/">
            <title>ignored</title></head></html>"#;
        assert_eq!(
            extract("text/html", html.to_vec()).await,
            Extraction::Redirect(SoftRedirect::new("http://foo.test/"))
        );
    }

    #[tokio::test]
    async fn test_meta_refresh_invalid_delay_is_immediate() {
        let html = br#"<meta http-equiv="refresh" content="soon; URL=/next">"#;
        assert_eq!(
            extract("text/html", html.to_vec()).await,
            Extraction::Redirect(SoftRedirect::new("/next"))
        );
    }

    #[tokio::test]
    async fn test_meta_refresh_long() {
        let html = br#"<html><head>
            <meta http-equiv="refresh" content="60; url=http://foo.test/">
            <title>hello world</title></head></html>"#;
        assert_eq!(
            extract("text/html", html.to_vec()).await,
            Extraction::Title("hello world".to_string())
        );
    }

    #[tokio::test]
    async fn test_meta_refresh_without_url() {
        let html = br#"<meta http-equiv="refresh" content="5"><title>reloads</title>"#;
        assert_eq!(
            extract("text/html", html.to_vec()).await,
            Extraction::Title("reloads".to_string())
        );
    }

    #[tokio::test]
    async fn test_no_title() {
        let html = b"<html><body><p>no title here</p></body></html>";
        assert_eq!(extract("text/html", html.to_vec()).await, Extraction::NoTitle);

        let html = b"<title>   </title>";
        assert_eq!(extract("text/html", html.to_vec()).await, Extraction::NoTitle);
    }

    #[tokio::test]
    async fn test_charset_from_header() {
        let html = b"<title>caf\xe9</title>";
        assert_eq!(
            extract("text/html; charset=iso-8859-1", html.to_vec()).await,
            Extraction::Title("caf\u{e9}".to_string())
        );
    }

    #[tokio::test]
    async fn test_title_beyond_download_limit() {
        let mut html = b"<html><head>".to_vec();
        html.extend(std::iter::repeat(b' ').take(70 * 1024));
        html.extend_from_slice(b"<title>too late</title></head></html>");
        assert_eq!(extract("text/html", html).await, Extraction::NoTitle);
    }
}

//! Base HTTP transport backed by reqwest

use super::Agent;
use crate::error::FetchError;
use crate::http::{Body, Request, Response};
use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::redirect::Policy;
use std::time::Duration;
use tracing::debug;

/// Default connect timeout
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Innermost agent: connects and transfers bytes
///
/// Redirects are never followed here and bodies are passed through
/// exactly as received; both are handled by outer layers.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport with the given User-Agent and connect timeout
    pub fn new(user_agent: &str, connect_timeout: Duration) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static(crate::DEFAULT_USER_AGENT)),
        );
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(connect_timeout)
            .redirect(Policy::none())
            .build()
            .map_err(FetchError::ClientBuildError)?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Agent for HttpTransport {
    async fn request(&self, request: Request) -> Result<Response, FetchError> {
        let response = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone())
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        let headers = response.headers().clone();
        debug!(url = %request.url, status = status.as_u16(), "Received response");

        let body = Body::from_stream(response.bytes_stream().map_err(FetchError::from_reqwest));
        Ok(Response::new(request, status, headers, body))
    }
}

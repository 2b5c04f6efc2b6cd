//! Hard (3xx) redirect following

use super::Agent;
use crate::error::FetchError;
use crate::http::{Request, Response};
use async_trait::async_trait;
use reqwest::header::LOCATION;
use reqwest::{Method, StatusCode};
use tracing::debug;

/// Default number of hard redirects followed per request
pub const DEFAULT_MAX_REDIRECTS: usize = 20;

/// Agent wrapper that follows protocol-level redirects
///
/// Every hop is issued through the inner agent, so any checks it performs
/// apply to each redirect target. The replaced responses are recorded in
/// the final response's chain.
pub struct RedirectAgent<A> {
    inner: A,
    max_redirects: usize,
}

impl<A> RedirectAgent<A> {
    pub fn new(inner: A, max_redirects: usize) -> Self {
        Self {
            inner,
            max_redirects,
        }
    }
}

#[async_trait]
impl<A: Agent> Agent for RedirectAgent<A> {
    async fn request(&self, request: Request) -> Result<Response, FetchError> {
        let mut request = request;
        let mut previous = None;
        let mut redirects = 0usize;

        loop {
            let mut response = self.inner.request(request.clone()).await?;
            if let Some(hop) = previous.take() {
                response.set_previous_response(hop);
            }

            let status = response.status();
            if !is_redirect(status) {
                return Ok(response);
            }

            let location = response
                .header_str(LOCATION)
                .ok_or_else(|| {
                    FetchError::ResponseFailure(format!(
                        "{} redirect from {} has no Location header",
                        status.as_u16(),
                        response.url()
                    ))
                })?
                .to_string();

            if redirects >= self.max_redirects {
                return Err(FetchError::TooManyRedirects { location });
            }

            let next = response.url().join(&location).map_err(|e| {
                FetchError::ResponseFailure(format!("invalid redirect location {location:?}: {e}"))
            })?;

            debug!(from = %response.url(), to = %next, status = status.as_u16(), "Following redirect");

            previous = Some(response.hop());
            if status == StatusCode::SEE_OTHER {
                request.method = Method::GET;
            }
            request.url = next;
            redirects += 1;
        }
    }
}

fn is_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

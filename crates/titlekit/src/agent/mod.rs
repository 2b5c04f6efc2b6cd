//! Layered request agents
//!
//! Design: every layer implements [`Agent`] and wraps an inner agent. The
//! default stack, outermost first, is
//! [`DecodingAgent`] → [`RedirectAgent`] → [`BlacklistingAgent`] → [`HttpTransport`],
//! so the host check runs for every redirect hop and decompression only ever
//! sees data that was already fetched.

mod decode;
mod guard;
mod redirect;
mod transport;

pub use decode::DecodingAgent;
pub use guard::{is_blocked_address, BlacklistingAgent, Resolve, SystemResolver};
pub use redirect::{RedirectAgent, DEFAULT_MAX_REDIRECTS};
pub use transport::{HttpTransport, CONNECT_TIMEOUT};

use crate::error::FetchError;
use crate::http::{Request, Response};
use async_trait::async_trait;
use std::sync::Arc;

/// Issue a request, get a response
#[async_trait]
pub trait Agent: Send + Sync {
    async fn request(&self, request: Request) -> Result<Response, FetchError>;
}

#[async_trait]
impl<A: Agent + ?Sized> Agent for Box<A> {
    async fn request(&self, request: Request) -> Result<Response, FetchError> {
        (**self).request(request).await
    }
}

#[async_trait]
impl<A: Agent + ?Sized> Agent for Arc<A> {
    async fn request(&self, request: Request) -> Result<Response, FetchError> {
        (**self).request(request).await
    }
}

/// The default agent stack
pub type LayeredAgent = DecodingAgent<RedirectAgent<BlacklistingAgent<HttpTransport>>>;

/// Compose the default stack around a transport
pub fn layered(
    transport: HttpTransport,
    resolver: Arc<dyn Resolve>,
    max_redirects: usize,
) -> LayeredAgent {
    DecodingAgent::new(RedirectAgent::new(
        BlacklistingAgent::with_resolver(transport, resolver),
        max_redirects,
    ))
}

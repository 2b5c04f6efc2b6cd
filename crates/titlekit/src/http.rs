//! Request and response types shared by every agent layer
//!
//! A [`Response`] owns a lazily consumed [`Body`] stream and remembers the
//! responses it replaced as a chain of [`Hop`]s, newest first.

use crate::error::FetchError;
use bytes::Bytes;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use std::fmt;
use std::sync::Arc;
use url::Url;

/// An outgoing request
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
}

impl Request {
    /// Create a request with no extra headers
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
        }
    }

    /// Create a GET request
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Set a header, replacing any previous value
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// A response that was replaced by a later one in the same fetch
#[derive(Debug)]
pub struct Hop {
    pub status: StatusCode,
    pub request: Request,
    pub previous: Option<Arc<Hop>>,
}

impl Hop {
    /// Copy this chain with `root` attached below its oldest link
    fn rooted_at(&self, root: Arc<Hop>) -> Arc<Hop> {
        let previous = match &self.previous {
            Some(hop) => hop.rooted_at(root),
            None => root,
        };
        Arc::new(Hop {
            status: self.status,
            request: self.request.clone(),
            previous: Some(previous),
        })
    }
}

/// Response body as a stream of byte chunks
///
/// Dropping the body drops the underlying stream, which closes the
/// connection it reads from.
pub struct Body {
    stream: BoxStream<'static, Result<Bytes, FetchError>>,
}

impl Body {
    /// Wrap an arbitrary chunk stream
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, FetchError>> + Send + 'static,
    {
        Self {
            stream: stream.boxed(),
        }
    }

    pub fn empty() -> Self {
        Self::from_stream(stream::empty())
    }

    pub(crate) fn into_stream(self) -> BoxStream<'static, Result<Bytes, FetchError>> {
        self.stream
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::from_stream(stream::once(async move { Ok(bytes) }))
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Bytes::from(bytes).into()
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Bytes::from_static(text.as_bytes()).into()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Body { .. }")
    }
}

/// A received response with its redirect chain
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    length: Option<u64>,
    request: Request,
    previous: Option<Arc<Hop>>,
    body: Body,
}

impl Response {
    /// Create a response; the declared length is taken from `Content-Length`
    pub fn new(request: Request, status: StatusCode, headers: HeaderMap, body: Body) -> Self {
        let length = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse().ok());
        Self {
            status,
            headers,
            length,
            request,
            previous: None,
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Declared body length, `None` if unknown
    pub fn length(&self) -> Option<u64> {
        self.length
    }

    /// The request that produced this response
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Effective URL of this response
    pub fn url(&self) -> &Url {
        &self.request.url
    }

    /// The response this one replaced, if any
    pub fn previous(&self) -> Option<&Arc<Hop>> {
        self.previous.as_ref()
    }

    /// Iterate over replaced responses, newest first
    pub fn chain(&self) -> impl Iterator<Item = &Hop> {
        std::iter::successors(self.previous.as_deref(), |hop| hop.previous.as_deref())
    }

    /// The request that started the chain
    pub fn first_request(&self) -> &Request {
        self.chain()
            .last()
            .map(|hop| &hop.request)
            .unwrap_or(&self.request)
    }

    /// First value of a header as a string
    pub fn header_str(&self, name: HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Raw `Content-Type` header value
    pub fn content_type(&self) -> Option<&str> {
        self.header_str(CONTENT_TYPE)
    }

    /// Normalized media type: parameters stripped, lowercased
    pub fn media_type(&self) -> Option<String> {
        self.content_type()
            .map(media_type)
            .filter(|mt| !mt.is_empty())
    }

    /// `charset` parameter of the `Content-Type` header
    pub fn charset(&self) -> Option<String> {
        self.content_type()
            .and_then(|ct| header_param(ct, "charset"))
    }

    /// Snapshot of this response as a chain link
    pub fn hop(&self) -> Arc<Hop> {
        Arc::new(Hop {
            status: self.status,
            request: self.request.clone(),
            previous: self.previous.clone(),
        })
    }

    /// Attach `previous` below the oldest link of this response's chain
    ///
    /// Existing links are never replaced, so repeated calls only extend the
    /// chain at its root.
    pub fn set_previous_response(&mut self, previous: Arc<Hop>) {
        self.previous = Some(match self.previous.take() {
            Some(hop) => hop.rooted_at(previous),
            None => previous,
        });
    }

    pub fn into_body(self) -> Body {
        self.body
    }

    pub(crate) fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub(crate) fn set_length(&mut self, length: Option<u64>) {
        self.length = length;
    }

    pub(crate) fn replace_body(&mut self, body: Body) -> Body {
        std::mem::replace(&mut self.body, body)
    }
}

/// Split a header value like `text/html; charset=utf-8` into its main value
/// and lowercased parameter names with unquoted values
pub fn parse_header(value: &str) -> (String, Vec<(String, String)>) {
    let mut parts = value.split(';');
    let main = parts.next().unwrap_or("").trim().to_string();
    let params = parts
        .filter_map(|part| {
            let (name, value) = part.split_once('=')?;
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim().trim_matches('"').to_string();
            (!name.is_empty()).then_some((name, value))
        })
        .collect();
    (main, params)
}

/// Media type of a `Content-Type` value without parameters
pub fn media_type(value: &str) -> String {
    parse_header(value).0.to_ascii_lowercase()
}

/// Look up a single parameter of a header value
pub fn header_param(value: &str, name: &str) -> Option<String> {
    parse_header(value)
        .1
        .into_iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value)
}

//! Title fetching
//!
//! A [`TitleFetcher`] drives one "title for this URL" operation: it requests
//! the document through its agent, hands the response to the extractor
//! registered for its media type, and follows soft redirects up to a fixed
//! budget. Hard redirects are followed by the agent with a budget of their
//! own.

use crate::agent::{self, Agent, HttpTransport, Resolve, SystemResolver, DEFAULT_MAX_REDIRECTS};
use crate::client::FetchOptions;
use crate::error::{describe_error, FetchError, TOO_MANY_REDIRECTS_MESSAGE};
use crate::extractors::{Extraction, ExtractorRegistry};
use crate::http::{Hop, Request, Response};
use crate::humanize::filesize;
use crate::DEFAULT_USER_AGENT;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Default number of soft redirects followed per fetch
pub const DEFAULT_MAX_SOFT_REDIRECTS: usize = 2;

/// Default deadline for a whole fetch, across all hops
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A URL to fetch, along with its host as the caller wrote it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTarget {
    url: Url,
    display_host: String,
}

impl FetchTarget {
    /// Parse a URL string, keeping the host in its original form
    pub fn parse(input: &str) -> Result<Self, FetchError> {
        let input = input.trim();
        let url = Url::parse(input).map_err(|e| FetchError::InvalidUrl(format!("{input}: {e}")))?;
        let display_host = raw_host(input)
            .filter(|host| !host.is_empty())
            .map(str::to_string)
            .or_else(|| url.host_str().map(str::to_string))
            .unwrap_or_default();
        Ok(Self { url, display_host })
    }

    /// Normalized URL that will be requested
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Host as originally provided, before any normalization
    pub fn display_host(&self) -> &str {
        &self.display_host
    }
}

impl From<Url> for FetchTarget {
    fn from(url: Url) -> Self {
        let display_host = url.host_str().unwrap_or_default().to_string();
        Self { url, display_host }
    }
}

/// Anything [`TitleFetcher::fetch_title`] accepts as a URL
pub trait IntoTarget {
    fn into_target(self) -> Result<FetchTarget, FetchError>;
}

impl IntoTarget for FetchTarget {
    fn into_target(self) -> Result<FetchTarget, FetchError> {
        Ok(self)
    }
}

impl IntoTarget for Url {
    fn into_target(self) -> Result<FetchTarget, FetchError> {
        Ok(self.into())
    }
}

impl IntoTarget for &Url {
    fn into_target(self) -> Result<FetchTarget, FetchError> {
        Ok(self.clone().into())
    }
}

impl IntoTarget for &str {
    fn into_target(self) -> Result<FetchTarget, FetchError> {
        FetchTarget::parse(self)
    }
}

impl IntoTarget for String {
    fn into_target(self) -> Result<FetchTarget, FetchError> {
        FetchTarget::parse(&self)
    }
}

impl IntoTarget for &String {
    fn into_target(self) -> Result<FetchTarget, FetchError> {
        FetchTarget::parse(self)
    }
}

/// Host part of a URL string without parsing or normalizing it
fn raw_host(input: &str) -> Option<&str> {
    let (_, rest) = input.split_once("://")?;
    let authority = rest.split(['/', '\\', '?', '#']).next()?;
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    if host_port.starts_with('[') {
        let end = host_port.find(']')?;
        return Some(&host_port[..=end]);
    }
    host_port.split(':').next()
}

/// Builder for configuring a [`TitleFetcher`]
#[derive(Clone)]
pub struct TitleFetcherBuilder {
    user_agent: Option<String>,
    max_soft_redirects: usize,
    max_hard_redirects: usize,
    timeout: Option<Duration>,
    connect_timeout: Duration,
    resolver: Option<Arc<dyn Resolve>>,
    extractors: Option<ExtractorRegistry>,
}

impl Default for TitleFetcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TitleFetcherBuilder {
    pub fn new() -> Self {
        Self {
            user_agent: None,
            max_soft_redirects: DEFAULT_MAX_SOFT_REDIRECTS,
            max_hard_redirects: DEFAULT_MAX_REDIRECTS,
            timeout: Some(DEFAULT_TIMEOUT),
            connect_timeout: agent::CONNECT_TIMEOUT,
            resolver: None,
            extractors: None,
        }
    }

    /// Set custom User-Agent
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Soft redirects (e.g. `<meta>` refreshes) followed before giving up
    pub fn max_soft_redirects(mut self, max: usize) -> Self {
        self.max_soft_redirects = max;
        self
    }

    /// Protocol-level redirects followed per request
    pub fn max_hard_redirects(mut self, max: usize) -> Self {
        self.max_hard_redirects = max;
        self
    }

    /// Deadline for the whole fetch; `None` disables it
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Resolver used by the host blacklist check
    pub fn resolver(mut self, resolver: Arc<dyn Resolve>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Replace the built-in extractors
    pub fn extractors(mut self, extractors: ExtractorRegistry) -> Self {
        self.extractors = Some(extractors);
        self
    }

    /// Build a fetcher backed by the default agent stack
    pub fn build(self) -> Result<TitleFetcher, FetchError> {
        let user_agent = self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
        let transport = HttpTransport::new(user_agent, self.connect_timeout)?;
        let resolver = self.resolver.unwrap_or_else(|| Arc::new(SystemResolver));
        let agent = agent::layered(transport, resolver, self.max_hard_redirects);
        let extractors = self.extractors.unwrap_or_else(ExtractorRegistry::with_defaults);

        Ok(TitleFetcher::with_agent(agent, extractors)
            .with_max_soft_redirects(self.max_soft_redirects)
            .with_timeout(self.timeout))
    }
}

/// Fetches documents and summarizes them as a one-line title
#[derive(Clone)]
pub struct TitleFetcher {
    agent: Arc<dyn Agent>,
    extractors: Arc<ExtractorRegistry>,
    max_soft_redirects: usize,
    timeout: Option<Duration>,
}

/// Final title plus the hosts at either end of the redirect chain, if a
/// response was received
struct Outcome {
    title: String,
    hosts: Option<ChainHosts>,
}

/// Host of the chain's first request and of the final response
#[derive(Debug, Clone, PartialEq, Eq)]
struct ChainHosts {
    first: Option<String>,
    last: Option<String>,
}

impl ChainHosts {
    fn of(response: &Response) -> Self {
        Self {
            first: response.first_request().url.host_str().map(str::to_string),
            last: response.url().host_str().map(str::to_string),
        }
    }
}

impl TitleFetcher {
    /// Create a fetcher with default settings
    pub fn new() -> Result<Self, FetchError> {
        TitleFetcherBuilder::new().build()
    }

    /// Create a new fetcher builder
    pub fn builder() -> TitleFetcherBuilder {
        TitleFetcherBuilder::new()
    }

    /// Create a fetcher around an existing agent
    pub fn with_agent(agent: impl Agent + 'static, extractors: ExtractorRegistry) -> Self {
        Self {
            agent: Arc::new(agent),
            extractors: Arc::new(extractors),
            max_soft_redirects: DEFAULT_MAX_SOFT_REDIRECTS,
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }

    pub fn with_max_soft_redirects(mut self, max: usize) -> Self {
        self.max_soft_redirects = max;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn extractors(&self) -> &ExtractorRegistry {
        &self.extractors
    }

    /// Fetch the document at `url` and return its title or summary
    ///
    /// With `hostname_tag`, the title is prefixed with `[host]`, or
    /// `[initial → final]` when the final response came from a different
    /// host than the one originally given. With `friendly_errors`, common
    /// connection failures are returned as a description instead of an
    /// error; everything else is always returned as an error.
    pub async fn fetch_title(
        &self,
        url: impl IntoTarget,
        options: FetchOptions,
    ) -> Result<String, FetchError> {
        let target = url.into_target()?;
        if !matches!(target.url().scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrlScheme);
        }

        let run = self.run(&target, options.friendly_errors);
        let outcome = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, run)
                .await
                .map_err(|_| FetchError::Timeout)??,
            None => run.await?,
        };

        if !options.hostname_tag {
            return Ok(outcome.title);
        }
        Ok(format!(
            "[{}] {}",
            host_tag(&target, outcome.hosts.as_ref()),
            outcome.title
        ))
    }

    async fn run(&self, target: &FetchTarget, friendly_errors: bool) -> Result<Outcome, FetchError> {
        let mut current = target.url().clone();
        let mut previous: Option<Arc<Hop>> = None;
        let mut soft_redirects = 0usize;

        loop {
            let mut response = match self.agent.request(Request::get(current.clone())).await {
                Ok(response) => response,
                Err(e) if friendly_errors => {
                    let title = describe_error(e)?;
                    return Ok(Outcome { title, hosts: None });
                }
                Err(e) => return Err(e),
            };
            if let Some(hop) = previous.take() {
                response.set_previous_response(hop);
            }

            let media_type = response.media_type();
            let length = response.length();
            let final_url = response.url().clone();
            let hosts = ChainHosts::of(&response);
            let hop = response.hop();

            let extractor = media_type
                .as_deref()
                .and_then(|mt| self.extractors.lookup(mt))
                .cloned();
            let extraction = match extractor {
                Some(extractor) => {
                    debug!(extractor = extractor.name(), url = %final_url, "Using extractor");
                    match extractor.extract(response).await {
                        Ok(extraction) => extraction,
                        Err(e) => {
                            warn!(extractor = extractor.name(), url = %final_url, error = %e, "Extractor failed");
                            Extraction::NoTitle
                        }
                    }
                }
                None => {
                    debug!(content_type = ?media_type, url = %final_url, "No extractor for content type");
                    Extraction::NoTitle
                }
            };

            let redirect = match extraction {
                Extraction::Title(title) => {
                    return Ok(Outcome {
                        title,
                        hosts: Some(hosts),
                    })
                }
                Extraction::NoTitle => {
                    return Ok(Outcome {
                        title: placeholder(media_type.as_deref(), length),
                        hosts: Some(hosts),
                    })
                }
                Extraction::Redirect(redirect) => redirect,
            };

            soft_redirects += 1;
            if soft_redirects > self.max_soft_redirects {
                if friendly_errors {
                    return Ok(Outcome {
                        title: TOO_MANY_REDIRECTS_MESSAGE.to_string(),
                        hosts: Some(hosts),
                    });
                }
                return Err(FetchError::TooManyRedirects {
                    location: redirect.location,
                });
            }

            current = final_url.join(&redirect.location).map_err(|e| {
                FetchError::InvalidUrl(format!("soft redirect to {:?}: {e}", redirect.location))
            })?;
            if !matches!(current.scheme(), "http" | "https") {
                return Err(FetchError::InvalidUrlScheme);
            }
            debug!(from = %final_url, to = %current, soft_redirects, "Following soft redirect");
            previous = Some(hop);
        }
    }
}

/// Generic description for documents without a better title
fn placeholder(media_type: Option<&str>, length: Option<u64>) -> String {
    let mut title = format!("{} document", media_type.unwrap_or("Unknown"));
    if let Some(length) = length {
        title.push_str(&format!(" ({})", filesize(length)));
    }
    title
}

fn host_tag(target: &FetchTarget, hosts: Option<&ChainHosts>) -> String {
    let Some(hosts) = hosts else {
        return target.display_host().to_string();
    };
    // The chain starts at the target, which is shown as the caller wrote it
    let initial = match hosts.first.as_deref() {
        Some(first) if Some(first) != target.url().host_str() => first,
        _ => target.display_host(),
    };
    match hosts.last.as_deref() {
        Some(last) if !last.eq_ignore_ascii_case(initial) => format!("{initial} \u{2192} {last}"),
        _ => initial.to_string(),
    }
}

//! TitleKit - one-line summaries of web documents
//!
//! This crate fetches a remote document and derives a short title for it,
//! with limits suitable for untrusted input such as links pasted into a
//! chat channel.
//!
//! ## Pipeline
//!
//! A [`TitleFetcher`] requests the document through a stack of
//! [`Agent`](agent::Agent) layers that decompress bodies, follow HTTP
//! redirects and refuse to connect to private or loopback addresses. The
//! response is handed to the [`Extractor`] registered for its media type,
//! which reads at most a fixed number of bytes. Extractors may answer with a
//! soft redirect, such as a `<meta>` refresh, which the fetcher follows up
//! to a fixed budget.
//!
//! Built-in extractors:
//! - [`HtmlExtractor`] - `<title>` text and `<meta>` refreshes
//! - [`PlainTextExtractor`] - first line of the document
//! - [`ImageExtractor`] - format, dimensions and animation length
//! - [`AvExtractor`] - container, streams and running time of media files
//!
//! ```no_run
//! # async fn run() -> Result<(), titlekit::FetchError> {
//! use titlekit::{FetchOptions, TitleFetcher};
//!
//! let fetcher = TitleFetcher::new()?;
//! let title = fetcher
//!     .fetch_title("https://example.com/", FetchOptions::default().with_hostname_tag(true))
//!     .await?;
//! println!("{title}");
//! # Ok(())
//! # }
//! ```

pub mod agent;
mod body;
pub mod client;
mod error;
pub mod extractors;
mod fetcher;
pub mod http;
pub mod humanize;

pub use body::read_body;
pub use client::{fetch_title, FetchOptions};
pub use error::{
    describe_error, FetchError, COULD_NOT_CONNECT_MESSAGE, INCOMPLETE_RESPONSE_MESSAGE,
    TOO_MANY_REDIRECTS_MESSAGE,
};
pub use extractors::{
    AvExtractor, Extraction, Extractor, ExtractorRegistry, HtmlExtractor, ImageExtractor,
    PlainTextExtractor, SoftRedirect,
};
pub use fetcher::{
    FetchTarget, IntoTarget, TitleFetcher, TitleFetcherBuilder, DEFAULT_MAX_SOFT_REDIRECTS,
    DEFAULT_TIMEOUT,
};

/// Default User-Agent string
pub const DEFAULT_USER_AGENT: &str = "Everruns TitleKit/1.0";

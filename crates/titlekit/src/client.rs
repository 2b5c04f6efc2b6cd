//! Convenience entry points for TitleKit
//!
//! The actual fetch logic lives in [`TitleFetcher`](crate::TitleFetcher);
//! this module provides per-call options and a one-shot helper.

use crate::error::FetchError;
use crate::fetcher::{IntoTarget, TitleFetcher};
use serde::{Deserialize, Serialize};

/// Per-call fetch options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchOptions {
    /// Prefix the title with the requested host, and the final host if it
    /// differs
    pub hostname_tag: bool,
    /// Return descriptions of common failures instead of errors
    pub friendly_errors: bool,
}

impl FetchOptions {
    pub fn with_hostname_tag(mut self, enabled: bool) -> Self {
        self.hostname_tag = enabled;
        self
    }

    pub fn with_friendly_errors(mut self, enabled: bool) -> Self {
        self.friendly_errors = enabled;
        self
    }
}

/// Fetch a URL and return its title
///
/// Builds a [`TitleFetcher`] with default settings for this call only. For
/// repeated fetches or custom configuration, build one with
/// [`TitleFetcher::builder`] and reuse it.
pub async fn fetch_title(url: impl IntoTarget, options: FetchOptions) -> Result<String, FetchError> {
    let target = url.into_target()?;
    TitleFetcher::new()?.fetch_title(target, options).await
}

//! Title extractors for specific content types
//!
//! Design: each extractor declares the media types it understands. The
//! [`ExtractorRegistry`] maps every declared media type to its extractor
//! and is built once, then shared read-only.

mod av;
mod html;
mod image;
mod text;

pub use self::av::AvExtractor;
pub use self::html::HtmlExtractor;
pub use self::image::ImageExtractor;
pub use self::text::PlainTextExtractor;

use crate::error::FetchError;
use crate::http::Response;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// A document asking for its title to be taken from another location,
/// such as an HTML `<meta>` refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftRedirect {
    /// Absolute or relative URL of the new location
    pub location: String,
}

impl SoftRedirect {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }
}

/// What an extractor made of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Human-readable title or summary
    Title(String),
    /// Fetch another location instead
    Redirect(SoftRedirect),
    /// Nothing useful found
    NoTitle,
}

/// Trait for content-type specific title extractors
///
/// Extractors are expected to bound how much of the body they read with
/// [`read_body`](crate::read_body).
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Unique identifier for this extractor (for logging/debugging)
    fn name(&self) -> &'static str;

    /// Normalized media types handled by this extractor
    fn content_types(&self) -> &'static [&'static str];

    /// Produce a title, a soft redirect, or nothing for `response`
    async fn extract(&self, response: Response) -> Result<Extraction, FetchError>;
}

/// Media type to extractor mapping
#[derive(Clone, Default)]
pub struct ExtractorRegistry {
    extractors: HashMap<String, Arc<dyn Extractor>>,
}

impl ExtractorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in extractors
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(HtmlExtractor::new()));
        registry.register(Arc::new(PlainTextExtractor::new()));
        registry.register(Arc::new(ImageExtractor::new()));
        registry.register(Arc::new(AvExtractor::new()));
        registry
    }

    /// Register an extractor for each of its media types
    ///
    /// A media type that is already registered is taken over by the later
    /// registration.
    pub fn register(&mut self, extractor: Arc<dyn Extractor>) {
        for content_type in extractor.content_types() {
            self.extractors
                .insert(content_type.to_ascii_lowercase(), extractor.clone());
        }
    }

    /// Find the extractor for a normalized media type
    pub fn lookup(&self, media_type: &str) -> Option<&Arc<dyn Extractor>> {
        self.extractors.get(media_type)
    }

    /// Registered media types, sorted
    pub fn content_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.extractors.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}

impl std::fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for content_type in self.content_types() {
            if let Some(extractor) = self.extractors.get(content_type) {
                map.entry(&content_type, &extractor.name());
            }
        }
        map.finish()
    }
}

/// Decode document bytes with the declared charset
///
/// UTF-8 is the default; single-byte Latin charsets are mapped directly and
/// anything unrecognized falls back to UTF-8 with replacement characters.
pub(crate) fn decode_text(bytes: &[u8], charset: Option<&str>) -> String {
    let charset = charset.map(|c| c.trim().to_ascii_lowercase());
    match charset.as_deref() {
        Some("iso-8859-1" | "latin1" | "latin-1" | "l1" | "us-ascii" | "ascii" | "windows-1252") => {
            bytes.iter().map(|&b| b as char).collect()
        }
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

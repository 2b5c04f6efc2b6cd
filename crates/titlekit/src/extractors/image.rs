//! Image summary extractor

use super::{Extraction, Extractor};
use crate::body::read_body;
use crate::error::FetchError;
use crate::http::Response;
use crate::humanize::{duration, filesize};
use ::image::codecs::gif::GifDecoder;
use ::image::{AnimationDecoder, ImageDecoder, ImageFormat, ImageReader, Limits};
use async_trait::async_trait;
use std::io::Cursor;
use tracing::debug;

/// Describes images by format, dimensions and, for complete GIF
/// animations, running time
#[derive(Debug, Clone)]
pub struct ImageExtractor {
    /// Maximum number of bytes downloaded per image
    pub max_download_bytes: usize,
}

impl ImageExtractor {
    pub fn new() -> Self {
        Self {
            max_download_bytes: 64 * 1024,
        }
    }
}

impl Default for ImageExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Extractor for ImageExtractor {
    fn name(&self) -> &'static str {
        "image"
    }

    fn content_types(&self) -> &'static [&'static str] {
        &["image/png", "image/gif", "image/jpeg", "image/webp"]
    }

    async fn extract(&self, response: Response) -> Result<Extraction, FetchError> {
        let length = response.length();
        let truncated = length.map_or(true, |len| len > self.max_download_bytes as u64);
        let content = read_body(response.into_body(), Some(self.max_download_bytes)).await;
        Ok(summarize(&content, length, truncated))
    }
}

fn summarize(content: &[u8], length: Option<u64>, truncated: bool) -> Extraction {
    let reader = match ImageReader::new(Cursor::new(content)).with_guessed_format() {
        Ok(reader) => reader,
        Err(_) => return Extraction::NoTitle,
    };
    let Some(format) = reader.format() else {
        return Extraction::NoTitle;
    };
    // The data may be invalid, or we may have cut it off too early
    let (width, height) = match reader.into_dimensions() {
        Ok(dimensions) => dimensions,
        Err(e) => {
            debug!(error = %e, "Could not read image dimensions");
            return Extraction::NoTitle;
        }
    };

    let mut kind = "image";
    let mut details = String::new();
    if format == ImageFormat::Gif {
        if let Some(frames) = gif_frames(content, width, height) {
            if frames.count > 1 {
                kind = "animation";
                // Frame delays are only meaningful for the whole file
                if !truncated && frames.complete {
                    details.push_str(&format!(", {}", duration(frames.total_ms / 1000.0)));
                }
            }
        }
    }
    if let Some(length) = length {
        details.push_str(&format!(", {}", filesize(length)));
    }

    Extraction::Title(format!(
        "{} {kind} ({width} \u{d7} {height} pixels{details})",
        format_name(format)
    ))
}

/// Largest GIF canvas whose frames are walked, in pixels
const MAX_CANVAS_PIXELS: u64 = 4 * 1024 * 1024;

/// Canvas pixels composited across all frames before the walk stops
const MAX_COMPOSITED_PIXELS: u64 = 64 * 1024 * 1024;

/// Frames walked before giving up on counting
const MAX_FRAMES: usize = 1000;

/// Decodable frames of a GIF animation
#[derive(Debug, Clone, Copy, PartialEq)]
struct GifFrames {
    count: usize,
    total_ms: f64,
    /// Every frame was walked
    complete: bool,
}

/// Walks the frames of a GIF, within fixed memory and work bounds
///
/// Each frame is composited onto a full canvas, so canvases above
/// [`MAX_CANVAS_PIXELS`] are not walked at all.
fn gif_frames(content: &[u8], width: u32, height: u32) -> Option<GifFrames> {
    let canvas = u64::from(width) * u64::from(height);
    if canvas > MAX_CANVAS_PIXELS {
        debug!(width, height, "GIF canvas too large to walk frames");
        return None;
    }

    let mut limits = Limits::default();
    limits.max_image_width = Some(width);
    limits.max_image_height = Some(height);
    // Room for the composited canvas, one output frame and the raw frame
    limits.max_alloc = Some(canvas * 16 + (1 << 20));
    let mut decoder = GifDecoder::new(Cursor::new(content)).ok()?;
    decoder.set_limits(limits).ok()?;

    let mut walked = GifFrames {
        count: 0,
        total_ms: 0.0,
        complete: true,
    };
    for frame in decoder.into_frames() {
        if walked.count >= MAX_FRAMES || (walked.count as u64 + 1) * canvas > MAX_COMPOSITED_PIXELS {
            walked.complete = false;
            break;
        }
        let Ok(frame) = frame else {
            walked.complete = false;
            break;
        };
        let (numer, denom) = frame.delay().numer_denom_ms();
        if denom != 0 {
            walked.total_ms += f64::from(numer) / f64::from(denom);
        }
        walked.count += 1;
    }
    Some(walked)
}

fn format_name(format: ImageFormat) -> String {
    match format {
        ImageFormat::Png => "PNG".to_string(),
        ImageFormat::Gif => "GIF".to_string(),
        ImageFormat::Jpeg => "JPEG".to_string(),
        ImageFormat::WebP => "WebP".to_string(),
        other => format!("{other:?}").to_uppercase(),
    }
}

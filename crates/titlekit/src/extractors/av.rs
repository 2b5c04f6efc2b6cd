//! Audio and video summary extractor

use super::{Extraction, Extractor};
use crate::body::read_body;
use crate::error::FetchError;
use crate::http::Response;
use crate::humanize::{duration, filesize};
use async_trait::async_trait;
use std::io::Cursor;
use symphonia::core::codecs::{CodecParameters, CODEC_TYPE_NULL};
use symphonia::core::formats::{FormatOptions, Track};
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

/// Describes media files by container, streams and running time
///
/// Only the container headers are inspected; nothing is decoded.
#[derive(Debug, Clone)]
pub struct AvExtractor {
    /// Maximum number of bytes downloaded per file
    pub max_download_bytes: usize,
}

impl AvExtractor {
    pub fn new() -> Self {
        Self {
            max_download_bytes: 4 * 1024 * 1024,
        }
    }
}

impl Default for AvExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Extractor for AvExtractor {
    fn name(&self) -> &'static str {
        "av"
    }

    fn content_types(&self) -> &'static [&'static str] {
        &["audio/mpeg", "video/mp4", "video/webm", "video/x-matroska"]
    }

    async fn extract(&self, response: Response) -> Result<Extraction, FetchError> {
        let media_type = response.media_type();
        let length = response.length();
        let content = read_body(response.into_body(), Some(self.max_download_bytes)).await;

        let mut hint = Hint::new();
        if let Some(media_type) = media_type.as_deref() {
            hint.mime_type(media_type);
        }
        let source = MediaSourceStream::new(
            Box::new(Cursor::new(content.to_vec())),
            MediaSourceStreamOptions::default(),
        );
        let probed = match symphonia::default::get_probe().format(
            &hint,
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        ) {
            Ok(probed) => probed,
            Err(e) => {
                debug!(error = %e, "Could not read media container");
                return Ok(Extraction::NoTitle);
            }
        };

        let format = container_name(media_type.as_deref().unwrap_or_default());
        Ok(summarize(format, probed.format.tracks(), length)
            .map_or(Extraction::NoTitle, Extraction::Title))
    }
}

fn container_name(media_type: &str) -> &'static str {
    match media_type {
        "audio/mpeg" => "MPEG audio",
        "video/mp4" => "MP4",
        "video/webm" => "WebM",
        "video/x-matroska" => "Matroska",
        _ => "Media",
    }
}

fn summarize(format: &str, tracks: &[Track], length: Option<u64>) -> Option<String> {
    if tracks.is_empty() {
        return None;
    }
    let streams: Vec<String> = tracks
        .iter()
        .map(|track| describe_stream(&track.codec_params))
        .collect();

    let mut details = Vec::new();
    let seconds = tracks
        .iter()
        .filter_map(|track| track_seconds(&track.codec_params))
        .fold(None, |longest: Option<f64>, s| Some(longest.map_or(s, |l| l.max(s))));
    if let Some(seconds) = seconds {
        details.push(duration(seconds));
    }
    if let Some(length) = length {
        details.push(filesize(length));
    }

    let mut title = format!("{format} file containing {}", streams.join(" and "));
    if !details.is_empty() {
        title.push_str(&format!(" ({})", details.join(", ")));
    }
    Some(title)
}

/// Only audio codecs are known to the demuxers; anything else is reported
/// generically
fn describe_stream(params: &CodecParameters) -> String {
    if params.codec == CODEC_TYPE_NULL {
        return "other stream".to_string();
    }
    match symphonia::default::get_codecs().get_codec(params.codec) {
        Some(codec) => format!("{} audio", codec.long_name),
        None => "other stream".to_string(),
    }
}

fn track_seconds(params: &CodecParameters) -> Option<f64> {
    let frames = params.n_frames?;
    if let Some(time_base) = params.time_base {
        let time = time_base.calc_time(frames);
        return Some(time.seconds as f64 + time.frac);
    }
    params
        .sample_rate
        .filter(|&rate| rate > 0)
        .map(|rate| frames as f64 / f64::from(rate))
}

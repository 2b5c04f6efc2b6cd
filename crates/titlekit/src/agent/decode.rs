//! Transparent content decoding

use super::Agent;
use crate::error::FetchError;
use crate::http::{Body, Request, Response};
use async_trait::async_trait;
use bytes::{Buf, Bytes, BytesMut};
use flate2::{Decompress, FlushDecompress, Status};
use futures::{stream, StreamExt};
use reqwest::header::{HeaderValue, ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_LENGTH};
use std::io;
use tracing::debug;

/// Encodings advertised to servers
const ACCEPTED_ENCODINGS: &str = "gzip, deflate";

/// Largest chunk of decoded output produced at once
pub(crate) const BLOCK_SIZE: usize = 16 * 1024;

/// Longest gzip member header accepted, including name and comment
const MAX_GZIP_HEADER: usize = 64 * 1024;

/// Agent wrapper that decompresses gzip and deflate bodies as they stream
///
/// Decoded responses lose their `Content-Encoding` and `Content-Length`
/// headers and report an unknown length. Output is produced in blocks of at
/// most [`BLOCK_SIZE`] bytes, so a reader that stops early also stops
/// decompression.
pub struct DecodingAgent<A> {
    inner: A,
}

impl<A> DecodingAgent<A> {
    pub fn new(inner: A) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<A: Agent> Agent for DecodingAgent<A> {
    async fn request(&self, request: Request) -> Result<Response, FetchError> {
        let request = request.header(ACCEPT_ENCODING, HeaderValue::from_static(ACCEPTED_ENCODINGS));
        let mut response = self.inner.request(request).await?;

        let inflater = match response
            .header_str(CONTENT_ENCODING)
            .map(|v| v.trim().to_ascii_lowercase())
            .as_deref()
        {
            Some("gzip") | Some("x-gzip") => Inflater::gzip(),
            Some("deflate") => Inflater::zlib(),
            _ => return Ok(response),
        };

        debug!(url = %response.url(), encoding = inflater.name(), "Decoding response body");
        response.headers_mut().remove(CONTENT_ENCODING);
        response.headers_mut().remove(CONTENT_LENGTH);
        response.set_length(None);
        let body = response.replace_body(Body::empty());
        response.replace_body(inflate(body, inflater));
        Ok(response)
    }
}

/// Incremental decompressor fed one chunk at a time
struct Inflater {
    gzip: bool,
    /// Still looking for the end of the gzip member header
    awaiting_header: bool,
    decompress: Decompress,
    /// Compressed bytes not yet consumed
    input: BytesMut,
    seen_input: bool,
    finished: bool,
}

impl Inflater {
    fn gzip() -> Self {
        Self::new(true, Decompress::new(false))
    }

    fn zlib() -> Self {
        Self::new(false, Decompress::new(true))
    }

    fn new(gzip: bool, decompress: Decompress) -> Self {
        Self {
            gzip,
            awaiting_header: gzip,
            decompress,
            input: BytesMut::new(),
            seen_input: false,
            finished: false,
        }
    }

    fn name(&self) -> &'static str {
        if self.gzip {
            "gzip"
        } else {
            "deflate"
        }
    }

    fn push(&mut self, chunk: &[u8]) {
        if !chunk.is_empty() {
            self.seen_input = true;
        }
        if !self.finished {
            self.input.extend_from_slice(chunk);
        }
    }

    /// Next block of decoded output, or `None` if more input is needed or
    /// the compressed stream has ended
    fn next_block(&mut self) -> io::Result<Option<Bytes>> {
        if self.awaiting_header {
            match gzip_header_len(&self.input)? {
                Some(len) => {
                    self.input.advance(len);
                    self.awaiting_header = false;
                }
                None if self.input.len() > MAX_GZIP_HEADER => {
                    return Err(invalid("gzip header too long"));
                }
                None => return Ok(None),
            }
        }

        while !self.finished {
            let mut output = Vec::with_capacity(BLOCK_SIZE);
            let before = self.decompress.total_in();
            let status = self
                .decompress
                .decompress_vec(&self.input, &mut output, FlushDecompress::None)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            let consumed = (self.decompress.total_in() - before) as usize;
            self.input.advance(consumed);

            if status == Status::StreamEnd {
                // Trailers and anything after them are ignored
                self.finished = true;
                self.input.clear();
            }
            if !output.is_empty() {
                return Ok(Some(Bytes::from(output)));
            }
            if consumed == 0 {
                break;
            }
        }
        Ok(None)
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether the input seen so far forms a complete body
    fn is_complete(&self) -> bool {
        self.finished || !self.seen_input
    }
}

const FEXTRA: u8 = 0x04;
const FNAME: u8 = 0x08;
const FCOMMENT: u8 = 0x10;
const FHCRC: u8 = 0x02;

/// Length of the gzip member header at the start of `data`, or `None` if
/// more data is needed to tell
fn gzip_header_len(data: &[u8]) -> io::Result<Option<usize>> {
    if data.len() < 10 {
        return Ok(None);
    }
    if data[..3] != [0x1f, 0x8b, 0x08] {
        return Err(invalid("not a gzip stream"));
    }
    let flags = data[3];
    let mut pos = 10;

    if flags & FEXTRA != 0 {
        let Some(len) = data.get(pos..pos + 2) else {
            return Ok(None);
        };
        pos += 2 + usize::from(u16::from_le_bytes([len[0], len[1]]));
    }
    for flag in [FNAME, FCOMMENT] {
        if flags & flag != 0 {
            match data.get(pos..).and_then(|rest| rest.iter().position(|&b| b == 0)) {
                Some(end) => pos += end + 1,
                None => return Ok(None),
            }
        }
    }
    if flags & FHCRC != 0 {
        pos += 2;
    }

    Ok((data.len() >= pos).then_some(pos))
}

fn invalid(message: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.to_string())
}

fn inflate(body: Body, inflater: Inflater) -> Body {
    let state = Some((body.into_stream(), inflater));
    let decoded = stream::unfold(state, |state| async move {
        let (mut chunks, mut inflater) = state?;
        loop {
            match inflater.next_block() {
                Ok(Some(block)) => return Some((Ok(block), Some((chunks, inflater)))),
                Ok(None) if inflater.is_finished() => return None,
                Ok(None) => {}
                Err(e) => return Some((Err(decode_failure(e)), None)),
            }
            match chunks.next().await {
                Some(Ok(chunk)) => inflater.push(&chunk),
                Some(Err(e)) => return Some((Err(e), None)),
                None if inflater.is_complete() => return None,
                None => {
                    let truncated = io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "compressed body ended early",
                    );
                    return Some((Err(decode_failure(truncated)), None));
                }
            }
        }
    });
    Body::from_stream(decoded)
}

fn decode_failure(e: io::Error) -> FetchError {
    FetchError::ResponseFailure(format!("failed to decode response body: {e}"))
}

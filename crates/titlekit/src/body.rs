//! Byte-bounded body reading

use crate::http::Body;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use tracing::{debug, warn};

/// Read at most `max_bytes` bytes of `body`, or all of it if `None`
///
/// Once the limit is reached the stream is dropped, closing the connection
/// without waiting for the peer to finish sending. A read error ends the
/// body early and whatever arrived before it is returned.
pub async fn read_body(body: Body, max_bytes: Option<usize>) -> Bytes {
    let mut remaining = max_bytes.unwrap_or(usize::MAX);
    let mut buffer = BytesMut::new();
    let mut stream = body.into_stream();

    while remaining > 0 {
        match stream.next().await {
            Some(Ok(chunk)) => {
                let take = chunk.len().min(remaining);
                buffer.extend_from_slice(&chunk[..take]);
                remaining -= take;
            }
            Some(Err(e)) => {
                warn!(error = %e, "Error reading body chunk, keeping partial content");
                break;
            }
            None => break,
        }
    }

    if remaining == 0 {
        debug!(bytes = buffer.len(), "Body limit reached, closing stream");
    }
    drop(stream);
    buffer.freeze()
}

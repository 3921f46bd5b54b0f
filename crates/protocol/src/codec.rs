//! Length-prefixed envelope batch framing
//!
//! ```text
//! [4 bytes: length (big-endian)][N bytes: JSON EnvelopeBatch]
//! ```
//!
//! `encode_frame` produces a complete frame (prefix included). `encode_frames`
//! splits a batch across as many frames as the size limit requires.
//! `FrameDecoder` pulls complete frames out of a read buffer, leaving partial
//! frames in place until more bytes arrive.

use std::borrow::Borrow;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;
use crate::error::ProtocolError;
use crate::{LENGTH_PREFIX_SIZE, MAX_FRAME_SIZE};

/// A batch of envelopes as carried by one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeBatch {
    pub batch: Vec<Envelope>,
}

/// Borrowed view used for encoding without cloning envelopes
#[derive(Serialize)]
struct EnvelopeBatchRef<'a> {
    batch: Vec<&'a Envelope>,
}

/// Encode envelopes into a complete length-prefixed frame
///
/// Accepts owned envelopes or `Arc<Envelope>` so the fan-out path can encode
/// shared envelopes directly.
pub fn encode_frame<E: Borrow<Envelope>>(envelopes: &[E]) -> Result<Bytes, ProtocolError> {
    let view = EnvelopeBatchRef {
        batch: envelopes.iter().map(Borrow::borrow).collect(),
    };

    let body = serde_json::to_vec(&view).map_err(ProtocolError::Encode)?;
    if body.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::frame_too_large(body.len(), MAX_FRAME_SIZE));
    }

    let mut frame = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + body.len());
    frame.put_u32(body.len() as u32);
    frame.extend_from_slice(&body);
    Ok(frame.freeze())
}

const BATCH_OPEN: &[u8] = b"{\"batch\":[";
const BATCH_CLOSE: &[u8] = b"]}";

/// Output of [`encode_frames`]
#[derive(Debug, Clone, Default)]
pub struct EncodedFrames {
    /// Complete frames, in envelope order
    pub frames: Vec<Bytes>,
    /// Envelopes carried by `frames`
    pub encoded: usize,
    /// Envelopes skipped because they cannot fit in a frame on their own
    pub rejected: usize,
}

/// Encode envelopes into as many frames as `max_frame_size` requires
///
/// Each body is a valid `EnvelopeBatch`, byte-identical to what
/// [`encode_frame`] produces for the same envelopes. Order is preserved.
/// An envelope whose body alone would exceed the limit is skipped and counted
/// in `rejected`; it never fails the rest of the batch.
pub fn encode_frames<E: Borrow<Envelope>>(envelopes: &[E], max_frame_size: usize) -> EncodedFrames {
    let max_frame_size = max_frame_size.min(MAX_FRAME_SIZE);
    let overhead = BATCH_OPEN.len() + BATCH_CLOSE.len();

    let mut out = EncodedFrames::default();
    let mut body: Vec<u8> = Vec::new();
    let mut in_body = 0usize;

    for envelope in envelopes {
        let item = match serde_json::to_vec(envelope.borrow()) {
            Ok(item) if item.len() + overhead <= max_frame_size => item,
            _ => {
                out.rejected += 1;
                continue;
            }
        };

        if in_body > 0 && body.len() + 1 + item.len() + BATCH_CLOSE.len() > max_frame_size {
            out.frames.push(seal_frame(&mut body));
            in_body = 0;
        }

        if in_body == 0 {
            body.extend_from_slice(BATCH_OPEN);
        } else {
            body.push(b',');
        }
        body.extend_from_slice(&item);
        in_body += 1;
        out.encoded += 1;
    }

    if in_body > 0 {
        out.frames.push(seal_frame(&mut body));
    }
    out
}

/// Close the open batch body, prefix it and reset `body`
fn seal_frame(body: &mut Vec<u8>) -> Bytes {
    body.extend_from_slice(BATCH_CLOSE);

    let mut frame = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + body.len());
    frame.put_u32(body.len() as u32);
    frame.extend_from_slice(body);
    body.clear();
    frame.freeze()
}

/// Incremental frame decoder over a read buffer
#[derive(Debug, Clone, Copy)]
pub struct FrameDecoder {
    max_frame_size: usize,
}

impl FrameDecoder {
    /// Create a decoder with the default frame limit
    pub const fn new() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
        }
    }

    /// Create a decoder with a custom frame limit
    pub const fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    /// Peek at the next frame body length without consuming the buffer
    ///
    /// Returns:
    /// - Ok(Some(len)) if a complete frame is buffered
    /// - Ok(None) if more data is needed
    /// - Err if the announced length exceeds the limit
    #[inline]
    pub fn peek_frame_len(&self, buf: &[u8]) -> Result<Option<usize>, ProtocolError> {
        if buf.len() < LENGTH_PREFIX_SIZE {
            return Ok(None);
        }

        let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        if len > self.max_frame_size {
            return Err(ProtocolError::frame_too_large(len, self.max_frame_size));
        }

        if buf.len() < LENGTH_PREFIX_SIZE + len {
            return Ok(None);
        }

        Ok(Some(len))
    }

    /// Decode the next complete frame, advancing the buffer past it
    ///
    /// A frame whose body fails to parse is still consumed, so one bad frame
    /// does not wedge the connection.
    pub fn decode(&self, buf: &mut BytesMut) -> Result<Option<EnvelopeBatch>, ProtocolError> {
        let Some(len) = self.peek_frame_len(buf)? else {
            return Ok(None);
        };

        buf.advance(LENGTH_PREFIX_SIZE);
        let body = buf.split_to(len);

        serde_json::from_slice(&body)
            .map(Some)
            .map_err(ProtocolError::Decode)
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

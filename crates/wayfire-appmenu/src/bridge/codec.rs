//! Framed codec for the compositor IPC socket.
//!
//! Uses LengthDelimitedCodec for framing (4-byte little-endian length) +
//! serde_json for serialization. Works over any AsyncRead/AsyncWrite.

use std::io;
use std::marker::PhantomData;

use serde::{Serialize, de::DeserializeOwned};
use tokio_util::bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

/// Size of the length prefix in front of every payload.
pub const LENGTH_PREFIX_BYTES: usize = 4;

/// Codec that frames messages with a little-endian length prefix and
/// serializes with JSON.
///
/// Decoding never yields a partial payload: until the whole frame is
/// buffered `decode` returns `Ok(None)` and the reader waits for the next
/// readiness notification.
pub struct JsonCodec<T> {
    inner: LengthDelimitedCodec,
    /// Set once the inner codec has consumed a length prefix whose payload
    /// has not fully arrived yet.
    mid_frame: bool,
    _phantom: PhantomData<T>,
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self {
            inner: LengthDelimitedCodec::builder()
                .length_field_length(LENGTH_PREFIX_BYTES)
                .little_endian()
                .max_frame_length(u32::MAX as usize)
                .new_codec(),
            mid_frame: false,
            _phantom: PhantomData,
        }
    }
}

impl<T: DeserializeOwned> Decoder for JsonCodec<T> {
    type Item = T;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let buffered = src.len();
        match self.inner.decode(src)? {
            Some(bytes) => {
                self.mid_frame = false;
                tracing::trace!(payload_bytes = bytes.len(), "Decoded frame");
                let item = serde_json::from_slice(&bytes)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                Ok(Some(item))
            }
            None => {
                if src.len() < buffered {
                    self.mid_frame = true;
                }
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(item) => Ok(Some(item)),
            None if src.is_empty() && !self.mid_frame => Ok(None),
            None => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "stream ended inside a frame ({} bytes buffered)",
                    src.len()
                ),
            )),
        }
    }
}

impl<T: Serialize> Encoder<T> for JsonCodec<T> {
    type Error = io::Error;

    fn encode(&mut self, item: T, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let json =
            serde_json::to_vec(&item).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        tracing::trace!(json_size_bytes = json.len(), "Encoding frame");
        // Prefix and payload land in the same buffer, so one frame is
        // always written contiguously.
        self.inner.encode(Bytes::from(json), dst)
    }
}

//! Kafka protocol frame codec.
//!
//! Implements tokio's `Decoder` and `Encoder` traits for Kafka wire protocol frames.
//! Kafka uses a simple framing format: 4-byte big-endian length prefix followed by
//! the message bytes.

use bytes::{Buf, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::error::ProtocolError;
use crate::protocol::ApiKey;

/// Maximum frame size (100 MB by default).
const DEFAULT_MAX_FRAME_SIZE: usize = 100 * 1024 * 1024;

/// Bytes of `api_key` + `api_version` + `correlation_id`.
const FIXED_HEADER_LEN: usize = 8;

/// A request frame: the fixed header fields plus the raw content.
#[derive(Debug, Clone)]
pub struct KafkaFrame {
    /// The raw API key; keys the broker does not serve are kept as-is.
    pub api_key: i16,
    /// The API version.
    pub api_version: i16,
    /// The correlation ID for request/response matching.
    pub correlation_id: i32,
    /// The complete frame content (after the length prefix), header included.
    pub bytes: BytesMut,
}

impl KafkaFrame {
    /// Build a frame from content bytes, reading the fixed header fields.
    pub fn from_content(bytes: BytesMut) -> Result<Self, ProtocolError> {
        if bytes.len() < FIXED_HEADER_LEN {
            return Err(ProtocolError::FrameTooShort {
                length: bytes.len(),
            });
        }
        Ok(Self {
            api_key: i16::from_be_bytes([bytes[0], bytes[1]]),
            api_version: i16::from_be_bytes([bytes[2], bytes[3]]),
            correlation_id: i32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            bytes,
        })
    }

    /// The served API this frame targets, if any.
    #[must_use]
    pub fn api(&self) -> Option<ApiKey> {
        ApiKey::from_i16(self.api_key)
    }
}

/// Codec for Kafka wire protocol frames.
///
/// Kafka messages are framed as:
/// - 4 bytes: message length (big-endian, excludes these 4 bytes)
/// - N bytes: message content
///
/// Responses are produced by the handlers with their length prefix already in
/// place, so the encoder writes them verbatim.
#[derive(Debug, Clone)]
pub struct KafkaCodec {
    max_frame_size: usize,
}

impl KafkaCodec {
    /// Create a new codec with default max frame size.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Create a new codec with custom max frame size.
    #[must_use]
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }
}

impl Default for KafkaCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for KafkaCodec {
    type Item = KafkaFrame;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Need at least 4 bytes for the length prefix
        if src.len() < 4 {
            return Ok(None);
        }

        let length = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;

        if length > self.max_frame_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "frame size {length} exceeds maximum {}",
                    self.max_frame_size
                ),
            ));
        }

        if src.len() < 4 + length {
            src.reserve(4 + length - src.len());
            return Ok(None);
        }

        src.advance(4);
        let bytes = src.split_to(length);

        KafkaFrame::from_content(bytes)
            .map(Some)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None => {
                if !src.is_empty() {
                    // A peer closing mid-frame is an ordinary disconnect.
                    debug!(buffered = src.len(), "discarding partial frame at end of stream");
                    src.clear();
                }
                Ok(None)
            }
        }
    }
}

impl Encoder<BytesMut> for KafkaCodec {
    type Error = io::Error;

    fn encode(&mut self, item: BytesMut, dst: &mut BytesMut) -> Result<(), Self::Error> {
        debug_assert!(
            item.len() >= 4
                && u32::from_be_bytes([item[0], item[1], item[2], item[3]]) as usize
                    == item.len() - 4,
            "response length prefix does not match content"
        );
        dst.extend_from_slice(&item);
        Ok(())
    }
}

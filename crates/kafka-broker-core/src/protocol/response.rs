//! Response buffer construction.
//!
//! Every response is built in one [`BytesMut`] that starts with a 4-byte
//! length placeholder and the response header; the body is a typed
//! `kafka_protocol` message encoded at a fixed version.
//! [`ResponseBuf::finish`] back-patches the length to `total length - 4`.

use bytes::{BufMut, BytesMut};
use kafka_protocol::protocol::Encodable;

use crate::error::{BrokerError, Result};

/// Length-prefixed response under construction.
#[derive(Debug)]
pub struct ResponseBuf {
    buf: BytesMut,
}

impl ResponseBuf {
    /// Start a response with the v0 header (correlation id only).
    #[must_use]
    pub fn new(correlation_id: i32) -> Self {
        let mut buf = BytesMut::with_capacity(64);
        buf.put_i32(0);
        buf.put_i32(correlation_id);
        Self { buf }
    }

    /// Start a response with the flexible v1 header (correlation id + empty tag buffer).
    #[must_use]
    pub fn flexible(correlation_id: i32) -> Self {
        let mut response = Self::new(correlation_id);
        response.buf.put_u8(0);
        response
    }

    /// Encode `message` as the response body at `version`.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Encode`] if the message has fields the version
    /// cannot represent.
    pub fn put_message<M: Encodable>(&mut self, message: &M, version: i16) -> Result<()> {
        message
            .encode(&mut self.buf, version)
            .map_err(|e| BrokerError::Encode {
                message: e.to_string(),
            })
    }

    /// Back-patch the length prefix and return the wire bytes.
    #[must_use]
    pub fn finish(mut self) -> BytesMut {
        let len = (self.buf.len() - 4) as u32;
        self.buf[..4].copy_from_slice(&len.to_be_bytes());
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kafka_protocol::messages::ApiVersionsResponse;

    #[test]
    fn test_finish_patches_length() {
        let bytes = ResponseBuf::new(42).finish();
        assert_eq!(bytes.as_ref(), &[0, 0, 0, 4, 0, 0, 0, 42]);
    }

    #[test]
    fn test_flexible_header_adds_tag_byte() {
        let bytes = ResponseBuf::flexible(7).finish();
        assert_eq!(bytes.as_ref(), &[0, 0, 0, 5, 0, 0, 0, 7, 0]);
    }

    #[test]
    fn test_put_message_follows_header() {
        let mut response = ResponseBuf::new(1);
        response
            .put_message(&ApiVersionsResponse::default(), 3)
            .unwrap();
        let bytes = response.finish();
        // error_code, empty compact array, throttle_time_ms, tag buffer
        assert_eq!(&bytes[8..], &[0, 0, 1, 0, 0, 0, 0, 0]);
        assert_eq!(&bytes[..4], &((bytes.len() - 4) as u32).to_be_bytes());
    }
}

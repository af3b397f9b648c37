//! Request header (v2) parsing.

use crate::error::ProtocolResult;

use super::primitives::ByteReader;

/// Common header that precedes every request body.
///
/// Layout: `api_key:i16 api_version:i16 correlation_id:i32 client_id_len:i16
/// client_id[client_id_len] tagged_fields:uvarint`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeader {
    pub api_key: i16,
    pub api_version: i16,
    pub correlation_id: i32,
    /// `None` when the declared length is zero or negative.
    pub client_id: Option<String>,
    /// Offset of the first body byte in the parsed buffer.
    pub body_offset: usize,
}

impl RequestHeader {
    /// Parse the header from the start of `buf` (frame content, no length prefix).
    ///
    /// The trailing tagged-fields varint is consumed as a count and discarded;
    /// tagged-field payloads are not interpreted.
    pub fn parse(buf: &[u8]) -> ProtocolResult<Self> {
        let mut reader = ByteReader::new(buf);
        let api_key = reader.read_i16()?;
        let api_version = reader.read_i16()?;
        let correlation_id = reader.read_i32()?;

        let client_id_len = reader.read_i16()?;
        let client_id = if client_id_len > 0 {
            let raw = reader.read_bytes(client_id_len as usize)?;
            Some(String::from_utf8_lossy(raw).into_owned())
        } else {
            None
        };

        reader.read_unsigned_varint()?;

        Ok(Self {
            api_key,
            api_version,
            correlation_id,
            client_id,
            body_offset: reader.offset(),
        })
    }

    /// Reader positioned at the first body byte of `buf`.
    #[must_use]
    pub fn body<'a>(&self, buf: &'a [u8]) -> ByteReader<'a> {
        ByteReader::at(buf, self.body_offset)
    }
}

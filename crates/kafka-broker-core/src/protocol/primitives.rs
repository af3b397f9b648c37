//! Binary primitives of the Kafka wire format.
//!
//! Fixed-width integers are big-endian two's-complement. Writes go through
//! [`bytes::BufMut`] (`put_i16`, `put_i32`, `put_i64` are already big-endian);
//! reads are bound-checked and return [`ProtocolError::Truncated`] instead of
//! panicking, so a malformed request can only ever fail its own connection.

use bytes::BufMut;
use uuid::Uuid;

use crate::error::{ProtocolError, ProtocolResult};

fn take<const N: usize>(buf: &[u8], offset: usize) -> ProtocolResult<[u8; N]> {
    offset
        .checked_add(N)
        .and_then(|end| buf.get(offset..end))
        .and_then(|slice| slice.try_into().ok())
        .ok_or(ProtocolError::Truncated {
            offset,
            needed: N,
            available: buf.len().saturating_sub(offset),
        })
}

/// Read a big-endian `i16` at `offset`.
pub fn read_i16(buf: &[u8], offset: usize) -> ProtocolResult<i16> {
    take::<2>(buf, offset).map(i16::from_be_bytes)
}

/// Read a big-endian `i32` at `offset`.
pub fn read_i32(buf: &[u8], offset: usize) -> ProtocolResult<i32> {
    take::<4>(buf, offset).map(i32::from_be_bytes)
}

/// Read a big-endian `i64` at `offset`.
pub fn read_i64(buf: &[u8], offset: usize) -> ProtocolResult<i64> {
    take::<8>(buf, offset).map(i64::from_be_bytes)
}

/// Read an unsigned base-128 varint, advancing `offset` past it.
///
/// Groups are little-endian, 7 value bits each, high bit set on every byte but
/// the last. There is no byte-count cap: only buffer exhaustion fails. Bits
/// beyond the 32nd are discarded.
pub fn read_unsigned_varint(buf: &[u8], offset: &mut usize) -> ProtocolResult<u32> {
    let mut value: u32 = 0;
    let mut shift: u32 = 0;
    loop {
        let byte = *buf.get(*offset).ok_or(ProtocolError::Truncated {
            offset: *offset,
            needed: 1,
            available: 0,
        })?;
        *offset += 1;
        if shift < 32 {
            value |= u32::from(byte & 0x7F) << shift;
        }
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

/// Read a zigzag-encoded signed varint, advancing `offset` past it.
pub fn read_signed_varint(buf: &[u8], offset: &mut usize) -> ProtocolResult<i32> {
    let raw = read_unsigned_varint(buf, offset)?;
    Ok(((raw >> 1) as i32) ^ -((raw & 1) as i32))
}

/// Write an unsigned base-128 varint.
pub fn put_unsigned_varint<B: BufMut>(buf: &mut B, mut value: u32) {
    while value & !0x7F != 0 {
        buf.put_u8((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

/// Write a zigzag-encoded signed varint.
pub fn put_signed_varint<B: BufMut>(buf: &mut B, value: i32) {
    put_unsigned_varint(buf, ((value << 1) ^ (value >> 31)) as u32);
}

/// Convert a locally laid-out identifier to its wire form.
///
/// The local layout stores the first three groups (4, 2 and 2 bytes) little-endian
/// and the trailing 8 bytes verbatim; the wire form is big-endian throughout.
#[must_use]
pub fn id_to_wire(local: [u8; 16]) -> [u8; 16] {
    Uuid::from_bytes_le(local).into_bytes()
}

/// Convert a wire-form identifier to the local layout. Inverse of [`id_to_wire`].
#[must_use]
pub fn id_from_wire(wire: [u8; 16]) -> [u8; 16] {
    Uuid::from_bytes(wire).to_bytes_le()
}

/// Forward-only, bound-checked cursor over a request buffer.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    /// Start reading at the beginning of `buf`.
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self::at(buf, 0)
    }

    /// Start reading at `offset`.
    #[must_use]
    pub fn at(buf: &'a [u8], offset: usize) -> Self {
        Self { buf, offset }
    }

    /// Current position.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes left after the current position.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.offset)
    }

    pub fn read_i8(&mut self) -> ProtocolResult<i8> {
        let [b] = take::<1>(self.buf, self.offset)?;
        self.offset += 1;
        Ok(b as i8)
    }

    pub fn read_i16(&mut self) -> ProtocolResult<i16> {
        let v = read_i16(self.buf, self.offset)?;
        self.offset += 2;
        Ok(v)
    }

    pub fn read_i32(&mut self) -> ProtocolResult<i32> {
        let v = read_i32(self.buf, self.offset)?;
        self.offset += 4;
        Ok(v)
    }

    pub fn read_i64(&mut self) -> ProtocolResult<i64> {
        let v = read_i64(self.buf, self.offset)?;
        self.offset += 8;
        Ok(v)
    }

    pub fn read_unsigned_varint(&mut self) -> ProtocolResult<u32> {
        read_unsigned_varint(self.buf, &mut self.offset)
    }

    pub fn read_signed_varint(&mut self) -> ProtocolResult<i32> {
        read_signed_varint(self.buf, &mut self.offset)
    }

    /// Read a 16-byte identifier exactly as it appears on the wire.
    pub fn read_uuid_bytes(&mut self) -> ProtocolResult<[u8; 16]> {
        let v = take::<16>(self.buf, self.offset)?;
        self.offset += 16;
        Ok(v)
    }

    /// Borrow the next `len` bytes.
    pub fn read_bytes(&mut self, len: usize) -> ProtocolResult<&'a [u8]> {
        let truncated = ProtocolError::Truncated {
            offset: self.offset,
            needed: len,
            available: self.remaining(),
        };
        let end = self.offset.checked_add(len).ok_or_else(|| truncated.clone())?;
        let slice = self.buf.get(self.offset..end).ok_or(truncated)?;
        self.offset = end;
        Ok(slice)
    }

    /// Skip `len` bytes, failing if fewer remain.
    pub fn skip(&mut self, len: usize) -> ProtocolResult<()> {
        self.read_bytes(len).map(|_| ())
    }

    /// Read a compact length and return the element count it denotes.
    ///
    /// The wire value is `count + 1`; `0` (null) is reported as zero elements.
    pub fn read_compact_len(&mut self) -> ProtocolResult<usize> {
        Ok(self.read_unsigned_varint()?.saturating_sub(1) as usize)
    }

    /// Read a compact string; null and invalid UTF-8 are read leniently.
    pub fn read_compact_string(&mut self) -> ProtocolResult<String> {
        let len = self.read_compact_len()?;
        let bytes = self.read_bytes(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    fn unsigned(value: u32) -> Vec<u8> {
        let mut buf = BytesMut::new();
        put_unsigned_varint(&mut buf, value);
        buf.to_vec()
    }

    fn signed(value: i32) -> Vec<u8> {
        let mut buf = BytesMut::new();
        put_signed_varint(&mut buf, value);
        buf.to_vec()
    }

    #[test]
    fn test_fixed_width_reads() {
        let buf = [0x00, 0x12, 0x34, 0x56, 0x78, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE];
        assert_eq!(read_i16(&buf, 1).unwrap(), 0x1234);
        assert_eq!(read_i32(&buf, 1).unwrap(), 0x1234_5678);
        assert_eq!(read_i64(&buf, 5).unwrap(), -2);
    }

    #[test]
    fn test_fixed_width_out_of_bounds() {
        let buf = [0u8; 3];
        assert_eq!(
            read_i32(&buf, 1),
            Err(ProtocolError::Truncated {
                offset: 1,
                needed: 4,
                available: 2
            })
        );
        assert!(read_i16(&buf, usize::MAX).is_err());
    }

    #[test]
    fn test_unsigned_varint_known_encodings() {
        assert_eq!(unsigned(0), vec![0x00]);
        assert_eq!(unsigned(1), vec![0x01]);
        assert_eq!(unsigned(127), vec![0x7F]);
        assert_eq!(unsigned(128), vec![0x80, 0x01]);
        assert_eq!(unsigned(300), vec![0xAC, 0x02]);
    }

    #[test]
    fn test_unsigned_varint_round_trip() {
        for value in [0u32, 1, 63, 64, 127, 128, 16_383, 16_384, 2_097_151, 1 << 28, i32::MAX as u32] {
            let encoded = unsigned(value);
            let mut offset = 0;
            assert_eq!(read_unsigned_varint(&encoded, &mut offset).unwrap(), value);
            assert_eq!(offset, encoded.len());
        }
    }

    #[test]
    fn test_signed_varint_round_trip() {
        for value in [0, 1, -1, 63, -64, 64, -65, 1_000_000, i32::MIN, i32::MAX] {
            let encoded = signed(value);
            let mut offset = 0;
            assert_eq!(read_signed_varint(&encoded, &mut offset).unwrap(), value);
        }
        assert_eq!(signed(-1), vec![0x01]);
        assert_eq!(signed(1), vec![0x02]);
    }

    #[test]
    fn test_varint_exhaustion_fails() {
        let mut offset = 0;
        assert!(read_unsigned_varint(&[0x80, 0x80], &mut offset).is_err());
        let mut offset = 0;
        assert!(read_unsigned_varint(&[], &mut offset).is_err());
    }

    #[test]
    fn test_overlong_varint_does_not_panic() {
        let mut buf = vec![0xFF; 9];
        buf.push(0x01);
        let mut offset = 0;
        assert!(read_unsigned_varint(&buf, &mut offset).is_ok());
        assert_eq!(offset, 10);
    }

    #[test]
    fn test_id_byte_order() {
        let local: [u8; 16] = core::array::from_fn(|i| i as u8);
        let wire = id_to_wire(local);
        assert_eq!(&wire[..4], &[3, 2, 1, 0]);
        assert_eq!(&wire[4..6], &[5, 4]);
        assert_eq!(&wire[6..8], &[7, 6]);
        assert_eq!(&wire[8..], &local[8..]);
    }

    #[test]
    fn test_id_round_trip() {
        let samples: [[u8; 16]; 3] = [
            [0; 16],
            [0xFF; 16],
            core::array::from_fn(|i| (i as u8).wrapping_mul(37).wrapping_add(11)),
        ];
        for x in samples {
            assert_eq!(id_from_wire(id_to_wire(x)), x);
            assert_eq!(id_to_wire(id_from_wire(x)), x);
        }
    }

    #[test]
    fn test_reader_sequence() {
        let mut buf = BytesMut::new();
        bytes::BufMut::put_i16(&mut buf, 7);
        bytes::BufMut::put_i32(&mut buf, -3);
        put_unsigned_varint(&mut buf, 4);
        buf.extend_from_slice(b"abc");
        bytes::BufMut::put_i8(&mut buf, -1);

        let mut reader = ByteReader::new(&buf);
        assert_eq!(reader.read_i16().unwrap(), 7);
        assert_eq!(reader.read_i32().unwrap(), -3);
        assert_eq!(reader.read_compact_string().unwrap(), "abc");
        assert_eq!(reader.read_i8().unwrap(), -1);
        assert_eq!(reader.remaining(), 0);
        assert!(reader.read_i8().is_err());
    }

    #[test]
    fn test_reader_compact_len_null_is_zero() {
        let mut reader = ByteReader::new(&[0x00, 0x01, 0x05]);
        assert_eq!(reader.read_compact_len().unwrap(), 0);
        assert_eq!(reader.read_compact_len().unwrap(), 0);
        assert_eq!(reader.read_compact_len().unwrap(), 4);
    }

    #[test]
    fn test_reader_read_bytes_past_end() {
        let mut reader = ByteReader::new(&[1, 2, 3]);
        assert!(reader.read_bytes(4).is_err());
        assert_eq!(reader.offset(), 0);
        assert_eq!(reader.read_bytes(3).unwrap(), &[1, 2, 3]);
    }
}

//! On-disk fixtures: synthetic metadata logs and record batches.

use bytes::{BufMut, Bytes, BytesMut};
use uuid::Uuid;

use crate::metadata::TopicId;

/// Filler written after each record so the partition scan finds nothing else.
const PADDING: u8 = 0xFF;
const PADDING_LEN: usize = 128;

/// Builds a control-plane log the byte-scanning resolver understands.
///
/// Each topic becomes a record `0x00 | name | id` followed by one record
/// `id | partition index` per partition, all padded with `0xFF`.
#[derive(Debug, Default, Clone)]
pub struct MetadataLogBuilder {
    buf: BytesMut,
    topics: Vec<(String, TopicId)>,
}

impl MetadataLogBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a topic with a random identifier.
    #[must_use]
    pub fn topic(self, name: &str, partitions: &[i32]) -> Self {
        let id = TopicId::from_wire(*Uuid::new_v4().as_bytes());
        self.topic_with_id(name, id, partitions)
    }

    /// Add a topic with a given identifier.
    #[must_use]
    pub fn topic_with_id(mut self, name: &str, id: TopicId, partitions: &[i32]) -> Self {
        self.buf.put_u8(0x00);
        self.buf.put_slice(name.as_bytes());
        self.buf.put_slice(&id.to_wire());
        self.pad();

        for &partition in partitions {
            self.buf.put_slice(&id.to_wire());
            self.buf.put_i32(partition);
            self.pad();
        }

        self.topics.push((name.to_string(), id));
        self
    }

    /// Topics added so far, with their identifiers.
    #[must_use]
    pub fn topics(&self) -> &[(String, TopicId)] {
        &self.topics
    }

    #[must_use]
    pub fn build(self) -> Bytes {
        self.buf.freeze()
    }

    fn pad(&mut self) {
        self.buf.put_bytes(PADDING, PADDING_LEN);
    }
}

/// A record batch with the given base offset and opaque payload.
#[must_use]
pub fn record_batch(base_offset: i64, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(12 + payload.len());
    buf.put_i64(base_offset);
    buf.put_i32(payload.len() as i32);
    buf.put_slice(payload);
    buf.freeze()
}

//! Request builders for the four served APIs.
//!
//! Builders return frame content (header and body, no length prefix); use
//! [`with_length_prefix`] before writing to a socket.

use bytes::{BufMut, BytesMut};

use crate::metadata::TopicId;
use crate::protocol::primitives::put_unsigned_varint;
use crate::protocol::ApiKey;

/// Client id written into every request header.
pub const CLIENT_ID: &str = "test-client";

fn header(api_key: ApiKey, api_version: i16, correlation_id: i32) -> BytesMut {
    let mut buf = BytesMut::new();
    buf.put_i16(api_key as i16);
    buf.put_i16(api_version);
    buf.put_i32(correlation_id);
    buf.put_i16(CLIENT_ID.len() as i16);
    buf.put_slice(CLIENT_ID.as_bytes());
    buf.put_u8(0); // header tagged fields
    buf
}

fn put_compact_bytes(buf: &mut BytesMut, bytes: &[u8]) {
    put_unsigned_varint(buf, bytes.len() as u32 + 1);
    buf.put_slice(bytes);
}

/// Prefix `content` with its 4-byte big-endian length.
#[must_use]
pub fn with_length_prefix(content: &[u8]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(4 + content.len());
    buf.put_u32(content.len() as u32);
    buf.put_slice(content);
    buf
}

/// ApiVersions request; the body is empty.
#[must_use]
pub fn api_versions_request(correlation_id: i32, api_version: i16) -> BytesMut {
    header(ApiKey::ApiVersions, api_version, correlation_id)
}

/// DescribeTopicPartitions v0 request.
#[must_use]
pub fn describe_topic_partitions_request(
    correlation_id: i32,
    topics: &[&str],
    response_partition_limit: i32,
) -> BytesMut {
    let mut buf = header(ApiKey::DescribeTopicPartitions, 0, correlation_id);
    put_unsigned_varint(&mut buf, topics.len() as u32 + 1);
    for topic in topics {
        put_compact_bytes(&mut buf, topic.as_bytes());
        buf.put_u8(0);
    }
    buf.put_i32(response_partition_limit);
    buf.put_u8(0xFF); // null cursor
    buf.put_u8(0);
    buf
}

/// Fetch v16 request for one topic and its partitions, or for no topic.
#[must_use]
pub fn fetch_request(correlation_id: i32, topic: Option<(TopicId, &[i32])>) -> BytesMut {
    let mut buf = header(ApiKey::Fetch, 16, correlation_id);
    buf.put_i32(500); // max_wait_ms
    buf.put_i32(1); // min_bytes
    buf.put_i32(0x0320_0000); // max_bytes
    buf.put_i8(0); // isolation_level
    buf.put_i32(0); // session_id
    buf.put_i32(0); // session_epoch

    match topic {
        None => buf.put_u8(1),
        Some((id, partitions)) => {
            buf.put_u8(2);
            buf.put_slice(&id.to_wire());
            put_unsigned_varint(&mut buf, partitions.len() as u32 + 1);
            for &partition in partitions {
                buf.put_i32(partition);
                buf.put_i32(-1); // current_leader_epoch
                buf.put_i64(0); // fetch_offset
                buf.put_i32(-1); // last_fetched_epoch
                buf.put_i64(-1); // log_start_offset
                buf.put_i32(0x0010_0000); // partition_max_bytes
                buf.put_u8(0);
            }
            buf.put_u8(0);
        }
    }

    buf.put_u8(1); // forgotten_topics_data
    buf.put_u8(1); // rack_id: ""
    buf.put_u8(0);
    buf
}

/// One partition of a produce request; `None` records encode as null.
pub type ProducePartitionSpec<'a> = (i32, Option<&'a [u8]>);

/// Produce v11 request.
#[must_use]
pub fn produce_request(
    correlation_id: i32,
    topics: &[(&str, &[ProducePartitionSpec<'_>])],
) -> BytesMut {
    let mut buf = header(ApiKey::Produce, 11, correlation_id);
    buf.put_u8(0); // transactional_id: null
    buf.put_i16(-1); // acks
    buf.put_i32(1500); // timeout_ms

    put_unsigned_varint(&mut buf, topics.len() as u32 + 1);
    for (name, partitions) in topics {
        put_compact_bytes(&mut buf, name.as_bytes());
        put_unsigned_varint(&mut buf, partitions.len() as u32 + 1);
        for &(index, records) in partitions.iter() {
            buf.put_i32(index);
            match records {
                Some(records) => put_compact_bytes(&mut buf, records),
                None => buf.put_u8(0),
            }
            buf.put_u8(0);
        }
        buf.put_u8(0);
    }
    buf.put_u8(0);
    buf
}

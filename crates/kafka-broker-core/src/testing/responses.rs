//! Decoders for the responses the broker writes, for assertions in tests.
//!
//! Each decoder takes the full response including its length prefix and
//! panics if the prefix does not match the content length.

use crate::error::ProtocolResult;
use crate::protocol::ByteReader;

fn content(response: &[u8]) -> ProtocolResult<ByteReader<'_>> {
    let mut reader = ByteReader::new(response);
    let length = reader.read_i32()?;
    assert_eq!(
        length as usize,
        response.len() - 4,
        "length prefix does not match content"
    );
    Ok(reader)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiVersionsResponse {
    pub correlation_id: i32,
    pub error_code: i16,
    /// `(api_key, min_version, max_version)`
    pub apis: Vec<(i16, i16, i16)>,
}

pub fn decode_api_versions(response: &[u8]) -> ProtocolResult<ApiVersionsResponse> {
    let mut r = content(response)?;
    let correlation_id = r.read_i32()?;
    let error_code = r.read_i16()?;
    let count = r.read_compact_len()?;
    let mut apis = Vec::with_capacity(count);
    for _ in 0..count {
        apis.push((r.read_i16()?, r.read_i16()?, r.read_i16()?));
        r.read_unsigned_varint()?;
    }
    r.read_i32()?;
    r.read_unsigned_varint()?;
    Ok(ApiVersionsResponse {
        correlation_id,
        error_code,
        apis,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribedTopicResponse {
    pub error_code: i16,
    pub name: String,
    /// Wire (big-endian) form.
    pub topic_id: [u8; 16],
    pub is_internal: bool,
    pub partitions: Vec<i32>,
    pub authorized_operations: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeTopicPartitionsResponse {
    pub correlation_id: i32,
    pub topics: Vec<DescribedTopicResponse>,
    pub next_cursor: u8,
}

pub fn decode_describe_topic_partitions(
    response: &[u8],
) -> ProtocolResult<DescribeTopicPartitionsResponse> {
    let mut r = content(response)?;
    let correlation_id = r.read_i32()?;
    r.read_unsigned_varint()?;
    r.read_i32()?; // throttle_time_ms

    let count = r.read_compact_len()?;
    let mut topics = Vec::with_capacity(count);
    for _ in 0..count {
        let error_code = r.read_i16()?;
        let name = r.read_compact_string()?;
        let topic_id = r.read_uuid_bytes()?;
        let is_internal = r.read_i8()? != 0;

        let partition_count = r.read_compact_len()?;
        let mut partitions = Vec::with_capacity(partition_count);
        for _ in 0..partition_count {
            r.read_i16()?; // error_code
            partitions.push(r.read_i32()?);
            r.read_i32()?; // leader_id
            r.read_i32()?; // leader_epoch
            for _ in 0..5 {
                let len = r.read_compact_len()?;
                r.skip(len * 4)?;
            }
            r.read_unsigned_varint()?;
        }

        let authorized_operations = r.read_i32()?;
        r.read_unsigned_varint()?;
        topics.push(DescribedTopicResponse {
            error_code,
            name,
            topic_id,
            is_internal,
            partitions,
            authorized_operations,
        });
    }

    let next_cursor = r.read_i8()? as u8;
    r.read_unsigned_varint()?;
    Ok(DescribeTopicPartitionsResponse {
        correlation_id,
        topics,
        next_cursor,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPartitionResponse {
    pub topic_id: [u8; 16],
    pub partition: i32,
    pub error_code: i16,
    pub high_watermark: i64,
    pub last_stable_offset: i64,
    pub log_start_offset: i64,
    pub preferred_read_replica: i32,
    /// `None` for a null record set.
    pub records: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub correlation_id: i32,
    pub error_code: i16,
    pub session_id: i32,
    pub partitions: Vec<FetchPartitionResponse>,
}

pub fn decode_fetch(response: &[u8]) -> ProtocolResult<FetchResponse> {
    let mut r = content(response)?;
    let correlation_id = r.read_i32()?;
    r.read_unsigned_varint()?;
    r.read_i32()?; // throttle_time_ms
    let error_code = r.read_i16()?;
    let session_id = r.read_i32()?;

    let mut partitions = Vec::new();
    for _ in 0..r.read_compact_len()? {
        let topic_id = r.read_uuid_bytes()?;
        for _ in 0..r.read_compact_len()? {
            let partition = r.read_i32()?;
            let error_code = r.read_i16()?;
            let high_watermark = r.read_i64()?;
            let last_stable_offset = r.read_i64()?;
            let log_start_offset = r.read_i64()?;
            let aborted = r.read_compact_len()?;
            r.skip(aborted * 17)?;
            let preferred_read_replica = r.read_i32()?;
            let records = match r.read_unsigned_varint()? {
                0 => None,
                len => Some(r.read_bytes(len as usize - 1)?.to_vec()),
            };
            r.read_unsigned_varint()?;
            partitions.push(FetchPartitionResponse {
                topic_id,
                partition,
                error_code,
                high_watermark,
                last_stable_offset,
                log_start_offset,
                preferred_read_replica,
                records,
            });
        }
        r.read_unsigned_varint()?;
    }
    r.read_unsigned_varint()?;

    Ok(FetchResponse {
        correlation_id,
        error_code,
        session_id,
        partitions,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducePartitionResponse {
    pub topic: String,
    pub index: i32,
    pub error_code: i16,
    pub base_offset: i64,
    pub log_append_time_ms: i64,
    pub log_start_offset: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProduceResponse {
    pub correlation_id: i32,
    pub partitions: Vec<ProducePartitionResponse>,
    pub throttle_time_ms: i32,
}

pub fn decode_produce(response: &[u8]) -> ProtocolResult<ProduceResponse> {
    let mut r = content(response)?;
    let correlation_id = r.read_i32()?;
    r.read_unsigned_varint()?;

    let mut partitions = Vec::new();
    for _ in 0..r.read_compact_len()? {
        let topic = r.read_compact_string()?;
        for _ in 0..r.read_compact_len()? {
            let index = r.read_i32()?;
            let error_code = r.read_i16()?;
            let base_offset = r.read_i64()?;
            let log_append_time_ms = r.read_i64()?;
            let log_start_offset = r.read_i64()?;
            r.read_compact_len()?; // record_errors, always empty
            let message = r.read_compact_len()?;
            r.skip(message)?;
            r.read_unsigned_varint()?;
            partitions.push(ProducePartitionResponse {
                topic: topic.clone(),
                index,
                error_code,
                base_offset,
                log_append_time_ms,
                log_start_offset,
            });
        }
        r.read_unsigned_varint()?;
    }
    let throttle_time_ms = r.read_i32()?;
    r.read_unsigned_varint()?;

    Ok(ProduceResponse {
        correlation_id,
        partitions,
        throttle_time_ms,
    })
}

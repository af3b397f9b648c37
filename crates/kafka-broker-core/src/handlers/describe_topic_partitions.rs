//! DescribeTopicPartitions request handler.
//!
//! Resolves each requested topic name against the metadata resolver and
//! reports its identifier and partitions with single-node placement.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::BytesMut;
use kafka_protocol::messages::describe_topic_partitions_response::{
    DescribeTopicPartitionsResponsePartition, DescribeTopicPartitionsResponseTopic,
};
use kafka_protocol::messages::{BrokerId, DescribeTopicPartitionsResponse, TopicName};
use kafka_protocol::protocol::StrBytes;
use tracing::debug;

use crate::error::{ProtocolResult, Result};
use crate::metadata::{MetadataResolver, TopicId};
use crate::network::codec::KafkaFrame;
use crate::protocol::{error_code, ApiKey, RequestHeader, ResponseBuf};

use super::ProtocolHandler;

/// Topic names with this prefix are reported unknown without a lookup.
pub const UNKNOWN_TOPIC_PREFIX: &str = "UNKNOWN_TOPIC_";

/// Upper clamp for the request's `response_partition_limit`.
pub const MAX_RESPONSE_PARTITION_LIMIT: i32 = 64;

/// `topic_authorized_operations` reported for every topic.
pub const TOPIC_AUTHORIZED_OPERATIONS: i32 = 0x0200_0000;

/// Parsed request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeTopicPartitionsRequest {
    pub topic_names: Vec<String>,
    /// Clamped to `0..=64`.
    pub response_partition_limit: i32,
}

impl DescribeTopicPartitionsRequest {
    /// Parse from the raw frame content, header included.
    pub fn parse(buf: &[u8]) -> ProtocolResult<Self> {
        let header = RequestHeader::parse(buf)?;
        let mut body = header.body(buf);

        let count = body.read_compact_len()?;
        let mut topic_names = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            topic_names.push(body.read_compact_string()?);
            body.read_unsigned_varint()?; // topic tagged fields
        }

        let limit = body.read_i32()?.clamp(0, MAX_RESPONSE_PARTITION_LIMIT);

        Ok(Self {
            topic_names,
            response_partition_limit: limit,
        })
    }

    /// Partition cap for the topic at `index`.
    ///
    /// In a multi-topic request the Nth topic is capped at N partitions; a
    /// single topic gets the request limit, or 1 when that limit is 0.
    #[must_use]
    pub fn partition_limit_for(&self, index: usize) -> usize {
        if self.topic_names.len() > 1 {
            index + 1
        } else if self.response_partition_limit > 0 {
            self.response_partition_limit as usize
        } else {
            1
        }
    }
}

/// One topic entry of the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribedTopic {
    pub name: String,
    pub id: TopicId,
    pub partitions: Vec<i32>,
    pub unknown: bool,
}

impl DescribedTopic {
    fn unknown(name: String) -> Self {
        Self {
            name,
            id: TopicId::ZERO,
            partitions: Vec::new(),
            unknown: true,
        }
    }
}

/// Handler for DescribeTopicPartitions requests.
pub struct DescribeTopicPartitionsHandler {
    resolver: Arc<dyn MetadataResolver>,
}

impl DescribeTopicPartitionsHandler {
    /// Create a new DescribeTopicPartitions handler.
    #[must_use]
    pub fn new(resolver: Arc<dyn MetadataResolver>) -> Self {
        Self { resolver }
    }

    async fn describe(&self, name: &str, index: usize, limit: usize) -> Result<DescribedTopic> {
        if name.starts_with(UNKNOWN_TOPIC_PREFIX) {
            return Ok(DescribedTopic::unknown(name.to_string()));
        }

        let topic = self.resolver.topic_by_name(name, limit).await?;
        let id = if topic.is_unknown() {
            TopicId::placeholder(name, index)
        } else {
            topic.id
        };

        let mut partitions = topic.partition_indices();
        partitions.truncate(limit);
        if partitions.is_empty() {
            partitions = (0..limit.max(1) as i32).collect();
        }

        Ok(DescribedTopic {
            name: name.to_string(),
            id,
            partitions,
            unknown: false,
        })
    }

    fn build_response(correlation_id: i32, topics: &[DescribedTopic]) -> Result<BytesMut> {
        // No pagination: `next_cursor` stays null.
        let mut body = DescribeTopicPartitionsResponse::default();

        for described in topics {
            let mut topic = DescribeTopicPartitionsResponseTopic::default();
            topic.error_code = if described.unknown {
                error_code::UNKNOWN_TOPIC_OR_PARTITION
            } else {
                error_code::NONE
            };
            topic.name = Some(TopicName::from(StrBytes::from_string(
                described.name.clone(),
            )));
            topic.topic_id = described.id.as_uuid();
            topic.is_internal = false;
            topic.topic_authorized_operations = TOPIC_AUTHORIZED_OPERATIONS;

            for &index in &described.partitions {
                let mut partition = DescribeTopicPartitionsResponsePartition::default();
                partition.error_code = error_code::NONE;
                partition.partition_index = index;
                partition.leader_id = BrokerId(0);
                partition.leader_epoch = 0;
                partition.replica_nodes = vec![BrokerId(0)];
                partition.isr_nodes = vec![BrokerId(0)];
                partition.eligible_leader_replicas = Some(vec![BrokerId(0)]);
                partition.last_known_elr = Some(vec![BrokerId(0)]);
                partition.offline_replicas = Vec::new();
                topic.partitions.push(partition);
            }

            body.topics.push(topic);
        }

        let mut response = ResponseBuf::flexible(correlation_id);
        response.put_message(&body, 0)?;
        Ok(response.finish())
    }
}

#[async_trait]
impl ProtocolHandler for DescribeTopicPartitionsHandler {
    fn api_key(&self) -> ApiKey {
        ApiKey::DescribeTopicPartitions
    }

    async fn handle(&self, frame: &KafkaFrame) -> Result<BytesMut> {
        let request = DescribeTopicPartitionsRequest::parse(&frame.bytes)?;
        debug!(
            correlation_id = frame.correlation_id,
            topics = ?request.topic_names,
            response_partition_limit = request.response_partition_limit,
            "handling DescribeTopicPartitions"
        );

        let mut topics = Vec::with_capacity(request.topic_names.len());
        for (index, name) in request.topic_names.iter().enumerate() {
            let limit = request.partition_limit_for(index);
            topics.push(self.describe(name, index, limit).await?);
        }

        Self::build_response(frame.correlation_id, &topics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BufMut;
    use kafka_protocol::protocol::Decodable;
    use crate::protocol::primitives::put_unsigned_varint;

    fn request(names: &[&str], limit: i32) -> BytesMut {
        let mut buf = BytesMut::new();
        buf.put_i16(75);
        buf.put_i16(0);
        buf.put_i32(5);
        buf.put_i16(3);
        buf.extend_from_slice(b"cli");
        buf.put_u8(0);
        put_unsigned_varint(&mut buf, names.len() as u32 + 1);
        for name in names {
            put_unsigned_varint(&mut buf, name.len() as u32 + 1);
            buf.extend_from_slice(name.as_bytes());
            buf.put_u8(0);
        }
        buf.put_i32(limit);
        buf.put_u8(0xFF);
        buf.put_u8(0);
        buf
    }

    #[test]
    fn test_parse_request() {
        let parsed = DescribeTopicPartitionsRequest::parse(&request(&["foo", "bar"], 10)).unwrap();
        assert_eq!(parsed.topic_names, vec!["foo", "bar"]);
        assert_eq!(parsed.response_partition_limit, 10);
    }

    #[test]
    fn test_parse_clamps_limit() {
        let high = DescribeTopicPartitionsRequest::parse(&request(&["a"], 1000)).unwrap();
        assert_eq!(high.response_partition_limit, 64);
        let low = DescribeTopicPartitionsRequest::parse(&request(&["a"], -5)).unwrap();
        assert_eq!(low.response_partition_limit, 0);
    }

    #[test]
    fn test_parse_truncated() {
        let mut buf = request(&["foo"], 1);
        buf.truncate(buf.len() - 5);
        assert!(DescribeTopicPartitionsRequest::parse(&buf).is_err());
    }

    #[test]
    fn test_partition_limit_rule() {
        let single = DescribeTopicPartitionsRequest {
            topic_names: vec!["a".into()],
            response_partition_limit: 0,
        };
        assert_eq!(single.partition_limit_for(0), 1);

        let single = DescribeTopicPartitionsRequest {
            response_partition_limit: 7,
            ..single
        };
        assert_eq!(single.partition_limit_for(0), 7);

        let multi = DescribeTopicPartitionsRequest {
            topic_names: vec!["a".into(), "b".into(), "c".into()],
            response_partition_limit: 50,
        };
        assert_eq!(multi.partition_limit_for(0), 1);
        assert_eq!(multi.partition_limit_for(2), 3);
    }

    #[test]
    fn test_unknown_topic_entry_bytes() {
        let topic = DescribedTopic::unknown("UNKNOWN_TOPIC_x".to_string());
        let response = DescribeTopicPartitionsHandler::build_response(9, &[topic]).unwrap();

        let mut expected = BytesMut::new();
        expected.put_i32(0); // length placeholder
        expected.put_i32(9);
        expected.put_u8(0);
        expected.put_i32(0);
        expected.put_u8(2);
        expected.put_i16(3);
        expected.put_u8(16);
        expected.extend_from_slice(b"UNKNOWN_TOPIC_x");
        expected.extend_from_slice(&[0; 16]);
        expected.put_u8(0);
        expected.put_u8(1);
        expected.put_i32(TOPIC_AUTHORIZED_OPERATIONS);
        expected.put_u8(0);
        expected.put_u8(0xFF);
        expected.put_u8(0);
        let len = (expected.len() - 4) as u32;
        expected[..4].copy_from_slice(&len.to_be_bytes());

        assert_eq!(response, expected);
    }

    #[test]
    fn test_partition_entry_layout() {
        let topic = DescribedTopic {
            name: "t".into(),
            id: TopicId::placeholder("t", 0),
            partitions: vec![4],
            unknown: false,
        };
        let response = DescribeTopicPartitionsHandler::build_response(1, &[topic]).unwrap();
        // header(4+4+1) throttle(4) topics(1) error(2) name(2) id(16) internal(1) partitions(1)
        let p = 4 + 4 + 1 + 4 + 1 + 2 + 2 + 16 + 1 + 1;
        assert_eq!(&response[p..p + 6], &[0, 0, 0, 0, 0, 4]);
        // leader, epoch, then four single-element arrays, empty offline array, tags
        let arrays = p + 6 + 8;
        assert_eq!(&response[arrays..arrays + 5], &[2, 0, 0, 0, 0]);
        assert_eq!(&response[arrays + 20..arrays + 22], &[1, 0]);
    }

    #[test]
    fn test_response_decodes_as_typed_message() {
        let id = TopicId::placeholder("orders", 0);
        let topic = DescribedTopic {
            name: "orders".into(),
            id,
            partitions: vec![0, 1],
            unknown: false,
        };
        let response = DescribeTopicPartitionsHandler::build_response(3, &[topic]).unwrap();

        // length(4) correlation(4) header tags(1)
        let mut body = bytes::Bytes::copy_from_slice(&response[9..]);
        let decoded = DescribeTopicPartitionsResponse::decode(&mut body, 0).unwrap();

        assert_eq!(decoded.topics.len(), 1);
        let topic = &decoded.topics[0];
        assert_eq!(
            topic.name.as_ref().map(|n| n.to_string()),
            Some("orders".to_string())
        );
        assert_eq!(topic.topic_id, id.as_uuid());
        assert_eq!(topic.topic_authorized_operations, TOPIC_AUTHORIZED_OPERATIONS);
        let indices: Vec<i32> = topic.partitions.iter().map(|p| p.partition_index).collect();
        assert_eq!(indices, vec![0, 1]);
        assert!(decoded.next_cursor.is_none());
        assert!(body.is_empty());
    }
}

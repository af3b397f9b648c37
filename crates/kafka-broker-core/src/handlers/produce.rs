//! Produce request handler.
//!
//! The only write path of the broker: record-batch bytes are appended verbatim
//! to the partition log.
//!
//! A request naming exactly one topic with exactly one partition is validated
//! against the metadata log and only written when the partition is known. Any
//! other shape is written and acknowledged without validation; clients rely on
//! that difference, so both paths are kept.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::BytesMut;
use kafka_protocol::messages::produce_response::{PartitionProduceResponse, TopicProduceResponse};
use kafka_protocol::messages::{ProduceResponse, TopicName};
use kafka_protocol::protocol::StrBytes;
use tracing::debug;

use crate::error::{ProtocolResult, Result};
use crate::metadata::MetadataResolver;
use crate::network::codec::KafkaFrame;
use crate::protocol::{error_code, ApiKey, RequestHeader, ResponseBuf};
use crate::storage::validate_topic_name;

use super::ProtocolHandler;

/// Partition limit used when validating the single-partition path.
pub const VALIDATION_PARTITION_LIMIT: usize = 32;

/// Version the response body is encoded at.
const BODY_VERSION: i16 = 11;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducePartition {
    pub index: i32,
    /// Empty when the request carried null or zero-length records.
    pub records: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProduceTopic {
    pub name: String,
    pub partitions: Vec<ProducePartition>,
}

/// Parsed Produce request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProduceRequest {
    pub acks: i16,
    pub timeout_ms: i32,
    pub topics: Vec<ProduceTopic>,
}

impl ProduceRequest {
    /// Parse from the raw frame content, header included.
    pub fn parse(buf: &[u8]) -> ProtocolResult<Self> {
        let header = RequestHeader::parse(buf)?;
        let mut body = header.body(buf);

        let transactional_id_len = body.read_compact_len()?;
        body.skip(transactional_id_len)?;
        let acks = body.read_i16()?;
        let timeout_ms = body.read_i32()?;

        let topic_count = body.read_compact_len()?;
        let mut topics = Vec::with_capacity(topic_count.min(64));
        for _ in 0..topic_count {
            let name = body.read_compact_string()?;

            let partition_count = body.read_compact_len()?;
            let mut partitions = Vec::with_capacity(partition_count.min(64));
            for _ in 0..partition_count {
                let index = body.read_i32()?;
                let records_len = body.read_compact_len()?;
                let records = body.read_bytes(records_len)?.to_vec();
                body.read_unsigned_varint()?; // partition tagged fields
                partitions.push(ProducePartition { index, records });
            }

            body.read_unsigned_varint()?; // topic tagged fields
            topics.push(ProduceTopic { name, partitions });
        }

        Ok(Self {
            acks,
            timeout_ms,
            topics,
        })
    }

    /// The topic and partition when the request names exactly one of each.
    #[must_use]
    pub fn single_partition(&self) -> Option<(&ProduceTopic, &ProducePartition)> {
        match self.topics.as_slice() {
            [topic] => match topic.partitions.as_slice() {
                [partition] => Some((topic, partition)),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Per-partition acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionAck {
    pub index: i32,
    pub error_code: i16,
}

impl PartitionAck {
    fn success(index: i32) -> Self {
        Self {
            index,
            error_code: error_code::NONE,
        }
    }

    fn unknown(index: i32) -> Self {
        Self {
            index,
            error_code: error_code::UNKNOWN_TOPIC_OR_PARTITION,
        }
    }
}

/// Handler for Produce requests.
pub struct ProduceHandler {
    resolver: Arc<dyn MetadataResolver>,
}

impl ProduceHandler {
    /// Create a new Produce handler.
    #[must_use]
    pub fn new(resolver: Arc<dyn MetadataResolver>) -> Self {
        Self { resolver }
    }

    async fn produce_single(
        &self,
        topic: &ProduceTopic,
        partition: &ProducePartition,
    ) -> Result<PartitionAck> {
        let resolved = self
            .resolver
            .topic_by_name(&topic.name, VALIDATION_PARTITION_LIMIT)
            .await?;
        let known = !resolved.is_unknown() && resolved.has_partition(partition.index);

        if !known || partition.records.is_empty() {
            debug!(
                topic = %topic.name,
                partition = partition.index,
                known,
                "rejecting produce to unknown partition"
            );
            return Ok(PartitionAck::unknown(partition.index));
        }

        self.resolver
            .append_records(&topic.name, partition.index, &partition.records)
            .await?;
        Ok(PartitionAck::success(partition.index))
    }

    async fn produce_unchecked(&self, topics: &[ProduceTopic]) -> Result<Vec<Vec<PartitionAck>>> {
        // Nothing is written unless every name maps under the log root.
        for topic in topics {
            validate_topic_name(&topic.name)?;
        }

        let mut acks = Vec::with_capacity(topics.len());
        for topic in topics {
            let mut topic_acks = Vec::with_capacity(topic.partitions.len());
            for partition in &topic.partitions {
                if !partition.records.is_empty() {
                    self.resolver
                        .append_records(&topic.name, partition.index, &partition.records)
                        .await?;
                }
                topic_acks.push(PartitionAck::success(partition.index));
            }
            acks.push(topic_acks);
        }
        Ok(acks)
    }

    /// Build the response; `acks[i]` holds the partitions of `topics[i]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the response message fails to encode.
    pub fn build_response(
        correlation_id: i32,
        topics: &[ProduceTopic],
        acks: &[Vec<PartitionAck>],
    ) -> Result<BytesMut> {
        let mut body = ProduceResponse::default();
        body.throttle_time_ms = 0;

        for (topic, topic_acks) in topics.iter().zip(acks) {
            let mut topic_response = TopicProduceResponse::default();
            topic_response.name = TopicName::from(StrBytes::from_string(topic.name.clone()));

            for ack in topic_acks {
                let offset = if ack.error_code == error_code::NONE { 0 } else { -1 };
                let mut partition = PartitionProduceResponse::default();
                partition.index = ack.index;
                partition.error_code = ack.error_code;
                partition.base_offset = offset;
                partition.log_append_time_ms = -1;
                partition.log_start_offset = offset;
                partition.error_message = None;
                topic_response.partition_responses.push(partition);
            }

            body.responses.push(topic_response);
        }

        let mut response = ResponseBuf::flexible(correlation_id);
        response.put_message(&body, BODY_VERSION)?;
        Ok(response.finish())
    }
}

#[async_trait]
impl ProtocolHandler for ProduceHandler {
    fn api_key(&self) -> ApiKey {
        ApiKey::Produce
    }

    async fn handle(&self, frame: &KafkaFrame) -> Result<BytesMut> {
        let request = ProduceRequest::parse(&frame.bytes)?;
        debug!(
            correlation_id = frame.correlation_id,
            topics = request.topics.len(),
            acks = request.acks,
            "handling Produce"
        );

        let acks = match request.single_partition() {
            Some((topic, partition)) => vec![vec![self.produce_single(topic, partition).await?]],
            None => self.produce_unchecked(&request.topics).await?,
        };

        Self::build_response(frame.correlation_id, &request.topics, &acks)
    }
}

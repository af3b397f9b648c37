//! Fetch request handler.
//!
//! Only the first requested topic, and its first partition, are served. Stored
//! record batches are echoed back verbatim; watermarks are not tracked and are
//! always reported as 0.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use kafka_protocol::messages::fetch_response::{FetchableTopicResponse, PartitionData};
use kafka_protocol::messages::{BrokerId, FetchResponse};
use tracing::debug;

use crate::error::{ProtocolResult, Result};
use crate::metadata::{MetadataResolver, TopicId};
use crate::network::codec::KafkaFrame;
use crate::protocol::{error_code, ApiKey, RequestHeader, ResponseBuf};

use super::ProtocolHandler;

/// Version the response body is encoded at.
const BODY_VERSION: i16 = 16;

/// The part of a Fetch request this broker looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    pub topic_count: usize,
    pub topic_id: TopicId,
    /// `0` when the first topic lists no partitions.
    pub partition: i32,
}

impl FetchRequest {
    /// Parse from the raw frame content, header included.
    pub fn parse(buf: &[u8]) -> ProtocolResult<Self> {
        let header = RequestHeader::parse(buf)?;
        let mut body = header.body(buf);

        body.skip(4)?; // max_wait_ms
        body.skip(4)?; // min_bytes
        body.skip(4)?; // max_bytes
        body.skip(1)?; // isolation_level
        body.skip(4)?; // session_id
        body.skip(4)?; // session_epoch

        let topic_count = body.read_compact_len()?;
        if topic_count == 0 {
            return Ok(Self {
                topic_count,
                topic_id: TopicId::ZERO,
                partition: 0,
            });
        }

        let topic_id = TopicId::from_wire(body.read_uuid_bytes()?);
        let partition = if body.read_compact_len()? > 0 {
            body.read_i32()?
        } else {
            0
        };

        Ok(Self {
            topic_count,
            topic_id,
            partition,
        })
    }
}

/// Outcome for the single served partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// No topics were requested.
    NoTopics,
    /// The topic id is not in the metadata log.
    UnknownTopic { topic_id: TopicId },
    /// The topic exists but the partition log is absent or empty.
    Empty { topic_id: TopicId },
    /// Batches read from the partition log.
    Records {
        topic_id: TopicId,
        partition: i32,
        batches: Vec<Bytes>,
    },
}

/// Handler for Fetch requests.
pub struct FetchHandler {
    resolver: Arc<dyn MetadataResolver>,
}

impl FetchHandler {
    /// Create a new Fetch handler.
    #[must_use]
    pub fn new(resolver: Arc<dyn MetadataResolver>) -> Self {
        Self { resolver }
    }

    async fn resolve(&self, request: &FetchRequest) -> Result<FetchOutcome> {
        if request.topic_count == 0 {
            return Ok(FetchOutcome::NoTopics);
        }

        let topic_id = request.topic_id;
        if !self.resolver.topic_id_exists(&topic_id).await? {
            return Ok(FetchOutcome::UnknownTopic { topic_id });
        }

        let Some(name) = self.resolver.find_topic_name_by_id(&topic_id).await? else {
            debug!(topic_id = %topic_id, "topic id present but no name recovered");
            return Ok(FetchOutcome::UnknownTopic { topic_id });
        };

        if self.resolver.data_log_len(&name, request.partition).await? == 0 {
            return Ok(FetchOutcome::Empty { topic_id });
        }

        let batches = self.resolver.record_batches(&name, request.partition).await?;
        debug!(
            topic = %name,
            partition = request.partition,
            batches = batches.len(),
            "serving record batches"
        );
        Ok(FetchOutcome::Records {
            topic_id,
            partition: request.partition,
            batches,
        })
    }

    /// Build the response for `outcome`.
    ///
    /// # Errors
    ///
    /// Returns an error if the response message fails to encode.
    pub fn build_response(correlation_id: i32, outcome: &FetchOutcome) -> Result<BytesMut> {
        let mut body = FetchResponse::default();
        body.throttle_time_ms = 0;
        body.error_code = error_code::NONE;
        body.session_id = 0;

        let entry = match outcome {
            FetchOutcome::NoTopics => None,
            FetchOutcome::UnknownTopic { topic_id } => {
                Some((topic_id, 0, error_code::UNKNOWN_TOPIC_ID, None))
            }
            FetchOutcome::Empty { topic_id } => Some((topic_id, 0, error_code::NONE, None)),
            FetchOutcome::Records {
                topic_id,
                partition,
                batches,
            } => Some((
                topic_id,
                *partition,
                error_code::NONE,
                Some(concat_batches(batches)),
            )),
        };

        if let Some((topic_id, index, error, records)) = entry {
            let mut partition = PartitionData::default();
            partition.partition_index = index;
            partition.error_code = error;
            partition.high_watermark = 0;
            partition.last_stable_offset = 0;
            partition.log_start_offset = 0;
            partition.aborted_transactions = Some(Vec::new());
            partition.preferred_read_replica = BrokerId(-1);
            partition.records = records;

            let mut topic = FetchableTopicResponse::default();
            topic.topic_id = topic_id.as_uuid();
            topic.partitions.push(partition);
            body.responses.push(topic);
        }

        let mut response = ResponseBuf::flexible(correlation_id);
        response.put_message(&body, BODY_VERSION)?;
        Ok(response.finish())
    }
}

fn concat_batches(batches: &[Bytes]) -> Bytes {
    let mut records = BytesMut::with_capacity(batches.iter().map(Bytes::len).sum());
    for batch in batches {
        records.extend_from_slice(batch);
    }
    records.freeze()
}

#[async_trait]
impl ProtocolHandler for FetchHandler {
    fn api_key(&self) -> ApiKey {
        ApiKey::Fetch
    }

    async fn handle(&self, frame: &KafkaFrame) -> Result<BytesMut> {
        let request = FetchRequest::parse(&frame.bytes)?;
        debug!(
            correlation_id = frame.correlation_id,
            topic_count = request.topic_count,
            topic_id = %request.topic_id,
            partition = request.partition,
            "handling Fetch"
        );

        let outcome = self.resolve(&request).await?;
        Self::build_response(frame.correlation_id, &outcome)
    }
}

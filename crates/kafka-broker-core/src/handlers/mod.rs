//! Kafka protocol request handlers.
//!
//! Each handler parses its own request from the raw frame (header included)
//! and builds the complete, length-prefixed response. Handlers hold no mutable
//! state; the only side effect in the whole set is the Produce append.

pub mod api_versions;
pub mod describe_topic_partitions;
pub mod dispatcher;
pub mod fetch;
pub mod produce;

pub use api_versions::ApiVersionsHandler;
pub use describe_topic_partitions::DescribeTopicPartitionsHandler;
pub use dispatcher::Dispatcher;
pub use fetch::FetchHandler;
pub use produce::ProduceHandler;

use async_trait::async_trait;
use bytes::BytesMut;

use crate::error::Result;
use crate::network::codec::KafkaFrame;
use crate::protocol::ApiKey;

/// Trait for protocol handlers.
#[async_trait]
pub trait ProtocolHandler: Send + Sync {
    /// The API this handler serves.
    fn api_key(&self) -> ApiKey;

    /// Handle a Kafka request and produce the full response.
    ///
    /// The returned buffer starts with the 4-byte length prefix, followed by
    /// the response header and body.
    async fn handle(&self, frame: &KafkaFrame) -> Result<BytesMut>;
}

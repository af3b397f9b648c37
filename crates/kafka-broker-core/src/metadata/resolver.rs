//! Lookup interface used by the request handlers.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

use super::topic::{Topic, TopicId};

/// Resolves topic metadata and partition log locations.
///
/// Handlers only ever see this trait, so the byte-scanning
/// [`LogScanResolver`](super::LogScanResolver) can be replaced by a
/// schema-aware decoder without touching them.
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    /// Look a topic up by name, reporting at most `limit` partitions.
    async fn topic_by_name(&self, name: &str, limit: usize) -> Result<Topic>;

    /// Whether `id` is known to the control plane.
    async fn topic_id_exists(&self, id: &TopicId) -> Result<bool>;

    /// Name of the topic identified by `id`, if one can be recovered.
    async fn find_topic_name_by_id(&self, id: &TopicId) -> Result<Option<String>>;

    /// On-disk path of the data log for `topic`/`partition`.
    ///
    /// Fails for topic names that cannot map under the log root.
    fn data_log_path(&self, topic: &str, partition: i32) -> Result<PathBuf>;

    /// Size in bytes of the data log; `0` when absent.
    async fn data_log_len(&self, topic: &str, partition: i32) -> Result<u64>;

    /// Every complete record batch stored for `topic`/`partition`.
    async fn record_batches(&self, topic: &str, partition: i32) -> Result<Vec<Bytes>>;

    /// Append raw record-batch bytes to the data log for `topic`/`partition`.
    async fn append_records(&self, topic: &str, partition: i32, records: &[u8]) -> Result<()>;
}

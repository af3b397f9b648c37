//! Best-effort metadata lookup by scanning the raw control-plane log.
//!
//! This is not a decoder of the log's record schema. Topic names, identifiers
//! and partition indices are located by pattern-matching the file bytes, using
//! fixed windows and thresholds that existing fixtures depend on:
//!
//! - the identifier is the first 16-byte span within [`ID_SEARCH_WINDOW`] bytes
//!   after the name that has fewer than [`ID_MAX_ZERO_BYTES`] zero bytes;
//! - partition indices are the 4-byte-aligned big-endian `i32` slices in the
//!   window that follows each occurrence of the identifier, up to
//!   [`PARTITION_SCAN_END`] bytes from the identifier start, that fall in
//!   `0..`[`PARTITION_INDEX_BOUND`].
//!
//! The log is re-read on every query, so changes made by an external writer are
//! visible on the next request.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, trace};

use crate::error::{BrokerError, Result};
use crate::storage::PartitionLogStore;

use super::resolver::MetadataResolver;
use super::topic::{Topic, TopicId};

/// How far past the end of a topic name an identifier is searched for.
pub const ID_SEARCH_WINDOW: usize = 64;

/// A candidate identifier must have fewer zero bytes than this.
pub const ID_MAX_ZERO_BYTES: usize = 14;

/// End (exclusive, relative to the identifier start) of the partition-index window.
pub const PARTITION_SCAN_END: usize = 128;

/// Partition-index candidates must be below this value.
pub const PARTITION_INDEX_BOUND: i32 = 32;

const ID_LEN: usize = 16;

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn occurrences<'a>(haystack: &'a [u8], needle: &'a [u8]) -> impl Iterator<Item = usize> + 'a {
    haystack
        .windows(needle.len())
        .enumerate()
        .filter(move |(_, w)| *w == needle)
        .map(|(pos, _)| pos)
}

fn looks_like_id(span: &[u8]) -> bool {
    span.len() == ID_LEN && span.iter().filter(|&&b| b == 0).count() < ID_MAX_ZERO_BYTES
}

fn is_printable(b: u8) -> bool {
    (0x20..=0x7E).contains(&b)
}

/// Identifier-looking span right after the name at `name_end`.
#[must_use]
pub fn find_id_after(data: &[u8], name_end: usize) -> Option<TopicId> {
    let last_start = data.len().checked_sub(ID_LEN)?;
    let end = last_start.min(name_end.saturating_add(ID_SEARCH_WINDOW));
    (name_end..end)
        .find(|&i| looks_like_id(&data[i..i + ID_LEN]))
        .map(|i| {
            let mut wire = [0u8; ID_LEN];
            wire.copy_from_slice(&data[i..i + ID_LEN]);
            TopicId::from_wire(wire)
        })
}

/// Plausible partition indices recorded next to `id`, ascending and capped at `limit`.
///
/// Falls back to `0..limit` when nothing plausible is found. A `limit` of zero
/// is treated as one.
#[must_use]
pub fn partition_indices_for(data: &[u8], id: &TopicId, limit: usize) -> Vec<i32> {
    let limit = limit.max(1);
    let wire = id.to_wire();
    let mut indices = Vec::new();

    for pos in occurrences(data, &wire) {
        if pos + ID_LEN + 4 > data.len() {
            continue;
        }
        for lookahead in (ID_LEN..PARTITION_SCAN_END).step_by(4) {
            let start = pos + lookahead;
            let Some(slice) = data.get(start..start + 4) else {
                break;
            };
            let candidate = i32::from_be_bytes([slice[0], slice[1], slice[2], slice[3]]);
            if (0..PARTITION_INDEX_BOUND).contains(&candidate) {
                indices.push(candidate);
            }
        }
    }

    indices.sort_unstable();
    indices.dedup();
    indices.truncate(limit);
    if indices.is_empty() {
        indices = fallback_indices(limit);
    }
    indices
}

/// Printable-ASCII token immediately preceding the first usable occurrence of `id`.
#[must_use]
pub fn name_before_id(data: &[u8], id: &TopicId) -> Option<String> {
    let wire = id.to_wire();
    let name = occurrences(data, &wire).find_map(|pos| {
        if pos < 2 {
            return None;
        }
        let end = pos - 1;
        let mut start = end + 1;
        while start > 0 && is_printable(data[start - 1]) {
            start -= 1;
        }
        (start <= end).then(|| String::from_utf8_lossy(&data[start..=end]).into_owned())
    });
    name
}

fn fallback_indices(limit: usize) -> Vec<i32> {
    (0..limit as i32).collect()
}

/// [`MetadataResolver`] backed by a byte scan of the control-plane log.
#[derive(Debug, Clone)]
pub struct LogScanResolver {
    metadata_log: PathBuf,
    logs: PartitionLogStore,
}

impl LogScanResolver {
    /// Create a resolver reading `metadata_log` and storing partition data under `log_root`.
    #[must_use]
    pub fn new(metadata_log: impl Into<PathBuf>, log_root: impl Into<PathBuf>) -> Self {
        Self {
            metadata_log: metadata_log.into(),
            logs: PartitionLogStore::new(log_root),
        }
    }

    #[must_use]
    pub fn metadata_log(&self) -> &Path {
        &self.metadata_log
    }

    #[must_use]
    pub fn logs(&self) -> &PartitionLogStore {
        &self.logs
    }

    /// Current contents of the metadata log, `None` when it does not exist.
    async fn read_metadata_log(&self) -> Result<Option<Bytes>> {
        match tokio::fs::read(&self.metadata_log).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                trace!(path = %self.metadata_log.display(), "metadata log absent");
                Ok(None)
            }
            Err(e) => Err(BrokerError::storage(&self.metadata_log, e)),
        }
    }
}

#[async_trait]
impl MetadataResolver for LogScanResolver {
    async fn topic_by_name(&self, name: &str, limit: usize) -> Result<Topic> {
        let Some(data) = self.read_metadata_log().await? else {
            return Ok(Topic::new(TopicId::ZERO, name, fallback_indices(limit)));
        };

        let Some(name_pos) = find(&data, name.as_bytes()) else {
            debug!(topic = name, "topic name not found in metadata log");
            return Ok(Topic::unknown(name));
        };

        let Some(id) = find_id_after(&data, name_pos + name.len()) else {
            // Partitions are then read after runs of the all-zero identifier.
            let indices = partition_indices_for(&data, &TopicId::ZERO, limit);
            debug!(topic = name, partitions = ?indices, "no identifier found near topic name");
            return Ok(Topic::new(TopicId::ZERO, name, indices));
        };

        let indices = partition_indices_for(&data, &id, limit);
        debug!(topic = name, topic_id = %id, partitions = ?indices, "resolved topic");
        Ok(Topic::new(id, name, indices))
    }

    async fn topic_id_exists(&self, id: &TopicId) -> Result<bool> {
        Ok(self
            .read_metadata_log()
            .await?
            .is_some_and(|data| find(&data, &id.to_wire()).is_some()))
    }

    async fn find_topic_name_by_id(&self, id: &TopicId) -> Result<Option<String>> {
        Ok(self
            .read_metadata_log()
            .await?
            .and_then(|data| name_before_id(&data, id)))
    }

    fn data_log_path(&self, topic: &str, partition: i32) -> Result<PathBuf> {
        self.logs.path(topic, partition)
    }

    async fn data_log_len(&self, topic: &str, partition: i32) -> Result<u64> {
        self.logs.len(topic, partition).await
    }

    async fn record_batches(&self, topic: &str, partition: i32) -> Result<Vec<Bytes>> {
        self.logs.read_batches(topic, partition).await
    }

    async fn append_records(&self, topic: &str, partition: i32, records: &[u8]) -> Result<()> {
        self.logs.append(topic, partition, records).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID_WIRE: [u8; 16] = [
        0xA1, 0xB2, 0xC3, 0xD4, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB,
        0xCC,
    ];

    fn topic_record(name: &str) -> Vec<u8> {
        let mut out = vec![0x00];
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(&ID_WIRE);
        out.extend(std::iter::repeat(0xFF).take(PARTITION_SCAN_END));
        out
    }

    fn partition_record(index: i32) -> Vec<u8> {
        let mut out = ID_WIRE.to_vec();
        out.extend_from_slice(&index.to_be_bytes());
        out.extend(std::iter::repeat(0xFF).take(PARTITION_SCAN_END));
        out
    }

    fn sample_log() -> Vec<u8> {
        let mut log = topic_record("orders");
        log.extend(partition_record(2));
        log.extend(partition_record(0));
        log.extend(partition_record(1));
        log.extend(partition_record(2));
        log
    }

    #[test]
    fn test_find_id_after_name() {
        let log = sample_log();
        let name_end = find(&log, b"orders").unwrap() + "orders".len();
        let id = find_id_after(&log, name_end).unwrap();
        assert_eq!(id.to_wire(), ID_WIRE);
    }

    #[test]
    fn test_find_id_skips_mostly_zero_spans() {
        let mut log = b"topic".to_vec();
        log.extend([0u8; 20]);
        log.extend([0u8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 7, 0, 0]);
        log.extend_from_slice(&ID_WIRE);
        log.extend([0xEE; 4]);
        let id = find_id_after(&log, 5).unwrap();
        // The first span with fewer than 14 zero bytes starts inside the padding.
        assert!(id.to_wire().iter().filter(|&&b| b == 0).count() < ID_MAX_ZERO_BYTES);
    }

    #[test]
    fn test_find_id_none_outside_window() {
        let mut log = b"topic".to_vec();
        log.extend([0u8; ID_SEARCH_WINDOW + 16]);
        log.extend_from_slice(&ID_WIRE);
        assert!(find_id_after(&log, 5).is_none());
        assert!(find_id_after(b"short", 0).is_none());
    }

    #[test]
    fn test_partition_indices_sorted_deduplicated_limited() {
        let log = sample_log();
        let id = TopicId::from_wire(ID_WIRE);
        assert_eq!(partition_indices_for(&log, &id, 32), vec![0, 1, 2]);
        assert_eq!(partition_indices_for(&log, &id, 2), vec![0, 1]);
        assert_eq!(partition_indices_for(&log, &id, 0), vec![0]);
    }

    #[test]
    fn test_partition_indices_ignore_out_of_range_and_unaligned() {
        let mut log = ID_WIRE.to_vec();
        log.extend(40i32.to_be_bytes());
        log.extend([0xFF, 0x00, 0x00, 0x00]);
        log.extend([0x05, 0xFF, 0xFF, 0xFF]);
        let id = TopicId::from_wire(ID_WIRE);
        assert_eq!(partition_indices_for(&log, &id, 4), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_partition_scan_window_bound() {
        let mut log = ID_WIRE.to_vec();
        log.extend([0xFF; PARTITION_SCAN_END - ID_LEN]);
        log.extend(7i32.to_be_bytes());
        let id = TopicId::from_wire(ID_WIRE);
        assert_eq!(partition_indices_for(&log, &id, 8), (0..8).collect::<Vec<_>>());

        let mut log = ID_WIRE.to_vec();
        log.extend([0xFF; PARTITION_SCAN_END - ID_LEN - 4]);
        log.extend(7i32.to_be_bytes());
        assert_eq!(partition_indices_for(&log, &id, 8), vec![7]);
    }

    #[test]
    fn test_name_before_id() {
        let log = sample_log();
        let id = TopicId::from_wire(ID_WIRE);
        assert_eq!(name_before_id(&log, &id).as_deref(), Some("orders"));
    }

    #[test]
    fn test_name_before_id_skips_unusable_matches() {
        let mut log = ID_WIRE.to_vec();
        log.extend([0x01]);
        log.extend_from_slice(b"\x00late");
        log.extend_from_slice(&ID_WIRE);
        let id = TopicId::from_wire(ID_WIRE);
        assert_eq!(name_before_id(&log, &id).as_deref(), Some("late"));

        let mut log = vec![0x00, 0x01];
        log.extend_from_slice(&ID_WIRE);
        assert_eq!(name_before_id(&log, &id), None);
    }

    #[tokio::test]
    async fn test_missing_metadata_log_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = LogScanResolver::new(dir.path().join("absent.log"), dir.path());

        let topic = resolver.topic_by_name("foo", 3).await.unwrap();
        assert!(topic.is_unknown());
        assert_eq!(topic.partition_indices(), vec![0, 1, 2]);

        let id = TopicId::from_wire(ID_WIRE);
        assert!(!resolver.topic_id_exists(&id).await.unwrap());
        assert_eq!(resolver.find_topic_name_by_id(&id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_resolver_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("meta.log");
        std::fs::write(&log_path, sample_log()).unwrap();
        let resolver = LogScanResolver::new(&log_path, dir.path());

        let topic = resolver.topic_by_name("orders", 2).await.unwrap();
        assert_eq!(topic.id.to_wire(), ID_WIRE);
        assert_eq!(topic.partition_indices(), vec![0, 1]);

        let missing = resolver.topic_by_name("payments", 2).await.unwrap();
        assert!(missing.is_unknown());
        assert!(missing.partitions.is_empty());

        let id = TopicId::from_wire(ID_WIRE);
        assert!(resolver.topic_id_exists(&id).await.unwrap());
        assert!(!resolver.topic_id_exists(&TopicId::placeholder("x", 0)).await.unwrap());
        assert_eq!(
            resolver.find_topic_name_by_id(&id).await.unwrap().as_deref(),
            Some("orders")
        );
    }

    #[tokio::test]
    async fn test_name_without_identifier_scans_zero_id() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("meta.log");
        let mut log = b"\x00orders".to_vec();
        log.extend([0u8; 200]);
        std::fs::write(&log_path, &log).unwrap();
        let resolver = LogScanResolver::new(&log_path, dir.path());

        let topic = resolver.topic_by_name("orders", 3).await.unwrap();
        assert!(topic.id.is_zero());
        assert_eq!(topic.partition_indices(), vec![0]);
    }

    #[tokio::test]
    async fn test_name_without_identifier_or_zero_runs_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("meta.log");
        std::fs::write(&log_path, b"\x00orders").unwrap();
        let resolver = LogScanResolver::new(&log_path, dir.path());

        let topic = resolver.topic_by_name("orders", 3).await.unwrap();
        assert!(topic.id.is_zero());
        assert_eq!(topic.partition_indices(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_metadata_log_changes_are_visible() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("meta.log");
        std::fs::write(&log_path, b"nothing here").unwrap();
        let resolver = LogScanResolver::new(&log_path, dir.path());

        assert!(resolver.topic_by_name("orders", 1).await.unwrap().is_unknown());
        std::fs::write(&log_path, sample_log()).unwrap();
        assert!(!resolver.topic_by_name("orders", 1).await.unwrap().is_unknown());
    }
}

//! Per-partition append-only data logs.
//!
//! A partition log lives at `<root>/<topic>-<partition>/00000000000000000000.log`
//! and is a plain concatenation of record batches. Each batch starts with
//! `base_offset:i64 batch_length:i32` and spans `12 + batch_length` bytes; the
//! interior is never decoded.

use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::{BrokerError, Result};

/// File name of the first (and only) segment of every log.
pub const SEGMENT_FILE_NAME: &str = "00000000000000000000.log";

/// Size of the `base_offset` + `batch_length` prefix of a record batch.
pub const BATCH_HEADER_LEN: usize = 12;

/// Longest topic name Kafka accepts.
pub const MAX_TOPIC_NAME_LEN: usize = 249;

/// Whether `name` can name a partition directory directly under the log root.
///
/// Follows Kafka's legal topic names: 1 to 249 characters from
/// `[A-Za-z0-9._-]`, excluding `.` and `..`.
#[must_use]
pub fn is_valid_topic_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_TOPIC_NAME_LEN
        && name != "."
        && name != ".."
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
}

/// Reject topic names that cannot map onto a partition log directory.
///
/// # Errors
///
/// Returns [`BrokerError::InvalidTopicName`] for names failing [`is_valid_topic_name`].
pub fn validate_topic_name(name: &str) -> Result<()> {
    if is_valid_topic_name(name) {
        Ok(())
    } else {
        Err(BrokerError::InvalidTopicName {
            name: name.to_string(),
        })
    }
}

/// Split a log image into whole record batches.
///
/// Stops at the first batch whose declared length is negative or would run
/// past the end of `data`; a truncated tail is dropped, never an error.
#[must_use]
pub fn split_batches(data: &Bytes) -> Vec<Bytes> {
    let mut batches = Vec::new();
    let mut pos = 0usize;

    while pos + BATCH_HEADER_LEN <= data.len() {
        let declared = i32::from_be_bytes([
            data[pos + 8],
            data[pos + 9],
            data[pos + 10],
            data[pos + 11],
        ]);
        let Ok(declared) = usize::try_from(declared) else {
            break;
        };
        let end = pos + BATCH_HEADER_LEN + declared;
        if end > data.len() {
            break;
        }
        batches.push(data.slice(pos..end));
        pos = end;
    }

    if pos < data.len() {
        debug!(
            trailing_bytes = data.len() - pos,
            batches = batches.len(),
            "ignoring incomplete trailing record batch"
        );
    }

    batches
}

/// Directory tree holding every partition log.
#[derive(Debug, Clone)]
pub struct PartitionLogStore {
    root: PathBuf,
}

impl PartitionLogStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the log for `topic`/`partition`.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::InvalidTopicName`] when `topic` would leave the
    /// log root or is not a legal topic name.
    pub fn path(&self, topic: &str, partition: i32) -> Result<PathBuf> {
        validate_topic_name(topic)?;
        Ok(self
            .root
            .join(format!("{topic}-{partition}"))
            .join(SEGMENT_FILE_NAME))
    }

    /// Size of the log in bytes; `0` when the file does not exist.
    ///
    /// A topic name that cannot have a log under the root also reads as `0`.
    pub async fn len(&self, topic: &str, partition: i32) -> Result<u64> {
        if !is_valid_topic_name(topic) {
            debug!(topic, partition, "illegal topic name, no partition log");
            return Ok(0);
        }
        let path = self.path(topic, partition)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(BrokerError::storage(&path, e)),
        }
    }

    /// Every complete record batch in the log; empty when the file does not exist.
    pub async fn read_batches(&self, topic: &str, partition: i32) -> Result<Vec<Bytes>> {
        if !is_valid_topic_name(topic) {
            return Ok(Vec::new());
        }
        let path = self.path(topic, partition)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(split_batches(&Bytes::from(data))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(BrokerError::storage(&path, e)),
        }
    }

    /// Append `records` verbatim to the end of the log.
    ///
    /// Creates the partition directory and file when absent. The file is opened
    /// in append mode for this call only and the whole blob goes out in a single
    /// `write_all`; existing content is never rewritten.
    ///
    /// # Errors
    ///
    /// Fails without touching the filesystem when `topic` is not a legal name.
    pub async fn append(&self, topic: &str, partition: i32, records: &[u8]) -> Result<()> {
        let path = self.path(topic, partition)?;
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| BrokerError::storage(dir, e))?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| BrokerError::storage(&path, e))?;

        if let Err(e) = file.write_all(records).await {
            warn!(path = %path.display(), error = %e, "partition log append failed");
            return Err(BrokerError::storage(&path, e));
        }
        file.flush()
            .await
            .map_err(|e| BrokerError::storage(&path, e))?;

        debug!(topic, partition, bytes = records.len(), "appended records");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{BufMut, BytesMut};

    fn batch(base_offset: i64, payload_len: usize) -> Vec<u8> {
        let mut buf = BytesMut::new();
        buf.put_i64(base_offset);
        buf.put_i32(payload_len as i32);
        buf.extend(std::iter::repeat(0xAB).take(payload_len));
        buf.to_vec()
    }

    #[test]
    fn test_split_three_batches() {
        let mut data = batch(0, 5);
        data.extend(batch(1, 0));
        data.extend(batch(2, 40));

        let batches = split_batches(&Bytes::from(data));
        let sizes: Vec<usize> = batches.iter().map(Bytes::len).collect();
        assert_eq!(sizes, vec![17, 12, 52]);
    }

    #[test]
    fn test_split_drops_overrunning_tail() {
        let mut data = batch(0, 4);
        let mut tail = batch(1, 100);
        tail.truncate(40);
        data.extend(tail);

        let batches = split_batches(&Bytes::from(data));
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 16);
    }

    #[test]
    fn test_split_short_and_negative() {
        assert!(split_batches(&Bytes::from_static(&[0; 11])).is_empty());

        let mut data = BytesMut::new();
        data.put_i64(0);
        data.put_i32(-5);
        data.put_i32(0);
        assert!(split_batches(&data.freeze()).is_empty());
    }

    #[test]
    fn test_path_layout() {
        let store = PartitionLogStore::new("/var/kafka");
        assert_eq!(
            store.path("orders", 3).unwrap(),
            PathBuf::from("/var/kafka/orders-3/00000000000000000000.log")
        );
    }

    #[test]
    fn test_topic_name_rules() {
        let longest = "t".repeat(MAX_TOPIC_NAME_LEN);
        let too_long = "t".repeat(MAX_TOPIC_NAME_LEN + 1);

        for name in ["orders", "a.b_c-d", "X", "...", longest.as_str()] {
            assert!(is_valid_topic_name(name), "{name}");
        }
        for name in [
            "",
            ".",
            "..",
            "../escaped",
            "a/b",
            "a\\b",
            "nul\0",
            "with space",
            too_long.as_str(),
        ] {
            assert!(!is_valid_topic_name(name), "{name:?}");
        }
    }

    #[test]
    fn test_path_rejects_escaping_names() {
        let store = PartitionLogStore::new("/var/kafka");
        let err = store.path("../etc", 0).unwrap_err();
        assert!(matches!(err, BrokerError::InvalidTopicName { name } if name == "../etc"));
    }

    #[tokio::test]
    async fn test_append_with_illegal_name_writes_nothing() {
        let parent = tempfile::tempdir().unwrap();
        let root = parent.path().join("logs");
        let store = PartitionLogStore::new(&root);

        let err = store.append("../escaped", 0, &batch(0, 3)).await.unwrap_err();
        assert!(matches!(err, BrokerError::InvalidTopicName { .. }));
        assert!(!parent.path().join("escaped-0").exists());
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn test_reads_with_illegal_name_see_no_log() {
        let dir = tempfile::tempdir().unwrap();
        let store = PartitionLogStore::new(dir.path());

        assert_eq!(store.len("../x", 0).await.unwrap(), 0);
        assert!(store.read_batches("a/b", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_creates_and_extends() {
        let dir = tempfile::tempdir().unwrap();
        let store = PartitionLogStore::new(dir.path());

        assert_eq!(store.len("t", 0).await.unwrap(), 0);
        assert!(store.read_batches("t", 0).await.unwrap().is_empty());

        let first = batch(0, 3);
        let second = batch(1, 9);
        store.append("t", 0, &first).await.unwrap();
        store.append("t", 0, &second).await.unwrap();

        let on_disk = std::fs::read(store.path("t", 0).unwrap()).unwrap();
        assert_eq!(on_disk, [first.clone(), second.clone()].concat());
        assert_eq!(store.len("t", 0).await.unwrap(), on_disk.len() as u64);

        let batches = store.read_batches("t", 0).await.unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].as_ref(), first.as_slice());
        assert_eq!(batches[1].as_ref(), second.as_slice());
    }
}

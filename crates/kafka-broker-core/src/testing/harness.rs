//! Test harness for integration testing of the broker.
//!
//! Provides a complete test environment with:
//! - A temporary log root holding a synthetic metadata log
//! - A [`LogScanResolver`] and [`Dispatcher`] over that directory
//! - Helper methods for sending requests and inspecting partition logs

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::BytesMut;
use tempfile::TempDir;
use tokio::sync::broadcast;

use crate::config::ListenConfig;
use crate::handlers::Dispatcher;
use crate::metadata::{LogScanResolver, TopicId};
use crate::network::{BrokerListener, KafkaFrame};
use crate::storage::SEGMENT_FILE_NAME;

use super::fixtures::MetadataLogBuilder;

/// Test harness for integration testing.
pub struct BrokerTestHarness {
    dir: TempDir,
    metadata_log: PathBuf,
    topics: Vec<(String, TopicId)>,
    /// The resolver over the temporary metadata log.
    pub resolver: Arc<LogScanResolver>,
    /// The dispatcher every request goes through.
    pub dispatcher: Arc<Dispatcher>,
}

impl BrokerTestHarness {
    /// Harness whose metadata log describes the topics in `metadata`.
    pub fn new(metadata: MetadataLogBuilder) -> Self {
        let topics = metadata.topics().to_vec();
        let harness = Self::without_metadata_log();
        let path = harness.metadata_log.clone();
        std::fs::create_dir_all(path.parent().expect("metadata log has a parent"))
            .expect("Failed to create metadata log directory");
        std::fs::write(&path, metadata.build()).expect("Failed to write metadata log");
        Self { topics, ..harness }
    }

    /// Harness with no metadata log on disk.
    pub fn without_metadata_log() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let metadata_log = dir
            .path()
            .join("__cluster_metadata-0")
            .join("00000000000000000000.log");
        let resolver = Arc::new(LogScanResolver::new(&metadata_log, dir.path()));
        let dispatcher = Arc::new(Dispatcher::new(resolver.clone()));

        Self {
            dir,
            metadata_log,
            topics: Vec::new(),
            resolver,
            dispatcher,
        }
    }

    /// Identifier written for `name`.
    ///
    /// # Panics
    ///
    /// Panics if the topic was not part of the metadata log.
    #[must_use]
    pub fn topic_id(&self, name: &str) -> TopicId {
        self.topics
            .iter()
            .find(|(topic, _)| topic == name)
            .map(|(_, id)| *id)
            .unwrap_or_else(|| panic!("topic {name} not in metadata log"))
    }

    /// Root directory of the partition logs.
    #[must_use]
    pub fn log_root(&self) -> &Path {
        self.dir.path()
    }

    #[must_use]
    pub fn metadata_log(&self) -> &Path {
        &self.metadata_log
    }

    /// Dispatch one request (frame content, no length prefix).
    pub async fn send(&self, request: BytesMut) -> crate::error::Result<BytesMut> {
        let frame = KafkaFrame::from_content(request)?;
        self.dispatcher.dispatch(&frame).await
    }

    /// Where the partition log for `topic`/`partition` lands.
    ///
    /// The name is joined unchecked so tests can look for files outside the
    /// log root.
    #[must_use]
    pub fn data_log_path(&self, topic: &str, partition: i32) -> PathBuf {
        self.log_root()
            .join(format!("{topic}-{partition}"))
            .join(SEGMENT_FILE_NAME)
    }

    /// Overwrite the partition log with `bytes`.
    pub fn write_data_log(&self, topic: &str, partition: i32, bytes: &[u8]) {
        let path = self.data_log_path(topic, partition);
        std::fs::create_dir_all(path.parent().expect("partition log has a parent"))
            .expect("Failed to create partition directory");
        std::fs::write(path, bytes).expect("Failed to write partition log");
    }

    /// Contents of the partition log, `None` when absent.
    #[must_use]
    pub fn read_data_log(&self, topic: &str, partition: i32) -> Option<Vec<u8>> {
        std::fs::read(self.data_log_path(topic, partition)).ok()
    }

    /// Serve the harness dispatcher on an ephemeral local port.
    ///
    /// Returns the bound address and the listener's shutdown handle.
    pub async fn start_listener(&self) -> (SocketAddr, broadcast::Sender<()>) {
        let config = ListenConfig {
            address: "127.0.0.1:0".to_string(),
            max_connections: 16,
        };
        let listener = BrokerListener::bind(&config, Arc::clone(&self.dispatcher))
            .await
            .expect("Failed to bind listener");
        let addr = listener.local_addr();
        let shutdown = listener.shutdown_handle();
        tokio::spawn(async move { listener.run().await });
        (addr, shutdown)
    }
}

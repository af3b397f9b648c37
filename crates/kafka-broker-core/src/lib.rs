//! Kafka Broker Core Library
//!
//! A minimal broker speaking four APIs of the Kafka wire protocol:
//! ApiVersions, DescribeTopicPartitions, Produce and Fetch. Topic metadata is
//! recovered by scanning the KRaft control-plane log on disk; record batches
//! are stored and replayed verbatim from per-partition log files.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration loading, validation and metadata-log discovery
//! - [`error`] - Domain-specific error types
//! - [`protocol`] - Wire primitives, request header parsing, response buffers
//! - [`metadata`] - Topic model and the metadata resolver
//! - [`storage`] - Append-only partition logs
//! - [`handlers`] - Kafka protocol request handlers and the dispatcher
//! - [`network`] - TCP listener, Kafka frame codec, connection handling
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use kafka_broker_core::{BrokerConfig, BrokerListener, Dispatcher, LogScanResolver};
//!
//! let config = BrokerConfig::from_file("broker.yaml")?;
//! let metadata_log = config.discover_metadata_log("/tmp/server.properties".as_ref());
//! let resolver = LogScanResolver::new(&metadata_log, config.log_root(&metadata_log));
//! let dispatcher = Arc::new(Dispatcher::new(Arc::new(resolver)));
//!
//! let listener = BrokerListener::bind(&config.listen, dispatcher).await?;
//! listener.run().await?;
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod metadata;
pub mod network;
pub mod protocol;
pub mod storage;

/// Test utilities for integration testing.
///
/// This module is only available when compiling tests or when the `testing` feature is enabled.
#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used types
pub use config::{BrokerConfig, ListenConfig, LoggingConfig, StorageConfig};
pub use error::{BrokerError, ConfigError, ProtocolError, Result};
pub use handlers::{Dispatcher, ProtocolHandler};
pub use metadata::{LogScanResolver, MetadataResolver, Topic, TopicId};
pub use network::BrokerListener;
pub use storage::PartitionLogStore;

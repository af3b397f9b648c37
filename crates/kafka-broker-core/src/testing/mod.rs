//! Test utilities for the broker.
//!
//! This module provides infrastructure for integration testing:
//!
//! - [`BrokerTestHarness`] - temporary log root, resolver and dispatcher
//! - [`MetadataLogBuilder`] - synthetic control-plane logs
//! - [`requests`] - request builders for the four served APIs
//! - [`responses`] - response decoders for assertions
//!
//! # Example
//!
//! ```rust,ignore
//! use kafka_broker_core::testing::{requests, responses, BrokerTestHarness, MetadataLogBuilder};
//!
//! #[tokio::test]
//! async fn test_describe() {
//!     let harness = BrokerTestHarness::new(MetadataLogBuilder::new().topic("orders", &[0, 1]));
//!
//!     let response = harness
//!         .send(requests::describe_topic_partitions_request(1, &["orders"], 10))
//!         .await
//!         .unwrap();
//!     let decoded = responses::decode_describe_topic_partitions(&response).unwrap();
//!     assert_eq!(decoded.topics[0].partitions, vec![0, 1]);
//! }
//! ```

pub mod fixtures;
pub mod harness;
pub mod requests;
pub mod responses;

pub use fixtures::{record_batch, MetadataLogBuilder};
pub use harness::BrokerTestHarness;

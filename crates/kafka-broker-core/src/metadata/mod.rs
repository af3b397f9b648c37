//! Topic metadata resolution.
//!
//! The control-plane log is the source of truth; [`Topic`] values are
//! materialized from it per request and never cached.

pub mod log_scan;
pub mod resolver;
pub mod topic;

pub use log_scan::LogScanResolver;
pub use resolver::MetadataResolver;
pub use topic::{Partition, Topic, TopicId};

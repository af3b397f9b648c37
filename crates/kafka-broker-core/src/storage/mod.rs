//! On-disk partition data logs.

pub mod partition_log;

pub use partition_log::{
    is_valid_topic_name, split_batches, validate_topic_name, PartitionLogStore, BATCH_HEADER_LEN,
    SEGMENT_FILE_NAME,
};

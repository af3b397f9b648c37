//! Kafka wire-format building blocks shared by the request handlers.
//!
//! - [`primitives`] - big-endian integers, varints, identifier byte order
//! - [`header`] - the common request header
//! - [`response`] - length-prefixed response buffers

pub mod header;
pub mod primitives;
pub mod response;

pub use header::RequestHeader;
pub use primitives::ByteReader;
pub use response::ResponseBuf;

/// API keys served by the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum ApiKey {
    Produce = 0,
    Fetch = 1,
    ApiVersions = 18,
    DescribeTopicPartitions = 75,
}

impl ApiKey {
    /// All served keys, in advertisement order.
    pub const ALL: [ApiKey; 4] = [
        ApiKey::Produce,
        ApiKey::Fetch,
        ApiKey::ApiVersions,
        ApiKey::DescribeTopicPartitions,
    ];

    /// Map a raw key to a served API, if any.
    #[must_use]
    pub fn from_i16(raw: i16) -> Option<Self> {
        Self::ALL.into_iter().find(|key| *key as i16 == raw)
    }
}

/// Protocol error codes emitted in responses.
pub mod error_code {
    pub const NONE: i16 = 0;
    pub const UNKNOWN_TOPIC_OR_PARTITION: i16 = 3;
    pub const UNSUPPORTED_VERSION: i16 = 35;
    pub const UNKNOWN_TOPIC_ID: i16 = 100;
}

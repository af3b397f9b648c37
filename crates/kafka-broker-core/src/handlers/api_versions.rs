//! ApiVersions request handler.
//!
//! Answers locally with the fixed set of APIs this broker serves. Only the
//! request header is consulted.

use async_trait::async_trait;
use bytes::BytesMut;
use kafka_protocol::messages::api_versions_response::ApiVersion;
use kafka_protocol::messages::ApiVersionsResponse;
use tracing::debug;

use crate::error::Result;
use crate::network::codec::KafkaFrame;
use crate::protocol::{error_code, ApiKey, ResponseBuf};

use super::ProtocolHandler;

/// Supported API keys and their version ranges, in advertisement order.
pub const SUPPORTED_APIS: &[(ApiKey, i16, i16)] = &[
    (ApiKey::Produce, 0, 11),
    (ApiKey::Fetch, 0, 16),
    (ApiKey::ApiVersions, 0, 4),
    (ApiKey::DescribeTopicPartitions, 0, 0),
];

/// Highest ApiVersions request version accepted.
const MAX_VERSION: i16 = 4;

/// Version the body is encoded at; v3 and v4 share one layout.
const BODY_VERSION: i16 = 3;

/// Handler for ApiVersions requests.
#[derive(Debug, Default, Clone, Copy)]
pub struct ApiVersionsHandler;

impl ApiVersionsHandler {
    /// Create a new ApiVersions handler.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Build the response for a request of `api_version`.
    ///
    /// The error code is `UNSUPPORTED_VERSION` outside `0..=4`; the body is
    /// otherwise identical. The response header carries no tag buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the response message fails to encode.
    pub fn build_response(correlation_id: i32, api_version: i16) -> Result<BytesMut> {
        let mut body = ApiVersionsResponse::default();
        body.error_code = if (0..=MAX_VERSION).contains(&api_version) {
            error_code::NONE
        } else {
            error_code::UNSUPPORTED_VERSION
        };

        for &(api_key, min_version, max_version) in SUPPORTED_APIS {
            let mut api = ApiVersion::default();
            api.api_key = api_key as i16;
            api.min_version = min_version;
            api.max_version = max_version;
            body.api_keys.push(api);
        }

        let mut response = ResponseBuf::new(correlation_id);
        response.put_message(&body, BODY_VERSION)?;
        Ok(response.finish())
    }
}

#[async_trait]
impl ProtocolHandler for ApiVersionsHandler {
    fn api_key(&self) -> ApiKey {
        ApiKey::ApiVersions
    }

    async fn handle(&self, frame: &KafkaFrame) -> Result<BytesMut> {
        debug!(
            correlation_id = frame.correlation_id,
            api_key = frame.api_key,
            api_version = frame.api_version,
            "handling ApiVersions"
        );
        Self::build_response(frame.correlation_id, frame.api_version)
    }
}

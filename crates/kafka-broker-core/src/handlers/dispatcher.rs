//! Routes request frames to their handler by API key.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::BytesMut;

use crate::error::Result;
use crate::metadata::MetadataResolver;
use crate::network::codec::KafkaFrame;

use super::{
    ApiVersionsHandler, DescribeTopicPartitionsHandler, FetchHandler, ProduceHandler,
    ProtocolHandler,
};

/// Static API key to handler map, built once at startup.
///
/// Keys without a handler are answered by the ApiVersions handler.
pub struct Dispatcher {
    handlers: HashMap<i16, Arc<dyn ProtocolHandler>>,
    fallback: Arc<dyn ProtocolHandler>,
}

impl Dispatcher {
    /// Build the dispatcher with every handler sharing `resolver`.
    #[must_use]
    pub fn new(resolver: Arc<dyn MetadataResolver>) -> Self {
        let api_versions: Arc<dyn ProtocolHandler> = Arc::new(ApiVersionsHandler::new());
        let handlers: [Arc<dyn ProtocolHandler>; 4] = [
            Arc::new(ProduceHandler::new(Arc::clone(&resolver))),
            Arc::new(FetchHandler::new(Arc::clone(&resolver))),
            Arc::clone(&api_versions),
            Arc::new(DescribeTopicPartitionsHandler::new(resolver)),
        ];

        Self {
            handlers: handlers
                .into_iter()
                .map(|handler| (handler.api_key() as i16, handler))
                .collect(),
            fallback: api_versions,
        }
    }

    /// The handler serving `api_key`.
    #[must_use]
    pub fn handler_for(&self, api_key: i16) -> &Arc<dyn ProtocolHandler> {
        self.handlers.get(&api_key).unwrap_or(&self.fallback)
    }

    /// Handle one request frame, returning the length-prefixed response.
    pub async fn dispatch(&self, frame: &KafkaFrame) -> Result<BytesMut> {
        self.handler_for(frame.api_key).handle(frame).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::LogScanResolver;
    use crate::protocol::ApiKey;
    use bytes::BufMut;

    fn dispatcher() -> Dispatcher {
        let resolver = LogScanResolver::new("/nonexistent/metadata.log", "/nonexistent/logs");
        Dispatcher::new(Arc::new(resolver))
    }

    #[test]
    fn test_routes_served_keys() {
        let dispatcher = dispatcher();
        for api in ApiKey::ALL {
            assert_eq!(dispatcher.handler_for(api as i16).api_key(), api);
        }
    }

    #[test]
    fn test_unknown_key_falls_back_to_api_versions() {
        let dispatcher = dispatcher();
        assert_eq!(dispatcher.handler_for(3).api_key(), ApiKey::ApiVersions);
        assert_eq!(dispatcher.handler_for(-1).api_key(), ApiKey::ApiVersions);
    }

    #[tokio::test]
    async fn test_dispatch_unknown_key() {
        let mut bytes = BytesMut::new();
        bytes.put_i16(9);
        bytes.put_i16(1);
        bytes.put_i32(17);
        let frame = KafkaFrame::from_content(bytes).unwrap();

        let response = dispatcher().dispatch(&frame).await.unwrap();
        assert_eq!(&response[4..8], &17i32.to_be_bytes());
        assert_eq!(&response[8..10], &[0, 0]);
    }
}

//! Domain error types for the broker.
//!
//! Uses `thiserror` for ergonomic error definitions with proper context.
//! Protocol-level failures the peer can observe (unknown topic, unsupported
//! version, ...) are never represented here: they are encoded as error codes
//! inside well-formed responses. These types cover local faults only.

use thiserror::Error;

/// Errors related to configuration parsing and validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Invalid address format.
    #[error("invalid address format: {0} (expected 'host:port')")]
    InvalidAddress(String),
}

/// A request body that cannot be parsed.
///
/// Raised by the bound-checked primitive readers. It terminates the offending
/// connection and is never encoded as a protocol error code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A read ran past the end of the buffer.
    #[error("malformed request: need {needed} bytes at offset {offset}, only {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// Frame content is shorter than the fixed request header.
    #[error("malformed request: frame of {length} bytes is too small for a request header")]
    FrameTooShort { length: usize },
}

/// Errors that occur while serving a connection.
#[derive(Error, Debug)]
pub enum BrokerError {
    /// TCP/IO connection error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// Request bytes could not be parsed.
    #[error(transparent)]
    Malformed(#[from] ProtocolError),

    /// A partition or metadata log could not be read or written.
    #[error("storage error on '{path}': {source}")]
    Storage {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A response message could not be encoded.
    #[error("failed to encode response: {message}")]
    Encode { message: String },

    /// A topic name that cannot be mapped onto a partition log directory.
    #[error("invalid topic name '{name}'")]
    InvalidTopicName { name: String },

    /// Shutdown signal received.
    #[error("broker shutting down")]
    Shutdown,
}

impl BrokerError {
    /// Wrap an I/O error raised while touching `path`.
    pub(crate) fn storage(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Result type alias for broker operations.
pub type Result<T> = std::result::Result<T, BrokerError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for primitive decoding.
pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;

//! Error types and handling for tributary
//!
//! Every operator carries failures in-band as `Err(StreamError)`. A failure
//! terminates iteration: once an operator yields an error it yields nothing else.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Main error type for stream operations
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    /// Opaque failure forwarded verbatim from a source
    #[error("upstream failure: {0}")]
    Upstream(Arc<dyn Error + Send + Sync + 'static>),
    /// No element arrived within the configured duration
    #[error("no element received within {0:?}")]
    TimeoutExceeded(Duration),
    /// Operator parameters rejected at construction time
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// The consuming side went away; producers treat this as a clean stop
    #[error("operation cancelled")]
    Cancelled,
    /// A write was attempted after the channel completed
    #[error("channel closed")]
    ChannelClosed,
}

impl StreamError {
    /// Wrap any error as an upstream failure.
    pub fn upstream<E>(err: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        StreamError::Upstream(Arc::new(err))
    }

    /// Upstream failure carrying only a message.
    pub fn upstream_msg(msg: impl Into<String>) -> Self {
        StreamError::Upstream(Arc::new(UpstreamMessage(msg.into())))
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        StreamError::InvalidConfiguration(msg.into())
    }

    /// Returns `true` for the termination signals that are not user-visible failures.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, StreamError::Cancelled | StreamError::ChannelClosed)
    }
}

impl From<std::io::Error> for StreamError {
    fn from(err: std::io::Error) -> Self {
        StreamError::upstream(err)
    }
}

/// Plain-text upstream failure used by [`StreamError::upstream_msg`].
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct UpstreamMessage(pub String);

/// Result type for stream operations
pub type StreamResult<T> = Result<T, StreamError>;

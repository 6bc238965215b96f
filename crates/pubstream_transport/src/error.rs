//! Error types for transports and request handling.

use pubstream_protocol::{Control, ProtocolViolation};
use thiserror::Error;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for request handlers.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors raised by a transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The transport has been closed.
    #[error("transport closed")]
    Closed,

    /// A subject or filter is syntactically invalid.
    #[error("invalid subject {0:?}")]
    InvalidSubject(String),

    /// A reply was attempted on a message without a reply address.
    #[error("message has no reply subject")]
    NoReplySubject,

    /// A request received no reply in time.
    #[error("request timed out")]
    Timeout,

    /// The broker rejected or lost a publish.
    #[error("publish failed: {0}")]
    Publish(String),
}

impl TransportError {
    /// Returns true if repeating the operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Timeout | TransportError::Publish(_))
    }
}

/// Errors returned by request handlers.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The request could not be understood.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The request or a peer message broke the streaming protocol.
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),

    /// A transport operation failed while serving the request.
    #[error("{context}: {source}")]
    Transport {
        /// Step that failed.
        context: String,
        /// Underlying transport failure.
        #[source]
        source: TransportError,
    },

    /// A wait bounded by configuration expired.
    #[error("timed out: {0}")]
    Timeout(String),

    /// Application logic inside the handler failed.
    #[error("handler failed: {0}")]
    Handler(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ServiceError {
    /// Creates an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Wraps a transport failure with the step that caused it.
    pub fn transport(context: impl Into<String>, source: TransportError) -> Self {
        Self::Transport {
            context: context.into(),
            source,
        }
    }

    /// Wraps an application error.
    pub fn handler(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Handler(error.into())
    }

    /// Returns true if the requester is at fault.
    pub fn is_client_error(&self) -> bool {
        match self {
            ServiceError::InvalidRequest(_) => true,
            ServiceError::Protocol(violation) => !is_local_misuse(violation),
            _ => false,
        }
    }

    /// Returns true if the serving side is at fault.
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }
}

/// Violations raised by the serving side's own handler rather than a peer.
fn is_local_misuse(violation: &ProtocolViolation) -> bool {
    matches!(
        violation,
        ProtocolViolation::PublishAfterCompletion
            | ProtocolViolation::PublishAfterAbort
            | ProtocolViolation::UnexpectedPayload {
                control: Control::Done,
                ..
            }
    )
}

impl From<TransportError> for ServiceError {
    fn from(source: TransportError) -> Self {
        Self::transport("transport", source)
    }
}

//! Optional capabilities of delivered messages.
//!
//! Not every delivered message can be answered or acknowledged. Callers
//! probe for a capability through [`Capabilities`] and treat `None` as a
//! normal outcome.

use crate::error::TransportResult;
use async_trait::async_trait;
use pubstream_protocol::{Headers, Message, Outbound};

/// Read access to a message's addressing and headers.
pub trait Metadatable {
    /// Subject the message was delivered on.
    fn subject(&self) -> &str;

    /// Message headers.
    fn headers(&self) -> &Headers;

    /// Returns a header value.
    fn header(&self, name: &str) -> Option<&str> {
        self.headers().get(name)
    }
}

/// A message that can be answered on its reply address.
#[async_trait]
pub trait Respondable: Send + Sync {
    /// Address replies are published to.
    fn reply_subject(&self) -> &str;

    /// Publishes `outbound` to the reply address.
    async fn respond(&self, outbound: Outbound) -> TransportResult<()>;
}

/// A message whose receipt can be acknowledged.
#[async_trait]
pub trait Ackable: Send + Sync {
    /// Acknowledges receipt with an empty reply.
    async fn ack(&self) -> TransportResult<()>;
}

/// Capability probe.
///
/// Every method defaults to `None`; implementors override the ones they
/// support.
pub trait Capabilities {
    /// Returns the message as [`Metadatable`], if supported.
    fn as_metadatable(&self) -> Option<&dyn Metadatable> {
        None
    }

    /// Returns the message as [`Respondable`], if supported.
    fn as_respondable(&self) -> Option<&dyn Respondable> {
        None
    }

    /// Returns the message as [`Ackable`], if supported.
    fn as_ackable(&self) -> Option<&dyn Ackable> {
        None
    }
}

impl Metadatable for Message {
    fn subject(&self) -> &str {
        &self.subject
    }

    fn headers(&self) -> &Headers {
        &self.headers
    }
}

// A bare message has no transport to answer through.
impl Capabilities for Message {
    fn as_metadatable(&self) -> Option<&dyn Metadatable> {
        Some(self)
    }
}

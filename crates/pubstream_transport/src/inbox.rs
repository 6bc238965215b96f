//! Reply subjects drawn from the transport's own inbox namespace.

use crate::transport::Transport;
use pubstream_protocol::ReplySubject;
use std::sync::Arc;

/// Reply-subject generator delegating to [`Transport::new_inbox`].
#[derive(Clone)]
pub struct TransportInbox {
    transport: Arc<dyn Transport>,
}

impl TransportInbox {
    /// Creates a generator backed by `transport`.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

impl std::fmt::Debug for TransportInbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportInbox").finish_non_exhaustive()
    }
}

impl ReplySubject for TransportInbox {
    fn reply_subject(&self) -> String {
        self.transport.new_inbox()
    }
}

//! Configuration for stream clients and framers.

use std::time::Duration;

/// Configuration shared by [`Client`](crate::Client) and
/// [`StreamFramer`](crate::StreamFramer).
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Prefix of generated session subjects.
    pub subject_prefix: String,
    /// Prefix of generated reply inboxes.
    pub inbox_prefix: String,
    /// Bound on the handshake wait when the caller's context has no
    /// deadline.
    pub handshake_timeout: Duration,
    /// How long the framer waits for the caller to confirm its session
    /// subscription.
    ///
    /// Confirmation only happens when the request offers it; a client with
    /// `Some` offers it on every request. `None` disables it on both sides.
    pub ready_timeout: Option<Duration>,
}

impl StreamConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self {
            subject_prefix: "_STREAM".into(),
            inbox_prefix: "_INBOX".into(),
            handshake_timeout: Duration::from_secs(5),
            ready_timeout: Some(Duration::from_secs(5)),
        }
    }

    /// Sets the session subject prefix.
    pub fn with_subject_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.subject_prefix = prefix.into();
        self
    }

    /// Sets the reply inbox prefix.
    pub fn with_inbox_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.inbox_prefix = prefix.into();
        self
    }

    /// Sets the handshake timeout.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Sets the readiness confirmation timeout.
    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = Some(timeout);
        self
    }

    /// Starts streaming right after the ack, without waiting for the
    /// caller's confirmation.
    ///
    /// Only safe on transports that retain messages published before the
    /// caller subscribes.
    pub fn without_ready_confirmation(mut self) -> Self {
        self.ready_timeout = None;
        self
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = StreamConfig::default();
        assert_eq!(config.subject_prefix, "_STREAM");
        assert_eq!(config.inbox_prefix, "_INBOX");
        assert_eq!(config.handshake_timeout, Duration::from_secs(5));
        assert_eq!(config.ready_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn config_builder() {
        let config = StreamConfig::new()
            .with_subject_prefix("svc.streams")
            .with_inbox_prefix("svc.inbox")
            .with_handshake_timeout(Duration::from_millis(250))
            .without_ready_confirmation();

        assert_eq!(config.subject_prefix, "svc.streams");
        assert_eq!(config.inbox_prefix, "svc.inbox");
        assert_eq!(config.handshake_timeout, Duration::from_millis(250));
        assert!(config.ready_timeout.is_none());

        let config = config.with_ready_timeout(Duration::from_secs(1));
        assert_eq!(config.ready_timeout, Some(Duration::from_secs(1)));
    }
}

//! Transport-level message values.

use crate::frame::{Control, CONTROL_HEADER};
use crate::headers::Headers;
use bytes::Bytes;

/// A message as published to or delivered from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Target (outbound) or origin (inbound) subject.
    pub subject: String,
    /// Reply address, if the sender expects one.
    pub reply: Option<String>,
    /// Message headers.
    pub headers: Headers,
    /// Message body.
    pub payload: Bytes,
}

impl Message {
    /// Creates a message with no reply address and no headers.
    pub fn new(subject: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            subject: subject.into(),
            reply: None,
            headers: Headers::new(),
            payload: payload.into(),
        }
    }

    /// Sets the reply address.
    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.reply = Some(reply.into());
        self
    }

    /// Sets a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Returns the reply address if it is present and non-empty.
    pub fn reply(&self) -> Option<&str> {
        self.reply.as_deref().filter(|r| !r.is_empty())
    }

    /// Returns a header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }
}

/// A message body and headers handed to a publish sink, which decides the
/// target subject.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outbound {
    /// Message headers.
    pub headers: Headers,
    /// Message body.
    pub payload: Bytes,
}

impl Outbound {
    /// Creates an outbound message carrying `payload`.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            headers: Headers::new(),
            payload: payload.into(),
        }
    }

    /// Creates an empty message flagged as the end of the stream.
    ///
    /// Publishing it through a stream sink ends the session without the
    /// framer sending its own completion frame.
    pub fn completion() -> Self {
        Self::default().with_header(CONTROL_HEADER, Control::Done.as_str())
    }

    /// Sets a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Returns true if the message is flagged as the end of the stream.
    pub fn is_completion(&self) -> bool {
        Control::from_headers(&self.headers) == Some(Control::Done)
    }

    /// Addresses the message to `subject`.
    pub fn into_message(self, subject: impl Into<String>) -> Message {
        Message {
            subject: subject.into(),
            reply: None,
            headers: self.headers,
            payload: self.payload,
        }
    }
}

impl From<Bytes> for Outbound {
    fn from(payload: Bytes) -> Self {
        Self::new(payload)
    }
}

impl From<Vec<u8>> for Outbound {
    fn from(payload: Vec<u8>) -> Self {
        Self::new(payload)
    }
}

impl From<&'static str> for Outbound {
    fn from(payload: &'static str) -> Self {
        Self::new(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_reply_is_absent() {
        let msg = Message::new("svc.echo", "x").with_reply("");
        assert_eq!(msg.reply(), None);
        let msg = Message::new("svc.echo", "x").with_reply("_INBOX.1");
        assert_eq!(msg.reply(), Some("_INBOX.1"));
    }

    #[test]
    fn completion_outbound() {
        let done = Outbound::completion();
        assert!(done.is_completion());
        assert!(done.payload.is_empty());
        assert!(!Outbound::new("data").is_completion());
    }

    #[test]
    fn into_message_keeps_headers() {
        let msg = Outbound::new("body")
            .with_header("X-Trace", "t1")
            .into_message("_STREAM.abc");
        assert_eq!(msg.subject, "_STREAM.abc");
        assert_eq!(msg.header("x-trace"), Some("t1"));
        assert_eq!(&msg.payload[..], b"body");
    }
}

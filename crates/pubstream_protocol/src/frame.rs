//! Per-frame header contract.

use crate::error::{ProtocolResult, ProtocolViolation};
use crate::headers::Headers;
use bytes::Bytes;
use std::fmt;

/// Session correlation token header.
pub const UID_HEADER: &str = "Stream-UID";
/// Frame ordinal header.
pub const SEQUENCE_HEADER: &str = "Stream-Sequence";
/// Frame role header.
pub const CONTROL_HEADER: &str = "Stream-Control";
/// Request header by which a caller offers to confirm its session
/// subscription before frames flow.
pub const READY_HEADER: &str = "Stream-Ready";

/// Names accepted for the correlation token, preferred name first.
pub const UID_ALIASES: [&str; 2] = [UID_HEADER, "UID"];
/// Names accepted for the frame ordinal, preferred name first.
pub const SEQUENCE_ALIASES: [&str; 2] = [SEQUENCE_HEADER, "Sequence"];
/// Names accepted for the frame role, preferred name first.
pub const CONTROL_ALIASES: [&str; 2] = [CONTROL_HEADER, "Control"];

/// Role of a frame within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    /// Ordinary data frame.
    Proceed,
    /// Completion frame; ends the session.
    Done,
    /// Handshake acknowledgment carrying the session subject.
    Ack,
    /// Caller confirmation that it is subscribed to the session subject.
    Ready,
}

impl Control {
    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Control::Proceed => "proceed",
            Control::Done => "done",
            Control::Ack => "ack",
            Control::Ready => "ready",
        }
    }

    /// Parses a wire value. Values are case-sensitive.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "proceed" => Some(Control::Proceed),
            "done" => Some(Control::Done),
            "ack" => Some(Control::Ack),
            "ready" => Some(Control::Ready),
            _ => None,
        }
    }

    /// Reads the control header (or its alias) from `headers`.
    ///
    /// Returns `None` when the header is absent or carries an unknown value.
    pub fn from_headers(headers: &Headers) -> Option<Self> {
        headers.get_any(&CONTROL_ALIASES).and_then(Self::parse)
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of encoding one outbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// A data frame was produced; the session continues.
    Continue,
    /// The handler ended the session with this frame.
    Done,
}

impl Flow {
    /// Returns true if the session has ended.
    pub fn is_done(&self) -> bool {
        matches!(self, Flow::Done)
    }
}

/// A validated data frame delivered to the receiving side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Position of the frame within its session, starting at 0.
    pub sequence: u64,
    /// All headers of the frame, protocol headers included.
    pub headers: Headers,
    /// Frame body as published by the handler.
    pub payload: Bytes,
}

impl Frame {
    /// Returns a header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }
}

/// Parses a sequence header value.
///
/// Only plain base-10 digits are accepted: no sign, no whitespace, no
/// empty string. Values that overflow `u64` are malformed.
pub fn parse_sequence(value: &str) -> ProtocolResult<u64> {
    let malformed = || ProtocolViolation::MalformedSequence {
        value: value.to_string(),
    };
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    value.parse::<u64>().map_err(|_| malformed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn control_wire_values() {
        for control in [Control::Proceed, Control::Done, Control::Ack, Control::Ready] {
            assert_eq!(Control::parse(control.as_str()), Some(control));
        }
        assert_eq!(Control::parse("DONE"), None);
        assert_eq!(Control::parse(""), None);
    }

    #[test]
    fn control_from_alias_header() {
        let headers: Headers = [("control", "done")].into_iter().collect();
        assert_eq!(Control::from_headers(&headers), Some(Control::Done));
        assert_eq!(Control::from_headers(&Headers::new()), None);
    }

    #[test]
    fn sequence_accepts_plain_digits() {
        assert_eq!(parse_sequence("0").unwrap(), 0);
        assert_eq!(parse_sequence("100").unwrap(), 100);
        assert_eq!(parse_sequence("007").unwrap(), 7);
    }

    #[test]
    fn sequence_rejects_decorated_values() {
        for bad in ["", " 1", "1 ", "+1", "-1", "1.0", "0x10", "one", "18446744073709551616"] {
            assert!(
                matches!(
                    parse_sequence(bad),
                    Err(ProtocolViolation::MalformedSequence { .. })
                ),
                "accepted {bad:?}"
            );
        }
    }

    proptest! {
        #[test]
        fn sequence_parses_any_u64(n in any::<u64>()) {
            prop_assert_eq!(parse_sequence(&n.to_string()).unwrap(), n);
        }
    }
}

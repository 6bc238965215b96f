//! Frame decoding vectors.
//!
//! Each vector describes one raw message arriving on a session subject and
//! what a receiver must make of it. The vectors serialize to JSON so other
//! implementations of the protocol can check themselves against the same
//! cases.

use pubstream_protocol::{Decoded, FrameDecoder, Message, ProtocolViolation};
use serde::{Deserialize, Serialize};

/// Correlation token every vector's session uses.
pub const VECTOR_UID: &str = "X";

/// Outcome a receiver must produce for a vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Expected {
    /// A data frame with this sequence.
    Frame {
        /// Sequence the frame is delivered with.
        sequence: u64,
    },
    /// End-of-stream.
    End,
    /// A protocol violation of this kind; the receiver state is unchanged.
    Violation {
        /// Kind name as returned by [`violation_kind`].
        kind: String,
    },
}

/// A decoding case shareable across implementations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameVector {
    /// Unique identifier for this vector.
    pub id: String,
    /// Human-readable description.
    pub description: String,
    /// Valid data frames accepted before this one.
    pub preceding: u64,
    /// Raw headers, in wire spelling.
    pub headers: Vec<(String, String)>,
    /// Frame body.
    pub body: String,
    /// What the receiver must report.
    pub expected: Expected,
}

impl FrameVector {
    fn new(id: &str, description: &str, headers: &[(&str, &str)], expected: Expected) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            preceding: 0,
            headers: headers
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            body: String::new(),
            expected,
        }
    }

    fn after(mut self, preceding: u64) -> Self {
        self.preceding = preceding;
        self
    }

    fn body(mut self, body: &str) -> Self {
        self.body = body.into();
        self
    }

    /// The raw message this vector describes.
    pub fn message(&self) -> Message {
        let mut message = Message::new("_STREAM.vector", self.body.clone());
        for (name, value) in &self.headers {
            message.headers.insert(name.as_str(), value.as_str());
        }
        message
    }

    /// Feeds the vector to a fresh decoder and reports the outcome.
    ///
    /// A violation that advances the decoder is reported as the
    /// `state_advanced` kind instead of its own.
    pub fn run(&self) -> Expected {
        let mut decoder = FrameDecoder::resume(VECTOR_UID, self.preceding);
        let before = decoder.expected_sequence();
        match decoder.decode(self.message()) {
            Ok(Decoded::Frame(frame)) => Expected::Frame {
                sequence: frame.sequence,
            },
            Ok(Decoded::End) => Expected::End,
            Err(_) if decoder.expected_sequence() != before => violation("state_advanced"),
            Err(violation) => violation_outcome(&violation),
        }
    }
}

fn violation_outcome(violation: &ProtocolViolation) -> Expected {
    Expected::Violation {
        kind: violation_kind(violation).into(),
    }
}

/// Stable name of a violation kind.
pub fn violation_kind(violation: &ProtocolViolation) -> &'static str {
    match violation {
        ProtocolViolation::MissingReplySubject => "missing_reply_subject",
        ProtocolViolation::UidMismatch { .. } => "uid_mismatch",
        ProtocolViolation::UnexpectedControl { .. } => "unexpected_control",
        ProtocolViolation::MissingSequence => "missing_sequence",
        ProtocolViolation::MalformedSequence { .. } => "malformed_sequence",
        ProtocolViolation::OutOfOrder { .. } => "out_of_order",
        ProtocolViolation::UnexpectedPayload { .. } => "unexpected_payload",
        ProtocolViolation::InvalidSessionSubject { .. } => "invalid_session_subject",
        ProtocolViolation::PublishAfterCompletion => "publish_after_completion",
        ProtocolViolation::PublishAfterAbort => "publish_after_abort",
    }
}

fn frame(sequence: u64) -> Expected {
    Expected::Frame { sequence }
}

fn violation(kind: &str) -> Expected {
    Expected::Violation { kind: kind.into() }
}

/// Receiver-side decoding vectors.
pub fn decoder_vectors() -> Vec<FrameVector> {
    vec![
        FrameVector::new(
            "first_frame_explicit_proceed",
            "First data frame with explicit proceed control",
            &[
                ("Stream-UID", "X"),
                ("Stream-Sequence", "0"),
                ("Stream-Control", "proceed"),
            ],
            frame(0),
        )
        .body("hello"),
        FrameVector::new(
            "first_frame_absent_control",
            "Absent control header means proceed",
            &[("Stream-UID", "X"), ("Stream-Sequence", "0")],
            frame(0),
        )
        .body("hello"),
        FrameVector::new(
            "short_header_aliases",
            "Request-scoped short header names",
            &[("UID", "X"), ("Sequence", "0"), ("Control", "proceed")],
            frame(0),
        ),
        FrameVector::new(
            "header_names_case_insensitive",
            "Header names match regardless of case",
            &[("stream-uid", "X"), ("STREAM-SEQUENCE", "2")],
            frame(2),
        )
        .after(2),
        FrameVector::new(
            "next_in_sequence",
            "Frame following three accepted frames",
            &[("Stream-UID", "X"), ("Stream-Sequence", "3")],
            frame(3),
        )
        .after(3),
        FrameVector::new(
            "sequence_gap",
            "Sequence 100 while expecting 0",
            &[("UID", "X"), ("Sequence", "100")],
            violation("out_of_order"),
        ),
        FrameVector::new(
            "sequence_repeat",
            "Sequence already delivered",
            &[("Stream-UID", "X"), ("Stream-Sequence", "1")],
            violation("out_of_order"),
        )
        .after(2),
        FrameVector::new(
            "sequence_missing",
            "Data frame without sequence header",
            &[("Stream-UID", "X")],
            violation("missing_sequence"),
        ),
        FrameVector::new(
            "sequence_signed",
            "Signed sequence value",
            &[("Stream-UID", "X"), ("Stream-Sequence", "+0")],
            violation("malformed_sequence"),
        ),
        FrameVector::new(
            "sequence_whitespace",
            "Sequence value with surrounding whitespace",
            &[("Stream-UID", "X"), ("Stream-Sequence", " 0 ")],
            violation("malformed_sequence"),
        ),
        FrameVector::new(
            "sequence_not_numeric",
            "Non-numeric sequence value",
            &[("Stream-UID", "X"), ("Stream-Sequence", "zero")],
            violation("malformed_sequence"),
        ),
        FrameVector::new(
            "sequence_overflow",
            "Sequence value beyond 64 bits",
            &[("Stream-UID", "X"), ("Stream-Sequence", "18446744073709551616")],
            violation("malformed_sequence"),
        ),
        FrameVector::new(
            "uid_forged",
            "Frame from another session",
            &[("Stream-UID", "Y"), ("Stream-Sequence", "0")],
            violation("uid_mismatch"),
        ),
        FrameVector::new(
            "uid_missing",
            "Frame without correlation token",
            &[("Stream-Sequence", "0")],
            violation("uid_mismatch"),
        ),
        FrameVector::new(
            "uid_case_sensitive",
            "Correlation token values are compared exactly",
            &[("Stream-UID", "x"), ("Stream-Sequence", "0")],
            violation("uid_mismatch"),
        ),
        FrameVector::new(
            "completion",
            "Empty completion frame",
            &[("Stream-UID", "X"), ("Stream-Control", "done")],
            Expected::End,
        )
        .after(1),
        FrameVector::new(
            "completion_empty_stream",
            "Completion before any data frame",
            &[("UID", "X"), ("Control", "done")],
            Expected::End,
        ),
        FrameVector::new(
            "completion_with_data",
            "Completion frame carrying a body",
            &[("UID", "X"), ("Control", "done")],
            violation("unexpected_payload"),
        )
        .body("trailing"),
        FrameVector::new(
            "control_ack_on_session",
            "Handshake ack on the session subject",
            &[
                ("Stream-UID", "X"),
                ("Stream-Sequence", "0"),
                ("Stream-Control", "ack"),
            ],
            violation("unexpected_control"),
        ),
        FrameVector::new(
            "control_unknown",
            "Unknown control value",
            &[
                ("Stream-UID", "X"),
                ("Stream-Sequence", "0"),
                ("Stream-Control", "DONE"),
            ],
            violation("unexpected_control"),
        ),
    ]
}

/// All vectors as pretty-printed JSON.
pub fn vectors_json() -> serde_json::Result<String> {
    serde_json::to_string_pretty(&decoder_vectors())
}

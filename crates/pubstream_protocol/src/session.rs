//! Per-session frame state machines and handshake frames.

use crate::error::{ProtocolResult, ProtocolViolation};
use crate::frame::{
    parse_sequence, Control, Flow, Frame, CONTROL_ALIASES, CONTROL_HEADER, READY_HEADER,
    SEQUENCE_ALIASES, SEQUENCE_HEADER, UID_ALIASES, UID_HEADER,
};
use crate::headers::Headers;
use crate::message::{Message, Outbound};
use crate::subject::is_valid_subject;
use bytes::Bytes;

fn check_uid(headers: &Headers, expected: &str) -> ProtocolResult<()> {
    match headers.get_any(&UID_ALIASES) {
        Some(uid) if uid == expected => Ok(()),
        received => Err(ProtocolViolation::UidMismatch {
            expected: expected.to_string(),
            received: received.map(str::to_string),
        }),
    }
}

fn check_control(headers: &Headers, expected: Control) -> ProtocolResult<()> {
    match headers.get_any(&CONTROL_ALIASES) {
        Some(value) if value == expected.as_str() => Ok(()),
        received => Err(ProtocolViolation::UnexpectedControl {
            expected,
            received: received.map(str::to_string),
        }),
    }
}

fn strip_protocol_headers(headers: &mut Headers) {
    for name in UID_ALIASES
        .iter()
        .chain(SEQUENCE_ALIASES.iter())
        .chain(CONTROL_ALIASES.iter())
    {
        headers.remove(name);
    }
}

/// Marks a request as willing to confirm readiness.
pub fn advertise_readiness(request: &mut Message) {
    request.headers.insert(READY_HEADER, "true");
}

/// Returns true if the request offered a readiness confirmation.
///
/// Requests without the header get the plain flow: frames follow the ack.
pub fn advertises_readiness(request: &Message) -> bool {
    request
        .headers
        .get(READY_HEADER)
        .is_some_and(|value| value.eq_ignore_ascii_case("true"))
}

/// Builds the handshake acknowledgment sent to the caller's reply address.
///
/// The body is the session subject. When `ready_inbox` is set the caller is
/// expected to confirm its subscription there before frames flow.
pub fn ack_frame(
    reply: &str,
    uid: &str,
    session_subject: &str,
    ready_inbox: Option<&str>,
) -> Message {
    let mut ack = Message::new(reply, Bytes::copy_from_slice(session_subject.as_bytes()))
        .with_header(UID_HEADER, uid)
        .with_header(CONTROL_HEADER, Control::Ack.as_str());
    ack.reply = ready_inbox.map(str::to_string);
    ack
}

/// Session parameters carried by a valid handshake ack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeAck {
    /// Subject the data frames are published on.
    pub subject: String,
    /// Where to confirm readiness, if the sender waits for it.
    pub ready_inbox: Option<String>,
}

/// Validates a handshake ack against the caller's correlation token.
pub fn validate_ack(message: &Message, uid: &str) -> ProtocolResult<HandshakeAck> {
    check_uid(&message.headers, uid)?;
    check_control(&message.headers, Control::Ack)?;
    let subject = std::str::from_utf8(&message.payload)
        .ok()
        .filter(|s| is_valid_subject(s))
        .ok_or_else(|| ProtocolViolation::InvalidSessionSubject {
            value: String::from_utf8_lossy(&message.payload).into_owned(),
        })?;
    Ok(HandshakeAck {
        subject: subject.to_string(),
        ready_inbox: message.reply().map(str::to_string),
    })
}

/// Builds the caller's readiness confirmation.
pub fn ready_frame(inbox: &str, uid: &str) -> Message {
    Message::new(inbox, Bytes::new())
        .with_header(UID_HEADER, uid)
        .with_header(CONTROL_HEADER, Control::Ready.as_str())
}

/// Validates a readiness confirmation.
pub fn validate_ready(message: &Message, uid: &str) -> ProtocolResult<()> {
    check_uid(&message.headers, uid)?;
    check_control(&message.headers, Control::Ready)?;
    if !message.payload.is_empty() {
        return Err(ProtocolViolation::UnexpectedPayload {
            control: Control::Ready,
            len: message.payload.len(),
        });
    }
    Ok(())
}

/// Builds the completion frame ending a session.
pub fn completion_frame(subject: &str, uid: &str) -> Message {
    Message::new(subject, Bytes::new())
        .with_header(UID_HEADER, uid)
        .with_header(CONTROL_HEADER, Control::Done.as_str())
}

/// Sender-side framing state for one session.
///
/// Turns the handler's outbound messages into sequenced frames addressed to
/// the session subject.
#[derive(Debug, Clone)]
pub struct FrameEncoder {
    uid: String,
    subject: String,
    next_sequence: u64,
    done: bool,
}

impl FrameEncoder {
    /// Creates the encoder for a session.
    pub fn new(uid: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            subject: subject.into(),
            next_sequence: 0,
            done: false,
        }
    }

    /// Session correlation token.
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Session subject.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Sequence the next data frame will carry.
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Returns true once a completion frame has been produced.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Encodes one outbound message.
    ///
    /// A message flagged as completion becomes the session's completion
    /// frame and yields [`Flow::Done`]; anything else becomes the next data
    /// frame. Protocol headers set by the handler are replaced.
    pub fn encode(&mut self, outbound: Outbound) -> ProtocolResult<(Message, Flow)> {
        if self.done {
            return Err(ProtocolViolation::PublishAfterCompletion);
        }
        let completion = outbound.is_completion();
        let Outbound {
            mut headers,
            payload,
        } = outbound;
        strip_protocol_headers(&mut headers);

        let flow = if completion {
            if !payload.is_empty() {
                return Err(ProtocolViolation::UnexpectedPayload {
                    control: Control::Done,
                    len: payload.len(),
                });
            }
            headers.insert(CONTROL_HEADER, Control::Done.as_str());
            self.done = true;
            Flow::Done
        } else {
            headers.insert(CONTROL_HEADER, Control::Proceed.as_str());
            headers.insert(SEQUENCE_HEADER, self.next_sequence.to_string());
            self.next_sequence += 1;
            Flow::Continue
        };
        headers.insert(UID_HEADER, self.uid.as_str());

        let message = Message {
            subject: self.subject.clone(),
            reply: None,
            headers,
            payload,
        };
        Ok((message, flow))
    }

    /// Produces the explicit completion frame.
    pub fn finish(&mut self) -> ProtocolResult<Message> {
        if self.done {
            return Err(ProtocolViolation::PublishAfterCompletion);
        }
        self.done = true;
        Ok(completion_frame(&self.subject, &self.uid))
    }
}

/// Result of decoding one received message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// A valid data frame.
    Frame(Frame),
    /// A valid completion frame; the session is over.
    End,
}

/// Receiver-side validation state for one session.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    uid: String,
    expected: u64,
    done: bool,
}

impl FrameDecoder {
    /// Creates the decoder for a session.
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            expected: 0,
            done: false,
        }
    }

    /// Creates a decoder that has already accepted `expected` data frames.
    pub fn resume(uid: impl Into<String>, expected: u64) -> Self {
        Self {
            expected,
            ..Self::new(uid)
        }
    }

    /// Session correlation token.
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Sequence the next data frame must carry.
    pub fn expected_sequence(&self) -> u64 {
        self.expected
    }

    /// Returns true once a completion frame has been accepted.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Validates one message from the session subject.
    ///
    /// On a violation the decoder state is left untouched, so the caller may
    /// keep reading if it chooses to tolerate the offending frame.
    pub fn decode(&mut self, message: Message) -> ProtocolResult<Decoded> {
        if self.done {
            return Ok(Decoded::End);
        }
        check_uid(&message.headers, &self.uid)?;

        match message.headers.get_any(&CONTROL_ALIASES) {
            Some(value) if value == Control::Done.as_str() => {
                if !message.payload.is_empty() {
                    return Err(ProtocolViolation::UnexpectedPayload {
                        control: Control::Done,
                        len: message.payload.len(),
                    });
                }
                self.done = true;
                return Ok(Decoded::End);
            }
            None => {}
            Some(value) if value == Control::Proceed.as_str() => {}
            Some(other) => {
                return Err(ProtocolViolation::UnexpectedControl {
                    expected: Control::Proceed,
                    received: Some(other.to_string()),
                })
            }
        }

        let raw = message
            .headers
            .get_any(&SEQUENCE_ALIASES)
            .ok_or(ProtocolViolation::MissingSequence)?;
        let sequence = parse_sequence(raw)?;
        if sequence != self.expected {
            return Err(ProtocolViolation::OutOfOrder {
                expected: self.expected,
                received: sequence,
            });
        }
        self.expected += 1;

        Ok(Decoded::Frame(Frame {
            sequence,
            headers: message.headers,
            payload: message.payload,
        }))
    }
}

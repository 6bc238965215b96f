//! # pubstream Protocol
//!
//! Wire contract for streaming responses over a publish/subscribe transport.
//!
//! This crate provides:
//! - `Headers`, `Message` and `Outbound` message values
//! - The per-frame header contract (`Stream-UID`, `Stream-Sequence`,
//!   `Stream-Control`)
//! - `FrameEncoder` (sender side) and `FrameDecoder` (receiver side) state
//!   machines
//! - Handshake frame builders and validators
//! - Subject validation, wildcard matching and reply-subject generators
//!
//! This is a pure protocol crate with no I/O operations.
//!
//! ## Session shape
//!
//! ```text
//! caller                         transport                       handler
//!   | request (reply=inbox, UID) ---------------------------------> |
//!   | <------------------------- ack (UID, Control=ack, body=subj)  |
//!   | ready (UID, Control=ready) ---------------------------------> |  (*)
//!   | <------------- frame (UID, Sequence=0, Control=proceed)       |
//!   | <------------- frame (UID, Sequence=1, Control=proceed)       |
//!   | <------------- completion (UID, Control=done, empty body)     |
//! ```
//!
//! (*) Only when the request carried `Stream-Ready: true` and the handler
//! side agreed by setting a reply address on the ack. Otherwise frames
//! follow the ack directly.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod frame;
mod headers;
mod message;
mod reply;
mod session;
mod subject;

pub use error::{ProtocolResult, ProtocolViolation};
pub use frame::{
    parse_sequence, Control, Flow, Frame, CONTROL_ALIASES, CONTROL_HEADER, READY_HEADER,
    SEQUENCE_ALIASES, SEQUENCE_HEADER, UID_ALIASES, UID_HEADER,
};
pub use headers::Headers;
pub use message::{Message, Outbound};
pub use reply::{new_uid, CryptoRandom, FastRandom, ReplySubject};
pub use session::{
    ack_frame, advertise_readiness, advertises_readiness, completion_frame, ready_frame,
    validate_ack, validate_ready, Decoded, FrameDecoder, FrameEncoder, HandshakeAck,
};
pub use subject::{is_valid_filter, is_valid_subject, subject_matches};

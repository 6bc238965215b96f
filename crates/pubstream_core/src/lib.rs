//! # pubstream
//!
//! Streaming responses over publish/subscribe transports.
//!
//! A plain request/reply exchange yields one answer. This crate turns it
//! into a correlated, ordered, terminated sequence of frames:
//!
//! - [`StreamFramer`] wraps a request handler on the serving side. It
//!   acknowledges the request with a dedicated session subject and turns
//!   everything the handler publishes into sequenced frames there.
//! - [`Client`] sends the request, validates the acknowledgment and
//!   returns a [`Receiver`] bound to the session.
//! - [`Receiver`] validates every frame's correlation token and sequence
//!   number, and reports end-of-stream once the completion frame arrives.
//!
//! Typed variants ([`TypedClient`], [`TypedReceiver`], [`TypedHandler`])
//! marshal values with a [`Codec`](pubstream_codec::Codec).
//!
//! ## Failure model
//!
//! The transport may drop, duplicate or reorder messages. The protocol does
//! not repair any of that: a missing, repeated or out-of-order frame is
//! reported as a [`ProtocolViolation`], never silently skipped.
//!
//! Every blocking wait is bounded by a [`Context`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod config;
mod context;
mod error;
mod framer;
mod receiver;
mod state;
mod typed;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use client::Client;
pub use config::StreamConfig;
pub use context::Context;
pub use error::{Step, StreamError, StreamResult};
pub use framer::{StreamFramer, StreamPublisher};
pub use receiver::Receiver;
pub use state::SessionState;
pub use typed::{typed_framer, Typed, TypedClient, TypedHandler, TypedPublisher, TypedReceiver};

// Re-exports so applications can depend on this crate alone.
pub use pubstream_codec::{CborCodec, Codec, CodecError, JsonCodec};
pub use pubstream_protocol::{
    Control, CryptoRandom, FastRandom, Flow, Frame, Headers, Message, Outbound,
    ProtocolViolation, ReplySubject,
};
pub use pubstream_transport::{
    Handler, MemoryBus, Publisher, Request, Service, ServiceConfig, ServiceError, ServiceHandle,
    ServiceResult, Subscription, Transport, TransportError, TransportInbox,
};
pub use tokio_util::sync::CancellationToken;

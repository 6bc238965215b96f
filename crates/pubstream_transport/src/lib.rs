//! # pubstream Transport
//!
//! Publish/subscribe transport abstraction and request-handling host.
//!
//! This crate provides:
//! - The [`Transport`] trait (publish, subscribe, inbox, request/reply)
//! - [`Subscription`] handles that release their interest exactly once
//! - [`MemoryBus`], an in-process broker with wildcard subjects
//! - Capability traits for delivered messages ([`Metadatable`],
//!   [`Respondable`], [`Ackable`])
//! - The request [`Service`] host that runs a [`Handler`] per inbound
//!   request
//!
//! ## Delivery model
//!
//! Delivery is at-most-once. Messages published to a subject with no
//! subscriber are dropped, and nothing orders messages published to
//! different subjects relative to each other. Protocols layered on top must
//! verify whatever ordering they rely on.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod capability;
mod error;
mod inbox;
mod memory;
mod service;
mod transport;

pub use capability::{Ackable, Capabilities, Metadatable, Respondable};
pub use error::{ServiceError, ServiceResult, TransportError, TransportResult};
pub use inbox::TransportInbox;
pub use memory::MemoryBus;
pub use service::{
    Handler, Publisher, ReplyPublisher, Request, Service, ServiceConfig, ServiceHandle,
};
pub use transport::{Subscription, Transport};

//! Test fixtures: scripted handlers, fault injection and forged frames.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use pubstream_protocol::{
    parse_sequence, Message, Outbound, CONTROL_HEADER, SEQUENCE_HEADER, UID_HEADER,
};
use pubstream_transport::{
    Handler, MemoryBus, Publisher, Request, ServiceError, ServiceResult, Subscription, Transport,
    TransportResult,
};
use std::sync::atomic::{AtomicUsize, Ordering};

/// A handler publishing a fixed list of frames.
#[derive(Debug, Clone, Default)]
pub struct ScriptedHandler {
    frames: Vec<Bytes>,
    complete: bool,
    fail_after: Option<usize>,
}

impl ScriptedHandler {
    /// Creates a handler publishing `frames` in order.
    pub fn new<I, B>(frames: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            frames: frames.into_iter().map(Into::into).collect(),
            complete: false,
            fail_after: None,
        }
    }

    /// Creates a handler publishing `count` frames of `size` bytes each.
    pub fn sized(count: usize, size: usize) -> Self {
        Self::new((0..count).map(|_| vec![0xABu8; size]))
    }

    /// Publishes the completion frame itself after the last frame.
    pub fn completing(mut self) -> Self {
        self.complete = true;
        self
    }

    /// Fails after publishing `count` frames.
    pub fn failing_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }
}

#[async_trait]
impl Handler for ScriptedHandler {
    async fn handle(&self, publisher: &mut dyn Publisher, _request: &Request) -> ServiceResult<()> {
        for (i, frame) in self.frames.iter().enumerate() {
            if self.fail_after == Some(i) {
                return Err(ServiceError::handler(format!("scripted failure after {i} frames")));
            }
            publisher.publish(Outbound::new(frame.clone())).await?;
        }
        if self.fail_after == Some(self.frames.len()) {
            return Err(ServiceError::handler("scripted failure after last frame"));
        }
        if self.complete {
            publisher.publish(Outbound::completion()).await?;
        }
        Ok(())
    }
}

/// A handler echoing the request body back as a single frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoHandler;

#[async_trait]
impl Handler for EchoHandler {
    async fn handle(&self, publisher: &mut dyn Publisher, request: &Request) -> ServiceResult<()> {
        publisher
            .publish(Outbound::new(request.payload().clone()))
            .await?;
        Ok(())
    }
}

/// A fault applied to data frames by [`FaultyTransport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Loses the frame with this sequence.
    Drop(u64),
    /// Delivers the frame with this sequence twice.
    Duplicate(u64),
    /// Delivers the frame with this sequence after the next one.
    Reorder(u64),
    /// Rewrites the correlation token of the frame with this sequence.
    ForgeUid(u64),
}

impl Fault {
    fn target(&self) -> u64 {
        match *self {
            Fault::Drop(n) | Fault::Duplicate(n) | Fault::Reorder(n) | Fault::ForgeUid(n) => n,
        }
    }
}

/// A transport that misbehaves on one data frame.
///
/// Everything else passes straight through to the wrapped bus.
pub struct FaultyTransport {
    bus: MemoryBus,
    fault: Fault,
    held: Mutex<Option<Message>>,
    applied: AtomicUsize,
}

impl FaultyTransport {
    /// Wraps `bus`.
    pub fn new(bus: MemoryBus, fault: Fault) -> Self {
        Self {
            bus,
            fault,
            held: Mutex::new(None),
            applied: AtomicUsize::new(0),
        }
    }

    /// Number of times the fault fired.
    pub fn applied(&self) -> usize {
        self.applied.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FaultyTransport {
    async fn publish(&self, mut message: Message) -> TransportResult<()> {
        let sequence = message
            .header(SEQUENCE_HEADER)
            .and_then(|s| parse_sequence(s).ok());
        let Some(sequence) = sequence else {
            return self.bus.publish(message).await;
        };

        if sequence == self.fault.target() {
            self.applied.fetch_add(1, Ordering::SeqCst);
            match self.fault {
                Fault::Drop(_) => return Ok(()),
                Fault::Duplicate(_) => {
                    self.bus.publish(message.clone()).await?;
                }
                Fault::Reorder(_) => {
                    *self.held.lock() = Some(message);
                    return Ok(());
                }
                Fault::ForgeUid(_) => {
                    message.headers.insert(UID_HEADER, "forged");
                }
            }
            return self.bus.publish(message).await;
        }

        self.bus.publish(message).await?;
        let held = self.held.lock().take();
        match held {
            Some(late) => self.bus.publish(late).await,
            None => Ok(()),
        }
    }

    async fn subscribe(&self, filter: &str) -> TransportResult<Subscription> {
        self.bus.subscribe(filter).await
    }

    fn new_inbox(&self) -> String {
        self.bus.new_inbox()
    }

    fn is_connected(&self) -> bool {
        self.bus.is_connected()
    }
}

/// Builds an arbitrary frame for the session subject `subject`.
///
/// `None` leaves the corresponding header out.
pub fn forge_frame(
    subject: &str,
    uid: Option<&str>,
    sequence: Option<&str>,
    control: Option<&str>,
    body: impl Into<Bytes>,
) -> Message {
    let mut message = Message::new(subject, body);
    if let Some(uid) = uid {
        message.headers.insert(UID_HEADER, uid);
    }
    if let Some(sequence) = sequence {
        message.headers.insert(SEQUENCE_HEADER, sequence);
    }
    if let Some(control) = control {
        message.headers.insert(CONTROL_HEADER, control);
    }
    message
}

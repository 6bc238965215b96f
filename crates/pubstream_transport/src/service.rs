//! Request-handling host.
//!
//! A [`Service`] subscribes to a subject and runs a [`Handler`] in its own
//! task for every request delivered there. Handlers answer through a
//! [`Publisher`] sink; the default sink publishes to the request's reply
//! address.

use crate::capability::{Ackable, Capabilities, Metadatable, Respondable};
use crate::error::{ServiceError, ServiceResult, TransportError, TransportResult};
use crate::transport::{Subscription, Transport};
use async_trait::async_trait;
use bytes::Bytes;
use pubstream_protocol::{Flow, Headers, Message, Outbound, ProtocolViolation};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// An inbound request together with the transport it arrived on.
#[derive(Clone)]
pub struct Request {
    message: Message,
    transport: Arc<dyn Transport>,
}

impl Request {
    /// Wraps a delivered message.
    pub fn new(message: Message, transport: Arc<dyn Transport>) -> Self {
        Self { message, transport }
    }

    /// The delivered message.
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Request body.
    pub fn payload(&self) -> &Bytes {
        &self.message.payload
    }

    /// Reply address, if present and non-empty.
    pub fn reply(&self) -> Option<&str> {
        self.message.reply()
    }

    /// The transport the request arrived on.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

impl Metadatable for Request {
    fn subject(&self) -> &str {
        &self.message.subject
    }

    fn headers(&self) -> &Headers {
        &self.message.headers
    }
}

#[async_trait]
impl Respondable for Request {
    fn reply_subject(&self) -> &str {
        self.reply().unwrap_or_default()
    }

    async fn respond(&self, outbound: Outbound) -> TransportResult<()> {
        let reply = self.reply().ok_or(TransportError::NoReplySubject)?;
        self.transport.publish(outbound.into_message(reply)).await
    }
}

#[async_trait]
impl Ackable for Request {
    async fn ack(&self) -> TransportResult<()> {
        self.respond(Outbound::default()).await
    }
}

impl Capabilities for Request {
    fn as_metadatable(&self) -> Option<&dyn Metadatable> {
        Some(self)
    }

    fn as_respondable(&self) -> Option<&dyn Respondable> {
        self.reply().map(|_| self as &dyn Respondable)
    }

    fn as_ackable(&self) -> Option<&dyn Ackable> {
        self.reply().map(|_| self as &dyn Ackable)
    }
}

/// Sink handlers publish their responses through.
#[async_trait]
pub trait Publisher: Send {
    /// Publishes one message.
    ///
    /// The returned [`Flow`] tells the handler whether the sink still
    /// accepts messages.
    async fn publish(&mut self, outbound: Outbound) -> ServiceResult<Flow>;
}

/// Publishes every message to a request's reply address.
pub struct ReplyPublisher {
    transport: Arc<dyn Transport>,
    reply: Option<String>,
}

impl ReplyPublisher {
    /// Creates a sink answering `request`.
    pub fn new(request: &Request) -> Self {
        Self {
            transport: Arc::clone(request.transport()),
            reply: request.reply().map(str::to_string),
        }
    }
}

#[async_trait]
impl Publisher for ReplyPublisher {
    async fn publish(&mut self, outbound: Outbound) -> ServiceResult<Flow> {
        let reply = self
            .reply
            .as_deref()
            .ok_or(ProtocolViolation::MissingReplySubject)?;
        self.transport
            .publish(outbound.into_message(reply))
            .await
            .map_err(|e| ServiceError::transport("publish reply", e))?;
        Ok(Flow::Continue)
    }
}

/// Application logic run once per request.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Handles `request`, publishing any responses through `publisher`.
    async fn handle(&self, publisher: &mut dyn Publisher, request: &Request) -> ServiceResult<()>;
}

#[async_trait]
impl<H: Handler + ?Sized> Handler for Arc<H> {
    async fn handle(&self, publisher: &mut dyn Publisher, request: &Request) -> ServiceResult<()> {
        (**self).handle(publisher, request).await
    }
}

/// Service host configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Maximum number of requests handled concurrently.
    pub max_in_flight: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 1024,
        }
    }
}

impl ServiceConfig {
    /// Sets the concurrency limit.
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }
}

#[derive(Debug, Default)]
struct ServiceStats {
    handled: AtomicU64,
    failed: AtomicU64,
}

/// Runs handlers for requests arriving on a subject.
pub struct Service;

impl Service {
    /// Subscribes to `subject` and serves every request with `handler`.
    ///
    /// The subscription is in place when this returns, so requests
    /// published afterwards are not lost.
    pub async fn spawn<H>(
        transport: Arc<dyn Transport>,
        subject: &str,
        handler: H,
        config: ServiceConfig,
    ) -> TransportResult<ServiceHandle>
    where
        H: Handler + 'static,
    {
        let subscription = transport.subscribe(subject).await?;
        let shutdown = CancellationToken::new();
        let stats = Arc::new(ServiceStats::default());
        let task = tokio::spawn(serve(
            transport,
            subscription,
            Arc::new(handler),
            config,
            shutdown.clone(),
            Arc::clone(&stats),
        ));
        tracing::debug!(subject, "service started");

        Ok(ServiceHandle {
            subject: subject.to_string(),
            shutdown,
            stats,
            task,
        })
    }
}

async fn serve<H>(
    transport: Arc<dyn Transport>,
    mut subscription: Subscription,
    handler: Arc<H>,
    config: ServiceConfig,
    shutdown: CancellationToken,
    stats: Arc<ServiceStats>,
) where
    H: Handler + 'static,
{
    let permits = Arc::new(Semaphore::new(config.max_in_flight.max(1)));
    loop {
        let message = tokio::select! {
            _ = shutdown.cancelled() => break,
            message = subscription.next() => match message {
                Some(message) => message,
                None => break,
            },
        };
        let permit = tokio::select! {
            _ = shutdown.cancelled() => break,
            permit = Arc::clone(&permits).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let request = Request::new(message, Arc::clone(&transport));
        let handler = Arc::clone(&handler);
        let stats = Arc::clone(&stats);
        tokio::spawn(async move {
            let _permit = permit;
            let mut publisher = ReplyPublisher::new(&request);
            match handler.handle(&mut publisher, &request).await {
                Ok(()) => {
                    stats.handled.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    if e.is_client_error() {
                        tracing::debug!(
                            subject = %request.message().subject,
                            error = %e,
                            "request rejected"
                        );
                    } else {
                        tracing::warn!(
                            subject = %request.message().subject,
                            error = %e,
                            "handler failed"
                        );
                    }
                }
            }
        });
    }
    subscription.unsubscribe();
    tracing::debug!(filter = subscription.filter(), "service stopped");
}

/// Handle to a running [`Service`].
#[derive(Debug)]
pub struct ServiceHandle {
    subject: String,
    shutdown: CancellationToken,
    stats: Arc<ServiceStats>,
    task: JoinHandle<()>,
}

impl ServiceHandle {
    /// Subject the service listens on.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Number of requests whose handler returned `Ok`.
    pub fn handled(&self) -> u64 {
        self.stats.handled.load(Ordering::Relaxed)
    }

    /// Number of requests whose handler returned an error.
    pub fn failed(&self) -> u64 {
        self.stats.failed.load(Ordering::Relaxed)
    }

    /// Returns true once the service has stopped accepting requests.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops accepting requests and waits for the listener to exit.
    ///
    /// Requests already dispatched run to completion in their own tasks.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!(subject = %self.subject, error = %e, "service task failed");
        }
    }
}

//! In-process message bus.

use crate::error::{TransportError, TransportResult};
use crate::transport::{Subscription, Transport};
use async_trait::async_trait;
use parking_lot::RwLock;
use pubstream_protocol::{is_valid_filter, is_valid_subject, subject_matches, Message};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use uuid::Uuid;

const INBOX_PREFIX: &str = "_INBOX";

struct Route {
    filter: String,
    sender: mpsc::UnboundedSender<Message>,
}

#[derive(Default)]
struct BusInner {
    routes: RwLock<HashMap<u64, Route>>,
    next_id: AtomicU64,
    closed: AtomicBool,
    published: AtomicU64,
    delivered: AtomicU64,
}

/// An in-process broker.
///
/// Every subscription whose filter matches a published subject receives a
/// copy of the message. A message with no matching subscription is
/// dropped. Cloning the bus yields another handle to the same broker.
#[derive(Clone, Default)]
pub struct MemoryBus {
    inner: Arc<BusInner>,
}

impl MemoryBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions whose filter matches `subject`.
    pub fn subscriber_count(&self, subject: &str) -> usize {
        self.inner
            .routes
            .read()
            .values()
            .filter(|route| subject_matches(&route.filter, subject))
            .count()
    }

    /// Total number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.inner.routes.read().len()
    }

    /// Number of messages accepted by [`Transport::publish`].
    pub fn published_count(&self) -> u64 {
        self.inner.published.load(Ordering::Relaxed)
    }

    /// Number of per-subscription deliveries.
    pub fn delivered_count(&self) -> u64 {
        self.inner.delivered.load(Ordering::Relaxed)
    }

    /// Closes the bus.
    ///
    /// Further publishes and subscribes fail with
    /// [`TransportError::Closed`]; live subscriptions end once drained.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.routes.write().clear();
        tracing::debug!("memory bus closed");
    }

    fn ensure_open(&self) -> TransportResult<()> {
        if self.inner.closed.load(Ordering::SeqCst) {
            Err(TransportError::Closed)
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for MemoryBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBus")
            .field("subscriptions", &self.subscription_count())
            .field("published", &self.published_count())
            .field("closed", &!self.is_connected())
            .finish()
    }
}

#[async_trait]
impl Transport for MemoryBus {
    async fn publish(&self, message: Message) -> TransportResult<()> {
        self.ensure_open()?;
        if !is_valid_subject(&message.subject) {
            return Err(TransportError::InvalidSubject(message.subject));
        }
        if let Some(reply) = message.reply() {
            if !is_valid_subject(reply) {
                return Err(TransportError::InvalidSubject(reply.to_string()));
            }
        }
        self.inner.published.fetch_add(1, Ordering::Relaxed);

        let mut delivered = 0u64;
        {
            let routes = self.inner.routes.read();
            for route in routes.values() {
                if subject_matches(&route.filter, &message.subject)
                    && route.sender.send(message.clone()).is_ok()
                {
                    delivered += 1;
                }
            }
        }
        self.inner.delivered.fetch_add(delivered, Ordering::Relaxed);
        tracing::trace!(subject = %message.subject, delivered, "published");
        Ok(())
    }

    async fn subscribe(&self, filter: &str) -> TransportResult<Subscription> {
        self.ensure_open()?;
        if !is_valid_filter(filter) {
            return Err(TransportError::InvalidSubject(filter.to_string()));
        }
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.routes.write().insert(
            id,
            Route {
                filter: filter.to_string(),
                sender,
            },
        );
        tracing::trace!(filter, id, "subscribed");

        let bus: Weak<BusInner> = Arc::downgrade(&self.inner);
        Ok(Subscription::new(filter, receiver, move || {
            if let Some(inner) = bus.upgrade() {
                inner.routes.write().remove(&id);
            }
        }))
    }

    fn new_inbox(&self) -> String {
        format!("{INBOX_PREFIX}.{}", Uuid::new_v4().simple())
    }

    fn is_connected(&self) -> bool {
        !self.inner.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn delivers_to_matching_subscriptions() {
        let bus = MemoryBus::new();
        let mut exact = bus.subscribe("orders.eu.created").await.unwrap();
        let mut single = bus.subscribe("orders.*.created").await.unwrap();
        let mut tail = bus.subscribe("orders.>").await.unwrap();
        let mut other = bus.subscribe("users.>").await.unwrap();

        bus.publish(Message::new("orders.eu.created", "o-1"))
            .await
            .unwrap();

        assert_eq!(exact.next().await.unwrap().payload, "o-1");
        assert_eq!(single.next().await.unwrap().payload, "o-1");
        assert_eq!(tail.next().await.unwrap().payload, "o-1");
        assert!(other.try_next().is_none());
        assert_eq!(bus.published_count(), 1);
        assert_eq!(bus.delivered_count(), 3);
    }

    #[tokio::test]
    async fn unmatched_publish_is_dropped() {
        let bus = MemoryBus::new();
        bus.publish(Message::new("nobody.listens", "x"))
            .await
            .unwrap();
        let mut late = bus.subscribe("nobody.listens").await.unwrap();
        assert!(late.try_next().is_none());
    }

    #[tokio::test]
    async fn unsubscribe_removes_route() {
        let bus = MemoryBus::new();
        let mut sub = bus.subscribe("a.b").await.unwrap();
        assert_eq!(bus.subscriber_count("a.b"), 1);

        sub.unsubscribe();
        assert_eq!(bus.subscriber_count("a.b"), 0);

        let dropped = bus.subscribe("a.b").await.unwrap();
        drop(dropped);
        assert_eq!(bus.subscription_count(), 0);
    }

    #[tokio::test]
    async fn rejects_invalid_subjects() {
        let bus = MemoryBus::new();
        let err = bus.publish(Message::new("a..b", "")).await.unwrap_err();
        assert_eq!(err, TransportError::InvalidSubject("a..b".into()));

        let err = bus.publish(Message::new("a.*", "")).await.unwrap_err();
        assert!(matches!(err, TransportError::InvalidSubject(_)));

        let err = bus.subscribe("a.>.b").await.unwrap_err();
        assert!(matches!(err, TransportError::InvalidSubject(_)));
    }

    #[tokio::test]
    async fn close_ends_subscriptions() {
        let bus = MemoryBus::new();
        let mut sub = bus.subscribe("a.b").await.unwrap();
        bus.publish(Message::new("a.b", "last")).await.unwrap();
        bus.close();

        assert!(!bus.is_connected());
        assert_eq!(sub.next().await.unwrap().payload, "last");
        assert!(sub.next().await.is_none());
        assert_eq!(
            bus.publish(Message::new("a.b", "")).await,
            Err(TransportError::Closed)
        );
        assert!(matches!(
            bus.subscribe("a.b").await,
            Err(TransportError::Closed)
        ));
    }

    #[tokio::test]
    async fn inboxes_are_unique() {
        let bus = MemoryBus::new();
        let a = bus.new_inbox();
        let b = bus.new_inbox();
        assert_ne!(a, b);
        assert!(a.starts_with("_INBOX."));
        assert!(is_valid_subject(&a));
    }

    #[tokio::test]
    async fn request_returns_first_reply() {
        let bus = MemoryBus::new();
        let mut service = bus.subscribe("echo").await.unwrap();
        let responder = bus.clone();
        tokio::spawn(async move {
            let request = service.next().await.unwrap();
            let reply = request.reply().unwrap().to_string();
            responder
                .publish(Message::new(reply, request.payload))
                .await
                .unwrap();
        });

        let reply = bus
            .request(Message::new("echo", "ping"), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(reply.payload, "ping");
    }

    #[tokio::test]
    async fn request_times_out_without_responder() {
        let bus = MemoryBus::new();
        let err = bus
            .request(Message::new("void", "ping"), Duration::from_millis(20))
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::Timeout);
        assert_eq!(bus.subscription_count(), 0);
    }
}

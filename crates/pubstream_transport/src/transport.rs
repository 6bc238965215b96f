//! Transport abstraction for publish/subscribe messaging.

use crate::error::{TransportError, TransportResult};
use async_trait::async_trait;
use pubstream_protocol::Message;
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;

/// A publish/subscribe transport.
///
/// This trait abstracts the broker, allowing for different implementations
/// (in-process bus, network brokers, fault-injecting wrappers for testing).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Publishes a message to `message.subject`.
    ///
    /// Fire-and-forget: success means the transport accepted the message,
    /// not that anybody received it.
    async fn publish(&self, message: Message) -> TransportResult<()>;

    /// Registers interest in subjects matching `filter`.
    async fn subscribe(&self, filter: &str) -> TransportResult<Subscription>;

    /// Returns a fresh subject suitable as a reply address.
    fn new_inbox(&self) -> String;

    /// Checks if the transport is usable.
    fn is_connected(&self) -> bool {
        true
    }

    /// Sends `message` with a fresh inbox as reply address and waits for
    /// the first reply.
    async fn request(&self, message: Message, timeout: Duration) -> TransportResult<Message> {
        let inbox = self.new_inbox();
        let mut replies = self.subscribe(&inbox).await?;
        self.publish(message.with_reply(inbox)).await?;
        match tokio::time::timeout(timeout, replies.next()).await {
            Ok(Some(reply)) => Ok(reply),
            Ok(None) => Err(TransportError::Closed),
            Err(_) => Err(TransportError::Timeout),
        }
    }
}

type Release = Box<dyn FnOnce() + Send>;

/// An active interest in a subject filter.
///
/// Messages are queued per subscription until read. The interest is
/// released exactly once: by [`Subscription::unsubscribe`] or on drop,
/// whichever comes first.
pub struct Subscription {
    filter: String,
    receiver: mpsc::UnboundedReceiver<Message>,
    release: Option<Release>,
}

impl Subscription {
    /// Creates a subscription fed by `receiver`.
    ///
    /// `release` runs once when the subscription is released.
    pub fn new(
        filter: impl Into<String>,
        receiver: mpsc::UnboundedReceiver<Message>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            filter: filter.into(),
            receiver,
            release: Some(Box::new(release)),
        }
    }

    /// The filter this subscription was registered with.
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Waits for the next message.
    ///
    /// Returns `None` once the subscription is released or the transport
    /// closed and every queued message has been read.
    pub async fn next(&mut self) -> Option<Message> {
        self.receiver.recv().await
    }

    /// Returns a queued message without waiting.
    pub fn try_next(&mut self) -> Option<Message> {
        self.receiver.try_recv().ok()
    }

    /// Releases the interest.
    ///
    /// Returns true if this call released it, false if it was already
    /// released. Messages already queued can still be read.
    pub fn unsubscribe(&mut self) -> bool {
        match self.release.take() {
            Some(release) => {
                release();
                self.receiver.close();
                true
            }
            None => false,
        }
    }

    /// Returns true until the subscription is released.
    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("filter", &self.filter)
            .field("active", &self.is_active())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counted(filter: &str) -> (Subscription, mpsc::UnboundedSender<Message>, Arc<AtomicUsize>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let releases = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&releases);
        let sub = Subscription::new(filter, rx, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (sub, tx, releases)
    }

    #[test]
    fn release_runs_once() {
        let (mut sub, _tx, releases) = counted("a.b");
        assert!(sub.is_active());
        assert!(sub.unsubscribe());
        assert!(!sub.unsubscribe());
        drop(sub);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_releases() {
        let (sub, _tx, releases) = counted("a.b");
        drop(sub);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn queued_messages_survive_unsubscribe() {
        let (mut sub, tx, _releases) = counted("a.b");
        tx.send(Message::new("a.b", "one")).unwrap();
        sub.unsubscribe();

        assert_eq!(sub.next().await.unwrap().payload, "one");
        assert!(sub.next().await.is_none());
        assert!(tx.send(Message::new("a.b", "two")).is_err());
    }

    #[test]
    fn try_next_does_not_wait() {
        let (mut sub, tx, _releases) = counted("a.*");
        assert!(sub.try_next().is_none());
        tx.send(Message::new("a.b", "x")).unwrap();
        assert_eq!(sub.try_next().unwrap().subject, "a.b");
        assert_eq!(sub.filter(), "a.*");
    }
}

//! Caller side of the streaming handshake.

use crate::config::StreamConfig;
use crate::context::Context;
use crate::error::{Step, StreamError, StreamResult};
use crate::receiver::Receiver;
use bytes::Bytes;
use pubstream_protocol::{
    advertise_readiness, new_uid, ready_frame, validate_ack, FastRandom, HandshakeAck, Message,
    ReplySubject, UID_HEADER,
};
use pubstream_transport::Transport;
use std::sync::Arc;

/// Starts streaming sessions against remote handlers.
///
/// A client is cheap to clone and can start any number of sessions; each
/// session is owned by the [`Receiver`] it returns.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    inboxes: Arc<dyn ReplySubject>,
    config: StreamConfig,
}

impl Client {
    /// Creates a client with the default configuration.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_config(transport, StreamConfig::default())
    }

    /// Creates a client.
    ///
    /// Reply inboxes are drawn from a [`FastRandom`] generator under
    /// `config.inbox_prefix`.
    pub fn with_config(transport: Arc<dyn Transport>, config: StreamConfig) -> Self {
        Self {
            transport,
            inboxes: Arc::new(FastRandom::new(config.inbox_prefix.clone())),
            config,
        }
    }

    /// Replaces the reply inbox generator.
    pub fn with_inboxes(mut self, inboxes: impl ReplySubject + 'static) -> Self {
        self.inboxes = Arc::new(inboxes);
        self
    }

    /// The client's configuration.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// The underlying transport.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Sends `payload` to `subject` and performs the handshake.
    ///
    /// The ack wait is bounded by `ctx`, or by the configured handshake
    /// timeout if `ctx` has no deadline.
    pub async fn start(
        &self,
        ctx: &Context,
        subject: &str,
        payload: impl Into<Bytes>,
    ) -> StreamResult<Receiver> {
        self.start_with(ctx, Message::new(subject, payload)).await
    }

    /// Like [`Client::start`], with caller-supplied headers.
    ///
    /// Any reply address on `request` is replaced by the session inbox and
    /// any `Stream-UID` by the session's correlation token. Unless readiness
    /// confirmation is disabled, the request also offers it with
    /// `Stream-Ready: true`.
    pub async fn start_with(&self, ctx: &Context, mut request: Message) -> StreamResult<Receiver> {
        let uid = new_uid();
        let inbox = self.inboxes.reply_subject();

        let mut replies = self
            .transport
            .subscribe(&inbox)
            .await
            .map_err(|e| StreamError::transport(Step::SubscribeReply, e))?;

        request.reply = Some(inbox);
        request.headers.insert(UID_HEADER, uid.as_str());
        if self.config.ready_timeout.is_some() {
            advertise_readiness(&mut request);
        }
        let target = request.subject.clone();
        self.transport
            .publish(request)
            .await
            .map_err(|e| StreamError::transport(Step::PublishRequest, e))?;
        tracing::debug!(stream.uid = %uid, subject = %target, "stream requested");

        let ack = ctx
            .or_timeout(self.config.handshake_timeout)
            .run(replies.next())
            .await;
        replies.unsubscribe();
        let ack = ack?.ok_or(StreamError::SubscriptionClosed)?;

        let HandshakeAck {
            subject,
            ready_inbox,
        } = validate_ack(&ack, &uid).map_err(|violation| {
            tracing::warn!(stream.uid = %uid, %violation, "invalid handshake ack");
            StreamError::from(violation)
        })?;

        let session = self
            .transport
            .subscribe(&subject)
            .await
            .map_err(|e| StreamError::transport(Step::SubscribeSession, e))?;
        if let Some(ready_inbox) = ready_inbox {
            self.transport
                .publish(ready_frame(&ready_inbox, &uid))
                .await
                .map_err(|e| StreamError::transport(Step::PublishReady, e))?;
        }
        tracing::debug!(stream.uid = %uid, stream.subject = %subject, "stream established");

        Ok(Receiver::new(uid, subject, session))
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

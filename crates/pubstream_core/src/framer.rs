//! Sender-side stream framing.
//!
//! [`StreamFramer`] wraps a request [`Handler`]. For each request it runs
//! the handshake, hands the wrapped handler a [`StreamPublisher`] bound to
//! a fresh session subject, and ends the session with a completion frame
//! unless the handler already did.
//!
//! The framer waits for a readiness confirmation only when the request
//! carries `Stream-Ready: true`. Plain requests get their frames straight
//! after the ack.

use crate::config::StreamConfig;
use crate::state::SessionState;
use async_trait::async_trait;
use pubstream_protocol::{
    ack_frame, advertises_readiness, new_uid, validate_ready, FastRandom, Flow, FrameEncoder,
    Outbound, ProtocolViolation, ReplySubject, UID_ALIASES,
};
use pubstream_transport::{
    Handler, Publisher, Request, ServiceError, ServiceResult, Transport, TransportError,
};
use std::sync::Arc;
use tracing::Instrument;

/// Publish sink bound to one session subject.
///
/// Every message published through it becomes the next data frame, or the
/// completion frame if it is flagged as one. Once a publish fails the
/// session is aborted and the sink refuses further frames.
pub struct StreamPublisher {
    transport: Arc<dyn Transport>,
    encoder: FrameEncoder,
    state: SessionState,
}

impl StreamPublisher {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        encoder: FrameEncoder,
        state: SessionState,
    ) -> Self {
        Self {
            transport,
            encoder,
            state,
        }
    }

    /// Session correlation token.
    pub fn uid(&self) -> &str {
        self.encoder.uid()
    }

    /// Subject the frames are published on.
    pub fn subject(&self) -> &str {
        self.encoder.subject()
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Number of data frames published so far.
    pub fn frames_sent(&self) -> u64 {
        self.encoder.next_sequence()
    }

    /// Returns true once the completion frame has been produced.
    pub fn is_done(&self) -> bool {
        self.encoder.is_done()
    }

    fn ensure_open(&self) -> ServiceResult<()> {
        if self.state.can_publish() {
            return Ok(());
        }
        Err(match self.state {
            SessionState::Aborted => ProtocolViolation::PublishAfterAbort,
            _ => ProtocolViolation::PublishAfterCompletion,
        }
        .into())
    }

    async fn finish(&mut self) -> ServiceResult<()> {
        self.ensure_open()?;
        let completion = self.encoder.finish()?;
        if let Err(e) = self.transport.publish(completion).await {
            self.state = SessionState::Aborted;
            return Err(ServiceError::transport("publish stream completion", e));
        }
        self.state = SessionState::CompletionSent;
        tracing::debug!(frames = self.frames_sent(), "stream completed");
        Ok(())
    }

    fn abort(&mut self) {
        if !self.state.is_terminal() {
            self.state = SessionState::Aborted;
        }
    }
}

#[async_trait]
impl Publisher for StreamPublisher {
    async fn publish(&mut self, outbound: Outbound) -> ServiceResult<Flow> {
        self.ensure_open()?;
        let (message, flow) = self.encoder.encode(outbound)?;
        if let Err(e) = self.transport.publish(message).await {
            self.state = SessionState::Aborted;
            return Err(ServiceError::transport("publish stream frame", e));
        }
        match flow {
            Flow::Continue => {
                self.state = SessionState::Streaming;
                tracing::trace!(
                    stream.sequence = self.encoder.next_sequence() - 1,
                    "frame published"
                );
            }
            Flow::Done => {
                self.state = SessionState::CompletionSent;
                tracing::debug!(frames = self.frames_sent(), "stream completed by handler");
            }
        }
        Ok(flow)
    }
}

/// Turns a request handler into the sending side of a streaming session.
pub struct StreamFramer<H> {
    handler: H,
    subjects: Arc<dyn ReplySubject>,
    config: StreamConfig,
}

impl<H: Handler> StreamFramer<H> {
    /// Wraps `handler` with the default configuration.
    pub fn new(handler: H) -> Self {
        Self::with_config(handler, StreamConfig::default())
    }

    /// Wraps `handler`.
    ///
    /// Session subjects are drawn from a [`FastRandom`] generator under
    /// `config.subject_prefix`.
    pub fn with_config(handler: H, config: StreamConfig) -> Self {
        Self {
            handler,
            subjects: Arc::new(FastRandom::new(config.subject_prefix.clone())),
            config,
        }
    }

    /// Replaces the session subject generator.
    pub fn with_subjects(mut self, subjects: impl ReplySubject + 'static) -> Self {
        self.subjects = Arc::new(subjects);
        self
    }

    /// The framer's configuration.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// The wrapped handler.
    pub fn inner(&self) -> &H {
        &self.handler
    }

    async fn run_session(
        &self,
        request: &Request,
        reply: &str,
        uid: String,
        subject: String,
    ) -> ServiceResult<()> {
        let transport = request.transport();

        let ready_timeout = self
            .config
            .ready_timeout
            .filter(|_| advertises_readiness(request.message()));
        let readiness = match ready_timeout {
            Some(timeout) => {
                let inbox = transport.new_inbox();
                let subscription = transport
                    .subscribe(&inbox)
                    .await
                    .map_err(|e| ServiceError::transport("subscribe readiness inbox", e))?;
                Some((inbox, subscription, timeout))
            }
            None => None,
        };

        let ready_inbox = readiness.as_ref().map(|(inbox, _, _)| inbox.as_str());
        transport
            .publish(ack_frame(reply, &uid, &subject, ready_inbox))
            .await
            .map_err(|e| ServiceError::transport("publish stream ack", e))?;
        let mut state = SessionState::AckSent;
        tracing::debug!("handshake ack sent");

        if let Some((_, mut subscription, timeout)) = readiness {
            let confirmation = tokio::time::timeout(timeout, subscription.next())
                .await
                .map_err(|_| ServiceError::Timeout("readiness confirmation".into()))?
                .ok_or_else(|| {
                    ServiceError::transport("await readiness confirmation", TransportError::Closed)
                })?;
            subscription.unsubscribe();
            if let Err(violation) = validate_ready(&confirmation, &uid) {
                tracing::warn!(%violation, "invalid readiness confirmation");
                return Err(violation.into());
            }
            state = SessionState::ReadyConfirmed;
            tracing::debug!("caller ready");
        }

        let mut sink = StreamPublisher::new(
            Arc::clone(transport),
            FrameEncoder::new(uid, subject),
            state,
        );
        if let Err(e) = self.handler.handle(&mut sink, request).await {
            sink.abort();
            tracing::debug!(error = %e, frames = sink.frames_sent(), "handler failed");
            return Err(e);
        }
        if !sink.is_done() {
            sink.finish().await?;
        }
        Ok(())
    }
}

impl<H> std::fmt::Debug for StreamFramer<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamFramer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<H: Handler> Handler for StreamFramer<H> {
    async fn handle(&self, _publisher: &mut dyn Publisher, request: &Request) -> ServiceResult<()> {
        let reply = request
            .reply()
            .ok_or(ProtocolViolation::MissingReplySubject)?;
        let uid = request
            .message()
            .headers
            .get_any(&UID_ALIASES)
            .filter(|uid| !uid.is_empty())
            .map(str::to_string)
            .unwrap_or_else(new_uid);
        let subject = self.subjects.reply_subject();

        let span = tracing::debug_span!("stream", stream.uid = %uid, stream.subject = %subject);
        self.run_session(request, reply, uid, subject)
            .instrument(span)
            .await
    }
}

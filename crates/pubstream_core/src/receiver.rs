//! Receiver-side frame consumption.

use crate::context::Context;
use crate::error::{StreamError, StreamResult};
use futures::Stream;
use pubstream_protocol::{Decoded, Frame, FrameDecoder};
use pubstream_transport::Subscription;

/// Pulls and validates the frames of one session.
///
/// The receiver owns the session subscription and releases it exactly
/// once: at end-of-stream, on [`Receiver::stop`], or when dropped.
#[derive(Debug)]
pub struct Receiver {
    subject: String,
    decoder: FrameDecoder,
    subscription: Subscription,
}

impl Receiver {
    /// Binds a receiver to an established session.
    ///
    /// `subscription` must already be registered on `subject`.
    pub fn new(
        uid: impl Into<String>,
        subject: impl Into<String>,
        subscription: Subscription,
    ) -> Self {
        Self {
            subject: subject.into(),
            decoder: FrameDecoder::new(uid),
            subscription,
        }
    }

    /// Session correlation token.
    pub fn uid(&self) -> &str {
        self.decoder.uid()
    }

    /// Subject the frames arrive on.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Sequence the next frame must carry.
    pub fn expected_sequence(&self) -> u64 {
        self.decoder.expected_sequence()
    }

    /// Returns true once the completion frame has been received.
    pub fn is_done(&self) -> bool {
        self.decoder.is_done()
    }

    /// Waits for the next frame.
    ///
    /// Returns `Ok(None)` at end-of-stream, and on every call after it. A
    /// protocol violation leaves the expected sequence unchanged.
    pub async fn receive(&mut self, ctx: &Context) -> StreamResult<Option<Frame>> {
        if self.decoder.is_done() {
            return Ok(None);
        }
        let message = ctx
            .run(self.subscription.next())
            .await?
            .ok_or(StreamError::SubscriptionClosed)?;

        match self.decoder.decode(message) {
            Ok(Decoded::Frame(frame)) => {
                tracing::trace!(
                    stream.uid = %self.decoder.uid(),
                    stream.sequence = frame.sequence,
                    "frame received"
                );
                Ok(Some(frame))
            }
            Ok(Decoded::End) => {
                self.subscription.unsubscribe();
                tracing::debug!(
                    stream.uid = %self.decoder.uid(),
                    frames = self.decoder.expected_sequence(),
                    "stream completed"
                );
                Ok(None)
            }
            Err(violation) => {
                tracing::warn!(
                    stream.uid = %self.decoder.uid(),
                    stream.subject = %self.subject,
                    %violation,
                    "protocol violation"
                );
                Err(violation.into())
            }
        }
    }

    /// Collects every frame until end-of-stream.
    ///
    /// The first error is returned as is; frames collected before it are
    /// discarded.
    pub async fn receive_all(&mut self, ctx: &Context) -> StreamResult<Vec<Frame>> {
        let mut frames = Vec::new();
        while let Some(frame) = self.receive(ctx).await? {
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Releases the session subscription early.
    ///
    /// Frames already queued can still be received; after that `receive`
    /// fails with [`StreamError::SubscriptionClosed`]. Returns false if the
    /// subscription was already released.
    pub fn stop(&mut self) -> bool {
        self.subscription.unsubscribe()
    }

    /// Converts the receiver into a stream of frames.
    ///
    /// The stream ends at end-of-stream or right after yielding the first
    /// error.
    pub fn into_stream(self, ctx: Context) -> impl Stream<Item = StreamResult<Frame>> + Send {
        futures::stream::unfold(Some((self, ctx)), |state| async move {
            let (mut receiver, ctx) = state?;
            match receiver.receive(&ctx).await {
                Ok(Some(frame)) => Some((Ok(frame), Some((receiver, ctx)))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use proptest::prelude::*;
    use pubstream_protocol::{
        completion_frame, FrameEncoder, Message, Outbound, ProtocolViolation, UID_HEADER,
    };
    use pubstream_transport::{MemoryBus, Transport};
    use std::time::Duration;

    const SUBJECT: &str = "_STREAM.test";

    async fn session(bus: &MemoryBus) -> Receiver {
        let subscription = bus.subscribe(SUBJECT).await.unwrap();
        Receiver::new("X", SUBJECT, subscription)
    }

    fn frame(sequence: &str, body: &'static str) -> Message {
        Message::new(SUBJECT, body)
            .with_header(UID_HEADER, "X")
            .with_header("Stream-Sequence", sequence)
            .with_header("Stream-Control", "proceed")
    }

    proptest! {
        #[test]
        fn encoder_output_is_received_verbatim(
            bodies in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..32),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let received = rt.block_on(async {
                let bus = MemoryBus::new();
                let mut receiver = session(&bus).await;
                let mut encoder = FrameEncoder::new("X", SUBJECT);
                for body in &bodies {
                    let (message, _) = encoder.encode(Outbound::new(body.clone())).unwrap();
                    bus.publish(message).await.unwrap();
                }
                bus.publish(encoder.finish().unwrap()).await.unwrap();
                receiver.receive_all(&Context::new()).await.unwrap()
            });

            prop_assert_eq!(received.len(), bodies.len());
            for (i, (frame, body)) in received.iter().zip(&bodies).enumerate() {
                prop_assert_eq!(frame.sequence, i as u64);
                prop_assert_eq!(&frame.payload[..], &body[..]);
            }
        }
    }

    #[tokio::test]
    async fn receives_in_order_then_ends() {
        let bus = MemoryBus::new();
        let mut receiver = session(&bus).await;
        bus.publish(frame("0", "a")).await.unwrap();
        bus.publish(frame("1", "b")).await.unwrap();
        bus.publish(completion_frame(SUBJECT, "X")).await.unwrap();

        let ctx = Context::new();
        let frames = receiver.receive_all(&ctx).await.unwrap();
        let bodies: Vec<_> = frames.iter().map(|f| f.payload.clone()).collect();
        assert_eq!(bodies, ["a", "b"]);
        assert!(receiver.is_done());
        assert_eq!(bus.subscriber_count(SUBJECT), 0);

        assert!(receiver.receive(&ctx).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn out_of_order_does_not_advance() {
        let bus = MemoryBus::new();
        let mut receiver = session(&bus).await;
        bus.publish(
            Message::new(SUBJECT, "x")
                .with_header("UID", "X")
                .with_header("Sequence", "100"),
        )
        .await
        .unwrap();
        bus.publish(frame("0", "a")).await.unwrap();

        let ctx = Context::new();
        let err = receiver.receive(&ctx).await.unwrap_err();
        assert_eq!(
            err.violation(),
            Some(&ProtocolViolation::OutOfOrder {
                expected: 0,
                received: 100
            })
        );
        assert_eq!(receiver.expected_sequence(), 0);

        let next = receiver.receive(&ctx).await.unwrap().unwrap();
        assert_eq!(next.sequence, 0);
    }

    #[tokio::test]
    async fn forged_uid_is_rejected() {
        let bus = MemoryBus::new();
        let mut receiver = session(&bus).await;
        bus.publish(
            Message::new(SUBJECT, "forged")
                .with_header(UID_HEADER, "Y")
                .with_header("Stream-Sequence", "0"),
        )
        .await
        .unwrap();

        let err = receiver.receive(&Context::new()).await.unwrap_err();
        assert!(matches!(
            err.violation(),
            Some(ProtocolViolation::UidMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn completion_with_body_is_not_end_of_stream() {
        let bus = MemoryBus::new();
        let mut receiver = session(&bus).await;
        bus.publish(
            Message::new(SUBJECT, "trailing")
                .with_header("UID", "X")
                .with_header("Control", "done"),
        )
        .await
        .unwrap();

        let err = receiver.receive(&Context::new()).await.unwrap_err();
        assert!(err.is_protocol_violation());
        assert!(!receiver.is_done());
        assert_eq!(bus.subscriber_count(SUBJECT), 1);
    }

    #[tokio::test]
    async fn receive_all_discards_partial_frames_on_error() {
        let bus = MemoryBus::new();
        let mut receiver = session(&bus).await;
        bus.publish(frame("0", "a")).await.unwrap();
        bus.publish(frame("2", "c")).await.unwrap();

        let err = receiver.receive_all(&Context::new()).await.unwrap_err();
        assert!(matches!(
            err.violation(),
            Some(ProtocolViolation::OutOfOrder {
                expected: 1,
                received: 2
            })
        ));
    }

    #[tokio::test]
    async fn deadline_bounds_receive() {
        let bus = MemoryBus::new();
        let mut receiver = session(&bus).await;
        let ctx = Context::with_timeout(Duration::from_millis(10));

        let err = receiver.receive(&ctx).await.unwrap_err();
        assert!(matches!(err, StreamError::DeadlineExceeded));
        assert_eq!(receiver.expected_sequence(), 0);
    }

    #[tokio::test]
    async fn stop_releases_once() {
        let bus = MemoryBus::new();
        let mut receiver = session(&bus).await;
        bus.publish(frame("0", "queued")).await.unwrap();

        assert!(receiver.stop());
        assert!(!receiver.stop());
        assert_eq!(bus.subscriber_count(SUBJECT), 0);

        let ctx = Context::new();
        assert_eq!(receiver.receive(&ctx).await.unwrap().unwrap().payload, "queued");
        assert!(matches!(
            receiver.receive(&ctx).await,
            Err(StreamError::SubscriptionClosed)
        ));
    }

    #[tokio::test]
    async fn drop_releases_subscription() {
        let bus = MemoryBus::new();
        let receiver = session(&bus).await;
        assert_eq!(bus.subscriber_count(SUBJECT), 1);
        drop(receiver);
        assert_eq!(bus.subscriber_count(SUBJECT), 0);
    }

    #[tokio::test]
    async fn stream_adapter_yields_frames() {
        let bus = MemoryBus::new();
        let receiver = session(&bus).await;
        bus.publish(frame("0", "a")).await.unwrap();
        bus.publish(frame("1", "b")).await.unwrap();
        bus.publish(completion_frame(SUBJECT, "X")).await.unwrap();

        let frames: Vec<_> = receiver.into_stream(Context::new()).collect().await;
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].as_ref().unwrap().sequence, 1);
    }

    #[tokio::test]
    async fn stream_adapter_stops_after_error() {
        let bus = MemoryBus::new();
        let receiver = session(&bus).await;
        bus.publish(frame("5", "bad")).await.unwrap();
        bus.publish(frame("0", "good")).await.unwrap();

        let items: Vec<_> = receiver.into_stream(Context::new()).collect().await;
        assert_eq!(items.len(), 1);
        assert!(items[0].is_err());
    }
}

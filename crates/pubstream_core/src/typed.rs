//! Codec-driven variants of the client, receiver and framer.
//!
//! Typed layers marshal values with a [`Codec`] and tag every message they
//! produce with a `Content-Type` header naming the codec.

use crate::client::Client;
use crate::config::StreamConfig;
use crate::context::Context;
use crate::error::StreamResult;
use crate::framer::StreamFramer;
use crate::receiver::Receiver;
use async_trait::async_trait;
use pubstream_codec::{Codec, CodecResult, CONTENT_TYPE_HEADER};
use pubstream_protocol::{Flow, Message, Outbound};
use pubstream_transport::{Handler, Publisher, Request, ServiceError, ServiceResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

/// Starts sessions with typed requests and responses.
pub struct TypedClient<Req, Res, C> {
    client: Client,
    codec: C,
    _marker: PhantomData<fn(&Req) -> Res>,
}

impl<Req, Res, C> TypedClient<Req, Res, C>
where
    Req: Serialize + Sync,
    Res: DeserializeOwned,
    C: Codec + Clone,
{
    /// Wraps `client`.
    pub fn new(client: Client, codec: C) -> Self {
        Self {
            client,
            codec,
            _marker: PhantomData,
        }
    }

    /// The wrapped raw client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Marshals `request`, sends it to `subject` and performs the handshake.
    pub async fn start(
        &self,
        ctx: &Context,
        subject: &str,
        request: &Req,
    ) -> StreamResult<TypedReceiver<Res, C>> {
        let payload = self.codec.marshal(request)?;
        let message = Message::new(subject, payload)
            .with_header(CONTENT_TYPE_HEADER, self.codec.content_type());
        let receiver = self.client.start_with(ctx, message).await?;
        Ok(TypedReceiver::new(receiver, self.codec.clone()))
    }
}

/// Receives typed values from one session.
pub struct TypedReceiver<Res, C> {
    inner: Receiver,
    codec: C,
    _marker: PhantomData<fn() -> Res>,
}

impl<Res, C> TypedReceiver<Res, C>
where
    Res: DeserializeOwned,
    C: Codec,
{
    /// Wraps a raw receiver.
    pub fn new(inner: Receiver, codec: C) -> Self {
        Self {
            inner,
            codec,
            _marker: PhantomData,
        }
    }

    /// Waits for the next value.
    ///
    /// End-of-stream and protocol violations pass through unchanged; a
    /// frame body that does not decode is a codec error.
    pub async fn receive(&mut self, ctx: &Context) -> StreamResult<Option<Res>> {
        match self.inner.receive(ctx).await? {
            Some(frame) => Ok(Some(self.codec.unmarshal(&frame.payload)?)),
            None => Ok(None),
        }
    }

    /// Collects every value until end-of-stream.
    pub async fn receive_all(&mut self, ctx: &Context) -> StreamResult<Vec<Res>> {
        let mut values = Vec::new();
        while let Some(value) = self.receive(ctx).await? {
            values.push(value);
        }
        Ok(values)
    }

    /// Releases the session subscription early.
    pub fn stop(&mut self) -> bool {
        self.inner.stop()
    }

    /// The raw receiver.
    pub fn raw(&self) -> &Receiver {
        &self.inner
    }

    /// Unwraps the raw receiver.
    pub fn into_inner(self) -> Receiver {
        self.inner
    }
}

type Encode<'a, T> = dyn Fn(&T) -> CodecResult<Vec<u8>> + Send + Sync + 'a;

/// Publish sink for typed values.
pub struct TypedPublisher<'a, T> {
    inner: &'a mut dyn Publisher,
    encode: &'a Encode<'a, T>,
    content_type: &'static str,
}

impl<'a, T> TypedPublisher<'a, T> {
    fn new(
        inner: &'a mut dyn Publisher,
        encode: &'a Encode<'a, T>,
        content_type: &'static str,
    ) -> Self {
        Self {
            inner,
            encode,
            content_type,
        }
    }

    /// Marshals `value` and publishes it.
    pub async fn publish(&mut self, value: &T) -> ServiceResult<Flow> {
        let payload = (self.encode)(value).map_err(ServiceError::handler)?;
        self.inner
            .publish(Outbound::new(payload).with_header(CONTENT_TYPE_HEADER, self.content_type))
            .await
    }

    /// Ends the stream.
    pub async fn complete(&mut self) -> ServiceResult<Flow> {
        self.inner.publish(Outbound::completion()).await
    }
}

/// Application logic working on decoded values.
#[async_trait]
pub trait TypedHandler: Send + Sync {
    /// Decoded request type.
    type Request: DeserializeOwned + Send;
    /// Response type published on the stream.
    type Response: Serialize + Sync;

    /// Handles one decoded request.
    async fn handle(
        &self,
        publisher: &mut TypedPublisher<'_, Self::Response>,
        request: Self::Request,
    ) -> ServiceResult<()>;
}

/// Adapts a [`TypedHandler`] to the raw [`Handler`] interface.
#[derive(Debug, Clone)]
pub struct Typed<H, C> {
    handler: H,
    codec: C,
}

impl<H, C> Typed<H, C> {
    /// Wraps `handler`.
    pub fn new(handler: H, codec: C) -> Self {
        Self { handler, codec }
    }
}

#[async_trait]
impl<H, C> Handler for Typed<H, C>
where
    H: TypedHandler,
    C: Codec,
{
    async fn handle(&self, publisher: &mut dyn Publisher, request: &Request) -> ServiceResult<()> {
        if let Some(content_type) = request.message().header(CONTENT_TYPE_HEADER) {
            if content_type != self.codec.content_type() {
                return Err(ServiceError::invalid_request(format!(
                    "unsupported content type {content_type:?}"
                )));
            }
        }
        let value: H::Request = self
            .codec
            .unmarshal(request.payload())
            .map_err(|e| ServiceError::invalid_request(e.to_string()))?;

        let encode = |response: &H::Response| self.codec.marshal(response);
        let mut typed = TypedPublisher::new(publisher, &encode, self.codec.content_type());
        self.handler.handle(&mut typed, value).await
    }
}

/// Builds the complete sending side for a typed handler.
pub fn typed_framer<H, C>(handler: H, codec: C, config: StreamConfig) -> StreamFramer<Typed<H, C>>
where
    H: TypedHandler,
    C: Codec,
{
    StreamFramer::with_config(Typed::new(handler, codec), config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pubstream_codec::{CborCodec, JsonCodec};
    use pubstream_protocol::ProtocolViolation;
    use pubstream_transport::{MemoryBus, ReplyPublisher, Transport};
    use serde::Deserialize;
    use std::sync::Arc;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Tick {
        n: u32,
    }

    struct Countdown;

    #[async_trait]
    impl TypedHandler for Countdown {
        type Request = u32;
        type Response = Tick;

        async fn handle(
            &self,
            publisher: &mut TypedPublisher<'_, Tick>,
            request: u32,
        ) -> ServiceResult<()> {
            for n in (0..request).rev() {
                publisher.publish(&Tick { n }).await?;
            }
            Ok(())
        }
    }

    struct Recorder(Vec<Outbound>);

    #[async_trait]
    impl Publisher for Recorder {
        async fn publish(&mut self, outbound: Outbound) -> ServiceResult<Flow> {
            let flow = if outbound.is_completion() {
                Flow::Done
            } else {
                Flow::Continue
            };
            self.0.push(outbound);
            Ok(flow)
        }
    }

    fn request(bus: &MemoryBus, payload: Vec<u8>, content_type: &str) -> Request {
        let transport: Arc<dyn Transport> = Arc::new(bus.clone());
        Request::new(
            Message::new("svc.countdown", payload)
                .with_reply("_INBOX.x")
                .with_header(CONTENT_TYPE_HEADER, content_type),
            transport,
        )
    }

    #[tokio::test]
    async fn adapter_marshals_responses() {
        let bus = MemoryBus::new();
        let codec = JsonCodec;
        let typed = Typed::new(Countdown, codec);
        let mut recorder = Recorder(Vec::new());

        let req = request(&bus, codec.marshal(&3u32).unwrap(), "application/json");
        typed.handle(&mut recorder, &req).await.unwrap();

        let ticks: Vec<Tick> = recorder
            .0
            .iter()
            .map(|o| codec.unmarshal(&o.payload).unwrap())
            .collect();
        assert_eq!(ticks, [Tick { n: 2 }, Tick { n: 1 }, Tick { n: 0 }]);
        assert!(recorder
            .0
            .iter()
            .all(|o| o.headers.get(CONTENT_TYPE_HEADER) == Some("application/json")));
    }

    #[tokio::test]
    async fn undecodable_request_is_client_error() {
        let bus = MemoryBus::new();
        let typed = Typed::new(Countdown, CborCodec);
        let mut recorder = Recorder(Vec::new());

        let req = request(&bus, vec![0xff, 0x00], "application/cbor");
        let err = typed.handle(&mut recorder, &req).await.unwrap_err();
        assert!(err.is_client_error());
        assert!(recorder.0.is_empty());
    }

    #[tokio::test]
    async fn content_type_mismatch_is_client_error() {
        let bus = MemoryBus::new();
        let typed = Typed::new(Countdown, CborCodec);
        let req = request(&bus, JsonCodec.marshal(&1u32).unwrap(), "application/json");

        let mut publisher = ReplyPublisher::new(&req);
        let err = typed.handle(&mut publisher, &req).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn complete_flags_end_of_stream() {
        let mut recorder = Recorder(Vec::new());
        let encode = |tick: &Tick| JsonCodec.marshal(tick);
        let mut typed = TypedPublisher::new(&mut recorder, &encode, "application/json");

        assert_eq!(typed.publish(&Tick { n: 1 }).await.unwrap(), Flow::Continue);
        assert_eq!(typed.complete().await.unwrap(), Flow::Done);
        assert!(recorder.0[1].is_completion());
    }

    #[tokio::test]
    async fn receiver_reports_undecodable_frames() {
        let bus = MemoryBus::new();
        let subscription = bus.subscribe("_STREAM.t").await.unwrap();
        let mut receiver: TypedReceiver<Tick, _> =
            TypedReceiver::new(Receiver::new("X", "_STREAM.t", subscription), JsonCodec);

        bus.publish(
            Message::new("_STREAM.t", "{\"n\":4}")
                .with_header("Stream-UID", "X")
                .with_header("Stream-Sequence", "0"),
        )
        .await
        .unwrap();
        bus.publish(
            Message::new("_STREAM.t", "not json")
                .with_header("Stream-UID", "X")
                .with_header("Stream-Sequence", "1"),
        )
        .await
        .unwrap();

        let ctx = Context::new();
        assert_eq!(receiver.receive(&ctx).await.unwrap(), Some(Tick { n: 4 }));
        let err = receiver.receive(&ctx).await.unwrap_err();
        assert!(matches!(err, crate::StreamError::Codec(_)));
        assert_eq!(receiver.raw().expected_sequence(), 2);
    }

    #[tokio::test]
    async fn receiver_passes_violations_through() {
        let bus = MemoryBus::new();
        let subscription = bus.subscribe("_STREAM.t").await.unwrap();
        let mut receiver: TypedReceiver<Tick, _> =
            TypedReceiver::new(Receiver::new("X", "_STREAM.t", subscription), JsonCodec);
        bus.publish(Message::new("_STREAM.t", "{}").with_header("Stream-UID", "X"))
            .await
            .unwrap();

        let err = receiver.receive(&Context::new()).await.unwrap_err();
        assert_eq!(err.violation(), Some(&ProtocolViolation::MissingSequence));
    }
}

//! Cross-crate integration test helpers.
//!
//! Wires services, the stream framer and clients together over a shared
//! in-memory bus.

use bytes::Bytes;
use pubstream_core::{Client, Context, Receiver, StreamConfig, StreamFramer, StreamResult};
use pubstream_protocol::Frame;
use pubstream_transport::{
    Handler, MemoryBus, Service, ServiceConfig, ServiceHandle, Transport,
};
use std::sync::Arc;
use std::time::Duration;

/// A test harness for end-to-end streaming sessions.
pub struct StreamHarness {
    /// The bus every participant talks over.
    pub bus: MemoryBus,
    server: Arc<dyn Transport>,
    client: Client,
    config: StreamConfig,
    root: Context,
    timeout: Duration,
    services: Vec<ServiceHandle>,
}

impl StreamHarness {
    /// Creates a harness with the default configuration.
    pub fn new() -> Self {
        Self::with_config(StreamConfig::default())
    }

    /// Creates a harness whose framers and client use `config`.
    pub fn with_config(config: StreamConfig) -> Self {
        let bus = MemoryBus::new();
        let transport: Arc<dyn Transport> = Arc::new(bus.clone());
        Self {
            client: Client::with_config(Arc::clone(&transport), config.clone()),
            server: transport,
            bus,
            config,
            root: Context::new(),
            timeout: Duration::from_secs(5),
            services: Vec::new(),
        }
    }

    /// Serves subsequently registered handlers through `transport`.
    ///
    /// Use this to put a [`FaultyTransport`](crate::FaultyTransport) between
    /// the handlers and the bus.
    pub fn with_server_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.server = transport;
        self
    }

    /// Bounds every wait performed by [`StreamHarness::collect`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Serves `handler` on `subject` behind a stream framer.
    pub async fn serve<H: Handler + 'static>(&mut self, subject: &str, handler: H) {
        let handle = Service::spawn(
            Arc::clone(&self.server),
            subject,
            StreamFramer::with_config(handler, self.config.clone()),
            ServiceConfig::default(),
        )
        .await
        .expect("Failed to start service");
        self.services.push(handle);
    }

    /// The harness client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// A context bounded by the harness timeout and cancelled by
    /// [`StreamHarness::cancel`].
    pub fn context(&self) -> Context {
        self.root.child().or_timeout(self.timeout)
    }

    /// Cancels every context handed out by this harness.
    pub fn cancel(&self) {
        self.root.cancel();
    }

    /// Starts a session against `subject`.
    pub async fn open(&self, subject: &str, payload: impl Into<Bytes>) -> StreamResult<Receiver> {
        self.client.start(&self.context(), subject, payload).await
    }

    /// Starts a session and collects every frame until end-of-stream.
    pub async fn collect(
        &self,
        subject: &str,
        payload: impl Into<Bytes>,
    ) -> StreamResult<Vec<Frame>> {
        let mut receiver = self.open(subject, payload).await?;
        receiver.receive_all(&self.context()).await
    }

    /// Requests served successfully so far, across all services.
    pub fn handled(&self) -> u64 {
        self.services.iter().map(ServiceHandle::handled).sum()
    }

    /// Requests whose handler failed so far, across all services.
    pub fn failed(&self) -> u64 {
        self.services.iter().map(ServiceHandle::failed).sum()
    }

    /// Cancels outstanding contexts and stops every service.
    pub async fn shutdown(self) {
        self.root.cancel();
        for handle in self.services {
            handle.shutdown().await;
        }
    }
}

impl Default for StreamHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Frame bodies as lossily decoded strings.
pub fn payloads(frames: &[Frame]) -> Vec<String> {
    frames
        .iter()
        .map(|frame| String::from_utf8_lossy(&frame.payload).into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{EchoHandler, Fault, FaultyTransport, ScriptedHandler};
    use pubstream_core::StreamError;
    use pubstream_protocol::ProtocolViolation;

    async fn faulty_session(fault: Fault) -> StreamError {
        let bus_harness = StreamHarness::new();
        let faulty = Arc::new(FaultyTransport::new(bus_harness.bus.clone(), fault));
        let mut harness = bus_harness.with_server_transport(faulty.clone());
        harness
            .serve("svc.items", ScriptedHandler::new(["a", "b", "c", "d"]))
            .await;

        let err = harness.collect("svc.items", "").await.unwrap_err();
        assert_eq!(faulty.applied(), 1);
        err
    }

    #[tokio::test]
    async fn scripted_frames_arrive_in_order() {
        let mut harness = StreamHarness::new();
        harness
            .serve("svc.items", ScriptedHandler::new(["a", "b", "c"]))
            .await;

        let frames = harness.collect("svc.items", "").await.unwrap();
        assert_eq!(payloads(&frames), ["a", "b", "c"]);
        assert_eq!(harness.handled(), 1);
        harness.shutdown().await;
    }

    #[tokio::test]
    async fn explicit_completion_ends_stream_once() {
        let mut harness = StreamHarness::new();
        harness
            .serve("svc.items", ScriptedHandler::new(["a"]).completing())
            .await;

        let mut receiver = harness.open("svc.items", "").await.unwrap();
        let ctx = harness.context();
        assert!(receiver.receive(&ctx).await.unwrap().is_some());
        assert!(receiver.receive(&ctx).await.unwrap().is_none());
        assert!(receiver.is_done());
    }

    #[tokio::test]
    async fn echo_returns_request_body() {
        let mut harness = StreamHarness::new();
        harness.serve("svc.echo", EchoHandler).await;
        let frames = harness.collect("svc.echo", "ping").await.unwrap();
        assert_eq!(payloads(&frames), ["ping"]);
    }

    #[tokio::test]
    async fn failed_handler_never_completes() {
        let mut harness = StreamHarness::new().with_timeout(Duration::from_millis(100));
        harness
            .serve("svc.items", ScriptedHandler::new(["a", "b"]).failing_after(1))
            .await;

        let mut receiver = harness.open("svc.items", "").await.unwrap();
        let ctx = harness.context();
        let first = receiver.receive(&ctx).await.unwrap().unwrap();
        assert_eq!(first.payload, "a");
        let err = receiver.receive(&ctx).await.unwrap_err();
        assert!(matches!(err, StreamError::DeadlineExceeded));
        assert_eq!(harness.failed(), 1);
    }

    #[tokio::test]
    async fn cancel_ends_pending_receive() {
        let mut harness = StreamHarness::new();
        harness
            .serve("svc.items", ScriptedHandler::new(["a", "b"]).failing_after(1))
            .await;

        let mut receiver = harness.open("svc.items", "").await.unwrap();
        let ctx = harness.context();
        receiver.receive(&ctx).await.unwrap().unwrap();
        harness.cancel();
        let err = receiver.receive(&ctx).await.unwrap_err();
        assert!(matches!(err, StreamError::Cancelled));
    }

    #[tokio::test]
    async fn dropped_frame_is_detected() {
        let err = faulty_session(Fault::Drop(1)).await;
        assert_eq!(
            err.violation(),
            Some(&ProtocolViolation::OutOfOrder {
                expected: 1,
                received: 2
            })
        );
    }

    #[tokio::test]
    async fn duplicated_frame_is_detected() {
        let err = faulty_session(Fault::Duplicate(1)).await;
        assert_eq!(
            err.violation(),
            Some(&ProtocolViolation::OutOfOrder {
                expected: 2,
                received: 1
            })
        );
    }

    #[tokio::test]
    async fn reordered_frame_is_detected() {
        let err = faulty_session(Fault::Reorder(1)).await;
        assert_eq!(
            err.violation(),
            Some(&ProtocolViolation::OutOfOrder {
                expected: 1,
                received: 2
            })
        );
    }

    #[tokio::test]
    async fn forged_uid_is_detected() {
        let err = faulty_session(Fault::ForgeUid(2)).await;
        assert!(matches!(
            err.violation(),
            Some(ProtocolViolation::UidMismatch { .. })
        ));
    }
}

//! Demo command implementation.

use async_trait::async_trait;
use pubstream_core::{
    CancellationToken, Client, Context, Handler, MemoryBus, Outbound, Publisher, Request, Service,
    ServiceConfig, ServiceResult, StreamConfig, StreamFramer, Transport,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Demo session parameters.
#[derive(Debug, Clone)]
pub struct DemoOptions {
    /// Data frames the handler publishes.
    pub frames: usize,
    /// Request body.
    pub payload: String,
    /// Subject the handler listens on.
    pub subject: String,
    /// Whether the readiness confirmation leg runs.
    pub readiness: bool,
    /// Session deadline in milliseconds.
    pub timeout_ms: u64,
}

/// One received frame.
#[derive(Debug, Serialize)]
pub struct FrameRecord {
    /// Frame sequence.
    pub sequence: u64,
    /// Frame body, lossily decoded.
    pub body: String,
}

/// Demo session result.
#[derive(Debug, Serialize)]
pub struct DemoResult {
    /// Session correlation token.
    pub uid: String,
    /// Dedicated session subject.
    pub subject: String,
    /// Frames in arrival order.
    pub frames: Vec<FrameRecord>,
    /// Messages published on the bus, handshake included.
    pub messages_published: u64,
    /// Wall time of the whole session in microseconds.
    pub elapsed_us: u128,
}

/// Publishes `count` numbered copies of the request body.
struct Repeat {
    count: usize,
}

#[async_trait]
impl Handler for Repeat {
    async fn handle(&self, publisher: &mut dyn Publisher, request: &Request) -> ServiceResult<()> {
        let body = String::from_utf8_lossy(request.payload()).into_owned();
        for i in 0..self.count {
            publisher
                .publish(Outbound::new(format!("{i}: {body}")))
                .await?;
        }
        Ok(())
    }
}

/// Runs the demo command. Ctrl-C cancels the session.
pub async fn run(options: &DemoOptions, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let token = CancellationToken::new();
    let interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted");
            interrupt.cancel();
        }
    });

    let result = run_session(options, token).await?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => print_text(&result),
    }

    Ok(())
}

/// Serves a handler and consumes one session against it.
///
/// The session ends early once `token` is cancelled.
pub async fn run_session(
    options: &DemoOptions,
    token: CancellationToken,
) -> Result<DemoResult, Box<dyn std::error::Error>> {
    let config = if options.readiness {
        StreamConfig::default()
    } else {
        StreamConfig::default().without_ready_confirmation()
    };

    let bus = MemoryBus::new();
    let transport: Arc<dyn Transport> = Arc::new(bus.clone());
    let service = Service::spawn(
        Arc::clone(&transport),
        &options.subject,
        StreamFramer::with_config(
            Repeat {
                count: options.frames,
            },
            config.clone(),
        ),
        ServiceConfig::default(),
    )
    .await?;
    tracing::debug!(subject = %options.subject, frames = options.frames, "demo handler serving");

    let started = Instant::now();
    let ctx = Context::with_token(token).or_timeout(Duration::from_millis(options.timeout_ms));
    let client = Client::with_config(transport, config);
    let session = async {
        let mut receiver = client
            .start(&ctx, &options.subject, options.payload.clone())
            .await?;
        let frames = receiver.receive_all(&ctx).await?;
        Ok::<_, pubstream_core::StreamError>((receiver, frames))
    }
    .await;
    let elapsed = started.elapsed();

    service.shutdown().await;
    let (receiver, frames) = session?;

    Ok(DemoResult {
        uid: receiver.uid().to_string(),
        subject: receiver.subject().to_string(),
        frames: frames
            .into_iter()
            .map(|frame| FrameRecord {
                sequence: frame.sequence,
                body: String::from_utf8_lossy(&frame.payload).into_owned(),
            })
            .collect(),
        messages_published: bus.published_count(),
        elapsed_us: elapsed.as_micros(),
    })
}

fn print_text(result: &DemoResult) {
    println!("Session");
    println!("  UID:      {}", result.uid);
    println!("  Subject:  {}", result.subject);
    println!();
    println!("Frames ({})", result.frames.len());
    for frame in &result.frames {
        println!("  [{:>4}] {}", frame.sequence, frame.body);
    }
    println!();
    println!("End of stream");
    println!("  Messages published: {}", result.messages_published);
    println!("  Elapsed:            {} us", result.elapsed_us);
}

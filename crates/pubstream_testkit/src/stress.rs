//! Stress tests for pubstream.
//!
//! These runs open many sessions concurrently against one service and check
//! that every stream arrives complete and isolated.

use crate::fixtures::ScriptedHandler;
use crate::integration::StreamHarness;
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Sessions started.
    pub sessions: usize,
    /// Sessions that delivered every frame and ended cleanly.
    pub successful: usize,
    /// Sessions that failed.
    pub failed: usize,
    /// Data frames received across all sessions.
    pub frames: u64,
    /// Total duration.
    pub duration: Duration,
    /// Frames per second.
    pub frames_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, frames: u64, duration: Duration) -> Self {
        let frames_per_second = if duration.as_secs_f64() > 0.0 {
            frames as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            sessions: successful + failed,
            successful,
            failed,
            frames,
            duration,
            frames_per_second,
        }
    }

    /// Prints a summary of the run.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Sessions: {}", self.sessions);
        println!("Successful: {}", self.successful);
        println!("Failed: {}", self.failed);
        println!("Frames: {}", self.frames);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} frames/sec", self.frames_per_second);
    }
}

/// Configuration for stress runs.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of concurrent sessions.
    pub sessions: usize,
    /// Data frames published per session.
    pub frames_per_session: usize,
    /// Size of each frame body in bytes.
    pub payload_size: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            sessions: 64,
            frames_per_session: 100,
            payload_size: 256,
        }
    }
}

/// Runs `config.sessions` sessions concurrently against one service.
///
/// A session counts as successful only if it received exactly
/// `frames_per_session` frames, each of `payload_size` bytes, and its
/// correlation token and session subject were not shared with any other
/// session.
pub async fn stress_concurrent_sessions(config: &StressConfig) -> StressTestResult {
    let mut harness = StreamHarness::new();
    harness
        .serve(
            "stress.items",
            ScriptedHandler::sized(config.frames_per_session, config.payload_size),
        )
        .await;

    let start = Instant::now();
    let mut tasks = Vec::with_capacity(config.sessions);
    for _ in 0..config.sessions {
        let client = harness.client().clone();
        let ctx = harness.context();
        tasks.push(tokio::spawn(async move {
            let mut receiver = client.start(&ctx, "stress.items", "").await?;
            let frames = receiver.receive_all(&ctx).await?;
            Ok::<_, pubstream_core::StreamError>((
                receiver.uid().to_string(),
                receiver.subject().to_string(),
                frames,
            ))
        }));
    }

    let mut uids = HashSet::new();
    let mut subjects = HashSet::new();
    let mut successful = 0;
    let mut failed = 0;
    let mut frames_received = 0u64;
    for task in tasks {
        match task.await {
            Ok(Ok((uid, subject, frames))) => {
                frames_received += frames.len() as u64;
                let intact = frames.len() == config.frames_per_session
                    && frames.iter().all(|f| f.payload.len() == config.payload_size);
                if intact && uids.insert(uid) && subjects.insert(subject) {
                    successful += 1;
                } else {
                    failed += 1;
                }
            }
            _ => failed += 1,
        }
    }
    let duration = start.elapsed();

    harness.shutdown().await;
    StressTestResult::new(successful, failed, frames_received, duration)
}

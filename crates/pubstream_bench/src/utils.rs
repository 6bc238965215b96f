//! Benchmark utilities.

use async_trait::async_trait;
use bytes::Bytes;
use pubstream_core::{Handler, Outbound, Publisher, Request, ServiceResult};
use rand::Rng;

/// Generate random frame data of the specified size.
pub fn random_data(size: usize) -> Bytes {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen::<u8>()).collect::<Vec<_>>().into()
}

/// Generate a batch of frame bodies.
pub fn generate_frames(count: usize, payload_size: usize) -> Vec<Bytes> {
    (0..count).map(|_| random_data(payload_size)).collect()
}

/// A handler replaying the same bodies for every request.
#[derive(Debug, Clone)]
pub struct Replay {
    frames: Vec<Bytes>,
}

impl Replay {
    /// Replays `count` random bodies of `payload_size` bytes.
    pub fn new(count: usize, payload_size: usize) -> Self {
        Self {
            frames: generate_frames(count, payload_size),
        }
    }
}

#[async_trait]
impl Handler for Replay {
    async fn handle(&self, publisher: &mut dyn Publisher, _request: &Request) -> ServiceResult<()> {
        for frame in &self.frames {
            publisher.publish(Outbound::new(frame.clone())).await?;
        }
        Ok(())
    }
}

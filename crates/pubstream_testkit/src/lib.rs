//! # pubstream Testkit
//!
//! Test utilities for pubstream.
//!
//! This crate provides:
//! - Fixtures: scripted handlers, fault-injecting transports, forged frames
//! - Property-based test generators using proptest
//! - A harness wiring services and clients over an in-memory bus
//! - Concurrent session stress runs
//! - Frame decoding vectors shareable with other implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pubstream_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn streams_three_frames() {
//!     let mut harness = StreamHarness::new();
//!     harness.serve("svc.items", ScriptedHandler::new(["a", "b", "c"])).await;
//!     let frames = harness.collect("svc.items", "").await.unwrap();
//!     assert_eq!(payloads(&frames), ["a", "b", "c"]);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod stress;
pub mod vectors;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::stress::*;
    pub use crate::vectors::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
pub use stress::*;
pub use vectors::*;

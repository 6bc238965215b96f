//! Shared fixtures for the pubstream benchmarks.

pub mod utils;

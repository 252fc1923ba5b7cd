//! Test harness utilities for concurrency testing.
//!
//! An echo server on a random loopback port, a client wrapper, and shared
//! counters for concurrent test tasks.

#![allow(dead_code)]

mod client;
mod metrics;
mod server;

pub use client::TestClient;
pub use metrics::Metrics;
pub use server::TestServer;

//! Courier integration test harness.
//!
//! Each test spins up a local HTTP origin on a loopback port and drives the
//! full proxy path against it — client, transport, executor. No external
//! network is required.
//!
//!   cargo test --test integration

mod infra;

mod buffered;
mod fallback;
mod fetcher_settings;
mod streaming;
mod unix_socket;

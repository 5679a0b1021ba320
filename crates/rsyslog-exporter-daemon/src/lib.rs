//! rsyslog-exporter daemon library entry.
//!
//! Wires the stdin input loop, the Prometheus collector, configuration and the
//! HTTP endpoints around the core stats store. Consumed by the binary
//! (`main.rs`) and by integration tests.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod app_state;
pub mod args;
pub mod collector;
pub mod config;
pub mod input;
pub mod obs;
pub mod ops;
pub mod router;

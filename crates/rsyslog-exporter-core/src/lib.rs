//! rsyslog-exporter core: impstats record folding, the double-buffered stats
//! table, and the silence-driven liveness state machine.
//!
//! This crate does no I/O. The daemon feeds it lines and elapsed time and
//! reads snapshots back out.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. A malformed stats
//! line surfaces as an `ExporterError` and is counted; it never takes the
//! process down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod liveness;
pub mod normalize;
pub mod record;
pub mod store;

/// Shared result type.
pub use error::{ErrorKind, ExporterError, Result};
pub use liveness::{LivenessTracker, Phase, Tick, Timeouts};
pub use normalize::normalize;
pub use store::{LivenessState, MetricTable, ParseOutcome, Snapshot, StatsStore};

//! Top-level facade crate for rsyslog-exporter.
//!
//! Re-exports the core stats store and the daemon library so users can depend on a single crate.

pub mod core {
    pub use rsyslog_exporter_core::*;
}

pub mod daemon {
    pub use rsyslog_exporter_daemon::*;
}

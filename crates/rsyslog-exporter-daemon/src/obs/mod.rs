//! Exporter observability: self-metrics registered alongside the rsyslog
//! collector.

pub mod metrics;

pub use metrics::ExporterMetrics;

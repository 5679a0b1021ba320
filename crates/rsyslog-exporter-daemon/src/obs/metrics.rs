//! Exporter self-instrumentation.
//!
//! Two histograms: time spent folding one stats line and time spent building
//! one scrape. Both are registered next to the rsyslog collector so they show
//! up on the same `/metrics` page.

use prometheus::{exponential_buckets, Histogram, HistogramOpts, Registry};

pub const PARSING_SECONDS: &str = "rsyslog_exporter_parsing_seconds";
pub const COLLECTING_SECONDS: &str = "rsyslog_exporter_collecting_seconds";

// 10us .. ~2.6s
const BUCKET_START: f64 = 0.000_01;
const BUCKET_FACTOR: f64 = 4.0;
const BUCKET_COUNT: usize = 10;

#[derive(Clone)]
pub struct ExporterMetrics {
    pub parsing_seconds: Histogram,
    pub collecting_seconds: Histogram,
}

impl ExporterMetrics {
    pub fn new() -> prometheus::Result<Self> {
        Ok(Self {
            parsing_seconds: histogram(PARSING_SECONDS, "Time spent on parsing input")?,
            collecting_seconds: histogram(COLLECTING_SECONDS, "Time spent on collecting metrics")?,
        })
    }

    pub fn register(&self, registry: &Registry) -> prometheus::Result<()> {
        registry.register(Box::new(self.parsing_seconds.clone()))?;
        registry.register(Box::new(self.collecting_seconds.clone()))?;
        Ok(())
    }
}

fn histogram(name: &str, help: &str) -> prometheus::Result<Histogram> {
    let buckets = exponential_buckets(BUCKET_START, BUCKET_FACTOR, BUCKET_COUNT)?;
    Histogram::with_opts(HistogramOpts::new(name, help).buckets(buckets))
}

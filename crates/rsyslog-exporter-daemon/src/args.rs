//! Command-line and environment flags.
//!
//! Every flag is optional so that a YAML file (if given) keeps its values
//! unless a flag or variable overrides them.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Parser;
use rsyslog_exporter_core::error::Result;

use crate::config::{self, ExporterConfig};

#[derive(Debug, Default, Parser)]
#[command(
    name = "rsyslog_exporter",
    version,
    about = "Export rsyslog impstats counters (via omprog) as Prometheus metrics"
)]
pub struct Args {
    /// YAML config file
    #[arg(short = 'c', long, env = "RSYSLOG_EXPORTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to bind the metrics server to
    #[arg(long, env = "RSYSLOG_EXPORTER_LISTEN")]
    pub listen: Option<String>,

    /// Port to serve metrics requests on [default: 9292]
    #[arg(short = 'p', long, env = "RSYSLOG_EXPORTER_PORT")]
    pub port: Option<u16>,

    /// Export current stats if nothing is received during this many seconds [default: 5]
    #[arg(short = 'e', long = "export-after", env = "RSYSLOG_EXPORTER_EXPORT_AFTER")]
    pub export_after: Option<f64>,

    /// Mark rsyslog as down if nothing is received during this many seconds [default: 180]
    #[arg(short = 'd', long = "down-after", env = "RSYSLOG_EXPORTER_DOWN_AFTER")]
    pub down_after: Option<f64>,

    /// Custom key=value label added to every metric; repeatable
    #[arg(
        short = 'L',
        long = "label",
        env = "RSYSLOG_EXPORTER_LABELS",
        value_delimiter = ','
    )]
    pub labels: Vec<String>,
}

impl Args {
    /// Resolve the effective config: file (or defaults), then flags.
    pub fn load_config(&self) -> Result<ExporterConfig> {
        let mut cfg = match &self.config {
            Some(path) => config::load_from_file(path)?,
            None => ExporterConfig::default(),
        };

        if let Some(listen) = &self.listen {
            cfg.server.listen = listen.clone();
        }
        if let Some(port) = self.port {
            cfg.server.port = port;
        }
        if let Some(v) = self.export_after {
            cfg.stats.export_after = v;
        }
        if let Some(v) = self.down_after {
            cfg.stats.down_after = v;
        }
        cfg.labels.extend(parse_labels(&self.labels));

        cfg.validate()?;
        Ok(cfg)
    }
}

/// Parse `key=value` items. Anything else is dropped with a warning.
pub fn parse_labels<S: AsRef<str>>(items: &[S]) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    for item in items {
        let item = item.as_ref().trim();
        if item.is_empty() {
            continue;
        }
        let mut parts = item.split('=');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(k), Some(v), None) => {
                labels.insert(k.to_string(), v.to_string());
            }
            _ => tracing::warn!(label = %item, "ignoring label, expected key=value"),
        }
    }
    labels
}

use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};

use serde::Deserialize;
use rsyslog_exporter_core::error::{ExporterError, Result};
use rsyslog_exporter_core::Timeouts;

/// Label names the collector sets itself.
const RESERVED_LABELS: [&str; 2] = ["name", "version"];

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub stats: StatsSection,

    /// Static labels attached to every emitted series.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server: ServerSection::default(),
            stats: StatsSection::default(),
            labels: BTreeMap::new(),
        }
    }
}

impl ExporterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(ExporterError::ConfigurationInvalid(format!(
                "unsupported config version {}",
                self.version
            )));
        }

        self.server.listen_addr()?;
        self.stats.timeouts()?;

        for name in self.labels.keys() {
            validate_label_name(name)?;
        }
        Ok(())
    }

    pub fn timeouts(&self) -> Result<Timeouts> {
        self.stats.timeouts()
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.server.listen_addr()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
        }
    }
}

impl ServerSection {
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.listen.parse().map_err(|e| {
            ExporterError::ConfigurationInvalid(format!(
                "server.listen must be an IP address (got {:?}): {e}",
                self.listen
            ))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatsSection {
    /// Seconds of silence before the open generation is published.
    #[serde(default = "default_export_after")]
    pub export_after: f64,

    /// Seconds of silence before rsyslog is reported down.
    #[serde(default = "default_down_after")]
    pub down_after: f64,
}

impl Default for StatsSection {
    fn default() -> Self {
        Self {
            export_after: default_export_after(),
            down_after: default_down_after(),
        }
    }
}

impl StatsSection {
    pub fn timeouts(&self) -> Result<Timeouts> {
        Timeouts::from_secs_f64(self.export_after, self.down_after)
    }
}

fn default_listen() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    9292
}
fn default_export_after() -> f64 {
    5.0
}
fn default_down_after() -> f64 {
    180.0
}

/// Prometheus label name rules, minus the names the collector owns.
pub fn validate_label_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_first = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !valid_first || !valid_rest || name.starts_with("__") {
        return Err(ExporterError::ConfigurationInvalid(format!(
            "invalid label name {name:?}"
        )));
    }
    if RESERVED_LABELS.contains(&name) {
        return Err(ExporterError::ConfigurationInvalid(format!(
            "label name {name:?} is reserved"
        )));
    }
    Ok(())
}

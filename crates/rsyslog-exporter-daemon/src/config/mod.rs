//! Exporter config loader (strict parsing).
//!
//! The YAML file is optional; command-line flags and `RSYSLOG_EXPORTER_*`
//! variables are layered on top of it by [`crate::args`].

pub mod schema;

use std::fs;
use std::path::Path;

use rsyslog_exporter_core::error::{ExporterError, Result};

pub use schema::{validate_label_name, ExporterConfig, ServerSection, StatsSection};

pub fn load_from_file(path: &Path) -> Result<ExporterConfig> {
    let s = fs::read_to_string(path).map_err(|e| {
        ExporterError::ConfigurationInvalid(format!("read config {} failed: {e}", path.display()))
    })?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ExporterConfig> {
    let cfg: ExporterConfig = serde_yaml::from_str(s)
        .map_err(|e| ExporterError::ConfigurationInvalid(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

//! Shared application state for the exporter.
//!
//! Owns the stats store, the Prometheus registry the collector is registered
//! into, and the exporter's own histograms. Cloned into every axum handler.

use std::sync::Arc;

use prometheus::{Encoder, Registry, TextEncoder};
use rsyslog_exporter_core::error::{ExporterError, Result};
use rsyslog_exporter_core::StatsStore;

use crate::collector::RsyslogCollector;
use crate::config::ExporterConfig;
use crate::obs::ExporterMetrics;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: ExporterConfig,
    store: Arc<StatsStore>,
    registry: Registry,
    metrics: ExporterMetrics,
}

impl AppState {
    /// Build state and register collectors.
    /// Returns Result so main can exit with a message instead of panicking.
    pub fn new(cfg: ExporterConfig) -> Result<Self> {
        let store = Arc::new(StatsStore::new());
        let registry = Registry::new();

        let metrics = ExporterMetrics::new().map_err(registry_err)?;
        metrics.register(&registry).map_err(registry_err)?;

        let collector = RsyslogCollector::new(Arc::clone(&store), &cfg.labels)
            .with_timer(metrics.collecting_seconds.clone());
        registry.register(Box::new(collector)).map_err(registry_err)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                store,
                registry,
                metrics,
            }),
        })
    }

    pub fn cfg(&self) -> &ExporterConfig {
        &self.inner.cfg
    }

    pub fn store(&self) -> Arc<StatsStore> {
        Arc::clone(&self.inner.store)
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn metrics(&self) -> &ExporterMetrics {
        &self.inner.metrics
    }

    /// Gather and encode every registered family in text format.
    pub fn render(&self) -> Result<String> {
        let families = self.inner.registry.gather();
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buf)
            .map_err(|e| ExporterError::Internal(format!("encode metrics failed: {e}")))?;
        String::from_utf8(buf)
            .map_err(|e| ExporterError::Internal(format!("metrics are not utf-8: {e}")))
    }
}

fn registry_err(e: prometheus::Error) -> ExporterError {
    ExporterError::Internal(format!("metrics registry: {e}"))
}

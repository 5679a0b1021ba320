//! Prometheus collector over the exported stats generation.
//!
//! Metric families are rebuilt on every scrape from a [`Snapshot`], so the
//! registry never holds rsyslog series of its own. Meta-metrics are always
//! emitted; rsyslog series only while the producer is up.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Counter, CounterVec, Gauge, GaugeVec, Histogram, Opts};
use rsyslog_exporter_core::{Snapshot, StatsStore};

use crate::obs::metrics::{COLLECTING_SECONDS, PARSING_SECONDS};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const VERSION_METRIC: &str = "rsyslog_exporter_version";
pub const UP_METRIC: &str = "rsyslog_exporter_up";
pub const LAST_STATS_METRIC: &str = "rsyslog_exporter_last_stats_processed";
pub const PARSER_FAILURES_METRIC: &str = "rsyslog_exporter_parser_failures";
pub const LAST_EXPORT_METRIC: &str = "rsyslog_exporter_last_export_timestamp";

/// The only rsyslog counter that is a point-in-time value.
pub const QUEUE_SIZE_METRIC: &str = "rsyslog_core_queue_size";

const NAME_LABEL: &str = "name";
const VERSION_LABEL: &str = "version";
const RSYSLOG_HELP: &str = "rsyslog impstats counter";

const RESERVED_METRICS: [&str; 7] = [
    VERSION_METRIC,
    UP_METRIC,
    LAST_STATS_METRIC,
    PARSER_FAILURES_METRIC,
    LAST_EXPORT_METRIC,
    PARSING_SECONDS,
    COLLECTING_SECONDS,
];

/// Sample names a histogram writes next to its base name.
const HISTOGRAM_SUFFIXES: [&str; 3] = ["_bucket", "_sum", "_count"];

fn is_reserved(metric: &str) -> bool {
    RESERVED_METRICS.contains(&metric)
        || [PARSING_SECONDS, COLLECTING_SECONDS].iter().any(|hist| {
            metric
                .strip_prefix(hist)
                .is_some_and(|rest| HISTOGRAM_SUFFIXES.contains(&rest))
        })
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Gauge,
    Counter,
}

pub struct RsyslogCollector {
    store: Arc<StatsStore>,
    labels: HashMap<String, String>,
    collect_time: Option<Histogram>,
}

impl RsyslogCollector {
    pub fn new(store: Arc<StatsStore>, labels: &BTreeMap<String, String>) -> Self {
        Self {
            store,
            labels: labels.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            collect_time: None,
        }
    }

    /// Observe scrape duration into `histogram`.
    pub fn with_timer(mut self, histogram: Histogram) -> Self {
        self.collect_time = Some(histogram);
        self
    }

    fn opts(&self, name: &str, help: &str) -> Opts {
        Opts::new(name, help).const_labels(self.labels.clone())
    }

    /// Build every family for one scrape. A family that fails to build is
    /// logged and left out; the rest of the scrape still goes through.
    pub fn families(&self) -> Vec<MetricFamily> {
        let Snapshot { table, liveness } = self.store.snapshot();
        let mut out = Vec::with_capacity(table.len() + RESERVED_METRICS.len());

        let mut push = |name: &str, built: prometheus::Result<Vec<MetricFamily>>| match built {
            Ok(families) => out.extend(families),
            Err(e) => tracing::warn!(metric = %name, error = %e, "skipping metric family"),
        };

        push(VERSION_METRIC, self.version_family());
        push(
            UP_METRIC,
            self.single(
                Kind::Gauge,
                UP_METRIC,
                "Is rsyslog_exporter up and connected?",
                if liveness.is_up { 1.0 } else { 0.0 },
            ),
        );
        push(
            LAST_STATS_METRIC,
            self.single(
                Kind::Gauge,
                LAST_STATS_METRIC,
                "Amount of rsyslog stats processed last time",
                liveness.last_stats_processed as f64,
            ),
        );
        push(
            PARSER_FAILURES_METRIC,
            self.single(
                Kind::Counter,
                PARSER_FAILURES_METRIC,
                "Amount of rsyslog stats parsing failures",
                liveness.parser_failures as f64,
            ),
        );
        push(
            LAST_EXPORT_METRIC,
            self.single(
                Kind::Gauge,
                LAST_EXPORT_METRIC,
                "Last metrics export timestamp",
                liveness.export_timestamp,
            ),
        );

        if !liveness.is_up {
            return out;
        }

        for (metric, series) in table.iter() {
            if is_reserved(metric) {
                tracing::warn!(
                    metric = %metric,
                    "rsyslog metric collides with exporter metric, skipping"
                );
                continue;
            }
            push(metric.as_str(), self.table_family(metric, series));
        }
        out
    }

    fn version_family(&self) -> prometheus::Result<Vec<MetricFamily>> {
        let vec = GaugeVec::new(
            self.opts(VERSION_METRIC, "Version of rsyslog_exporter running"),
            &[VERSION_LABEL],
        )?;
        vec.with_label_values(&[VERSION]).set(1.0);
        Ok(vec.collect())
    }

    fn single(
        &self,
        kind: Kind,
        name: &str,
        help: &str,
        value: f64,
    ) -> prometheus::Result<Vec<MetricFamily>> {
        let opts = self.opts(name, help);
        match kind {
            Kind::Gauge => {
                let g = Gauge::with_opts(opts)?;
                g.set(value);
                Ok(g.collect())
            }
            Kind::Counter => {
                let c = Counter::with_opts(opts)?;
                c.inc_by(value);
                Ok(c.collect())
            }
        }
    }

    fn table_family(
        &self,
        metric: &str,
        series: &BTreeMap<String, f64>,
    ) -> prometheus::Result<Vec<MetricFamily>> {
        let opts = self.opts(metric, RSYSLOG_HELP);

        if metric == QUEUE_SIZE_METRIC {
            let vec = GaugeVec::new(opts, &[NAME_LABEL])?;
            for (label, value) in series {
                vec.with_label_values(&[label.as_str()]).set(*value);
            }
            return Ok(vec.collect());
        }

        let vec = CounterVec::new(opts, &[NAME_LABEL])?;
        for (label, value) in series {
            // counters only go up from zero
            if !value.is_finite() || *value < 0.0 {
                tracing::trace!(
                    metric = %metric,
                    name = %label,
                    value = %value,
                    "skipping non-counter value"
                );
                continue;
            }
            vec.with_label_values(&[label.as_str()]).inc_by(*value);
        }
        Ok(vec.collect())
    }
}

impl Collector for RsyslogCollector {
    fn desc(&self) -> Vec<&Desc> {
        // families are dynamic; nothing to pre-declare
        Vec::new()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let _timer = self.collect_time.as_ref().map(Histogram::start_timer);
        self.families()
    }
}

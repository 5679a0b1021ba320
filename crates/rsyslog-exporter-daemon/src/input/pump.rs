//! Input loop: read lines, fold them, and turn silence into exports.
//!
//! The wait for the next line is bounded by [`LivenessTracker::next_wait`], so
//! the loop wakes exactly at the export and down boundaries instead of
//! polling.

use std::future::Future;
use std::sync::Arc;

use prometheus::Histogram;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::time::Instant;
use tracing::{debug, info, trace};

use rsyslog_exporter_core::error::{ExporterError, Result};
use rsyslog_exporter_core::{LivenessTracker, StatsStore, Timeouts};

use super::reader::extract_json;

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// rsyslog closed the pipe.
    Eof,
    /// Shutdown signal.
    Interrupted,
}

pub struct InputLoop {
    store: Arc<StatsStore>,
    tracker: LivenessTracker,
    parse_time: Option<Histogram>,
}

impl InputLoop {
    pub fn new(store: Arc<StatsStore>, timeouts: Timeouts) -> Self {
        Self {
            store,
            tracker: LivenessTracker::new(timeouts),
            parse_time: None,
        }
    }

    /// Observe per-line parse duration into `histogram`.
    pub fn with_parse_timer(mut self, histogram: Histogram) -> Self {
        self.parse_time = Some(histogram);
        self
    }

    pub fn tracker(&self) -> &LivenessTracker {
        &self.tracker
    }

    /// Run until EOF, a read error, or `shutdown` resolves.
    pub async fn run<R, S>(&mut self, mut reader: R, shutdown: S) -> Result<Exit>
    where
        R: AsyncBufRead + Unpin,
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        // `read_until` keeps partial input in `buf` when the wait times out,
        // so the buffer must outlive each attempt.
        let mut buf = Vec::new();

        loop {
            let wait = self.tracker.next_wait(&self.store);
            let started = Instant::now();

            let read = tokio::select! {
                _ = &mut shutdown => {
                    info!("interrupted");
                    return Ok(Exit::Interrupted);
                }
                read = tokio::time::timeout(wait, reader.read_until(b'\n', &mut buf)) => read,
            };

            match read {
                Err(_) => self.on_silence(started.elapsed()),
                Ok(Ok(0)) => {
                    if !buf.is_empty() {
                        self.on_line(&buf);
                    }
                    info!("input closed");
                    return Ok(Exit::Eof);
                }
                Ok(Ok(_)) => {
                    self.on_line(&buf);
                    buf.clear();
                }
                Ok(Err(e)) => {
                    return Err(ExporterError::Internal(format!("input read failed: {e}")));
                }
            }
        }
    }

    fn on_line(&mut self, raw: &[u8]) {
        self.tracker.on_receipt();

        let line = String::from_utf8_lossy(raw);
        let json = extract_json(&line);

        let _timer = self.parse_time.as_ref().map(Histogram::start_timer);
        match self.store.parse(json) {
            Ok(outcome) => {
                if outcome.rotated {
                    debug!("global record closed the previous generation");
                }
                trace!(samples = outcome.samples, "stats line folded");
            }
            Err(e) => {
                debug!(error = %e, kind = e.kind().as_str(), "failed to parse stats line");
            }
        }
    }

    fn on_silence(&mut self, elapsed: std::time::Duration) {
        let tick = self.tracker.on_silence(elapsed, &self.store);
        if tick.exported {
            let snap = self.store.snapshot();
            debug!(
                metrics = snap.table.len(),
                records = snap.liveness.last_stats_processed,
                "exported stats after silence"
            );
            if tracing::enabled!(tracing::Level::TRACE) {
                self.store.dump(true);
            }
        }
        if tick.went_down {
            info!(
                silent_secs = self.tracker.silent().as_secs_f64(),
                "no stats received, marking rsyslog down"
            );
        }
        trace!(phase = ?self.tracker.phase(), "silence tick");
    }
}

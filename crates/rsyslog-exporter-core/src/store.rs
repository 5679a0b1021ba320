//! Double-buffered stats store.
//!
//! `current` accumulates the generation being reported; `exported` is the
//! last completed generation and is what scrapes see. Export moves `current`
//! into a fresh `Arc`, so readers holding a snapshot are never torn.
//!
//! One mutex guards the table pair and the liveness fields. Record decoding
//! happens before the lock is taken; the lock only covers the fold itself.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::Result;
use crate::record::{Sample, StatsRecord};

/// metric name -> label value -> value
pub type MetricTable = BTreeMap<String, BTreeMap<String, f64>>;

/// Liveness and bookkeeping fields, copied out on every snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LivenessState {
    pub is_up: bool,
    pub parser_failures: u64,
    /// Records folded into the open generation.
    pub stats_count: u64,
    /// `stats_count` of the generation most recently exported.
    pub last_stats_processed: u64,
    /// Unix seconds of the last export, 0 before the first one.
    pub export_timestamp: f64,
}

/// Read-only view handed to the collector.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub table: Arc<MetricTable>,
    pub liveness: LivenessState,
}

/// Result of folding one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOutcome {
    /// Number of (metric, label) observations written.
    pub samples: usize,
    /// The line was a global record that closed the previous generation.
    pub rotated: bool,
}

#[derive(Debug)]
struct Inner {
    current: MetricTable,
    exported: Arc<MetricTable>,
    /// No generation open; the next record starts a new one.
    is_exported: bool,
    liveness: LivenessState,
}

impl Inner {
    fn add(&mut self, sample: Sample) {
        self.current
            .entry(sample.metric)
            .or_default()
            .insert(sample.label, sample.value);
    }

    fn export(&mut self) {
        let completed = std::mem::take(&mut self.current);
        self.exported = Arc::new(completed);
        self.liveness.last_stats_processed = if self.is_exported {
            0
        } else {
            self.liveness.stats_count
        };
        self.is_exported = true;
        self.liveness.export_timestamp = unix_now();
    }
}

/// Shared stats accumulator.
#[derive(Debug)]
pub struct StatsStore {
    inner: Mutex<Inner>,
}

impl Default for StatsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                current: MetricTable::new(),
                exported: Arc::new(MetricTable::new()),
                is_exported: true,
                liveness: LivenessState::default(),
            }),
        }
    }

    // A panic while holding the lock cannot leave the tables half-swapped
    // (export is a move), so recovering the guard is sound.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fold one JSON stats object into the open generation.
    ///
    /// Any call marks the producer as up. A malformed line bumps
    /// `parser_failures` and changes nothing else.
    pub fn parse(&self, text: &str) -> Result<ParseOutcome> {
        let planned = StatsRecord::decode(text)
            .and_then(|record| Ok((record.is_global(), record.samples()?)));

        let mut inner = self.lock();
        inner.liveness.is_up = true;

        let (is_global, samples) = match planned {
            Ok(planned) => planned,
            Err(e) => {
                inner.liveness.parser_failures += 1;
                return Err(e);
            }
        };

        // A global record while nothing is open means rsyslog started a new
        // reporting cycle before the silence timer fired.
        let rotated = is_global && !inner.is_exported;
        if rotated {
            inner.export();
        }

        let count = samples.len();
        for sample in samples {
            inner.add(sample);
        }

        if inner.is_exported {
            inner.liveness.stats_count = 0;
            inner.is_exported = false;
        }
        inner.liveness.stats_count += 1;

        Ok(ParseOutcome {
            samples: count,
            rotated,
        })
    }

    /// Close the open generation and publish it.
    pub fn export(&self) {
        self.lock().export();
    }

    /// The last exported generation plus liveness fields.
    pub fn snapshot(&self) -> Snapshot {
        let inner = self.lock();
        Snapshot {
            table: Arc::clone(&inner.exported),
            liveness: inner.liveness,
        }
    }

    /// Copy of the generation still being accumulated.
    pub fn current(&self) -> MetricTable {
        self.lock().current.clone()
    }

    pub fn is_exported(&self) -> bool {
        self.lock().is_exported
    }

    pub fn is_up(&self) -> bool {
        self.lock().liveness.is_up
    }

    pub fn mark_down(&self) {
        self.lock().liveness.is_up = false;
    }

    pub fn parser_failures(&self) -> u64 {
        self.lock().liveness.parser_failures
    }

    /// Trace-level dump of the open or exported table.
    pub fn dump(&self, exported: bool) {
        let table = {
            let inner = self.lock();
            if exported {
                Arc::clone(&inner.exported)
            } else {
                Arc::new(inner.current.clone())
            }
        };
        for (metric, series) in table.iter() {
            for (label, value) in series {
                tracing::trace!(exported, "{metric}{{label=\"{label}\"}}: {value}");
            }
        }
    }
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

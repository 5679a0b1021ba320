//! Silence-driven export / down state machine.
//!
//! rsyslog sends no heartbeat. The only signal is the cadence of lines: a
//! burst of records per impstats interval, then silence. The tracker turns
//! elapsed silence into two actions on the store (close the generation, mark
//! the producer down) and tells the input loop how long to wait next.
//!
//! Time is passed in explicitly, so every boundary can be driven from tests.

use std::time::Duration;

use crate::error::{ExporterError, Result};
use crate::store::StatsStore;

/// Validated silence thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    export_after: Duration,
    down_after: Duration,
}

impl Timeouts {
    /// `export_after` must be non-zero and `down_after` strictly greater.
    pub fn new(export_after: Duration, down_after: Duration) -> Result<Self> {
        if export_after.is_zero() {
            return Err(ExporterError::ConfigurationInvalid(
                "export timeout must be greater than zero".into(),
            ));
        }
        if down_after <= export_after {
            return Err(ExporterError::ConfigurationInvalid(
                "down timeout must be greater than export timeout".into(),
            ));
        }
        Ok(Self {
            export_after,
            down_after,
        })
    }

    /// Seconds as given on the command line.
    pub fn from_secs_f64(export_after: f64, down_after: f64) -> Result<Self> {
        let export_after = secs(export_after, "export")?;
        let down_after = secs(down_after, "down")?;
        Self::new(export_after, down_after)
    }

    pub fn export_after(&self) -> Duration {
        self.export_after
    }

    pub fn down_after(&self) -> Duration {
        self.down_after
    }
}

fn secs(v: f64, what: &str) -> Result<Duration> {
    Duration::try_from_secs_f64(v).map_err(|_| {
        ExporterError::ConfigurationInvalid(format!(
            "{what} timeout must be a finite, non-negative number of seconds (got {v})"
        ))
    })
}

/// Where the producer stands, as seen from the input side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// A line just arrived.
    Active,
    /// Silent, generation still open.
    SilentPendingExport,
    /// Silent, generation already published.
    SilentExported,
    /// Silent past `down_after`.
    Down,
}

/// What a silence tick did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tick {
    pub exported: bool,
    pub went_down: bool,
}

#[derive(Debug, Clone)]
pub struct LivenessTracker {
    timeouts: Timeouts,
    silent: Duration,
    phase: Phase,
}

impl LivenessTracker {
    /// Starts as `Down`: nothing has been received yet.
    pub fn new(timeouts: Timeouts) -> Self {
        Self {
            timeouts,
            silent: Duration::ZERO,
            phase: Phase::Down,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn silent(&self) -> Duration {
        self.silent
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// A line was read (parsed or not).
    pub fn on_receipt(&mut self) {
        self.silent = Duration::ZERO;
        self.phase = Phase::Active;
    }

    /// The wait ended without input after `elapsed`.
    pub fn on_silence(&mut self, elapsed: Duration, store: &StatsStore) -> Tick {
        self.silent = self.silent.saturating_add(elapsed);
        let mut tick = Tick::default();

        if !store.is_exported() && self.silent >= self.timeouts.export_after {
            store.export();
            tick.exported = true;
        }

        if store.is_up() && self.silent >= self.timeouts.down_after {
            store.mark_down();
            tick.went_down = true;
        }

        self.phase = if !store.is_up() {
            Phase::Down
        } else if store.is_exported() {
            Phase::SilentExported
        } else {
            Phase::SilentPendingExport
        };
        tick
    }

    /// Time until the nearest threshold that can still fire.
    pub fn next_wait(&self, store: &StatsStore) -> Duration {
        let mut wait: Option<Duration> = None;
        let mut consider = |threshold: Duration| {
            if self.silent < threshold {
                let remaining = threshold - self.silent;
                wait = Some(wait.map_or(remaining, |w| w.min(remaining)));
            }
        };

        if !store.is_exported() {
            consider(self.timeouts.export_after);
        }
        if store.is_up() {
            consider(self.timeouts.down_after);
        }

        wait.unwrap_or(self.timeouts.down_after)
    }
}

//! Lightweight stage timing for the analysis pipeline.
//!
//! Two tools live here. [`TimingGuard`] is an RAII guard that logs how long a
//! scope took on the `skintelli::telemetry` target, but only when telemetry was
//! switched on through [`configure`] and the logger admits the level.
//! [`StageTimings`] collects named durations for one analysis so callers can put
//! them into reports without scraping logs.

use std::{
    borrow::Cow,
    collections::BTreeMap,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::{Duration, Instant},
};

use log::{Level, LevelFilter, log, log_enabled};

pub const TELEMETRY_TARGET: &str = "skintelli::telemetry";

static TELEMETRY_ENABLED: AtomicBool = AtomicBool::new(false);
static TELEMETRY_LEVEL: AtomicUsize = AtomicUsize::new(0);

/// Logs the elapsed time of a scope when dropped.
pub struct TimingGuard {
    label: Cow<'static, str>,
    level: Level,
    start: Instant,
    active: bool,
}

impl TimingGuard {
    /// Returns `true` when the guard will emit a log entry on drop.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        if self.active {
            log!(
                target: TELEMETRY_TARGET,
                self.level,
                "{} completed in {:.2?}",
                self.label,
                self.start.elapsed()
            );
        }
    }
}

/// Start timing a scope; the result is logged at `level` if telemetry allows it.
pub fn timing_guard(label: impl Into<Cow<'static, str>>, level: Level) -> TimingGuard {
    let active = telemetry_allows(level) && log_enabled!(target: TELEMETRY_TARGET, level);
    TimingGuard {
        label: label.into(),
        level,
        start: Instant::now(),
        active,
    }
}

/// Configure the global telemetry switch and its maximum level.
pub fn configure(enabled: bool, level: LevelFilter) {
    TELEMETRY_ENABLED.store(enabled, Ordering::Relaxed);
    TELEMETRY_LEVEL.store(level as usize, Ordering::Relaxed);
}

pub fn telemetry_enabled() -> bool {
    TELEMETRY_ENABLED.load(Ordering::Relaxed)
}

/// Returns `true` when telemetry is on and `level` is within the configured threshold.
pub fn telemetry_allows(level: Level) -> bool {
    telemetry_enabled() && (level as usize) <= TELEMETRY_LEVEL.load(Ordering::Relaxed)
}

/// Ordered record of named stage durations for a single run.
#[derive(Debug, Clone, Default)]
pub struct StageTimings {
    stages: Vec<(Cow<'static, str>, Duration)>,
}

impl StageTimings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a measured stage. Repeated labels are kept as separate entries.
    pub fn record(&mut self, label: impl Into<Cow<'static, str>>, duration: Duration) {
        self.stages.push((label.into(), duration));
    }

    /// Run `f`, record how long it took under `label`, and return its output.
    pub fn time<T>(&mut self, label: impl Into<Cow<'static, str>>, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.record(label, start.elapsed());
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Duration)> {
        self.stages.iter().map(|(label, d)| (label.as_ref(), *d))
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn total(&self) -> Duration {
        self.stages.iter().map(|(_, d)| *d).sum()
    }

    /// Milliseconds per label; repeated labels are summed.
    pub fn to_millis(&self) -> BTreeMap<String, f64> {
        let mut out = BTreeMap::new();
        for (label, duration) in self.iter() {
            *out.entry(label.to_string()).or_insert(0.0) += duration.as_secs_f64() * 1_000.0;
        }
        out
    }
}

//! Named timers and counters for render instrumentation.
//!
//! [`Metrics`] is shared by reference across the worker pool. Workers count
//! into a local [`CounterSet`] and merge it once per bucket.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

pub mod timers {
    pub const ALL: &str = "all";
    pub const GENERATE_QUEUE: &str = "generateQueue";
    pub const PROCESS_QUEUE: &str = "processQueue";
    pub const MERGE: &str = "merge";
}

pub mod counters {
    pub const PRIMARY_RAYS: &str = "primaryRays";
    pub const TRACE_TASKS: &str = "traceTasks";
    pub const CHILD_TASKS: &str = "childTasks";
    pub const SAMPLES: &str = "samples";
    pub const SKY_SAMPLES: &str = "skySamples";
    pub const BUCKETS: &str = "buckets";
}

#[derive(Debug, Clone, Copy, Default)]
struct Timer {
    started: Option<Instant>,
    total: Duration,
    laps: u32,
}

/// Counters local to one worker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterSet {
    counts: BTreeMap<&'static str, u64>,
}

impl CounterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, name: &'static str) {
        self.record_n(name, 1);
    }

    pub fn record_n(&mut self, name: &'static str, n: u64) {
        *self.counts.entry(name).or_insert(0) += n;
    }

    pub fn get(&self, name: &str) -> u64 {
        self.counts.get(name).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct Metrics {
    timers: Mutex<BTreeMap<String, Timer>>,
    counters: Mutex<BTreeMap<String, u64>>,
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // counters stay usable after a worker panic
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_timer(&self, name: &str) {
        lock(&self.timers).entry(name.to_string()).or_default().started = Some(Instant::now());
    }

    /// Stop a running timer and add the lap to its total. Stopping an idle timer does nothing.
    pub fn stop_timer(&self, name: &str) {
        let mut timers = lock(&self.timers);
        if let Some(timer) = timers.get_mut(name) {
            if let Some(started) = timer.started.take() {
                timer.total += started.elapsed();
                timer.laps += 1;
            }
        }
    }

    /// Run `f` between `start_timer` and `stop_timer`.
    pub fn time<T>(&self, name: &str, f: impl FnOnce() -> T) -> T {
        self.start_timer(name);
        let result = f();
        self.stop_timer(name);
        result
    }

    pub fn timer(&self, name: &str) -> Duration {
        lock(&self.timers).get(name).map(|t| t.total).unwrap_or_default()
    }

    pub fn timer_laps(&self, name: &str) -> u32 {
        lock(&self.timers).get(name).map(|t| t.laps).unwrap_or(0)
    }

    pub fn record(&self, name: &str) {
        self.record_n(name, 1);
    }

    pub fn record_n(&self, name: &str, n: u64) {
        *lock(&self.counters).entry(name.to_string()).or_insert(0) += n;
    }

    pub fn counter(&self, name: &str) -> u64 {
        lock(&self.counters).get(name).copied().unwrap_or(0)
    }

    pub fn merge(&self, local: &CounterSet) {
        let mut counters = lock(&self.counters);
        for (&name, &n) in &local.counts {
            *counters.entry(name.to_string()).or_insert(0) += n;
        }
    }

    pub fn reset(&self) {
        lock(&self.timers).clear();
        lock(&self.counters).clear();
    }

    pub fn log_summary(&self) {
        for (name, timer) in lock(&self.timers).iter() {
            log::info!("timer {:<16} {:>10.3?} ({} laps)", name, timer.total, timer.laps);
        }
        for (name, count) in lock(&self.counters).iter() {
            log::info!("count {:<16} {:>10}", name, count);
        }
    }
}

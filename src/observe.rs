//! Progress reporting for import runs.
//!
//! The pipeline never talks to a progress bar or logger directly. It emits [`ImportEvent`]s to an
//! optional [`ImportObserver`] and updates an [`ImportMetrics`] counter set that callers can
//! snapshot at any time. Both are purely observational.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

/// Events emitted during one import invocation, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportEvent {
    /// The source resolved into `splits` importers holding `total_records` records.
    Resolved {
        source: String,
        splits: usize,
        total_records: u64,
    },
    ColumnCreated { name: String },
    SplitStarted {
        split: String,
        columns: Vec<String>,
        records: u64,
    },
    /// One more record was written. `completed` counts across all splits.
    Advanced { completed: u64, total: u64 },
    Committed { digest: String, message: String },
    Failed { error: String },
}

/// Observer hook for import events.
pub trait ImportObserver: Send + Sync {
    fn on_event(&self, event: &ImportEvent);
}

/// Fans events out to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn ImportObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn ImportObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl ImportObserver for CompositeObserver {
    fn on_event(&self, event: &ImportEvent) {
        for o in &self.observers {
            o.on_event(event);
        }
    }
}

/// Forwards events to `tracing`. Per-record progress is logged every `progress_every` records.
#[derive(Debug)]
pub struct TracingObserver {
    progress_every: u64,
}

impl TracingObserver {
    pub fn new(progress_every: u64) -> Self {
        Self {
            progress_every: progress_every.max(1),
        }
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl ImportObserver for TracingObserver {
    fn on_event(&self, event: &ImportEvent) {
        match event {
            ImportEvent::Resolved {
                source,
                splits,
                total_records,
            } => info!(source = %source, splits, total_records, "resolved dataset"),
            ImportEvent::ColumnCreated { name } => debug!(column = %name, "created column"),
            ImportEvent::SplitStarted { split, records, .. } => {
                info!(split = %split, records, "adding split")
            }
            ImportEvent::Advanced { completed, total } => {
                if completed % self.progress_every == 0 || completed == total {
                    info!(completed, total, "import progress");
                }
            }
            ImportEvent::Committed { digest, .. } => info!(digest = %digest, "committed import"),
            ImportEvent::Failed { error } => warn!(error = %error, "import failed"),
        }
    }
}

/// Real-time counters for the current import run.
pub struct ImportMetrics {
    run_id: AtomicU64,
    started_at: Mutex<Option<Instant>>,
    elapsed_ns: AtomicU64,

    total_records: AtomicU64,
    records_written: AtomicU64,
    columns_created: AtomicU64,
    splits_started: AtomicU64,
}

impl ImportMetrics {
    pub fn new() -> Self {
        Self {
            run_id: AtomicU64::new(0),
            started_at: Mutex::new(None),
            elapsed_ns: AtomicU64::new(0),
            total_records: AtomicU64::new(0),
            records_written: AtomicU64::new(0),
            columns_created: AtomicU64::new(0),
            splits_started: AtomicU64::new(0),
        }
    }

    pub fn begin_run(&self) {
        let _ = self.run_id.fetch_add(1, Ordering::SeqCst);
        *self.started_at.lock().expect("metrics mutex poisoned") = Some(Instant::now());

        self.elapsed_ns.store(0, Ordering::SeqCst);
        self.total_records.store(0, Ordering::SeqCst);
        self.records_written.store(0, Ordering::SeqCst);
        self.columns_created.store(0, Ordering::SeqCst);
        self.splits_started.store(0, Ordering::SeqCst);
    }

    pub fn end_run(&self) {
        let started = *self.started_at.lock().expect("metrics mutex poisoned");
        if let Some(start) = started {
            let ns = start.elapsed().as_nanos().min(u64::MAX as u128) as u64;
            self.elapsed_ns.store(ns.max(1), Ordering::SeqCst);
        }
    }

    pub fn set_total(&self, total: u64) {
        self.total_records.store(total, Ordering::SeqCst);
    }

    /// Count one written record and return the new running total.
    pub fn advance(&self) -> u64 {
        self.records_written.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn on_column_created(&self) {
        let _ = self.columns_created.fetch_add(1, Ordering::SeqCst);
    }

    pub fn on_split_started(&self) {
        let _ = self.splits_started.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> ImportMetricsSnapshot {
        let elapsed_ns = self.elapsed_ns.load(Ordering::SeqCst);
        ImportMetricsSnapshot {
            run_id: self.run_id.load(Ordering::SeqCst),
            elapsed: (elapsed_ns > 0).then(|| Duration::from_nanos(elapsed_ns)),
            total_records: self.total_records.load(Ordering::SeqCst),
            records_written: self.records_written.load(Ordering::SeqCst),
            columns_created: self.columns_created.load(Ordering::SeqCst),
            splits_started: self.splits_started.load(Ordering::SeqCst),
        }
    }
}

impl Default for ImportMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ImportMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ImportMetrics").field(&self.snapshot()).finish()
    }
}

/// Immutable snapshot of [`ImportMetrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportMetricsSnapshot {
    pub run_id: u64,
    /// Set once the run has finished (successfully or not).
    pub elapsed: Option<Duration>,
    pub total_records: u64,
    pub records_written: u64,
    pub columns_created: u64,
    pub splits_started: u64,
}

impl fmt::Display for ImportMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run_id={}, records={}/{}, columns_created={}, splits={}, elapsed={:?}",
            self.run_id,
            self.records_written,
            self.total_records,
            self.columns_created,
            self.splits_started,
            self.elapsed
        )
    }
}

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Execution events emitted by the engine.
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    RunStarted { columns: usize },
    ThrottleWaited { duration: Duration },
    ColumnStarted { column: String, rows: usize },
    ColumnFinished { column: String, changed: bool },
    RunFinished {
        elapsed: Duration,
        metrics: ExecutionMetricsSnapshot,
    },
}

/// Observer hook for execution events.
///
/// `ColumnStarted`/`ColumnFinished` are emitted from worker threads.
pub trait ExecutionObserver: Send + Sync {
    fn on_event(&self, event: &ExecutionEvent);
}

/// A simple stderr logger for execution events.
#[derive(Default)]
pub struct StdErrExecutionObserver;

impl ExecutionObserver for StdErrExecutionObserver {
    fn on_event(&self, event: &ExecutionEvent) {
        eprintln!("{event:?}");
    }
}

/// Real-time metrics for an execution run.
///
/// The engine updates these counters during execution; callers can snapshot them at any time.
pub struct ExecutionMetrics {
    run_id: AtomicU64,
    elapsed_ns: AtomicU64,

    columns_started: AtomicU64,
    columns_finished: AtomicU64,
    columns_changed: AtomicU64,
    rows_scanned: AtomicU64,
    throttle_wait_ns: AtomicU64,

    active_columns: AtomicUsize,
    max_active_columns: AtomicUsize,
}

impl ExecutionMetrics {
    pub fn new() -> Self {
        Self {
            run_id: AtomicU64::new(0),
            elapsed_ns: AtomicU64::new(0),
            columns_started: AtomicU64::new(0),
            columns_finished: AtomicU64::new(0),
            columns_changed: AtomicU64::new(0),
            rows_scanned: AtomicU64::new(0),
            throttle_wait_ns: AtomicU64::new(0),
            active_columns: AtomicUsize::new(0),
            max_active_columns: AtomicUsize::new(0),
        }
    }

    pub fn begin_run(&self) {
        let _ = self.run_id.fetch_add(1, Ordering::SeqCst);

        self.elapsed_ns.store(0, Ordering::SeqCst);
        self.columns_started.store(0, Ordering::SeqCst);
        self.columns_finished.store(0, Ordering::SeqCst);
        self.columns_changed.store(0, Ordering::SeqCst);
        self.rows_scanned.store(0, Ordering::SeqCst);
        self.throttle_wait_ns.store(0, Ordering::SeqCst);
        self.active_columns.store(0, Ordering::SeqCst);
        self.max_active_columns.store(0, Ordering::SeqCst);
    }

    pub fn end_run(&self, elapsed: Duration) {
        self.elapsed_ns.store(duration_ns(elapsed), Ordering::SeqCst);
    }

    pub fn on_column_start(&self, rows: usize) {
        let _ = self.columns_started.fetch_add(1, Ordering::SeqCst);
        let _ = self.rows_scanned.fetch_add(rows as u64, Ordering::SeqCst);
        let now = self.active_columns.fetch_add(1, Ordering::SeqCst) + 1;
        update_max_usize(&self.max_active_columns, now);
    }

    pub fn on_column_end(&self, changed: bool) {
        let _ = self.columns_finished.fetch_add(1, Ordering::SeqCst);
        if changed {
            let _ = self.columns_changed.fetch_add(1, Ordering::SeqCst);
        }
        let _ = self.active_columns.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn on_throttle_wait(&self, d: Duration) {
        let _ = self.throttle_wait_ns.fetch_add(duration_ns(d), Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> ExecutionMetricsSnapshot {
        let elapsed_ns = self.elapsed_ns.load(Ordering::SeqCst);
        let elapsed = if elapsed_ns > 0 {
            Some(Duration::from_nanos(elapsed_ns))
        } else {
            None
        };

        ExecutionMetricsSnapshot {
            run_id: self.run_id.load(Ordering::SeqCst),
            elapsed,
            columns_started: self.columns_started.load(Ordering::SeqCst),
            columns_finished: self.columns_finished.load(Ordering::SeqCst),
            columns_changed: self.columns_changed.load(Ordering::SeqCst),
            rows_scanned: self.rows_scanned.load(Ordering::SeqCst),
            throttle_wait: Duration::from_nanos(self.throttle_wait_ns.load(Ordering::SeqCst)),
            max_active_columns: self.max_active_columns.load(Ordering::SeqCst),
        }
    }
}

impl Default for ExecutionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn duration_ns(d: Duration) -> u64 {
    d.as_nanos().min(u128::from(u64::MAX)) as u64
}

fn update_max_usize(dst: &AtomicUsize, now: usize) {
    loop {
        let cur = dst.load(Ordering::SeqCst);
        if now <= cur {
            break;
        }
        if dst
            .compare_exchange(cur, now, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            break;
        }
    }
}

/// Immutable snapshot of [`ExecutionMetrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionMetricsSnapshot {
    pub run_id: u64,
    pub elapsed: Option<Duration>,
    pub columns_started: u64,
    pub columns_finished: u64,
    pub columns_changed: u64,
    pub rows_scanned: u64,
    pub throttle_wait: Duration,
    pub max_active_columns: usize,
}

impl fmt::Display for ExecutionMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run_id={}, columns={}/{}, changed={}, rows_scanned={}, max_active_columns={}, throttle_wait={:?}, elapsed={:?}",
            self.run_id,
            self.columns_finished,
            self.columns_started,
            self.columns_changed,
            self.rows_scanned,
            self.max_active_columns,
            self.throttle_wait,
            self.elapsed
        )
    }
}

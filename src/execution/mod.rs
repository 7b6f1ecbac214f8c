//! Execution engine for normalizing columns in parallel.
//!
//! Columns are independent, so this module sits "above" [`crate::normalize`] and provides:
//!
//! - Parallel execution across columns on a dedicated rayon pool
//! - Resource limits / throttling (in-flight columns)
//! - Real-time metrics + observer hooks for monitoring
//!
//! Replacement columns are computed on worker threads and applied afterwards on the calling
//! thread, in schema order, so the result is identical to
//! [`crate::normalize::normalize_for_columnar`].

mod observer;
mod semaphore;

use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use rayon::ThreadPool;
use rayon::ThreadPoolBuilder;

use crate::normalize::{apply_outcome, finish, normalize_field, ColumnOutcome, ColumnReport, NormalizeOptions};
use crate::types::DataSet;

pub use observer::{
    ExecutionEvent, ExecutionMetrics, ExecutionMetricsSnapshot, ExecutionObserver, StdErrExecutionObserver,
};

use semaphore::Semaphore;

/// Configuration for the [`ExecutionEngine`].
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    /// Number of worker threads used by the engine.
    ///
    /// If `None`, uses the platform's available parallelism.
    pub num_threads: Option<usize>,
    /// Upper bound on columns being normalized at the same time.
    ///
    /// This is an additional throttle on top of `num_threads`; it bounds how many replacement
    /// columns are held in memory while being built.
    pub max_in_flight_columns: usize,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        let n = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        Self {
            num_threads: Some(n),
            max_in_flight_columns: n.max(1),
        }
    }
}

/// A configurable execution engine for normalizing [`DataSet`] columns in parallel.
pub struct ExecutionEngine {
    pool: ThreadPool,
    opts: ExecutionOptions,
    observer: Option<Arc<dyn ExecutionObserver>>,
    metrics: Arc<ExecutionMetrics>,
}

impl ExecutionEngine {
    /// Create a new engine with the given options.
    ///
    /// # Panics
    ///
    /// Panics if `max_in_flight_columns == 0`, `num_threads == Some(0)`, or the thread pool
    /// cannot be built.
    pub fn new(opts: ExecutionOptions) -> Self {
        assert!(
            opts.max_in_flight_columns > 0,
            "max_in_flight_columns must be > 0"
        );
        if let Some(n) = opts.num_threads {
            assert!(n > 0, "num_threads must be > 0 when set");
        }

        let n_threads = opts
            .num_threads
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
            .max(1);

        let pool = ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .build()
            .expect("failed to build rayon thread pool");

        Self {
            pool,
            opts,
            observer: None,
            metrics: Arc::new(ExecutionMetrics::new()),
        }
    }

    /// Attach an observer for execution events (metrics/logging).
    pub fn with_observer(mut self, observer: Arc<dyn ExecutionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Get a handle to real-time execution metrics.
    pub fn metrics(&self) -> Arc<ExecutionMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Normalize every column of `dataset` in place and return it for chaining.
    pub fn normalize<'a>(&self, dataset: &'a mut DataSet, options: &NormalizeOptions) -> &'a mut DataSet {
        self.normalize_with_report(dataset, options);
        dataset
    }

    /// Normalize every column in parallel, returning one report per column in schema order.
    pub fn normalize_with_report(&self, dataset: &mut DataSet, options: &NormalizeOptions) -> Vec<ColumnReport> {
        let start = Instant::now();
        self.metrics.begin_run();
        self.emit(ExecutionEvent::RunStarted {
            columns: dataset.column_count(),
        });

        let outcomes = self.pool.install(|| self.compute_outcomes(dataset, options));

        let observer = options.observer.as_deref();
        let reports: Vec<ColumnReport> = outcomes
            .into_iter()
            .enumerate()
            .map(|(idx, outcome)| apply_outcome(dataset, idx, outcome, observer))
            .collect();
        finish(&reports, observer);

        self.metrics.end_run(start.elapsed());
        self.emit(ExecutionEvent::RunFinished {
            elapsed: start.elapsed(),
            metrics: self.metrics.snapshot(),
        });

        reports
    }

    fn compute_outcomes(&self, dataset: &DataSet, options: &NormalizeOptions) -> Vec<ColumnOutcome> {
        let rules = options.rules();
        let sem = Semaphore::new(self.opts.max_in_flight_columns);

        dataset
            .columns()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|(field, values)| {
                let waited = sem.acquire();
                if waited > Duration::ZERO {
                    self.metrics.on_throttle_wait(waited);
                    self.emit(ExecutionEvent::ThrottleWaited { duration: waited });
                }

                let rows = if field.data_type.is_primitive() { 0 } else { values.len() };
                self.metrics.on_column_start(rows);
                self.emit(ExecutionEvent::ColumnStarted {
                    column: field.name.clone(),
                    rows,
                });

                let outcome = normalize_field(field, values, &rules);
                let changed = outcome.values.is_some();

                self.emit(ExecutionEvent::ColumnFinished {
                    column: field.name.clone(),
                    changed,
                });
                self.metrics.on_column_end(changed);
                sem.release();
                outcome
            })
            .collect()
    }

    fn emit(&self, event: ExecutionEvent) {
        if let Some(obs) = &self.observer {
            obs.on_event(&event);
        }
    }
}

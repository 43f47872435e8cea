//! Batch execution driver for extraction stages.
//!
//! The per-row core in [`crate::extraction`] is single-threaded and synchronous;
//! parallelism belongs to the enclosing pipeline. This module is a minimal
//! in-process stand-in for that pipeline: it runs one shared, immutable
//! [`RowExtractor`] over an in-memory [`DataSet`] in parallel chunks, with
//!
//! - chunked rayon execution and a bound on in-flight chunks
//! - real-time metrics + observer hooks for monitoring
//! - row order preserved; the first failing row (in row order) aborts the batch

mod observer;
mod semaphore;

use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use rayon::ThreadPool;
use rayon::ThreadPoolBuilder;

use crate::error::{ExtractionError, ExtractionResult};
use crate::extraction::RowExtractor;
use crate::types::{DataSet, Value};

pub use observer::{
    ExecutionEvent, ExecutionMetrics, ExecutionMetricsSnapshot, ExecutionObserver,
    StdErrExecutionObserver,
};

use semaphore::Semaphore;

/// Configuration for the [`ExecutionEngine`].
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    /// Number of worker threads used by the engine.
    ///
    /// If `None`, uses the platform's available parallelism.
    pub num_threads: Option<usize>,
    /// Number of rows per chunk.
    pub chunk_size: usize,
    /// Upper bound on concurrently executing chunks, on top of `num_threads`.
    pub max_in_flight_chunks: usize,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        let n = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        Self {
            num_threads: Some(n),
            chunk_size: 4_096,
            max_in_flight_chunks: n.max(1),
        }
    }
}

/// A configurable engine for running extraction stages over in-memory batches.
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
    /// Panics if `chunk_size == 0`, `max_in_flight_chunks == 0`, or
    /// `num_threads == Some(0)`.
    pub fn new(opts: ExecutionOptions) -> Self {
        assert!(opts.chunk_size > 0, "chunk_size must be > 0");
        assert!(
            opts.max_in_flight_chunks > 0,
            "max_in_flight_chunks must be > 0"
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
            opts: opts.clone(),
            observer: None,
            metrics: Arc::new(ExecutionMetrics::new()),
        }
    }

    /// Attach an observer for engine-level events (metrics/logging).
    pub fn with_observer(mut self, observer: Arc<dyn ExecutionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Get a handle to real-time execution metrics.
    pub fn metrics(&self) -> Arc<ExecutionMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run `extractor` over every row of `dataset` in parallel chunks.
    ///
    /// The one extractor is shared across all workers; it is read-only after
    /// construction, so no synchronization is involved. The output dataset carries
    /// the extractor's output schema and preserves input row order. If any row
    /// fails (possible only with the skip-failed policy disabled), the first
    /// failing row's error (in row order) is returned and the batch is discarded.
    pub fn extract_parallel(
        &self,
        dataset: &DataSet,
        extractor: &RowExtractor,
    ) -> ExtractionResult<DataSet> {
        self.pool
            .install(|| self.extract_parallel_impl(dataset, extractor))
    }

    fn extract_parallel_impl(
        &self,
        dataset: &DataSet,
        extractor: &RowExtractor,
    ) -> ExtractionResult<DataSet> {
        let start = Instant::now();
        self.metrics.begin_run();
        self.emit(ExecutionEvent::RunStarted);

        let sem = Semaphore::new(self.opts.max_in_flight_chunks);
        let chunk_ranges = chunk_ranges(dataset.row_count(), self.opts.chunk_size);

        let per_chunk: Vec<ExtractionResult<Vec<Vec<Value>>>> = chunk_ranges
            .into_par_iter()
            .map(|range| {
                let waited = sem.acquire();
                if waited > Duration::ZERO {
                    self.metrics.on_throttle_wait(waited);
                    self.emit(ExecutionEvent::ThrottleWaited { duration: waited });
                }

                self.metrics.on_chunk_start();
                self.emit(ExecutionEvent::ChunkStarted {
                    start_row: range.start,
                    row_count: range.end - range.start,
                });

                let mut out = Vec::with_capacity(range.end - range.start);
                let mut failure: Option<ExtractionError> = None;
                for row in &dataset.rows[range] {
                    self.metrics.on_row_processed();
                    match extractor.extract(row.as_slice()) {
                        Ok(extracted) => out.push(extracted),
                        Err(e) => {
                            self.metrics.on_row_failed();
                            self.emit(ExecutionEvent::RowFailed {
                                message: e.to_string(),
                            });
                            failure = Some(e);
                            break;
                        }
                    }
                }

                self.emit(ExecutionEvent::ChunkFinished {
                    output_rows: out.len(),
                });
                self.metrics.on_chunk_end();
                sem.release();

                match failure {
                    Some(e) => Err(e),
                    None => Ok(out),
                }
            })
            .collect();

        let mut rows = Vec::with_capacity(dataset.row_count());
        let mut first_error: Option<ExtractionError> = None;
        for chunk in per_chunk {
            match chunk {
                Ok(extracted) => rows.extend(extracted),
                Err(e) => {
                    first_error = Some(e);
                    break;
                }
            }
        }

        self.metrics.end_run(start.elapsed());
        self.emit(ExecutionEvent::RunFinished {
            elapsed: start.elapsed(),
            metrics: self.metrics.snapshot(),
        });

        match first_error {
            Some(e) => Err(e),
            None => Ok(DataSet::new(extractor.output_schema().clone(), rows)),
        }
    }

    fn emit(&self, event: ExecutionEvent) {
        if let Some(obs) = &self.observer {
            obs.on_event(&event);
        }
    }
}

fn chunk_ranges(row_count: usize, chunk_size: usize) -> Vec<std::ops::Range<usize>> {
    if row_count == 0 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(row_count.div_ceil(chunk_size));
    let mut start = 0usize;
    while start < row_count {
        let end = (start + chunk_size).min(row_count);
        out.push(start..end);
        start = end;
    }
    out
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::{ExecutionEngine, ExecutionOptions};
    use crate::execution::{ExecutionEvent, ExecutionObserver};
    use crate::extraction::{ExtractionConfig, RowExtractor};
    use crate::types::{DataSet, DataType, Field, Schema, Value};

    fn input_schema() -> Schema {
        Schema::new(vec![
            Field::new("id", DataType::Int64),
            Field::new("payload", DataType::Utf8),
        ])
    }

    fn dataset_of_n(n: usize) -> DataSet {
        let mut rows = Vec::with_capacity(n);
        for i in 0..n as i64 {
            rows.push(vec![
                Value::Int64(i),
                Value::Utf8(format!(r#"{{"a":{{"b":{i}}}}}"#)),
            ]);
        }
        DataSet::new(input_schema(), rows)
    }

    fn extractor(skip_failed: bool) -> RowExtractor {
        let config = ExtractionConfig {
            source_column: "payload".to_string(),
            json_paths: vec!["$.a.b".to_string()],
            output_columns: vec!["b".to_string()],
            output_types: Some(vec!["long".to_string()]),
            skip_failed,
            reserved_columns: vec!["id".to_string()],
        };
        RowExtractor::new(&input_schema(), &config).unwrap()
    }

    #[test]
    fn parallel_extraction_matches_sequential_and_preserves_order() {
        let ds = dataset_of_n(400);
        let ex = extractor(false);
        let engine = ExecutionEngine::new(ExecutionOptions {
            num_threads: Some(4),
            chunk_size: 7,
            max_in_flight_chunks: 4,
        });

        let out = engine.extract_parallel(&ds, &ex).unwrap();

        assert_eq!(out.schema, *ex.output_schema());
        assert_eq!(out.row_count(), ds.row_count());
        for (i, row) in out.rows.iter().enumerate() {
            assert_eq!(row, &vec![Value::Int64(i as i64), Value::Int64(i as i64)]);
        }
    }

    #[test]
    fn first_failing_row_aborts_the_batch() {
        let mut ds = dataset_of_n(50);
        ds.rows[23][1] = Value::Utf8("not json".to_string());
        let ex = extractor(false);
        let engine = ExecutionEngine::new(ExecutionOptions {
            num_threads: Some(4),
            chunk_size: 5,
            max_in_flight_chunks: 4,
        });

        let err = engine.extract_parallel(&ds, &ex).unwrap_err();
        assert!(err.to_string().contains("failed to evaluate json path '$.a.b'"));
        assert!(engine.metrics().snapshot().rows_failed >= 1);
    }

    #[test]
    fn skip_failed_batches_never_fail() {
        let mut ds = dataset_of_n(50);
        ds.rows[10][1] = Value::Null;
        ds.rows[20][1] = Value::Utf8("not json".to_string());
        let ex = extractor(true);
        let engine = ExecutionEngine::new(ExecutionOptions {
            num_threads: Some(2),
            chunk_size: 8,
            max_in_flight_chunks: 2,
        });

        let out = engine.extract_parallel(&ds, &ex).unwrap();
        assert_eq!(out.row_count(), 50);
        assert_eq!(out.rows[10], vec![Value::Int64(10), Value::Null]);
        assert_eq!(out.rows[20], vec![Value::Int64(20), Value::Null]);
        assert_eq!(out.rows[21], vec![Value::Int64(21), Value::Int64(21)]);
    }

    struct ConcurrencyObserver {
        active_chunks: AtomicUsize,
        max_active_chunks: AtomicUsize,
    }

    impl ConcurrencyObserver {
        fn new() -> Self {
            Self {
                active_chunks: AtomicUsize::new(0),
                max_active_chunks: AtomicUsize::new(0),
            }
        }
        fn max(&self) -> usize {
            self.max_active_chunks.load(Ordering::SeqCst)
        }
        fn bump_max(&self, now: usize) {
            loop {
                let cur = self.max_active_chunks.load(Ordering::SeqCst);
                if now <= cur {
                    break;
                }
                if self
                    .max_active_chunks
                    .compare_exchange(cur, now, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
                {
                    break;
                }
            }
        }
    }

    impl ExecutionObserver for ConcurrencyObserver {
        fn on_event(&self, event: &ExecutionEvent) {
            match event {
                ExecutionEvent::ChunkStarted { .. } => {
                    let now = self.active_chunks.fetch_add(1, Ordering::SeqCst) + 1;
                    self.bump_max(now);
                }
                ExecutionEvent::ChunkFinished { .. } => {
                    let _ = self.active_chunks.fetch_sub(1, Ordering::SeqCst);
                }
                _ => {}
            }
        }
    }

    #[test]
    fn max_in_flight_chunks_throttles_chunk_concurrency() {
        let ds = dataset_of_n(100);
        let ex = extractor(false);
        let observer = Arc::new(ConcurrencyObserver::new());
        let obs_trait: Arc<dyn ExecutionObserver> = observer.clone();
        let engine = ExecutionEngine::new(ExecutionOptions {
            num_threads: Some(4),
            chunk_size: 1,
            max_in_flight_chunks: 1,
        })
        .with_observer(obs_trait);

        let out = engine.extract_parallel(&ds, &ex).unwrap();
        assert_eq!(out.row_count(), ds.row_count());
        assert_eq!(observer.max(), 1);
    }

    #[test]
    fn metrics_are_available_after_run() {
        let ds = dataset_of_n(60);
        let ex = extractor(false);
        let engine = ExecutionEngine::new(ExecutionOptions {
            num_threads: Some(4),
            chunk_size: 10,
            max_in_flight_chunks: 2,
        });
        let metrics = engine.metrics();

        let out = engine.extract_parallel(&ds, &ex).unwrap();
        assert_eq!(out.row_count(), ds.row_count());

        let snap = metrics.snapshot();
        assert_eq!(snap.rows_processed, 60);
        assert_eq!(snap.rows_failed, 0);
        assert_eq!(snap.chunks_started, 6);
        assert_eq!(snap.chunks_finished, 6);
        assert!(snap.max_active_chunks >= 1);
        assert!(snap.elapsed.is_some());
    }
}

use ingest::PredictionRow;
use resolve::CacheStats;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

#[derive(Default)]
pub struct RunMetrics {
    // Counts
    input_rows: AtomicUsize,
    predicted_rows: AtomicUsize,
    empty_predictions: AtomicUsize,
    predicted_objects: AtomicUsize,

    // Timing (in microseconds)
    total_load_time_us: AtomicU64,
    total_predict_time_us: AtomicU64,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_load(&self, duration: Duration, rows: usize) {
        self.total_load_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.input_rows.fetch_add(rows, Ordering::Relaxed);
    }

    pub fn record_predictions(&self, duration: Duration, rows: &[PredictionRow]) {
        self.total_predict_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.predicted_rows.fetch_add(rows.len(), Ordering::Relaxed);
        let empty = rows.iter().filter(|row| row.object_entities_id.is_empty()).count();
        self.empty_predictions.fetch_add(empty, Ordering::Relaxed);
        let objects: usize = rows.iter().map(|row| row.object_entities_id.len()).sum();
        self.predicted_objects.fetch_add(objects, Ordering::Relaxed);
    }

    pub fn snapshot(&self, resolver: CacheStats) -> RunSummary {
        let predicted_rows = self.predicted_rows.load(Ordering::Relaxed);
        let predict_ms = self.total_predict_time_us.load(Ordering::Relaxed) as f64 / 1000.0;
        RunSummary {
            input_rows: self.input_rows.load(Ordering::Relaxed),
            predicted_rows,
            empty_predictions: self.empty_predictions.load(Ordering::Relaxed),
            avg_objects_per_row: ratio(self.predicted_objects.load(Ordering::Relaxed) as f64, predicted_rows),
            load_time_ms: self.total_load_time_us.load(Ordering::Relaxed) as f64 / 1000.0,
            predict_time_ms: predict_ms,
            avg_predict_time_ms: ratio(predict_ms, predicted_rows),
            resolver,
        }
    }
}

fn ratio(total: f64, count: usize) -> f64 {
    if count > 0 { total / count as f64 } else { 0.0 }
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub input_rows: usize,
    pub predicted_rows: usize,
    pub empty_predictions: usize,
    pub avg_objects_per_row: f64,
    pub load_time_ms: f64,
    pub predict_time_ms: f64,
    pub avg_predict_time_ms: f64,
    pub resolver: CacheStats,
}

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

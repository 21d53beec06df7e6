use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Instant,
};

/// Counters for writes made against the fixture store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StoreMetrics {
    pub total_writes: u64,
    pub successful_writes: u64,
    pub failed_writes: u64,
    pub avg_write_time_ms: f64,
    pub last_error: Option<String>,
    pub last_error_time: Option<DateTime<Utc>>,
}

#[derive(Clone, Default)]
pub struct MetricsCollector {
    metrics: Arc<Mutex<StoreMetrics>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the counters invalid.
    fn lock(&self) -> MutexGuard<'_, StoreMetrics> {
        self.metrics.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record_write_start(&self) -> WriteTracker {
        WriteTracker {
            start_time: Instant::now(),
            collector: self.clone(),
        }
    }

    pub fn record_error(&self, error: String) {
        let mut metrics = self.lock();
        metrics.last_error = Some(error);
        metrics.last_error_time = Some(Utc::now());
    }

    pub fn get_metrics(&self) -> StoreMetrics {
        self.lock().clone()
    }
}

pub struct WriteTracker {
    start_time: Instant,
    collector: MetricsCollector,
}

impl WriteTracker {
    pub fn finish(self, success: bool) {
        let duration = self.start_time.elapsed();
        let mut metrics = self.collector.lock();

        metrics.total_writes += 1;
        if success {
            metrics.successful_writes += 1;
        } else {
            metrics.failed_writes += 1;
        }

        // Exponential moving average
        let alpha = 0.1;
        metrics.avg_write_time_ms =
            metrics.avg_write_time_ms * (1.0 - alpha) + duration.as_secs_f64() * 1000.0 * alpha;
    }
}

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Instant;

use serde_json::Value;
use serde_json::json;
use uia_bridge_common::poison_recovery_count;

pub struct BridgeMetrics {
    pub requests_total: AtomicU64,
    pub translation_errors: AtomicU64,
    pub runtime_errors: AtomicU64,
    pub execution_errors: AtomicU64,
    pub lock_timeouts: AtomicU64,
    start_time: Instant,
}

impl Default for BridgeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl BridgeMetrics {
    pub fn new() -> Self {
        Self {
            requests_total: AtomicU64::new(0),
            translation_errors: AtomicU64::new(0),
            runtime_errors: AtomicU64::new(0),
            execution_errors: AtomicU64::new(0),
            lock_timeouts: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_translation_error(&self) {
        self.translation_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_runtime_error(&self) {
        self.runtime_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_execution_error(&self) {
        self.execution_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_lock_timeout(&self) {
        self.lock_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn translation_errors(&self) -> u64 {
        self.translation_errors.load(Ordering::Relaxed)
    }

    pub fn runtime_errors(&self) -> u64 {
        self.runtime_errors.load(Ordering::Relaxed)
    }

    pub fn execution_errors(&self) -> u64 {
        self.execution_errors.load(Ordering::Relaxed)
    }

    pub fn lock_timeouts(&self) -> u64 {
        self.lock_timeouts.load(Ordering::Relaxed)
    }

    /// Process-wide count of recovered poisoned locks.
    pub fn poison_recoveries(&self) -> u64 {
        poison_recovery_count()
    }

    pub fn uptime_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    pub fn to_json(&self) -> Value {
        json!({
            "requests": self.requests(),
            "translation_errors": self.translation_errors(),
            "runtime_errors": self.runtime_errors(),
            "execution_errors": self.execution_errors(),
            "lock_timeouts": self.lock_timeouts(),
            "poison_recoveries": self.poison_recoveries(),
            "uptime_ms": self.uptime_ms()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initial_values() {
        let metrics = BridgeMetrics::new();
        assert_eq!(metrics.requests(), 0);
        assert_eq!(metrics.translation_errors(), 0);
        assert_eq!(metrics.runtime_errors(), 0);
        assert_eq!(metrics.execution_errors(), 0);
        assert_eq!(metrics.lock_timeouts(), 0);
    }

    #[test]
    fn test_metrics_increment() {
        let metrics = BridgeMetrics::new();
        metrics.record_request();
        metrics.record_request();
        metrics.record_translation_error();
        metrics.record_runtime_error();
        metrics.record_lock_timeout();
        assert_eq!(metrics.requests(), 2);
        assert_eq!(metrics.translation_errors(), 1);
        assert_eq!(metrics.runtime_errors(), 1);
        assert_eq!(metrics.lock_timeouts(), 1);
    }

    #[test]
    fn test_json_snapshot() {
        let metrics = BridgeMetrics::new();
        metrics.record_execution_error();
        let snapshot = metrics.to_json();
        assert_eq!(snapshot["execution_errors"], 1);
        assert_eq!(snapshot["requests"], 0);
        assert!(snapshot["uptime_ms"].is_u64());
    }
}

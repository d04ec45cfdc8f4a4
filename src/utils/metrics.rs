//! Observability for the version gate
//!
//! Counters are owned by each gate instance; the crate keeps no process-wide
//! state. Uses atomic counters so connection workers can share a gate.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Counters for one version gate
#[derive(Debug)]
pub struct GateMetrics {
    /// Total dispatch calls
    pub dispatches: AtomicU64,
    /// Dispatches with no rule for the version and kind
    pub misses: AtomicU64,
    /// Handlers that returned a packet
    pub successes: AtomicU64,
    /// Handlers that returned an error
    pub failures: AtomicU64,
    /// Failures that desynchronized a buffer
    pub decode_faults: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl GateMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            dispatches: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            decode_faults: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a dispatch call
    pub fn dispatch(&self) {
        self.dispatches.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dispatch that no rule matched
    pub fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a handler success
    pub fn success(&self) {
        self.successes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a handler failure
    pub fn failure(&self, decode_fault: bool) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        if decode_fault {
            self.decode_faults.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> GateSnapshot {
        GateSnapshot {
            dispatches: self.dispatches.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            decode_faults: self.decode_faults.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_summary(&self) {
        let snapshot = self.snapshot();
        info!(
            dispatches = snapshot.dispatches,
            misses = snapshot.misses,
            successes = snapshot.successes,
            failures = snapshot.failures,
            decode_faults = snapshot.decode_faults,
            uptime_seconds = snapshot.uptime_seconds,
            "Version gate metrics snapshot"
        );
    }
}

impl Default for GateMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateSnapshot {
    pub dispatches: u64,
    pub misses: u64,
    pub successes: u64,
    pub failures: u64,
    pub decode_faults: u64,
    pub uptime_seconds: u64,
}

/// Timer for measuring operation duration
pub struct Timer {
    start: Instant,
    operation: &'static str,
}

impl Timer {
    /// Start timing an operation
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        debug!(
            operation = self.operation,
            duration_us = duration.as_micros() as u64,
            "Operation completed"
        );
    }
}

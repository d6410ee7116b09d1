//! Observability and Metrics
//!
//! This module provides metrics collection for codec throughput and
//! failure rates.
//!
//! Uses atomic counters for thread-safe metrics collection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Global metrics collector for codec operations
#[derive(Debug)]
pub struct Metrics {
    /// Envelopes successfully encoded
    pub packets_encoded: AtomicU64,
    /// Envelopes successfully decoded
    pub packets_decoded: AtomicU64,
    /// Total bytes produced by encode
    pub bytes_encoded: AtomicU64,
    /// Total bytes consumed by decode
    pub bytes_decoded: AtomicU64,
    /// Failed encodes
    pub encode_errors: AtomicU64,
    /// Failed decodes, excluding unknown packet types
    pub decode_errors: AtomicU64,
    /// Decodes rejected because the type id was not registered
    pub unknown_type_rejections: AtomicU64,
    /// Schemas added to any registry
    pub schemas_registered: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            packets_encoded: AtomicU64::new(0),
            packets_decoded: AtomicU64::new(0),
            bytes_encoded: AtomicU64::new(0),
            bytes_decoded: AtomicU64::new(0),
            encode_errors: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            unknown_type_rejections: AtomicU64::new(0),
            schemas_registered: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record an encoded envelope
    pub fn packet_encoded(&self, byte_count: u64) {
        self.packets_encoded.fetch_add(1, Ordering::Relaxed);
        self.bytes_encoded.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record a decoded envelope
    pub fn packet_decoded(&self, byte_count: u64) {
        self.packets_decoded.fetch_add(1, Ordering::Relaxed);
        self.bytes_decoded.fetch_add(byte_count, Ordering::Relaxed);
    }

    pub fn encode_error(&self) {
        self.encode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn unknown_type_rejected(&self) {
        self.unknown_type_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn schema_registered(&self) {
        self.schemas_registered.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            packets_encoded: self.packets_encoded.load(Ordering::Relaxed),
            packets_decoded: self.packets_decoded.load(Ordering::Relaxed),
            bytes_encoded: self.bytes_encoded.load(Ordering::Relaxed),
            bytes_decoded: self.bytes_decoded.load(Ordering::Relaxed),
            encode_errors: self.encode_errors.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            unknown_type_rejections: self.unknown_type_rejections.load(Ordering::Relaxed),
            schemas_registered: self.schemas_registered.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            packets_encoded = snapshot.packets_encoded,
            packets_decoded = snapshot.packets_decoded,
            bytes_encoded = snapshot.bytes_encoded,
            bytes_decoded = snapshot.bytes_decoded,
            encode_errors = snapshot.encode_errors,
            decode_errors = snapshot.decode_errors,
            unknown_type_rejections = snapshot.unknown_type_rejections,
            schemas_registered = snapshot.schemas_registered,
            uptime_seconds = snapshot.uptime_seconds,
            "Codec metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub packets_encoded: u64,
    pub packets_decoded: u64,
    pub bytes_encoded: u64,
    pub bytes_decoded: u64,
    pub encode_errors: u64,
    pub decode_errors: u64,
    pub unknown_type_rejections: u64,
    pub schemas_registered: u64,
    pub uptime_seconds: u64,
}

static METRICS: once_cell::sync::Lazy<Metrics> = once_cell::sync::Lazy::new(Metrics::new);

/// Get the global metrics instance
pub fn global_metrics() -> &'static Metrics {
    &METRICS
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = Metrics::new();
        metrics.packet_encoded(10);
        metrics.packet_encoded(5);
        metrics.packet_decoded(7);
        metrics.unknown_type_rejected();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.packets_encoded, 2);
        assert_eq!(snapshot.bytes_encoded, 15);
        assert_eq!(snapshot.bytes_decoded, 7);
        assert_eq!(snapshot.unknown_type_rejections, 1);
        assert_eq!(snapshot.decode_errors, 0);
    }

    #[test]
    fn test_log_metrics_reads_live_counters() {
        let metrics = Metrics::default();
        metrics.encode_error();
        metrics.schema_registered();
        metrics.log_metrics();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.encode_errors, 1);
        assert_eq!(snapshot.schemas_registered, 1);
    }
}

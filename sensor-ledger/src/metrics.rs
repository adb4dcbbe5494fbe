//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//!
//! # Metrics
//!
//! - `sensor_ledger_sensors_registered_total` - Sensors admitted
//! - `sensor_ledger_sensors_revoked_total` - Revocations applied
//! - `sensor_ledger_readings_accepted_total` - Readings appended
//! - `sensor_ledger_calls_rejected_total{reason}` - Rejected calls by reason
//! - `sensor_ledger_commit_duration_seconds` - Histogram of commit latencies

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};
use std::sync::Arc;

/// Metrics collector
///
/// Each collector owns its registry, so several ledgers (and tests) can live
/// in one process.
#[derive(Clone)]
pub struct Metrics {
    /// Sensors admitted
    pub sensors_registered: IntCounter,

    /// Revocations applied
    pub sensors_revoked: IntCounter,

    /// Readings appended
    pub readings_accepted: IntCounter,

    /// Rejected mutating calls, by reason
    pub rejections: IntCounterVec,

    /// Commit duration histogram
    pub commit_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let sensors_registered = IntCounter::new(
            "sensor_ledger_sensors_registered_total",
            "Total number of sensors registered",
        )?;
        registry.register(Box::new(sensors_registered.clone()))?;

        let sensors_revoked = IntCounter::new(
            "sensor_ledger_sensors_revoked_total",
            "Total number of sensor revocations",
        )?;
        registry.register(Box::new(sensors_revoked.clone()))?;

        let readings_accepted = IntCounter::new(
            "sensor_ledger_readings_accepted_total",
            "Total number of readings appended",
        )?;
        registry.register(Box::new(readings_accepted.clone()))?;

        let rejections = IntCounterVec::new(
            Opts::new(
                "sensor_ledger_calls_rejected_total",
                "Total number of rejected mutating calls",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(rejections.clone()))?;

        let commit_duration = Histogram::with_opts(
            HistogramOpts::new(
                "sensor_ledger_commit_duration_seconds",
                "Histogram of commit latencies",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.010, 0.050, 0.100, 0.500]),
        )?;
        registry.register(Box::new(commit_duration.clone()))?;

        Ok(Self {
            sensors_registered,
            sensors_revoked,
            readings_accepted,
            rejections,
            commit_duration,
            registry,
        })
    }

    /// Record an applied notification
    pub fn record_event(&self, event: &crate::types::LedgerEvent) {
        use crate::types::LedgerEvent;

        match event {
            LedgerEvent::SensorRegistered { .. } => self.sensors_registered.inc(),
            LedgerEvent::SensorRevoked { .. } => self.sensors_revoked.inc(),
            LedgerEvent::ReadingSubmitted { .. } => self.readings_accepted.inc(),
        }
    }

    /// Record a rejected call
    pub fn record_rejection(&self, reason: &str) {
        self.rejections.with_label_values(&[reason]).inc();
    }

    /// Record commit duration
    pub fn record_commit_duration(&self, duration_seconds: f64) {
        self.commit_duration.observe(duration_seconds);
    }

    /// Rejections recorded for `reason`
    pub fn rejection_count(&self, reason: &str) -> u64 {
        self.rejections.with_label_values(&[reason]).get()
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

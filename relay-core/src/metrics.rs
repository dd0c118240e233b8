//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `relay_events_total` - Events processed, labeled by kind
//! - `relay_verdicts_total` - Matching verdicts issued, labeled by status
//! - `relay_broadcast_failures_total` - Settlement dispatches that failed
//! - `relay_batches_total` - Event batches processed

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Events processed, by kind
    pub events_total: IntCounterVec,

    /// Verdicts issued, by status
    pub verdicts_total: IntCounterVec,

    /// Failed settlement broadcasts
    pub broadcast_failures: IntCounter,

    /// Batches processed
    pub batches_total: IntCounter,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let events_total = IntCounterVec::new(
            Opts::new("relay_events_total", "Events processed by kind"),
            &["kind"],
        )?;
        registry.register(Box::new(events_total.clone()))?;

        let verdicts_total = IntCounterVec::new(
            Opts::new("relay_verdicts_total", "Matching verdicts issued by status"),
            &["status"],
        )?;
        registry.register(Box::new(verdicts_total.clone()))?;

        let broadcast_failures = IntCounter::new(
            "relay_broadcast_failures_total",
            "Settlement dispatches that failed",
        )?;
        registry.register(Box::new(broadcast_failures.clone()))?;

        let batches_total =
            IntCounter::new("relay_batches_total", "Event batches processed")?;
        registry.register(Box::new(batches_total.clone()))?;

        Ok(Self {
            events_total,
            verdicts_total,
            broadcast_failures,
            batches_total,
            registry,
        })
    }

    /// Export metrics in Prometheus text format
    pub fn export(&self) -> prometheus::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_register_and_export() {
        let metrics = Metrics::new().unwrap();
        metrics.events_total.with_label_values(&["send_trade"]).inc();
        metrics.verdicts_total.with_label_values(&["confirmed"]).inc();
        metrics.broadcast_failures.inc();

        let exported = metrics.export().unwrap();
        assert!(exported.contains("relay_events_total"));
        assert!(exported.contains("relay_broadcast_failures_total"));
    }
}

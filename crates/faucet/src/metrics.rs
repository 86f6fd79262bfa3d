//! Prometheus metrics for the faucet.

use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

lazy_static! {
    pub static ref TOPUP_TOTAL: CounterVec = CounterVec::new(
        Opts::new("faucet_topup_total", "Total number of top-up requests by outcome"),
        &["outcome"]  // granted | graylisted | invalid | failed
    ).unwrap();

    pub static ref GRAYLIST_ENTRIES: Gauge = Gauge::new(
        "faucet_graylist_entries",
        "Current number of graylisted addresses"
    ).unwrap();

    pub static ref TRANSFER_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new("faucet_transfer_duration_seconds", "Spend transaction round trip in seconds")
            .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0])
    ).unwrap();
}

/// Metrics collector
#[derive(Clone)]
pub struct MetricsCollector {
    registry: Arc<Registry>,
}

impl MetricsCollector {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        registry.register(Box::new(TOPUP_TOTAL.clone()))?;
        registry.register(Box::new(GRAYLIST_ENTRIES.clone()))?;
        registry.register(Box::new(TRANSFER_DURATION.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
        })
    }

    /// Gather metrics as Prometheus text format
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

//! Controller Metrics
//!
//! Prometheus metrics for namespace operations and engine calls, kept in a
//! private registry so several controllers can coexist in one process.

use crate::error::{Error, Result};
use prometheus::{
    Encoder, HistogramOpts, HistogramTimer, HistogramVec, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

const METRICS_NAMESPACE: &str = "nvme_bridge";

/// Metrics recorded by the namespace controller
#[derive(Clone)]
pub struct ControllerMetrics {
    registry: Registry,
    requests: IntCounterVec,
    engine_calls: HistogramVec,
    namespaces: IntGauge,
}

impl ControllerMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new("requests_total", "Namespace operations by outcome")
                .namespace(METRICS_NAMESPACE),
            &["operation", "outcome"],
        )?;
        let engine_calls = HistogramVec::new(
            HistogramOpts::new(
                "engine_call_duration_seconds",
                "Duration of engine commands",
            )
            .namespace(METRICS_NAMESPACE),
            &["command"],
        )?;
        let namespaces = IntGauge::with_opts(
            Opts::new("namespaces", "Namespaces held in the registry").namespace(METRICS_NAMESPACE),
        )?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(engine_calls.clone()))?;
        registry.register(Box::new(namespaces.clone()))?;

        Ok(Self {
            registry,
            requests,
            engine_calls,
            namespaces,
        })
    }

    /// Count an operation outcome
    pub fn record<T>(&self, operation: &str, result: &Result<T>) {
        let outcome = match result {
            Ok(_) => "ok".to_string(),
            Err(e) => e.kind().to_string(),
        };
        self.requests
            .with_label_values(&[operation, outcome.as_str()])
            .inc();
    }

    /// Start timing an engine command; observed when dropped
    pub fn engine_timer(&self, command: &str) -> HistogramTimer {
        self.engine_calls.with_label_values(&[command]).start_timer()
    }

    pub fn set_namespaces(&self, count: usize) {
        self.namespaces.set(count as i64);
    }

    /// Count of recorded operations with the given labels
    pub fn request_count(&self, operation: &str, outcome: &str) -> u64 {
        self.requests.with_label_values(&[operation, outcome]).get()
    }

    /// Render all metrics in the Prometheus text format
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| Error::Internal(format!("metrics not UTF-8: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_render() {
        let metrics = ControllerMetrics::new().unwrap();

        metrics.record::<()>("create", &Ok(()));
        metrics.record::<()>("create", &Err(Error::namespace_not_found("namespaces/x")));
        metrics.set_namespaces(3);
        drop(metrics.engine_timer("controller_nvme_namespace_attach"));

        assert_eq!(metrics.request_count("create", "ok"), 1);
        assert_eq!(metrics.request_count("create", "not_found"), 1);

        let text = metrics.render().unwrap();
        assert!(text.contains("nvme_bridge_requests_total"));
        assert!(text.contains("nvme_bridge_namespaces 3"));
        assert!(text.contains("nvme_bridge_engine_call_duration_seconds"));
    }
}

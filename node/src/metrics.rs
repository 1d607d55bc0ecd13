//! # Prometheus Metrics
//!
//! Operational metrics for the node, scraped at `/metrics` on the metrics
//! port. Everything lives in a dedicated [`prometheus::Registry`] under the
//! `txgate` namespace.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// All metric handles for the node. Handles are internally reference
/// counted, so clones share the same series.
#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// Transactions committed through `submit_tx`.
    pub submissions_total: IntCounter,
    /// Rejected submissions, labelled by error kind.
    pub submission_failures_total: IntCounterVec,
    /// Successful resolutions, labelled by the tier that answered.
    pub lookups_total: IntCounterVec,
    /// Resolutions that found nothing in any tier.
    pub lookup_misses_total: IntCounter,
    /// Resolutions that failed, labelled by error kind.
    pub lookup_errors_total: IntCounterVec,
    /// Wall time of one resolution, in seconds.
    pub lookup_latency_seconds: Histogram,
    /// Transactions currently in the pending pool.
    pub pending_pool_size: IntGauge,
    /// Height of the current chain tip.
    pub block_height: IntGauge,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("txgate".into()), None)?;

        let submissions_total =
            IntCounter::new("submissions_total", "Transactions signed and committed")?;
        registry.register(Box::new(submissions_total.clone()))?;

        let submission_failures_total = IntCounterVec::new(
            Opts::new("submission_failures_total", "Rejected submissions by error kind"),
            &["kind"],
        )?;
        registry.register(Box::new(submission_failures_total.clone()))?;

        let lookups_total = IntCounterVec::new(
            Opts::new("lookups_total", "Resolved transaction lookups by tier"),
            &["tier"],
        )?;
        registry.register(Box::new(lookups_total.clone()))?;

        let lookup_misses_total = IntCounter::new(
            "lookup_misses_total",
            "Transaction lookups that found nothing",
        )?;
        registry.register(Box::new(lookup_misses_total.clone()))?;

        let lookup_errors_total = IntCounterVec::new(
            Opts::new("lookup_errors_total", "Failed transaction lookups by error kind"),
            &["kind"],
        )?;
        registry.register(Box::new(lookup_errors_total.clone()))?;

        let lookup_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "lookup_latency_seconds",
                "Transaction resolution latency in seconds",
            )
            .buckets(vec![
                0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
            ]),
        )?;
        registry.register(Box::new(lookup_latency_seconds.clone()))?;

        let pending_pool_size =
            IntGauge::new("pending_pool_size", "Transactions in the pending pool")?;
        registry.register(Box::new(pending_pool_size.clone()))?;

        let block_height = IntGauge::new("block_height", "Height of the current chain tip")?;
        registry.register(Box::new(block_height.clone()))?;

        Ok(Self {
            registry,
            submissions_total,
            submission_failures_total,
            lookups_total,
            lookup_misses_total,
            lookup_errors_total,
            lookup_latency_seconds,
            pending_pool_size,
            block_height,
        })
    }

    /// Encodes all registered metrics into the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

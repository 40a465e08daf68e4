use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info};

use axum::{Router, routing::get};
use opentelemetry::metrics::{Counter, Histogram, MeterProvider};
use opentelemetry_sdk::metrics::{MetricError, SdkMeterProvider};
use prometheus::{Encoder, TextEncoder};
use std::net::SocketAddr;

#[derive(Clone)]
pub struct Metrics {
    registry: Arc<prometheus::Registry>,
    _provider: SdkMeterProvider,

    // Capture metrics
    pub pages_visited: Counter<u64>,
    pub events_captured: Counter<u64>,
    pub shard_failures: Counter<u64>,

    // Explorer metrics
    pub explorer_requests: Counter<u64>,
    pub explorer_errors: Counter<u64>,
    pub explorer_latency: Histogram<f64>,
}

impl Metrics {
    pub fn new() -> Result<Self, MetricError> {
        // Create a new prometheus registry
        let registry = prometheus::Registry::new();

        // Configure OpenTelemetry to use this registry
        let exporter = opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()?;

        // Set up a meter to create instruments
        let provider = SdkMeterProvider::builder().with_reader(exporter).build();
        let meter = provider.meter("etherseek_metrics");

        let pages_visited = meter
            .u64_counter("etherseek_pages_visited")
            .with_description("Pages navigated to, labelled by outcome")
            .build();

        let events_captured = meter
            .u64_counter("etherseek_events_captured")
            .with_description("Request and response events recorded by capture sessions")
            .build();

        let shard_failures = meter
            .u64_counter("etherseek_shard_failures")
            .with_description("Capture shards that failed and contributed no results")
            .build();

        let explorer_requests = meter
            .u64_counter("etherseek_explorer_requests")
            .with_description("Number of explorer lookups made")
            .build();

        let explorer_errors = meter
            .u64_counter("etherseek_explorer_errors")
            .with_description("Number of explorer lookups that failed")
            .build();

        let explorer_latency = meter
            .f64_histogram("etherseek_explorer_latency")
            .with_description("Explorer lookup latency")
            .with_boundaries(vec![0.05, 0.1, 0.2, 0.3, 0.5, 1.0, 2.0, 5.0, 10.0])
            .with_unit("s")
            .build();

        Ok(Self {
            registry: Arc::new(registry),
            _provider: provider,
            pages_visited,
            events_captured,
            shard_failures,
            explorer_requests,
            explorer_errors,
            explorer_latency,
        })
    }

    /// Prometheus text exposition of everything recorded so far.
    pub fn render(&self) -> Result<String> {
        encode(&self.registry)
    }

    pub async fn start_metrics_server(&self, addr: &str, port: u16) -> Result<()> {
        let addr = format!("{addr}:{port}")
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid metrics address {addr}:{port}"))?;
        let registry = self.registry.clone();

        let app = Router::new().route("/metrics", get(move || metrics_handler(registry.clone())));

        // Determine the access URL based on the binding address. Only used for logging.
        let access_url = if addr.ip().to_string() == "0.0.0.0" {
            format!("http://localhost:{port}/metrics")
        } else {
            format!("http://{}:{port}/metrics", addr.ip())
        };

        info!(
            "Starting metrics server - binding to {} (accessible at {})",
            addr, access_url
        );

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind metrics server to {addr}"))?;

        // Spawn the server in a separate task
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("Metrics server stopped: {}", e);
            }
        });

        Ok(())
    }
}

fn encode(registry: &prometheus::Registry) -> Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

async fn metrics_handler(registry: Arc<prometheus::Registry>) -> String {
    encode(&registry).unwrap_or_else(|e| {
        error!("Failed to encode metrics: {}", e);
        String::new()
    })
}

use lazy_static::lazy_static;
use prometheus::{
    Counter, Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "readings_http_requests_total",
            "Total HTTP requests handled, by endpoint"
        ),
        &["endpoint"]
    )
    .unwrap();
    pub static ref READINGS_WRITTEN_TOTAL: Counter = Counter::with_opts(Opts::new(
        "readings_written_total",
        "Total readings appended to the store"
    ))
    .unwrap();
    pub static ref REJECTED_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "readings_rejected_requests_total",
            "Total requests answered with an error, by reason"
        ),
        &["reason"]
    )
    .unwrap();
    pub static ref QUERY_LATENCY_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "readings_query_latency_seconds",
            "Time taken to run a filtered query against the store"
        )
        .buckets(vec![
            0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0
        ])
    )
    .unwrap();
}

pub fn init_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(READINGS_WRITTEN_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REJECTED_REQUESTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(QUERY_LATENCY_SECONDS.clone()))?;
    Ok(())
}

pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder globally and pre-register the engine's
/// metrics so they render before the first trade arrives.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    counter!("feed_messages_total").absolute(0);
    counter!("feed_malformed_total").absolute(0);
    counter!("feed_reconnects_total").absolute(0);
    counter!("whale_events_total").absolute(0);
    counter!("catalog_resolve_failures_total").absolute(0);
    counter!("sink_overflows_total").absolute(0);
    counter!("alerts_discarded_total").absolute(0);

    gauge!("resolved_instruments").set(0.0);

    // Histogram is lazily created on first record; force creation.
    histogram!("classify_latency_seconds").record(0.0);

    Ok(handle)
}

use once_cell::sync::Lazy;
use prometheus::{
	register_gauge, register_int_counter, register_int_counter_vec, register_int_gauge, Encoder,
	Gauge, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};

pub static REFRESHES: Lazy<IntCounter> = Lazy::new(|| {
	register_int_counter!("snapshot_refreshes_total", "refresh attempts").expect("metric can be created")
});

pub static FETCH_ERRORS: Lazy<IntCounterVec> = Lazy::new(|| {
	register_int_counter_vec!("fetch_errors_total", "failed ingress fetches", &["kind"])
		.expect("metric can be created")
});

pub static MOCK_FALLBACKS: Lazy<IntCounter> = Lazy::new(|| {
	register_int_counter!("mock_fallbacks_total", "reads answered with placeholder data")
		.expect("metric can be created")
});

pub static NORMALIZE_SKIPS: Lazy<IntCounter> = Lazy::new(|| {
	register_int_counter!("normalize_skips_total", "ingresses skipped as unparseable")
		.expect("metric can be created")
});

pub static INGRESS_COUNT: Lazy<Gauge> = Lazy::new(|| {
	register_gauge!("ingress_count", "ingresses in the current snapshot").expect("metric can be created")
});

pub static SUBSCRIBERS: Lazy<IntGauge> = Lazy::new(|| {
	register_int_gauge!("subscribers", "connected realtime subscribers").expect("metric can be created")
});

pub static DROPPED_DELIVERIES: Lazy<IntCounter> = Lazy::new(|| {
	register_int_counter!(
		"dropped_deliveries_total",
		"updates not delivered to a slow or gone subscriber"
	)
	.expect("metric can be created")
});

/// Text exposition of everything in the default registry.
pub fn render() -> String {
	let mut buffer = Vec::new();
	if let Err(e) = TextEncoder::new().encode(&prometheus::gather(), &mut buffer) {
		tracing::error!("could not encode metrics: {e}");
	}
	String::from_utf8_lossy(&buffer).into_owned()
}

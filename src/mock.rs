use chrono::{SecondsFormat, Utc};
use once_cell::sync::Lazy;

use crate::record::{DisplayRecord, Status};

// Fixed at first use so the placeholder set is identical for the life of the process.
static GENERATED_AT: Lazy<String> =
	Lazy::new(|| Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));

/// Placeholder records served whenever live data is unavailable or empty.
pub fn records() -> Vec<DisplayRecord> {
	vec![
		DisplayRecord {
			name: "example-ingress".into(),
			namespace: "default".into(),
			hostname: "example.local".into(),
			ingress_class: "nginx".into(),
			status: Status::Active,
			creation_timestamp: GENERATED_AT.clone(),
		},
		DisplayRecord {
			name: "dashboard-ingress".into(),
			namespace: "kube-system".into(),
			hostname: "dashboard.local".into(),
			ingress_class: "nginx".into(),
			status: Status::Pending,
			creation_timestamp: GENERATED_AT.clone(),
		},
	]
}

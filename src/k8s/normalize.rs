use chrono::SecondsFormat;
use k8s_openapi::api::networking::v1::Ingress;

use crate::errors::NormalizeError;
use crate::record::{DisplayRecord, Status, DEFAULT_CLASS, NOT_AVAILABLE};

const LEGACY_CLASS_ANNOTATION: &str = "kubernetes.io/ingress.class";

/// Flattens one ingress into a display record. Missing optional data becomes a sentinel; only an
/// ingress without a name is rejected.
pub fn ingress_to_record(ingress: &Ingress) -> Result<DisplayRecord, NormalizeError> {
	let metadata = &ingress.metadata;
	let Some(name) = metadata.name.clone() else {
		return Err(NormalizeError::MissingName {
			namespace: metadata.namespace.clone(),
		});
	};
	let namespace = metadata
		.namespace
		.clone()
		.unwrap_or_else(|| "default".to_string());

	let hostname = ingress
		.spec
		.as_ref()
		.and_then(|spec| spec.rules.as_ref()?.first()?.host.clone())
		.filter(|host| !host.is_empty())
		.unwrap_or_else(|| NOT_AVAILABLE.to_string());

	let creation_timestamp = metadata
		.creation_timestamp
		.as_ref()
		.map_or_else(
			|| NOT_AVAILABLE.to_string(),
			|t| t.0.to_rfc3339_opts(SecondsFormat::Secs, true),
		);

	Ok(DisplayRecord {
		name,
		namespace,
		hostname,
		ingress_class: ingress_class(ingress),
		status: status(ingress),
		creation_timestamp,
	})
}

fn ingress_class(ingress: &Ingress) -> String {
	let spec = ingress.spec.as_ref();
	let non_empty = |class: &&String| !class.is_empty();
	spec.and_then(|s| s.ingress_class_name.as_ref())
		.filter(non_empty)
		.or_else(|| {
			ingress
				.metadata
				.annotations
				.as_ref()?
				.get(LEGACY_CLASS_ANNOTATION)
				.filter(non_empty)
		})
		.or_else(|| {
			Some(&spec?.default_backend.as_ref()?.resource.as_ref()?.kind).filter(non_empty)
		})
		.map_or_else(|| DEFAULT_CLASS.to_string(), String::clone)
}

fn status(ingress: &Ingress) -> Status {
	let has_endpoint = ingress
		.status
		.as_ref()
		.and_then(|s| s.load_balancer.as_ref())
		.and_then(|lb| lb.ingress.as_ref())
		.is_some_and(|endpoints| !endpoints.is_empty());
	if has_endpoint {
		Status::Active
	} else {
		Status::Pending
	}
}

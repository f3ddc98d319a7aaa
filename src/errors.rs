use std::time::Duration;

use strum::IntoStaticStr;
use thiserror::Error;

/// Anything that stops us getting ingress data out of the cluster.
#[derive(Debug, Error, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum FetchError {
	#[error("orchestrator unavailable: no usable cluster credentials")]
	ConfigUnavailable,
	#[error("orchestrator did not answer within {0:?}")]
	Timeout(Duration),
	#[error("not authorized: {0}")]
	Auth(String),
	#[error("not found: {0}")]
	NotFound(String),
	#[error("transport error: {0}")]
	Transport(String),
	#[error("orchestrator listed no ingress resources")]
	Empty,
}

impl FetchError {
	/// Short label used for metrics.
	pub fn kind(&self) -> &'static str {
		self.into()
	}
}

impl From<kube::Error> for FetchError {
	fn from(error: kube::Error) -> FetchError {
		match error {
			kube::Error::Api(response) => match response.code {
				401 | 403 => Self::Auth(response.message),
				404 => Self::NotFound(response.message),
				_ => Self::Transport(response.message),
			},
			other => Self::Transport(other.to_string()),
		}
	}
}

/// An ingress object we cannot turn into a display record at all.
#[derive(Debug, Error)]
pub enum NormalizeError {
	#[error("ingress in namespace {namespace:?} has no name")]
	MissingName { namespace: Option<String> },
}

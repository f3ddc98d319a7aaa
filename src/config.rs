use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use tracing::level_filters::LevelFilter;

use crate::k8s::cache::CacheSettings;
use crate::trace::LogFormat;

#[derive(Clone, Debug, Parser)]
#[command(version, about = "Live dashboard of the cluster's ingress resources")]
pub struct Config {
	/// Address the HTTP and websocket server listens on
	#[arg(long, env = "BIND_ADDRESS", default_value = "0.0.0.0:5000")]
	pub bind: SocketAddr,

	/// Seconds between scheduled refreshes, and the age after which a read refreshes
	#[arg(long, env = "REFRESH_INTERVAL_SECS", default_value_t = 30)]
	pub refresh_interval_secs: u64,

	/// Upper bound on a single call to the cluster API
	#[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = 10)]
	pub fetch_timeout_secs: u64,

	/// Kubeconfig path(s), colon separated, tried after in-cluster credentials
	#[arg(long, env = "KUBECONFIG")]
	pub kubeconfig: Option<String>,

	#[arg(long, env = "LOG_LEVEL", default_value = "info")]
	pub log_level: LevelFilter,

	#[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Auto)]
	pub log_format: LogFormat,
}

impl Config {
	pub fn refresh_interval(&self) -> Duration {
		Duration::from_secs(self.refresh_interval_secs.max(1))
	}

	pub fn cache_settings(&self) -> CacheSettings {
		CacheSettings {
			refresh_interval: self.refresh_interval(),
			fetch_timeout: Duration::from_secs(self.fetch_timeout_secs.max(1)),
		}
	}
}

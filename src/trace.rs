use std::io::IsTerminal;

use clap::ValueEnum;
use tracing::{level_filters::LevelFilter, Level, Subscriber};
use tracing_subscriber::{filter, fmt, layer::SubscriberExt, Layer};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
	/// Pretty on a terminal, JSON otherwise
	#[default]
	Auto,
	Pretty,
	Json,
}

impl LogFormat {
	fn json(self) -> bool {
		match self {
			Self::Auto => !std::io::stdout().is_terminal(),
			Self::Pretty => false,
			Self::Json => true,
		}
	}
}

pub fn configure_logging(log_level: LevelFilter, format: LogFormat) -> impl Subscriber {
	let (plain_log_format, json_log_format) = if format.json() {
		(
			None,
			Some(
				fmt::layer()
					.json()
					.flatten_event(true)
					.with_filter(log_level),
			),
		)
	} else {
		(Some(fmt::layer().pretty().with_filter(log_level)), None)
	};

	tracing_subscriber::registry()
		.with(plain_log_format)
		.with(json_log_format)
		.with(
			filter::Targets::new()
				.with_default(log_level)
				.with_target("axum::rejection", Level::TRACE)
				.with_target("hyper", Level::ERROR)
				.with_target("hyper_util", Level::ERROR)
				.with_target("kube_client", Level::WARN)
				.with_target("tower", Level::ERROR),
		)
}

use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod broadcast;
mod config;
mod errors;
mod filter;
mod k8s;
mod metrics;
mod mock;
mod record;
mod scheduler;
mod server;
mod trace;

use k8s::cache::SnapshotCache;
use k8s::{IngressSource, KubeIngressSource, UnavailableSource};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let conf = config::Config::parse();
	tracing::subscriber::set_global_default(trace::configure_logging(
		conf.log_level,
		conf.log_format,
	))?;
	info!("starting with {:?}", conf);

	let source: Arc<dyn IngressSource> = match k8s::connect(conf.kubeconfig.as_deref()).await {
		Some(client) => Arc::new(KubeIngressSource::new(client)),
		None => {
			warn!("cluster unavailable, listings will show placeholder data");
			Arc::new(UnavailableSource)
		},
	};

	let cache = Arc::new(SnapshotCache::new(source, conf.cache_settings()));
	let broadcaster = Arc::new(broadcast::Broadcaster::new(cache.clone()));
	let shutdown = CancellationToken::new();

	let scheduler = tokio::spawn(scheduler::run(
		cache.clone(),
		broadcaster.clone(),
		cache.settings().refresh_interval,
		shutdown.clone(),
	));

	let app = server::router(server::AppState {
		cache,
		broadcaster,
		shutdown: shutdown.clone(),
	});
	let listener = TcpListener::bind(conf.bind).await?;
	info!("listening on {}", conf.bind);

	axum::serve(listener, app)
		.with_graceful_shutdown(server::shutdown_signal(shutdown.clone()))
		.await?;

	shutdown.cancel();
	scheduler.await?;
	info!("stopped");
	Ok(())
}

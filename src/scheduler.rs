use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::broadcast::{Broadcaster, Destination};
use crate::filter::FilterSpec;
use crate::k8s::cache::SnapshotCache;

/// Forces a refresh every `period` and pushes the result to every subscriber, until `shutdown`
/// is cancelled. A cycle that panics is logged and the next one still fires on schedule.
pub async fn run(
	cache: Arc<SnapshotCache>,
	broadcaster: Arc<Broadcaster>,
	period: Duration,
	shutdown: CancellationToken,
) {
	let mut ticker = interval_at(Instant::now() + period, period);
	ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
	info!("refresh scheduler started, period {period:?}");

	loop {
		tokio::select! {
			() = shutdown.cancelled() => break,
			_ = ticker.tick() => {},
		}

		let cycle = tokio::spawn(refresh_and_broadcast(cache.clone(), broadcaster.clone()));
		match cycle.await {
			Ok(delivered) => info!("scheduled refresh pushed to {delivered} subscribers"),
			Err(e) => error!("scheduled refresh failed: {e}"),
		}
	}

	info!("refresh scheduler stopped");
}

pub(crate) async fn refresh_and_broadcast(cache: Arc<SnapshotCache>, broadcaster: Arc<Broadcaster>) -> usize {
	let view = cache.get(&FilterSpec::default(), true).await;
	broadcaster.deliver(&view, Destination::All)
}

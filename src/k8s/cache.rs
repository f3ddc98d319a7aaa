use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

use super::normalize::ingress_to_record;
use super::{render_yaml, IngressSource};
use crate::errors::FetchError;
use crate::filter::{self, FilterSpec};
use crate::metrics::{FETCH_ERRORS, INGRESS_COUNT, MOCK_FALLBACKS, NORMALIZE_SKIPS, REFRESHES};
use crate::mock;
use crate::record::{DisplayRecord, Source};

#[derive(Clone, Copy, Debug)]
pub struct CacheSettings {
	pub refresh_interval: Duration,
	pub fetch_timeout: Duration,
}

impl Default for CacheSettings {
	fn default() -> Self {
		Self {
			refresh_interval: Duration::from_secs(30),
			fetch_timeout: Duration::from_secs(10),
		}
	}
}

/// One generation of cluster state. Never modified after construction.
#[derive(Debug)]
pub struct Snapshot {
	records: Arc<Vec<DisplayRecord>>,
	fetched_at: DateTime<Utc>,
	source: Source,
	// Last refresh attempt, successful or not. Drives staleness.
	checked_at: Instant,
}

impl Snapshot {
	fn live(records: Vec<DisplayRecord>) -> Self {
		Self {
			records: Arc::new(records),
			fetched_at: Utc::now(),
			source: Source::Live,
			checked_at: Instant::now(),
		}
	}

	fn mock() -> Self {
		Self {
			records: Arc::new(mock::records()),
			fetched_at: Utc::now(),
			source: Source::Mock,
			checked_at: Instant::now(),
		}
	}

	/// Same data, new attempt time: a failed refresh must not trigger another one per reader.
	fn rechecked(&self) -> Self {
		Self {
			records: Arc::clone(&self.records),
			fetched_at: self.fetched_at,
			source: self.source,
			checked_at: Instant::now(),
		}
	}

	fn is_stale(&self, refresh_interval: Duration) -> bool {
		self.checked_at.elapsed() > refresh_interval
	}
}

/// What a read hands back: an immutable record sequence and where it came from.
#[derive(Clone, Debug)]
pub struct View {
	pub records: Arc<Vec<DisplayRecord>>,
	pub source: Source,
	pub fetched_at: DateTime<Utc>,
}

impl View {
	pub fn fetched_at_rfc3339(&self) -> String {
		self.fetched_at.to_rfc3339_opts(SecondsFormat::Secs, true)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
	Ready,
	NotReady(String),
}

#[derive(Debug, Default)]
struct Health {
	last_success: Option<DateTime<Utc>>,
	last_error: Option<String>,
}

/// The single shared view of cluster ingresses.
///
/// The snapshot lock is held across the whole upstream fetch, so at most one list call is ever in
/// flight. Readers arriving during a refresh wait for it (bounded by the fetch timeout) and then get
/// the new generation. Filtering happens after the lock is released, on a shared immutable copy.
pub struct SnapshotCache {
	source: Arc<dyn IngressSource>,
	settings: CacheSettings,
	snapshot: Mutex<Option<Arc<Snapshot>>>,
	health: StdMutex<Health>,
}

impl SnapshotCache {
	pub fn new(source: Arc<dyn IngressSource>, settings: CacheSettings) -> Self {
		Self {
			source,
			settings,
			snapshot: Mutex::new(None),
			health: StdMutex::new(Health::default()),
		}
	}

	pub fn settings(&self) -> CacheSettings {
		self.settings
	}

	/// Current records, refreshed first if forced or stale, then filtered. Never empty: an empty
	/// result is replaced by the placeholder set, tagged [`Source::Mock`].
	pub async fn get(&self, filters: &FilterSpec, force_refresh: bool) -> View {
		let snapshot = {
			let mut current = self.snapshot.lock().await;
			let fresh = current
				.as_ref()
				.filter(|s| !force_refresh && !s.is_stale(self.settings.refresh_interval))
				.cloned();
			match fresh {
				Some(snapshot) => snapshot,
				None => {
					let next = self.refresh(current.clone()).await;
					*current = Some(Arc::clone(&next));
					next
				},
			}
		};

		let records = if filters.is_empty() {
			Arc::clone(&snapshot.records)
		} else {
			Arc::new(filter::apply(&snapshot.records, filters))
		};

		if records.is_empty() {
			MOCK_FALLBACKS.inc();
			return View {
				records: Arc::new(mock::records()),
				source: Source::Mock,
				fetched_at: snapshot.fetched_at,
			};
		}

		View {
			records,
			source: snapshot.source,
			fetched_at: snapshot.fetched_at,
		}
	}

	async fn refresh(&self, previous: Option<Arc<Snapshot>>) -> Arc<Snapshot> {
		REFRESHES.inc();
		let has_live = previous
			.as_ref()
			.is_some_and(|previous| previous.source == Source::Live);
		match self.fetch(has_live).await {
			Ok(records) => {
				info!("refreshed snapshot with {} ingresses", records.len());
				INGRESS_COUNT.set(records.len() as f64);
				self.record_success();
				Arc::new(Snapshot::live(records))
			},
			Err(e) => {
				FETCH_ERRORS.with_label_values(&[e.kind()]).inc();
				self.record_failure(&e);
				match previous {
					Some(previous) => {
						warn!("refresh failed, keeping previous snapshot: {e}");
						Arc::new(previous.rechecked())
					},
					None => {
						warn!("refresh failed with no previous snapshot, serving placeholder data: {e}");
						Arc::new(Snapshot::mock())
					},
				}
			},
		}
	}

	/// An empty listing only counts as a result once a live snapshot exists.
	async fn fetch(&self, has_live: bool) -> Result<Vec<DisplayRecord>, FetchError> {
		let timeout = self.settings.fetch_timeout;
		let items = tokio::time::timeout(timeout, self.source.list_all())
			.await
			.map_err(|_| FetchError::Timeout(timeout))??;
		if items.is_empty() && !has_live {
			return Err(FetchError::Empty);
		}

		let records = items
			.iter()
			.filter_map(|ingress| match ingress_to_record(ingress) {
				Ok(record) => Some(record),
				Err(e) => {
					NORMALIZE_SKIPS.inc();
					warn!("skipping ingress: {e}");
					None
				},
			})
			.collect();
		Ok(records)
	}

	fn record_success(&self) {
		if let Ok(mut health) = self.health.lock() {
			health.last_success = Some(Utc::now());
			health.last_error = None;
		}
	}

	fn record_failure(&self, error: &FetchError) {
		if let Ok(mut health) = self.health.lock() {
			health.last_error = Some(error.to_string());
		}
	}

	/// Ready once a refresh has succeeded and the latest attempt did too. Never waits on a fetch.
	pub fn readiness(&self) -> Readiness {
		let Ok(health) = self.health.lock() else {
			return Readiness::NotReady("health state unavailable".into());
		};
		match (&health.last_success, &health.last_error) {
			(_, Some(error)) => Readiness::NotReady(error.clone()),
			(None, None) => Readiness::NotReady("no successful refresh yet".into()),
			(Some(_), None) => Readiness::Ready,
		}
	}

	/// One ingress rendered as YAML, read straight from the orchestrator.
	pub async fn read_yaml(&self, namespace: &str, name: &str) -> Result<String, YamlError> {
		let timeout = self.settings.fetch_timeout;
		let ingress = tokio::time::timeout(timeout, self.source.read(namespace, name))
			.await
			.map_err(|_| FetchError::Timeout(timeout))??;
		Ok(render_yaml(ingress)?)
	}
}

#[derive(Debug, thiserror::Error)]
pub enum YamlError {
	#[error(transparent)]
	Fetch(#[from] FetchError),
	#[error("could not render yaml: {0}")]
	Render(#[from] serde_yaml::Error),
}

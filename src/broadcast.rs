use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, warn};

use crate::filter::FilterSpec;
use crate::k8s::cache::{SnapshotCache, View};
use crate::metrics::{DROPPED_DELIVERIES, SUBSCRIBERS};
use crate::record::{DisplayRecord, Source};

/// Updates queued per subscriber before further ones are dropped for it.
const SUBSCRIBER_QUEUE: usize = 16;

pub type SubscriberId = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Destination {
	All,
	One(SubscriberId),
}

/// Messages pushed to realtime subscribers.
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerEvent<'a> {
	IngressesUpdate {
		source: Source,
		fetched_at: String,
		data: &'a [DisplayRecord],
	},
}

/// Messages subscribers send us.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientEvent {
	GetIngresses {
		#[serde(default)]
		filters: FilterSpec,
	},
}

/// Fans snapshot views out to connected subscribers. Delivery never waits on a subscriber: each
/// one has a small queue, a full queue loses that update, a closed one is unregistered.
pub struct Broadcaster {
	cache: Arc<SnapshotCache>,
	subscribers: Mutex<HashMap<SubscriberId, mpsc::Sender<Arc<str>>>>,
	next_id: AtomicU64,
}

impl Broadcaster {
	pub fn new(cache: Arc<SnapshotCache>) -> Self {
		Self {
			cache,
			subscribers: Mutex::new(HashMap::new()),
			next_id: AtomicU64::new(1),
		}
	}

	pub fn subscribe(&self) -> (SubscriberId, mpsc::Receiver<Arc<str>>) {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE);
		if let Ok(mut subscribers) = self.subscribers.lock() {
			subscribers.insert(id, tx);
			SUBSCRIBERS.set(subscribers.len() as i64);
		}
		debug!("subscriber {id} registered");
		(id, rx)
	}

	pub fn unsubscribe(&self, id: SubscriberId) {
		if let Ok(mut subscribers) = self.subscribers.lock() {
			subscribers.remove(&id);
			SUBSCRIBERS.set(subscribers.len() as i64);
		}
		debug!("subscriber {id} unregistered");
	}

	pub fn subscriber_count(&self) -> usize {
		self.subscribers.lock().map_or(0, |s| s.len())
	}

	/// Reads the cache with `filters` and delivers the result to `destination`.
	pub async fn push(&self, filters: &FilterSpec, destination: Destination) -> usize {
		let view = self.cache.get(filters, false).await;
		self.deliver(&view, destination)
	}

	/// Sends an already computed view. Returns how many subscribers accepted it.
	pub fn deliver(&self, view: &View, destination: Destination) -> usize {
		let event = ServerEvent::IngressesUpdate {
			source: view.source,
			fetched_at: view.fetched_at_rfc3339(),
			data: &view.records,
		};
		let payload: Arc<str> = match serde_json::to_string(&event) {
			Ok(json) => json.into(),
			Err(e) => {
				error!("could not serialize update: {e}");
				return 0;
			},
		};

		let Ok(mut subscribers) = self.subscribers.lock() else {
			return 0;
		};
		let mut delivered = 0;
		let mut closed = Vec::new();
		for (id, tx) in subscribers.iter() {
			if destination != Destination::All && destination != Destination::One(*id) {
				continue;
			}
			match tx.try_send(Arc::clone(&payload)) {
				Ok(()) => delivered += 1,
				Err(TrySendError::Full(_)) => {
					DROPPED_DELIVERIES.inc();
					warn!("subscriber {id} is not keeping up, dropping update");
				},
				Err(TrySendError::Closed(_)) => {
					DROPPED_DELIVERIES.inc();
					closed.push(*id);
				},
			}
		}
		for id in closed {
			subscribers.remove(&id);
			debug!("subscriber {id} went away");
		}
		SUBSCRIBERS.set(subscribers.len() as i64);
		delivered
	}
}

use axum::{
	extract::{
		ws::{Message, WebSocket, WebSocketUpgrade},
		State,
	},
	response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use super::AppState;
use crate::broadcast::{ClientEvent, Destination};
use crate::filter::FilterSpec;

pub(super) async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
	ws.on_upgrade(|socket| session(socket, state))
}

/// One subscriber: gets the unfiltered snapshot on connect, a filtered one whenever it asks,
/// and every scheduled push in between.
async fn session(socket: WebSocket, state: AppState) {
	let (id, mut updates) = state.broadcaster.subscribe();
	info!(
		"subscriber {id} connected, {} connected in total",
		state.broadcaster.subscriber_count()
	);
	let (mut sender, mut receiver) = socket.split();

	state
		.broadcaster
		.push(&FilterSpec::default(), Destination::One(id))
		.await;

	loop {
		tokio::select! {
			() = state.shutdown.cancelled() => {
				let _ = sender.send(Message::Close(None)).await;
				break;
			},
			update = updates.recv() => {
				let Some(payload) = update else { break };
				if sender.send(Message::Text(payload.as_ref().into())).await.is_err() {
					break;
				}
			},
			incoming = receiver.next() => match incoming {
				Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientEvent>(text.as_str()) {
					Ok(ClientEvent::GetIngresses { filters }) => {
						debug!("subscriber {id} asked for ingresses with {filters:?}");
						state.broadcaster.push(&filters, Destination::One(id)).await;
					},
					Err(e) => warn!("subscriber {id} sent an unknown event: {e}"),
				},
				Some(Ok(Message::Close(_))) | None => break,
				Some(Ok(_)) => {},
				Some(Err(e)) => {
					debug!("subscriber {id} connection error: {e}");
					break;
				},
			},
		}
	}

	state.broadcaster.unsubscribe(id);
	info!("subscriber {id} disconnected");
}

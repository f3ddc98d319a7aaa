use std::collections::HashMap;
use std::sync::Arc;

use axum::{
	extract::{Path, Query, State},
	http::{header, HeaderValue, StatusCode},
	response::{Html, IntoResponse, Response},
	routing::get,
	Json, Router,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::broadcast::Broadcaster;
use crate::errors::FetchError;
use crate::filter::FilterSpec;
use crate::k8s::cache::{Readiness, SnapshotCache, View, YamlError};
use crate::metrics;
mod realtime;
mod render;

/// Response header telling clients whether a listing is real cluster data or placeholders.
pub const DATA_SOURCE_HEADER: &str = "x-data-source";

#[derive(Clone)]
pub struct AppState {
	pub cache: Arc<SnapshotCache>,
	pub broadcaster: Arc<Broadcaster>,
	pub shutdown: CancellationToken,
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/", get(index))
		.route("/health", get(health))
		.route("/ready", get(ready))
		.route("/metrics", get(prometheus))
		.route("/api/ingresses", get(list_ingresses))
		.route("/ingress/yaml/{namespace}/{name}", get(ingress_yaml))
		.route("/ws", get(realtime::upgrade))
		.with_state(state)
}

async fn index(
	State(state): State<AppState>,
	Query(params): Query<HashMap<String, String>>,
) -> Response {
	let view = state.cache.get(&FilterSpec::from_query(&params), false).await;
	with_source(Html(render::page(&view)), &view)
}

async fn health() -> impl IntoResponse {
	(StatusCode::OK, "OK")
}

async fn ready(State(state): State<AppState>) -> impl IntoResponse {
	match state.cache.readiness() {
		Readiness::Ready => (StatusCode::OK, Json(json!({ "status": "ready" }))),
		Readiness::NotReady(reason) => (
			StatusCode::SERVICE_UNAVAILABLE,
			Json(json!({ "status": "not-ready", "reason": reason })),
		),
	}
}

async fn prometheus() -> impl IntoResponse {
	(
		[(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
		metrics::render(),
	)
}

async fn list_ingresses(
	State(state): State<AppState>,
	Query(params): Query<HashMap<String, String>>,
) -> Response {
	let view = state.cache.get(&FilterSpec::from_query(&params), false).await;
	with_source(Json(view.records.as_slice()), &view)
}

async fn ingress_yaml(
	State(state): State<AppState>,
	Path((namespace, name)): Path<(String, String)>,
) -> Response {
	match state.cache.read_yaml(&namespace, &name).await {
		Ok(yaml) => Json(json!({ "yaml": yaml })).into_response(),
		Err(e) => {
			let status = match &e {
				YamlError::Fetch(FetchError::NotFound(_)) => StatusCode::NOT_FOUND,
				_ => StatusCode::INTERNAL_SERVER_ERROR,
			};
			error!("could not render {namespace}/{name} as yaml: {e}");
			(status, Json(json!({ "error": e.to_string() }))).into_response()
		},
	}
}

fn with_source(body: impl IntoResponse, view: &View) -> Response {
	let mut response = body.into_response();
	response.headers_mut().insert(
		DATA_SOURCE_HEADER,
		HeaderValue::from_static(view.source.as_str()),
	);
	response
}

/// Resolves once ctrl-c or SIGTERM arrives, cancelling `shutdown` for everything watching it.
pub async fn shutdown_signal(shutdown: CancellationToken) {
	let ctrl_c = async {
		if let Err(e) = tokio::signal::ctrl_c().await {
			error!("could not listen for ctrl-c: {e}");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut signal) => {
				signal.recv().await;
			},
			Err(e) => {
				error!("could not listen for SIGTERM: {e}");
				std::future::pending::<()>().await;
			},
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		() = ctrl_c => {},
		() = terminate => {},
		() = shutdown.cancelled() => {},
	}
	info!("shutting down");
	shutdown.cancel();
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::k8s::cache::CacheSettings;
	use crate::k8s::testing::{ingress, named, StubSource};
	use crate::k8s::IngressSource;
	use crate::k8s::UnavailableSource;
	use assert_json_diff::assert_json_eq;
	use axum::body::{to_bytes, Body};
	use axum::http::Request;
	use serde_json::Value;
	use tower::ServiceExt;

	fn app(source: impl IngressSource + 'static) -> Router {
		let cache = Arc::new(SnapshotCache::new(Arc::new(source), CacheSettings::default()));
		router(AppState {
			broadcaster: Arc::new(Broadcaster::new(cache.clone())),
			cache,
			shutdown: CancellationToken::new(),
		})
	}

	fn cluster() -> StubSource {
		StubSource::fixed(vec![
			ingress(json!({
				"metadata": {
					"name": "web",
					"namespace": "prod",
					"creationTimestamp": "2024-03-01T12:30:00Z"
				},
				"spec": { "ingressClassName": "nginx", "rules": [{ "host": "a.com" }] },
				"status": { "loadBalancer": { "ingress": [{ "ip": "1.2.3.4" }] } }
			})),
			named("default", "api", "api.a.com"),
		])
	}

	async fn call(app: Router, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
		let response = app
			.oneshot(Request::get(uri).body(Body::empty()).unwrap())
			.await
			.unwrap();
		let status = response.status();
		let source = response
			.headers()
			.get(DATA_SOURCE_HEADER)
			.map(|v| v.to_str().unwrap().to_string());
		let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
		(status, source, body.to_vec())
	}

	fn json_body(body: &[u8]) -> Value {
		serde_json::from_slice(body).unwrap()
	}

	#[tokio::test]
	async fn health_is_ok_without_cluster() {
		let (status, _, body) = call(app(UnavailableSource), "/health").await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body, b"OK");
	}

	#[tokio::test]
	async fn api_lists_normalized_ingresses() {
		let (status, source, body) = call(app(cluster()), "/api/ingresses").await;

		assert_eq!(status, StatusCode::OK);
		assert_eq!(source.as_deref(), Some("live"));
		assert_json_eq!(
			json_body(&body),
			json!([
				{
					"name": "web",
					"namespace": "prod",
					"hostname": "a.com",
					"ingress_class": "nginx",
					"status": "Active",
					"creation_timestamp": "2024-03-01T12:30:00Z"
				},
				{
					"name": "api",
					"namespace": "default",
					"hostname": "api.a.com",
					"ingress_class": "Default",
					"status": "Pending",
					"creation_timestamp": "N/A"
				}
			])
		);
	}

	#[tokio::test]
	async fn api_applies_query_filters() {
		let (_, _, body) = call(
			app(cluster()),
			"/api/ingresses?namespace=&ingress_class_name=NGINX&status=active",
		)
		.await;

		let body = json_body(&body);
		assert_eq!(body.as_array().unwrap().len(), 1);
		assert_eq!(body[0]["name"], "web");
	}

	#[tokio::test]
	async fn api_serves_mock_when_cluster_unavailable() {
		let (status, source, body) = call(app(UnavailableSource), "/api/ingresses").await;

		assert_eq!(status, StatusCode::OK);
		assert_eq!(source.as_deref(), Some("mock"));
		let body = json_body(&body);
		assert_eq!(body[0]["namespace"], "default");
		assert_eq!(body[1]["namespace"], "kube-system");
	}

	#[tokio::test]
	async fn ready_reflects_refresh_state() {
		let app = app(cluster());

		let (status, _, body) = call(app.clone(), "/ready").await;
		assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
		assert_eq!(json_body(&body)["status"], "not-ready");

		call(app.clone(), "/api/ingresses").await;

		let (status, _, body) = call(app, "/ready").await;
		assert_eq!(status, StatusCode::OK);
		assert_json_eq!(json_body(&body), json!({ "status": "ready" }));
	}

	#[tokio::test]
	async fn ready_reports_unavailable_cluster() {
		let app = app(UnavailableSource);
		call(app.clone(), "/api/ingresses").await;

		let (status, _, body) = call(app, "/ready").await;

		assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
		assert_json_eq!(
			json_body(&body),
			json!({
				"status": "not-ready",
				"reason": FetchError::ConfigUnavailable.to_string()
			})
		);
	}

	#[tokio::test]
	async fn yaml_endpoint_renders_single_ingress() {
		let (status, _, body) = call(app(cluster()), "/ingress/yaml/prod/web").await;

		assert_eq!(status, StatusCode::OK);
		let yaml = json_body(&body)["yaml"].as_str().unwrap().to_string();
		assert!(yaml.contains("name: web"));
		assert!(yaml.contains("host: a.com"));
	}

	#[tokio::test]
	async fn yaml_endpoint_reports_missing_ingress() {
		let (status, _, body) = call(app(cluster()), "/ingress/yaml/prod/nope").await;
		assert_eq!(status, StatusCode::NOT_FOUND);
		assert!(json_body(&body)["error"].is_string());

		let (status, _, _) = call(app(UnavailableSource), "/ingress/yaml/prod/web").await;
		assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
	}

	#[tokio::test]
	async fn index_renders_table() {
		let (status, source, body) = call(app(cluster()), "/?namespace=prod").await;

		assert_eq!(status, StatusCode::OK);
		assert_eq!(source.as_deref(), Some("live"));
		let page = String::from_utf8(body).unwrap();
		assert!(page.contains("<td>web</td>"));
		assert!(page.contains("<td>a.com</td>"));
		assert!(!page.contains("<td>api</td>"));
	}

	struct LiveServer {
		addr: std::net::SocketAddr,
		cache: Arc<SnapshotCache>,
		broadcaster: Arc<Broadcaster>,
		shutdown: CancellationToken,
		handle: tokio::task::JoinHandle<std::io::Result<()>>,
	}

	async fn serve(source: impl IngressSource + 'static) -> LiveServer {
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		let shutdown = CancellationToken::new();
		let cache = Arc::new(SnapshotCache::new(Arc::new(source), CacheSettings::default()));
		let broadcaster = Arc::new(Broadcaster::new(cache.clone()));
		let app = router(AppState {
			broadcaster: broadcaster.clone(),
			cache: cache.clone(),
			shutdown: shutdown.clone(),
		});
		let handle = tokio::spawn({
			let shutdown = shutdown.clone();
			async move {
				axum::serve(listener, app)
					.with_graceful_shutdown(shutdown.cancelled_owned())
					.await
			}
		});
		LiveServer {
			addr,
			cache,
			broadcaster,
			shutdown,
			handle,
		}
	}

	impl LiveServer {
		async fn stop(self) {
			self.shutdown.cancel();
			self.handle.await.unwrap().unwrap();
		}
	}

	type WsClient = tokio_tungstenite::WebSocketStream<
		tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
	>;

	async fn next_update(ws: &mut WsClient) -> Value {
		use futures::StreamExt;

		let message = tokio::time::timeout(std::time::Duration::from_secs(5), ws.next())
			.await
			.expect("no update within 5s")
			.unwrap()
			.unwrap();
		serde_json::from_str(message.to_text().unwrap()).unwrap()
	}

	async fn send(ws: &mut WsClient, text: String) {
		use futures::SinkExt;
		use tokio_tungstenite::tungstenite::Message;

		ws.send(Message::text(text)).await.unwrap();
	}

	#[tokio::test]
	async fn websocket_pushes_on_connect_and_on_request() {
		let server = serve(cluster()).await;
		let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", server.addr))
			.await
			.unwrap();

		let initial = next_update(&mut ws).await;
		assert_eq!(initial["event"], "ingresses_update");
		assert_eq!(initial["data"].as_array().unwrap().len(), 2);

		send(
			&mut ws,
			json!({ "event": "get_ingresses", "filters": { "namespace": "default" } }).to_string(),
		)
		.await;
		let filtered = next_update(&mut ws).await;
		assert_eq!(filtered["data"].as_array().unwrap().len(), 1);
		assert_eq!(filtered["data"][0]["name"], "api");

		server.stop().await;
	}

	#[tokio::test]
	async fn websocket_filters_behave_like_query_filters() {
		let server = serve(cluster()).await;
		let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", server.addr))
			.await
			.unwrap();
		next_update(&mut ws).await;

		send(
			&mut ws,
			json!({
				"event": "get_ingresses",
				"filters": { "namespace": "", "ingress_class_name": "NGINX", "status": "active" }
			})
			.to_string(),
		)
		.await;
		let filtered = next_update(&mut ws).await;
		assert_eq!(filtered["source"], "live");
		assert_eq!(filtered["data"].as_array().unwrap().len(), 1);
		assert_eq!(filtered["data"][0]["name"], "web");

		server.stop().await;
	}

	#[tokio::test]
	async fn scheduled_push_reaches_connected_session() {
		let server = serve(cluster()).await;
		let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", server.addr))
			.await
			.unwrap();
		next_update(&mut ws).await;

		let delivered =
			crate::scheduler::refresh_and_broadcast(server.cache.clone(), server.broadcaster.clone())
				.await;

		assert_eq!(delivered, 1);
		let pushed = next_update(&mut ws).await;
		assert_eq!(pushed["event"], "ingresses_update");
		assert_eq!(pushed["data"].as_array().unwrap().len(), 2);

		server.stop().await;
	}

	#[tokio::test]
	async fn unknown_events_leave_session_open() {
		let server = serve(cluster()).await;
		let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", server.addr))
			.await
			.unwrap();
		next_update(&mut ws).await;

		send(&mut ws, "not json".to_string()).await;
		send(&mut ws, json!({ "event": "delete_everything" }).to_string()).await;
		send(
			&mut ws,
			json!({ "event": "get_ingresses", "filters": { "namespace": "prod" } }).to_string(),
		)
		.await;

		let reply = next_update(&mut ws).await;
		assert_eq!(reply["data"].as_array().unwrap().len(), 1);
		assert_eq!(reply["data"][0]["name"], "web");
		assert_eq!(server.broadcaster.subscriber_count(), 1);

		server.stop().await;
	}

	#[tokio::test]
	async fn metrics_are_exposed() {
		let app = app(cluster());
		call(app.clone(), "/api/ingresses").await;

		let (status, _, body) = call(app, "/metrics").await;

		assert_eq!(status, StatusCode::OK);
		assert!(String::from_utf8(body).unwrap().contains("snapshot_refreshes_total"));
	}
}

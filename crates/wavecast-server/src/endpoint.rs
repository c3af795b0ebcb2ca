//! One generator family's listener: shared path `/ws`, individual path
//! `/wsi`, plus `/health` and `/metrics`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tower_http::trace::TraceLayer;
use wavecast_core::Signal;

use crate::config::EndpointConfig;
use crate::handlers::{ConnectionHandler, IndividualHandler, SharedHandler};
use crate::health::{self, HealthResponse};
use crate::registry::SessionRegistry;
use crate::stream::Broadcast;
use crate::websocket::run_socket;

/// Path serving the shared stream.
pub const SHARED_PATH: &str = "/ws";
/// Path serving per-client streams.
pub const INDIVIDUAL_PATH: &str = "/wsi";

/// Everything one generator family needs to serve both paths.
pub struct SignalEndpoint<S: Signal> {
    signal: Arc<S>,
    broadcast: Arc<Broadcast<S>>,
    sessions: Arc<SessionRegistry<S>>,
    shared_handler: Arc<dyn ConnectionHandler>,
    individual_handler: Arc<dyn ConnectionHandler>,
    tick: Duration,
    queue_capacity: usize,
    cancel: CancellationToken,
    sockets: TaskTracker,
    start_time: Instant,
    metrics: Option<PrometheusHandle>,
}

impl<S: Signal> SignalEndpoint<S> {
    /// Build the endpoint. `cancel` should be a child of the server's
    /// shutdown token; cancelling it stops the broadcast loop, every
    /// per-client loop and every open socket.
    pub fn new(
        signal: S,
        config: &EndpointConfig,
        queue_capacity: usize,
        cancel: CancellationToken,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        let signal = Arc::new(signal);
        let tick = config.tick_interval();
        let broadcast = Arc::new(Broadcast::new(signal.clone()));
        let sessions = Arc::new(SessionRegistry::new());
        let shared_handler: Arc<dyn ConnectionHandler> =
            Arc::new(SharedHandler::new(broadcast.clone()));
        let individual_handler: Arc<dyn ConnectionHandler> = Arc::new(IndividualHandler::new(
            signal.clone(),
            sessions.clone(),
            tick,
            cancel.clone(),
        ));
        Self {
            signal,
            broadcast,
            sessions,
            shared_handler,
            individual_handler,
            tick,
            queue_capacity,
            cancel,
            sockets: TaskTracker::new(),
            start_time: Instant::now(),
            metrics,
        }
    }

    /// The generator family.
    pub fn signal(&self) -> &S {
        &self.signal
    }

    /// Shared-mode state.
    pub fn broadcast(&self) -> &Arc<Broadcast<S>> {
        &self.broadcast
    }

    /// Individual-mode sessions.
    pub fn sessions(&self) -> &Arc<SessionRegistry<S>> {
        &self.sessions
    }

    /// This endpoint's cancellation token.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Spawn the shared-mode loop. It runs until the endpoint is cancelled.
    pub fn spawn_broadcast(&self) -> JoinHandle<()> {
        tokio::spawn(self.broadcast.clone().run(self.tick, self.cancel.clone()))
    }

    /// Wait until every upgraded socket on this endpoint has run its close
    /// handler. Cancel the endpoint first or this waits for clients to leave.
    pub async fn close_sockets(&self) {
        let _ = self.sockets.close();
        self.sockets.wait().await;
    }

    /// Current health counters.
    pub fn health(&self) -> HealthResponse {
        health::health_check(
            self.signal.name(),
            self.start_time,
            self.broadcast.connections().len(),
            self.sessions.len(),
        )
    }

    /// Build the Axum router with all routes.
    pub fn router(self: &Arc<Self>) -> Router {
        let mut router = Router::new()
            .route(SHARED_PATH, get(shared_ws::<S>))
            .route(INDIVIDUAL_PATH, get(individual_ws::<S>))
            .route("/health", get(health_handler::<S>));
        if self.metrics.is_some() {
            router = router.route("/metrics", get(metrics_handler::<S>));
        }
        router.layer(TraceLayer::new_for_http()).with_state(self.clone())
    }

    fn upgrade(&self, ws: WebSocketUpgrade, handler: Arc<dyn ConnectionHandler>) -> Response {
        let signal = self.signal.name();
        let capacity = self.queue_capacity;
        let cancel = self.cancel.clone();
        let sockets = self.sockets.clone();
        ws.on_upgrade(move |socket| {
            sockets.track_future(run_socket(socket, handler, signal, capacity, cancel))
        })
    }
}

/// GET /ws
async fn shared_ws<S: Signal>(
    State(endpoint): State<Arc<SignalEndpoint<S>>>,
    ws: WebSocketUpgrade,
) -> Response {
    endpoint.upgrade(ws, endpoint.shared_handler.clone())
}

/// GET /wsi
async fn individual_ws<S: Signal>(
    State(endpoint): State<Arc<SignalEndpoint<S>>>,
    ws: WebSocketUpgrade,
) -> Response {
    endpoint.upgrade(ws, endpoint.individual_handler.clone())
}

/// GET /health
async fn health_handler<S: Signal>(
    State(endpoint): State<Arc<SignalEndpoint<S>>>,
) -> Json<HealthResponse> {
    Json(endpoint.health())
}

/// GET /metrics
async fn metrics_handler<S: Signal>(State(endpoint): State<Arc<SignalEndpoint<S>>>) -> Response {
    match &endpoint.metrics {
        Some(handle) => handle.render().into_response(),
        None => axum::http::StatusCode::NOT_FOUND.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use tower::ServiceExt;
    use wavecast_core::{Ramp, Sine};

    fn config() -> EndpointConfig {
        EndpointConfig {
            port: 0,
            tick_interval_ms: 3,
        }
    }

    fn ramp_endpoint(metrics: Option<PrometheusHandle>) -> Arc<SignalEndpoint<Ramp>> {
        Arc::new(SignalEndpoint::new(
            Ramp::default(),
            &config(),
            16,
            CancellationToken::new(),
            metrics,
        ))
    }

    async fn get_body(router: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = router.oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn health_endpoint_returns_counts() {
        let endpoint = Arc::new(SignalEndpoint::new(
            Sine::default(),
            &config(),
            16,
            CancellationToken::new(),
            None,
        ));
        let (status, body) = get_body(endpoint.router(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["signal"], "sine");
        assert_eq!(parsed["sharedConnections"], 0);
        assert_eq!(parsed["individualSessions"], 0);
    }

    #[tokio::test]
    async fn metrics_route_only_with_handle() {
        let (status, _) = get_body(ramp_endpoint(None).router(), "/metrics").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let handle = PrometheusBuilder::new().build_recorder().handle();
        let (status, _) = get_body(ramp_endpoint(Some(handle)).router(), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn websocket_paths_require_upgrade() {
        let endpoint = ramp_endpoint(None);
        for path in [SHARED_PATH, INDIVIDUAL_PATH] {
            let (status, _) = get_body(endpoint.router(), path).await;
            assert!(status.is_client_error(), "{path}: {status}");
        }
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let (status, _) = get_body(ramp_endpoint(None).router(), "/nonexistent").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn broadcast_stops_on_cancel() {
        let endpoint = ramp_endpoint(None);
        let handle = endpoint.spawn_broadcast();
        endpoint.cancel_token().cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}

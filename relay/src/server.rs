use crate::classify::ThresholdTable;
use crate::errors::Result;
use crate::metrics::{self, VIEWERS_CONNECTED};
use crate::rest;
use crate::viewers::ViewerHub;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

/// Builds the HTTP surface: viewer socket, REST API, health and metrics.
///
/// CORS is open to every origin.
pub fn create_app(viewers: ViewerHub, thresholds: Arc<ThresholdTable>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(viewer_handler))
        .with_state(viewers)
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .merge(rest::create_router(thresholds))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn bind(addr: &str) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr).await?;
    Ok(listener)
}

async fn viewer_handler(ws: WebSocketUpgrade, State(viewers): State<ViewerHub>) -> Response {
    ws.on_upgrade(move |socket| handle_viewer(socket, viewers))
}

/// Streams every broadcast frame to one viewer until either side goes away.
async fn handle_viewer(socket: WebSocket, viewers: ViewerHub) {
    let mut viewer = viewers.subscribe();
    VIEWERS_CONNECTED.inc();
    info!("Viewer connected ({} total)", viewers.viewer_count());

    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = viewer.recv().await {
            if sender.send(Message::Text(frame)).await.is_err() {
                debug!("Viewer socket closed while sending");
                break;
            }
        }
    });

    // Viewers only listen; anything they send besides close is ignored.
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!("Viewer receive error: {}", e);
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    VIEWERS_CONNECTED.dec();
    info!("Viewer disconnected");
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn metrics_handler() -> String {
    metrics::gather_metrics()
}

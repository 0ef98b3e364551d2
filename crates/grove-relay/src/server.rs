//! Axum web server exposing the relay over WebSocket.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures::{SinkExt, Stream, StreamExt};
use grove_protocol::ClientEvent;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::time::{interval_at, Instant, Interval};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error, info, warn};

use crate::config::RelayConfig;
use crate::error::Result;
use crate::hub::{Hub, HubHandle};
use crate::outbox::outbox;

/// State shared by every request handler.
#[derive(Clone)]
struct AppState {
    hub: HubHandle,
    config: Arc<RelayConfig>,
}

/// Relay server.
pub struct RelayServer {
    state: AppState,
}

impl RelayServer {
    /// Create a relay and start its hub task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: RelayConfig) -> Self {
        let hub = Hub::new(&config).spawn();
        Self::with_hub(config, hub)
    }

    /// Create a relay around an already running hub.
    pub fn with_hub(config: RelayConfig, hub: HubHandle) -> Self {
        Self {
            state: AppState {
                hub,
                config: Arc::new(config),
            },
        }
    }

    /// Handle to the hub, for in-process inspection.
    pub fn hub(&self) -> HubHandle {
        self.state.hub.clone()
    }

    /// Build the router for the server.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/status", get(status_handler))
            .route("/ws", get(ws_handler))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind the configured address and serve until the listener fails.
    pub async fn serve(self) -> Result<()> {
        let listener = TcpListener::bind(self.state.config.listen_addr).await?;
        self.serve_on(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn serve_on(self, listener: TcpListener) -> Result<()> {
        info!("Relay listening on ws://{}/ws", listener.local_addr()?);
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    sessions: usize,
    avatars: usize,
}

async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.hub.status().await {
        Ok(status) => Json(StatusResponse {
            status: "ok",
            sessions: status.sessions,
            avatars: status.avatars,
        }),
        Err(e) => {
            error!("status unavailable: {}", e);
            Json(StatusResponse {
                status: "unavailable",
                sessions: 0,
                avatars: 0,
            })
        }
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drive one visitor's connection until it closes, errors or idles out.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (tx, mut outbound) = outbox(state.config.outbox_capacity);
    let assignment = match state.hub.connect(tx).await {
        Ok(assignment) => assignment,
        Err(e) => {
            error!("could not register connection: {}", e);
            return;
        }
    };
    let session_id = assignment.session_id;

    let (mut sink, mut stream) = socket.split();

    let writer_id = session_id.clone();
    let ping_interval = state.config.ping_interval;
    let writer = tokio::spawn(async move {
        let mut heartbeat = ping_interval.map(|every| interval_at(Instant::now() + every, every));
        loop {
            let message = tokio::select! {
                frame = outbound.recv() => match frame {
                    Some(frame) => Message::Text(frame.to_string().into()),
                    None => break,
                },
                () = next_ping(&mut heartbeat) => Message::Ping(Default::default()),
            };
            if let Err(e) = sink.send(message).await {
                debug!(session = %writer_id, error = %e, "send failed");
                break;
            }
        }
        let _ = sink.close().await;
    });

    loop {
        let next = match next_frame(&mut stream, state.config.idle_timeout).await {
            Ok(next) => next,
            Err(_) => {
                info!(session = %session_id, "idle timeout");
                break;
            }
        };

        match next {
            Some(Ok(Message::Text(text))) => match ClientEvent::from_json(text.as_str()) {
                Ok(event) => {
                    if state.hub.inbound(&session_id, event).await.is_err() {
                        error!(session = %session_id, "hub closed");
                        break;
                    }
                }
                Err(e) => warn!(session = %session_id, error = %e, "ignoring malformed frame"),
            },
            Some(Ok(Message::Close(_))) | None => break,
            // Pongs and other control frames only count as liveness.
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                debug!(session = %session_id, error = %e, "receive failed");
                break;
            }
        }
    }

    let _ = state.hub.disconnect(&session_id).await;
    writer.abort();
}

struct IdleTimeout;

/// Wait for the next heartbeat tick, or forever when pings are disabled.
async fn next_ping(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn next_frame<S>(
    stream: &mut S,
    idle: Option<Duration>,
) -> std::result::Result<Option<S::Item>, IdleTimeout>
where
    S: Stream + Unpin,
{
    match idle {
        Some(limit) => tokio::time::timeout(limit, stream.next())
            .await
            .map_err(|_| IdleTimeout),
        None => Ok(stream.next().await),
    }
}

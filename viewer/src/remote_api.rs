use std::{io, net::SocketAddr, time::Duration};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use log::{error, info};
use serde::{Deserialize, Serialize};
use story_engine::{Intent, Surface, ViewerFrame};
use tokio::sync::{mpsc, oneshot};
use tower_http::cors::{Any, CorsLayer};

use crate::driver::{CommandReply, DriverCommand, outcome_label};

const REPLY_TIMEOUT: Duration = Duration::from_secs(2);

type ApiError = (StatusCode, String);

#[derive(Clone)]
struct RemoteState {
    tx: mpsc::UnboundedSender<DriverCommand>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntentRequest {
    pub intent: Intent,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PointerDownRequest {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PointerUpRequest {
    pub x: f32,
    pub y: f32,
    pub surface: Surface,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClickRequest {
    pub x: f32,
    pub surface: Surface,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeyRequest {
    pub key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetReadyRequest {
    pub index: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputResponse {
    /// `null` when the input did not map to an intent.
    pub outcome: Option<&'static str>,
    pub frame: ViewerFrame,
}

impl From<CommandReply> for InputResponse {
    fn from(reply: CommandReply) -> Self {
        Self {
            outcome: reply.outcome.map(outcome_label),
            frame: reply.frame,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetReadyResponse {
    pub accepted: bool,
}

async fn health() -> &'static str {
    "ok"
}

async fn send_cmd<T>(
    tx: &mpsc::UnboundedSender<DriverCommand>,
    cmd: DriverCommand,
    rx: oneshot::Receiver<T>,
) -> Result<T, ApiError> {
    tx.send(cmd).map_err(|_| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "viewer session has ended".to_string(),
        )
    })?;

    match tokio::time::timeout(REPLY_TIMEOUT, rx).await {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(_)) => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "viewer did not respond".to_string(),
        )),
        Err(_) => Err((StatusCode::GATEWAY_TIMEOUT, "viewer timed out".to_string())),
    }
}

async fn session_state(State(state): State<RemoteState>) -> Result<Json<ViewerFrame>, ApiError> {
    let (tx, rx) = oneshot::channel();
    let frame = send_cmd(&state.tx, DriverCommand::Snapshot { respond: tx }, rx).await?;
    Ok(Json(frame))
}

async fn session_intent(
    State(state): State<RemoteState>,
    Json(payload): Json<IntentRequest>,
) -> Result<Json<InputResponse>, ApiError> {
    let (tx, rx) = oneshot::channel();
    let reply = send_cmd(
        &state.tx,
        DriverCommand::Intent {
            intent: payload.intent,
            respond: tx,
        },
        rx,
    )
    .await?;
    Ok(Json(reply.into()))
}

async fn session_pointer_down(
    State(state): State<RemoteState>,
    Json(payload): Json<PointerDownRequest>,
) -> Result<StatusCode, ApiError> {
    if !payload.x.is_finite() || !payload.y.is_finite() {
        return Err((StatusCode::BAD_REQUEST, "coordinates must be finite".into()));
    }
    state
        .tx
        .send(DriverCommand::PointerDown {
            x: payload.x,
            y: payload.y,
        })
        .map_err(|_| {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "viewer session has ended".to_string(),
            )
        })?;
    Ok(StatusCode::ACCEPTED)
}

async fn session_pointer_up(
    State(state): State<RemoteState>,
    Json(payload): Json<PointerUpRequest>,
) -> Result<Json<InputResponse>, ApiError> {
    let (tx, rx) = oneshot::channel();
    let reply = send_cmd(
        &state.tx,
        DriverCommand::PointerUp {
            x: payload.x,
            y: payload.y,
            surface: payload.surface,
            respond: tx,
        },
        rx,
    )
    .await?;
    Ok(Json(reply.into()))
}

async fn session_click(
    State(state): State<RemoteState>,
    Json(payload): Json<ClickRequest>,
) -> Result<Json<InputResponse>, ApiError> {
    let (tx, rx) = oneshot::channel();
    let reply = send_cmd(
        &state.tx,
        DriverCommand::Click {
            x: payload.x,
            surface: payload.surface,
            respond: tx,
        },
        rx,
    )
    .await?;
    Ok(Json(reply.into()))
}

async fn session_key(
    State(state): State<RemoteState>,
    Json(payload): Json<KeyRequest>,
) -> Result<Json<InputResponse>, ApiError> {
    let (tx, rx) = oneshot::channel();
    let reply = send_cmd(
        &state.tx,
        DriverCommand::Key {
            key: payload.key,
            respond: tx,
        },
        rx,
    )
    .await?;
    Ok(Json(reply.into()))
}

async fn session_asset_ready(
    State(state): State<RemoteState>,
    Json(payload): Json<AssetReadyRequest>,
) -> Result<Json<AssetReadyResponse>, ApiError> {
    let (tx, rx) = oneshot::channel();
    let accepted = send_cmd(
        &state.tx,
        DriverCommand::AssetReady {
            index: payload.index,
            respond: tx,
        },
        rx,
    )
    .await?;
    Ok(Json(AssetReadyResponse { accepted }))
}

pub fn router(tx: mpsc::UnboundedSender<DriverCommand>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/session/state", get(session_state))
        .route("/api/session/intent", post(session_intent))
        .route("/api/session/pointer/down", post(session_pointer_down))
        .route("/api/session/pointer/up", post(session_pointer_up))
        .route("/api/session/click", post(session_click))
        .route("/api/session/key", post(session_key))
        .route("/api/session/asset-ready", post(session_asset_ready))
        .with_state(RemoteState { tx })
        .layer(cors)
}

pub struct RemoteServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
}

impl RemoteServer {
    /// Binds synchronously so a taken port fails here, then serves on the current tokio
    /// runtime. Must be called from within a runtime.
    pub fn start(addr: SocketAddr, tx: mpsc::UnboundedSender<DriverCommand>) -> io::Result<Self> {
        let std_listener = std::net::TcpListener::bind(addr)?;
        std_listener.set_nonblocking(true)?;
        let addr = std_listener.local_addr()?;
        let listener = tokio::net::TcpListener::from_std(std_listener)?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let serve = axum::serve(listener, router(tx)).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            if let Err(err) = serve.await {
                error!("remote api server error: {err}");
            }
        });

        info!("remote api listening on http://{addr}");
        Ok(Self {
            addr,
            shutdown: Some(shutdown_tx),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for RemoteServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

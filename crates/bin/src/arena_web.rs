//! Arena Web - game WebSocket plus HTTP status routes on one port.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, RawQuery, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use protocol::{ClientPacket, ConnectionKind, ProtocolError};
use serde::Serialize;
use server::GameHandle;
use std::net::SocketAddr;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
struct AppState {
    game: GameHandle,
    started: Instant,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Health {
    status: &'static str,
    uptime_secs: u64,
    version: &'static str,
}

#[derive(Serialize)]
struct Ready {
    status: &'static str,
}

#[derive(Serialize)]
struct PlayerList {
    total: usize,
    players: Vec<server::PlayerSummary>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Arena Web Server v{}", env!("CARGO_PKG_VERSION"));

    let config = server::Config::load()?;
    info!("Loaded configuration");
    info!("  Port: {}", config.server.port);
    info!("  Border: {}x{}", config.border.width, config.border.height);

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let (game, _task) = server::spawn_game(config);
    let state = AppState {
        game,
        started: Instant::now(),
    };

    let app = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/api/players", get(players))
        .route("/ws", get(websocket_handler))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server running on http://{}", addr);
    info!("Game WebSocket endpoint: ws://{}/ws?type=player", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        uptime_secs: state.started.elapsed().as_secs(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn ready() -> Json<Ready> {
    Json(Ready { status: "ready" })
}

async fn players(State(state): State<AppState>) -> Response {
    match state.game.players().await {
        Some(players) => Json(PlayerList {
            total: players.len(),
            players,
        })
        .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "game loop stopped").into_response(),
    }
}

/// Upgrade `/ws?type=player|spectator`.
async fn websocket_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    RawQuery(query): RawQuery,
    State(state): State<AppState>,
) -> Response {
    let Some(kind) = ConnectionKind::from_query(query.as_deref()) else {
        warn!("Rejected WebSocket from {}: missing or unknown connection type", addr);
        return (StatusCode::BAD_REQUEST, "expected ?type=player or ?type=spectator").into_response();
    };
    ws.on_upgrade(move |socket| handle_websocket(socket, addr, kind, state.game))
}

/// Pump one socket between the client and the game task.
async fn handle_websocket(socket: WebSocket, addr: SocketAddr, kind: ConnectionKind, game: GameHandle) {
    let (conn, mut outbound) = game.connect(kind);
    info!("New {:?} connection {} from {}", kind, conn, addr);
    let (mut write, mut read) = socket.split();

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => match ClientPacket::parse(text.as_str()) {
                        Ok(packet) => game.deliver(conn, packet),
                        Err(e) => game.reject(conn, e),
                    },
                    Some(Ok(Message::Binary(_))) => game.reject(
                        conn,
                        ProtocolError::Malformed {
                            packet: "binary",
                            reason: "only text frames are accepted",
                        },
                    ),
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("Connection {} closed by {}", conn, addr);
                        break;
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error from {}: {}", addr, e);
                        break;
                    }
                    _ => {}
                }
            }
            packet = outbound.recv() => {
                match packet {
                    Some(packet) => {
                        let text = match packet.encode() {
                            Ok(text) => text,
                            Err(e) => {
                                error!("Failed to encode packet for {}: {}", conn, e);
                                continue;
                            }
                        };
                        if let Err(e) = write.send(Message::Text(text.into())).await {
                            warn!("Failed to send to {}: {}", addr, e);
                            break;
                        }
                    }
                    None => {
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        }
    }

    game.disconnect(conn);
}

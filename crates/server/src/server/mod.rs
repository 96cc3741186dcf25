//! Session boundary: WebSocket listener and per-connection tasks.
//!
//! Connection tasks never touch the world. They decode frames into
//! [`ClientPacket`]s for the game task and write whatever it queues for them.

use crate::config::Config;
use futures_util::{SinkExt, StreamExt};
use protocol::{ClientPacket, ConnectionKind, ProtocolError};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

pub mod game;
pub mod scheduler;
pub mod session;

pub use game::{GameState, PlayerSummary};
pub use scheduler::{run_scheduler, spawn_game, Event, GameHandle};
pub use session::{ConnectionId, ConnectionPhase, Session};

/// Run the game server (blocking).
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!("{} listening on ws://{}", config.server.name, addr);

    let (handle, _game) = spawn_game(config);

    loop {
        let (stream, addr) = listener.accept().await?;
        let handle = handle.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, addr, handle).await {
                error!("Connection error from {}: {}", addr, e);
            }
        });
    }
}

/// Handle a single WebSocket connection.
async fn handle_connection(stream: TcpStream, addr: SocketAddr, handle: GameHandle) -> anyhow::Result<()> {
    let mut kind = None;
    let ws_stream = accept_hdr_async(stream, |request: &Request, response: Response| {
        kind = ConnectionKind::from_query(request.uri().query());
        if kind.is_none() {
            let mut rejection = ErrorResponse::new(Some("expected ?type=player or ?type=spectator".to_string()));
            *rejection.status_mut() = StatusCode::BAD_REQUEST;
            return Err(rejection);
        }
        Ok(response)
    })
    .await?;
    let Some(kind) = kind else {
        return Ok(());
    };

    let (conn, mut outbound) = handle.connect(kind);
    info!("New {:?} connection {} from {}", kind, conn, addr);
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => match ClientPacket::parse(text.as_str()) {
                        Ok(packet) => handle.deliver(conn, packet),
                        Err(e) => handle.reject(conn, e),
                    },
                    Some(Ok(Message::Binary(_))) => handle.reject(
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
                        if let Err(e) = write.send(Message::text(text)).await {
                            warn!("Failed to send to {}: {}", addr, e);
                            break;
                        }
                    }
                    None => {
                        // The game dropped this connection (kick).
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        }
    }

    handle.disconnect(conn);
    Ok(())
}

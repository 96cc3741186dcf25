//! Tick scheduler and the handle connection tasks use to reach it.
//!
//! One task owns the [`GameState`]. It multiplexes the physics, slow and
//! broadcast intervals with the inbound event channel, so a tick never
//! overlaps another tick or a packet handler. An overrunning tick delays the
//! next one instead of running concurrently.

use super::game::{GameState, PlayerSummary};
use super::session::ConnectionId;
use crate::config::Config;
use protocol::{ClientPacket, ConnectionKind, ProtocolError, ServerPacket};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{info, warn};

/// Something that happened on a connection, or a query from outside.
#[derive(Debug)]
pub enum Event {
    Connect {
        conn: ConnectionId,
        kind: ConnectionKind,
        outbound: mpsc::UnboundedSender<ServerPacket>,
    },
    Message {
        conn: ConnectionId,
        packet: ClientPacket,
    },
    /// A frame that failed to decode or validate.
    Malformed {
        conn: ConnectionId,
        error: ProtocolError,
    },
    Disconnect {
        conn: ConnectionId,
    },
    /// Snapshot of the live players, answered from the game task.
    Players {
        reply: oneshot::Sender<Vec<PlayerSummary>>,
    },
}

/// Cloneable entry point into the game task.
#[derive(Debug, Clone)]
pub struct GameHandle {
    events: mpsc::UnboundedSender<Event>,
    next_conn: Arc<AtomicU32>,
}

impl GameHandle {
    /// Register a connection. Packets for it arrive on the returned receiver;
    /// the receiver yields `None` once the game has dropped the connection.
    pub fn connect(&self, kind: ConnectionKind) -> (ConnectionId, mpsc::UnboundedReceiver<ServerPacket>) {
        let conn = self.next_conn.fetch_add(1, Ordering::Relaxed);
        let (outbound, rx) = mpsc::unbounded_channel();
        let _ = self.events.send(Event::Connect { conn, kind, outbound });
        (conn, rx)
    }

    pub fn deliver(&self, conn: ConnectionId, packet: ClientPacket) {
        let _ = self.events.send(Event::Message { conn, packet });
    }

    pub fn reject(&self, conn: ConnectionId, error: ProtocolError) {
        let _ = self.events.send(Event::Malformed { conn, error });
    }

    pub fn disconnect(&self, conn: ConnectionId) {
        let _ = self.events.send(Event::Disconnect { conn });
    }

    /// Live players, or `None` if the game task has stopped.
    pub async fn players(&self) -> Option<Vec<PlayerSummary>> {
        let (reply, rx) = oneshot::channel();
        self.events.send(Event::Players { reply }).ok()?;
        rx.await.ok()
    }
}

/// Build the game, populate the world and start its task.
pub fn spawn_game(config: Config) -> (GameHandle, JoinHandle<()>) {
    let mut state = GameState::new(config);
    state.populate();

    let (events, rx) = mpsc::unbounded_channel();
    let handle = GameHandle {
        events,
        // Id 0 is the spectator placeholder.
        next_conn: Arc::new(AtomicU32::new(1)),
    };
    let task = tokio::spawn(run_scheduler(state, rx));
    (handle, task)
}

fn ticker(period: Duration) -> Interval {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Run the game until every [`GameHandle`] is dropped.
pub async fn run_scheduler(mut state: GameState, mut events: mpsc::UnboundedReceiver<Event>) {
    let physics_period = state.config.server.physics_interval();
    let mut physics = ticker(physics_period);
    let mut slow = ticker(state.config.server.slow_interval());
    let mut broadcast = ticker(state.config.server.broadcast_interval());

    info!(
        "Game loop started: physics {:?}, slow {:?}, broadcast {:?}",
        physics_period,
        state.config.server.slow_interval(),
        state.config.server.broadcast_interval()
    );

    loop {
        tokio::select! {
            _ = physics.tick() => {
                let started = Instant::now();
                state.physics_tick(started.into_std());
                let elapsed = started.elapsed();
                if elapsed > physics_period {
                    let counts = state.world.counts();
                    warn!(
                        "Slow tick #{}: {:.3}ms (budget: {:.1}ms) - {} players, {} cells",
                        state.tick_count,
                        elapsed.as_secs_f64() * 1000.0,
                        physics_period.as_secs_f64() * 1000.0,
                        counts.players,
                        counts.cells
                    );
                }
            }
            _ = slow.tick() => state.slow_tick(),
            _ = broadcast.tick() => state.broadcast_tick(),
            event = events.recv() => match event {
                Some(event) => state.handle_event(event, Instant::now().into_std()),
                None => {
                    info!("All game handles dropped, stopping game loop");
                    break;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::packets::Handshake;

    async fn next_snapshot(rx: &mut mpsc::UnboundedReceiver<ServerPacket>) -> Option<ServerPacket> {
        while let Some(packet) = rx.recv().await {
            if matches!(packet, ServerPacket::Snapshot(_)) {
                return Some(packet);
            }
        }
        None
    }

    #[tokio::test]
    async fn test_game_task_round_trip() {
        let mut config = Config::default();
        config.food.max_amount = 50;
        config.virus.max_amount = 5;
        let (handle, task) = spawn_game(config);

        let (conn, mut rx) = handle.connect(ConnectionKind::Player);
        assert!(matches!(rx.recv().await, Some(ServerPacket::Welcome { .. })));

        handle.deliver(
            conn,
            ClientPacket::Handshake(Some(Handshake {
                name: "blob".into(),
                ..Default::default()
            })),
        );
        let players = handle.players().await.unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].name, "blob");

        let snapshot = tokio::time::timeout(Duration::from_secs(2), next_snapshot(&mut rx))
            .await
            .unwrap();
        match snapshot {
            Some(ServerPacket::Snapshot(snapshot)) => {
                assert_eq!(snapshot.player.id, conn);
                assert!(snapshot.food.len() <= 50);
            }
            other => panic!("unexpected {:?}", other),
        }

        handle.disconnect(conn);
        assert!(handle.players().await.unwrap().is_empty());
        // Queued packets drain, then the channel reports closed.
        while rx.recv().await.is_some() {}

        drop(handle);
        task.await.unwrap();
    }
}

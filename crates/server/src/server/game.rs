//! Game state: the world store plus every connection.
//!
//! Owned by exactly one task (see [`super::scheduler`]); every method here runs
//! to completion before the next event or tick is looked at.

use super::scheduler::Event;
use super::session::{ConnectionId, ConnectionPhase, Session};
use crate::balance;
use crate::collision::{self, PlayerDeath};
use crate::config::Config;
use crate::entity::{mass_to_radius, Cell, MassPellet, Player};
use crate::error::GameError;
use crate::leaderboard::LeaderboardTracker;
use crate::naming::{self, NicknamePolicy, WordNickname};
use crate::spawn::{get_spawn_policy, SpawnPolicy};
use crate::split;
use crate::visibility;
use crate::world::World;
use glam::Vec2;
use protocol::packets::{Handshake, PlayerSettings, Target, WorldSize};
use protocol::{ClientPacket, ConnectionKind, ServerPacket};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

/// Row of the `/api/players` listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    pub id: ConnectionId,
    pub name: String,
    pub wallet_address: Option<String>,
    pub mass_total: f32,
    pub cells_count: usize,
}

/// The whole game: world, sessions, leaderboard and pluggable policies.
pub struct GameState {
    pub config: Config,
    pub world: World,
    sessions: BTreeMap<ConnectionId, Session>,
    leaderboard: LeaderboardTracker,
    spawn: Box<dyn SpawnPolicy>,
    names: Box<dyn NicknamePolicy>,
    /// Physics ticks run so far.
    pub tick_count: u64,
}

impl GameState {
    pub fn new(config: Config) -> Self {
        let world = World::new(config.border.width as f32, config.border.height as f32);
        Self {
            world,
            sessions: BTreeMap::new(),
            leaderboard: LeaderboardTracker::new(config.player.leaderboard_size),
            spawn: get_spawn_policy(config.player.spawn),
            names: Box::new(WordNickname {
                max_length: config.player.max_nick_length,
            }),
            tick_count: 0,
            config,
        }
    }

    /// Swap the nickname policy.
    pub fn with_nickname_policy(mut self, names: Box<dyn NicknamePolicy>) -> Self {
        self.names = names;
        self
    }

    /// Fill the world with its initial food and viruses.
    pub fn populate(&mut self) {
        let report = balance::balance(&mut self.world, &self.config);
        info!(
            "World initialized: {} food, {} viruses (spawn policy: {})",
            report.food_added,
            report.viruses_added,
            self.spawn.name()
        );
    }

    #[inline]
    pub fn session(&self, conn: ConnectionId) -> Option<&Session> {
        self.sessions.get(&conn)
    }

    #[inline]
    pub fn connection_count(&self) -> usize {
        self.sessions.len()
    }

    /// Apply one inbound event.
    pub fn handle_event(&mut self, event: Event, now: Instant) {
        match event {
            Event::Connect { conn, kind, outbound } => self.connect(conn, kind, outbound),
            Event::Message { conn, packet } => {
                if let Err(e) = self.handle_packet(conn, packet, now) {
                    self.reject(conn, e);
                }
            }
            Event::Malformed { conn, error } => self.reject(conn, GameError::Malformed(error)),
            Event::Disconnect { conn } => self.disconnect(conn),
            Event::Players { reply } => {
                let _ = reply.send(self.player_summaries());
            }
        }
    }

    /// Register a new connection and greet it.
    pub fn connect(&mut self, conn: ConnectionId, kind: ConnectionKind, outbound: UnboundedSender<ServerPacket>) {
        info!("Connection {} opened ({:?})", conn, kind);
        let session = Session::new(conn, kind, World::random_hue(), outbound);
        self.sessions.insert(conn, session);
        self.greet(conn);
    }

    /// Send `welcome` and wait for `gotit`.
    fn greet(&mut self, conn: ConnectionId) {
        let Some(session) = self.sessions.get_mut(&conn) else {
            return;
        };
        session.phase = ConnectionPhase::Handshaking;
        session.send(ServerPacket::Welcome {
            player: PlayerSettings {
                id: conn,
                name: session.name.clone(),
                hue: session.hue,
                admin: session.admin,
            },
            world: WorldSize {
                width: self.world.border.width,
                height: self.world.border.height,
            },
        });
    }

    /// Apply one client packet.
    pub fn handle_packet(&mut self, conn: ConnectionId, packet: ClientPacket, now: Instant) -> Result<(), GameError> {
        if !self.sessions.contains_key(&conn) {
            return Err(GameError::UnknownConnection(conn));
        }
        match packet {
            ClientPacket::Handshake(handshake) => self.handshake(conn, handshake.unwrap_or_default(), now),
            ClientPacket::Heartbeat(Target { x, y }) => {
                let player = self.live_player(conn, "heartbeat")?;
                player.target = Vec2::new(x, y);
                player.last_heartbeat = now;
                Ok(())
            }
            ClientPacket::Eject => self.eject(conn),
            ClientPacket::Split => {
                let tick = self.tick_count;
                let border = self.world.border;
                let player = self
                    .world
                    .player_mut(conn)
                    .ok_or(GameError::NotPermitted("split"))?;
                split::voluntary_split(player, &self.config, tick, &border);
                Ok(())
            }
            ClientPacket::Respawn => self.respawn(conn),
            ClientPacket::WindowResized(size) => {
                let screen = Vec2::new(size.screen_width, size.screen_height);
                if let Some(session) = self.sessions.get_mut(&conn) {
                    session.screen = screen;
                }
                if let Some(player) = self.world.player_mut(conn) {
                    player.screen = screen;
                }
                Ok(())
            }
            ClientPacket::AdminAuth { password } => {
                self.admin_auth(conn, &password);
                Ok(())
            }
            ClientPacket::AdminKick { name, reason } => {
                self.admin_kick(conn, &name, &reason);
                Ok(())
            }
            ClientPacket::Chat { sender, message } => {
                self.chat(conn, &sender, &message);
                Ok(())
            }
            ClientPacket::PingCheck => {
                self.send_to(conn, ServerPacket::PongCheck);
                Ok(())
            }
        }
    }

    fn live_player(&mut self, conn: ConnectionId, what: &'static str) -> Result<&mut Player, GameError> {
        self.world.player_mut(conn).ok_or(GameError::NotPermitted(what))
    }

    fn handshake(&mut self, conn: ConnectionId, handshake: Handshake, now: Instant) -> Result<(), GameError> {
        let session = self.sessions.get_mut(&conn).ok_or(GameError::UnknownConnection(conn))?;

        if session.is_spectator() {
            if session.phase == ConnectionPhase::Handshaking {
                session.phase = ConnectionPhase::Active;
                info!("Spectator {} joined", conn);
                self.broadcast_except(conn, ServerPacket::PlayerJoin { name: String::new() });
            }
            return Ok(());
        }
        if self.world.contains_player(conn) {
            return Err(GameError::DuplicateIdentity(conn));
        }
        if session.phase != ConnectionPhase::Handshaking {
            return Err(GameError::NotPermitted("gotit"));
        }

        let name = self.names.sanitize(&handshake.name)?;
        let screen = match (handshake.screen_width, handshake.screen_height) {
            (Some(width), Some(height)) => Vec2::new(width, height),
            _ => session.screen,
        };
        session.phase = ConnectionPhase::Active;
        session.name = name.clone();
        session.screen = screen;
        let (hue, admin) = (session.hue, session.admin);

        let mass = self.config.player.default_mass as f32;
        let position = self
            .spawn
            .pick(&self.world.border, mass_to_radius(mass), &self.world.occupied());
        let cell = Cell::new(conn, position, mass, self.config.player.speed as f32, 0);
        let mut player = Player::new(conn, name.clone(), hue, cell, screen, now);
        player.admin = admin;
        player.identity = handshake.wallet_address;
        self.world.insert_player(player);

        info!("Player {} ({}) joined at ({:.0}, {:.0})", name, conn, position.x, position.y);
        self.broadcast_except(conn, ServerPacket::PlayerJoin { name });
        Ok(())
    }

    /// Fire one pellet from every cell heavy enough to afford it.
    fn eject(&mut self, conn: ConnectionId) -> Result<(), GameError> {
        let eject_mass = self.config.eject.mass as f32;
        let eject_speed = self.config.eject.speed as f32;
        let min_mass = self.config.player.default_mass as f32 + eject_mass;
        let border = self.world.border;

        let player = self.live_player(conn, "eject")?;
        let aim = player.aim();
        let hue = player.hue;
        let mut emitters = Vec::new();
        for (idx, cell) in player.cells.iter_mut().enumerate() {
            if cell.mass() >= min_mass {
                cell.add_mass(-eject_mass);
                emitters.push((idx, cell.clone()));
            }
        }

        for (idx, cell) in emitters {
            let id = self.world.next_id();
            let pellet = MassPellet::emit(id, &cell, idx, aim, eject_mass, eject_speed, hue, &border);
            self.world.add_pellet(pellet);
        }
        Ok(())
    }

    /// Drop the current player (if any) and start the handshake over.
    fn respawn(&mut self, conn: ConnectionId) -> Result<(), GameError> {
        if self.sessions.get(&conn).is_some_and(Session::is_spectator) {
            return Err(GameError::NotPermitted("respawn"));
        }
        if let Some(player) = self.world.remove_player(conn) {
            info!("Player {} ({}) respawning", player.name, conn);
        }
        self.greet(conn);
        Ok(())
    }

    fn admin_auth(&mut self, conn: ConnectionId, password: &str) {
        let configured = &self.config.server.admin_password;
        let Some(session) = self.sessions.get_mut(&conn) else {
            return;
        };
        if configured.is_empty() || password != configured.as_str() {
            warn!("Connection {} ({}) failed admin authentication", conn, session.name);
            session.send(ServerPacket::ServerMessage {
                message: "Password incorrect, attempt logged.".to_string(),
            });
            return;
        }

        session.admin = true;
        let name = session.name.clone();
        session.send(ServerPacket::ServerMessage {
            message: format!("Welcome back {}", name),
        });
        if let Some(player) = self.world.player_mut(conn) {
            player.admin = true;
        }
        info!("Connection {} ({}) logged in as admin", conn, name);
        self.broadcast_except(conn, ServerPacket::ServerMessage {
            message: format!("{} just logged in as an admin.", name),
        });
    }

    fn admin_kick(&mut self, conn: ConnectionId, name: &str, reason: &str) {
        let Some(caller) = self.sessions.get(&conn) else {
            return;
        };
        if !caller.admin {
            warn!("Connection {} ({}) tried to kick {} without admin rights", conn, caller.name, name);
            self.send_to(conn, ServerPacket::ServerMessage {
                message: "You are not permitted to use this command.".to_string(),
            });
            return;
        }
        let caller_name = caller.name.clone();

        let targets: Vec<ConnectionId> = self
            .world
            .players()
            .iter()
            .filter(|p| p.name == name && !p.admin && p.id != conn)
            .map(|p| p.id)
            .collect();
        if targets.is_empty() {
            self.send_to(conn, ServerPacket::ServerMessage {
                message: "Could not locate user or user is an admin.".to_string(),
            });
            return;
        }

        let kick_reason = if reason.is_empty() {
            "Kicked by an admin.".to_string()
        } else {
            format!("Kicked by an admin: {}", reason)
        };
        for target in targets {
            info!("Admin {} kicked {} ({})", caller_name, name, target);
            self.kick(target, kick_reason.clone());
        }
        self.send_to(conn, ServerPacket::ServerMessage {
            message: format!("User {} was kicked by {}", name, caller_name),
        });
    }

    fn chat(&mut self, conn: ConnectionId, sender: &str, message: &str) {
        let Some(session) = self.sessions.get(&conn) else {
            return;
        };
        let sender = if session.name.is_empty() {
            naming::strip_tags(sender)
        } else {
            session.name.clone()
        };
        let message = naming::sanitize_chat(message);
        if message.trim().is_empty() {
            return;
        }
        if self.config.server.log_chat {
            info!("[CHAT] {}: {}", sender, message);
        }
        self.broadcast_except(conn, ServerPacket::Chat { sender, message });
    }

    /// Kick on fatal errors, log the rest.
    fn reject(&mut self, conn: ConnectionId, error: GameError) {
        if error.is_fatal() {
            warn!("Kicking connection {}: {}", conn, error);
            self.kick(conn, error.kick_reason());
        } else {
            debug!("Ignoring input from connection {}: {}", conn, error);
        }
    }

    /// Tell the connection why, drop it from the world, and close it.
    pub fn kick(&mut self, conn: ConnectionId, reason: String) {
        let Some((session, player)) = self.close(conn, ConnectionPhase::Kicked) else {
            return;
        };
        session.send(ServerPacket::Kick { reason });
        if let Some(player) = player {
            self.broadcast(ServerPacket::PlayerDisconnect { name: player.name });
        }
        // Dropping the session closes its outbound channel.
    }

    /// The transport went away.
    pub fn disconnect(&mut self, conn: ConnectionId) {
        if let Some((_, Some(player))) = self.close(conn, ConnectionPhase::Disconnected) {
            self.broadcast(ServerPacket::PlayerDisconnect { name: player.name });
        }
    }

    fn close(&mut self, conn: ConnectionId, phase: ConnectionPhase) -> Option<(Session, Option<Player>)> {
        let mut session = self.sessions.remove(&conn)?;
        session.phase = phase;
        let player = self.world.remove_player(conn);
        match &player {
            Some(player) => info!("Player {} ({}) left: {:?}", player.name, conn, session.phase),
            None => info!("Connection {} closed: {:?}", conn, session.phase),
        }
        Some((session, player))
    }

    /// Movement, consumption, deaths, then stale-heartbeat eviction.
    pub fn physics_tick(&mut self, now: Instant) {
        self.tick_count += 1;
        let tick = self.tick_count;
        let border = self.world.border;

        for player in self.world.players_mut() {
            let aim = player.aim();
            for cell in &mut player.cells {
                cell.step(aim, &self.config.player, &border);
            }
            split::merge_or_separate(player, &self.config, tick, &border);
        }
        for pellet in &mut self.world.pellets {
            pellet.step(&border);
        }

        collision::resolve_consumption(&mut self.world, &self.config, tick);
        for death in collision::resolve_player_eating(&mut self.world) {
            self.on_death(death);
        }
        self.evict_stale(now);
    }

    fn on_death(&mut self, death: PlayerDeath) {
        let PlayerDeath { victim, eaten_by } = death;
        info!("Player {} ({}) was eaten by {}", victim.name, victim.id, eaten_by);
        if let Some(session) = self.sessions.get_mut(&victim.id) {
            session.phase = ConnectionPhase::Dying;
            session.send(ServerPacket::Rip);
        }
        self.broadcast_except(victim.id, ServerPacket::PlayerDied { name: victim.name });
    }

    fn evict_stale(&mut self, now: Instant) {
        let timeout = self.config.server.heartbeat_timeout();
        let stale: Vec<(ConnectionId, Duration)> = self
            .world
            .players()
            .iter()
            .filter_map(|p| {
                let silent = now.saturating_duration_since(p.last_heartbeat);
                (silent > timeout).then_some((p.id, silent))
            })
            .collect();
        for (conn, silent) in stale {
            self.reject(conn, GameError::HeartbeatTimeout(silent));
        }
    }

    /// Leaderboard recomputation, then decay and replenishment.
    pub fn slow_tick(&mut self) {
        if self.leaderboard.recompute(self.world.players()) {
            debug!("Leaderboard changed");
        }
        let report = balance::balance(&mut self.world, &self.config);
        let counts = self.world.counts();
        debug!(
            "World: {} players, {} cells, {} food, {} pellets, {} viruses | decayed {:.2}, food +{}/-{}, viruses +{}",
            counts.players,
            counts.cells,
            counts.food,
            counts.pellets,
            counts.viruses,
            report.decayed,
            report.food_added,
            report.food_removed,
            report.viruses_added
        );
    }

    /// Per-connection snapshots, plus the leaderboard when it changed.
    pub fn broadcast_tick(&mut self) {
        for session in self.sessions.values() {
            if !session.wants_snapshots() {
                continue;
            }
            let snapshot = if session.is_spectator() {
                visibility::everything(&self.world).into_snapshot(visibility::spectator_state(&self.world))
            } else {
                let Some(player) = self.world.player(session.id) else {
                    continue;
                };
                visibility::cull(&self.world, player).into_snapshot(visibility::player_state(player, &player.cells))
            };
            session.send(ServerPacket::Snapshot(snapshot));
        }

        if let Some(update) = self.leaderboard.take_changed() {
            self.broadcast(ServerPacket::Leaderboard(update));
        }
    }

    pub fn player_summaries(&self) -> Vec<PlayerSummary> {
        self.world
            .players()
            .iter()
            .map(|p| PlayerSummary {
                id: p.id,
                name: p.name.clone(),
                wallet_address: p.identity.clone(),
                mass_total: p.mass_total(),
                cells_count: p.cells.len(),
            })
            .collect()
    }

    fn send_to(&self, conn: ConnectionId, packet: ServerPacket) {
        if let Some(session) = self.sessions.get(&conn) {
            session.send(packet);
        }
    }

    fn broadcast(&self, packet: ServerPacket) {
        for session in self.sessions.values() {
            session.send(packet.clone());
        }
    }

    fn broadcast_except(&self, except: ConnectionId, packet: ServerPacket) {
        for session in self.sessions.values().filter(|s| s.id != except) {
            session.send(packet.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::packets::ScreenSize;
    use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver};

    struct Client {
        rx: UnboundedReceiver<ServerPacket>,
    }

    impl Client {
        fn drain(&mut self) -> Vec<ServerPacket> {
            let mut packets = Vec::new();
            while let Ok(packet) = self.rx.try_recv() {
                packets.push(packet);
            }
            packets
        }

        fn is_closed(&mut self) -> bool {
            self.drain();
            matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
        }
    }

    fn game() -> GameState {
        let mut config = Config::default();
        config.server.admin_password = "secret".to_string();
        GameState::new(config)
    }

    fn connect(game: &mut GameState, conn: ConnectionId, kind: ConnectionKind) -> Client {
        let (tx, rx) = mpsc::unbounded_channel();
        game.connect(conn, kind, tx);
        Client { rx }
    }

    fn gotit(name: &str) -> ClientPacket {
        ClientPacket::Handshake(Some(Handshake {
            name: name.to_string(),
            ..Default::default()
        }))
    }

    fn join(game: &mut GameState, conn: ConnectionId, name: &str, now: Instant) -> Client {
        let mut client = connect(game, conn, ConnectionKind::Player);
        game.handle_event(Event::Message { conn, packet: gotit(name) }, now);
        client.drain();
        client
    }

    fn place(game: &mut GameState, conn: ConnectionId, position: Vec2, mass: f32) {
        let cell = &mut game.world.player_mut(conn).unwrap().cells[0];
        cell.position = position;
        cell.set_mass(mass);
    }

    fn kick_reason(packets: &[ServerPacket]) -> Option<&str> {
        packets.iter().find_map(|p| match p {
            ServerPacket::Kick { reason } => Some(reason.as_str()),
            _ => None,
        })
    }

    #[test]
    fn test_handshake_registers_player() {
        let now = Instant::now();
        let mut game = game();
        let mut watcher = join(&mut game, 1, "watcher", now);
        let mut client = connect(&mut game, 2, ConnectionKind::Player);

        match client.drain().as_slice() {
            [ServerPacket::Welcome { player, world }] => {
                assert_eq!(player.id, 2);
                assert_eq!(world.width, 5000.0);
            }
            other => panic!("expected welcome, got {:?}", other),
        }
        assert_eq!(game.session(2).unwrap().phase, ConnectionPhase::Handshaking);

        game.handle_event(Event::Message { conn: 2, packet: gotit("<b>blob</b>") }, now);
        let player = game.world.player(2).unwrap();
        assert_eq!(player.name, "blob");
        assert_eq!(player.mass_total(), 10.0);
        assert!(game.world.border.contains(player.center()));
        assert_eq!(game.session(2).unwrap().phase, ConnectionPhase::Active);
        assert_eq!(
            watcher.drain(),
            vec![ServerPacket::PlayerJoin { name: "blob".into() }]
        );
    }

    #[test]
    fn test_invalid_nickname_is_kicked() {
        let mut game = game();
        let mut client = connect(&mut game, 1, ConnectionKind::Player);
        client.drain();
        game.handle_event(Event::Message { conn: 1, packet: gotit("   ") }, Instant::now());

        assert_eq!(kick_reason(&client.drain()), Some("Invalid username."));
        assert!(client.is_closed());
        assert!(game.session(1).is_none());
        assert!(game.world.players().is_empty());
    }

    #[test]
    fn test_duplicate_handshake_is_kicked() {
        let now = Instant::now();
        let mut game = game();
        let mut client = join(&mut game, 1, "blob", now);
        game.handle_event(Event::Message { conn: 1, packet: gotit("blob") }, now);
        assert_eq!(kick_reason(&client.drain()), Some("Duplicate handshake."));
        assert!(game.world.player(1).is_none());
    }

    #[test]
    fn test_malformed_input_is_kicked() {
        let mut game = game();
        let mut client = connect(&mut game, 1, ConnectionKind::Player);
        let error = ClientPacket::parse("{not json").unwrap_err();
        game.handle_event(Event::Malformed { conn: 1, error }, Instant::now());
        assert_eq!(kick_reason(&client.drain()), Some("Malformed message."));
        assert!(client.is_closed());
    }

    #[test]
    fn test_commands_before_handshake_are_ignored() {
        let mut game = game();
        let mut client = connect(&mut game, 1, ConnectionKind::Player);
        client.drain();
        for packet in [ClientPacket::Split, ClientPacket::Eject] {
            game.handle_event(Event::Message { conn: 1, packet }, Instant::now());
        }
        assert!(client.drain().is_empty());
        assert!(game.session(1).is_some());
    }

    #[test]
    fn test_heartbeat_timeout_evicts() {
        let start = Instant::now();
        let mut game = game();
        let mut quiet = join(&mut game, 1, "quiet", start);
        let mut chatty = join(&mut game, 2, "chatty", start);

        let beat = ClientPacket::Heartbeat(Target { x: 0.0, y: 0.0 });
        game.handle_event(Event::Message { conn: 2, packet: beat }, start + Duration::from_secs(4));
        game.physics_tick(start + Duration::from_millis(4900));
        assert!(game.world.player(1).is_some());

        game.physics_tick(start + Duration::from_secs(6));
        let reason = kick_reason(&quiet.drain()).map(str::to_string);
        assert!(reason.unwrap().starts_with("Last heartbeat received over"));
        assert!(quiet.is_closed());
        assert!(game.world.player(1).is_none());
        assert!(game.world.player(2).is_some());
        assert!(chatty
            .drain()
            .contains(&ServerPacket::PlayerDisconnect { name: "quiet".into() }));
    }

    #[test]
    fn test_only_live_players_time_out() {
        let start = Instant::now();
        let mut game = game();
        let _hunter = join(&mut game, 1, "hunter", start);
        let mut prey = join(&mut game, 2, "prey", start);
        let mut pending = connect(&mut game, 3, ConnectionKind::Player);
        place(&mut game, 1, Vec2::new(2000.0, 2000.0), 200.0);
        place(&mut game, 2, Vec2::new(2000.0, 2000.0), 50.0);
        game.physics_tick(start);
        assert_eq!(game.session(2).unwrap().phase, ConnectionPhase::Dying);

        game.physics_tick(start + Duration::from_secs(30));
        assert!(game.world.player(1).is_none());
        assert_eq!(kick_reason(&prey.drain()), None);
        assert_eq!(kick_reason(&pending.drain()), None);
        assert_eq!(game.session(2).unwrap().phase, ConnectionPhase::Dying);
        assert_eq!(game.session(3).unwrap().phase, ConnectionPhase::Handshaking);
    }

    #[test]
    fn test_eject_needs_mass_and_spares_emitter() {
        let now = Instant::now();
        let mut game = game();
        let _client = join(&mut game, 1, "blob", now);
        place(&mut game, 1, Vec2::new(2500.0, 2500.0), 10.0);

        game.handle_event(Event::Message { conn: 1, packet: ClientPacket::Eject }, now);
        assert!(game.world.pellets.is_empty());

        place(&mut game, 1, Vec2::new(2500.0, 2500.0), 100.0);
        game.handle_event(
            Event::Message {
                conn: 1,
                packet: ClientPacket::Heartbeat(Target { x: 300.0, y: 0.0 }),
            },
            now,
        );
        game.handle_event(Event::Message { conn: 1, packet: ClientPacket::Eject }, now);
        assert_eq!(game.world.pellets.len(), 1);
        assert_eq!(game.world.player(1).unwrap().mass_total(), 80.0);

        game.physics_tick(now);
        assert_eq!(game.world.pellets.len(), 1);
        assert!(game.world.pellets[0].position.x > 2500.0);
    }

    #[test]
    fn test_eject_and_split_at_edge_stay_in_world() {
        let now = Instant::now();
        let mut game = game();
        let _client = join(&mut game, 1, "edge", now);
        place(&mut game, 1, Vec2::new(5.0, 2500.0), 400.0);
        game.handle_event(
            Event::Message {
                conn: 1,
                packet: ClientPacket::Heartbeat(Target { x: -1000.0, y: 0.0 }),
            },
            now,
        );

        game.handle_event(Event::Message { conn: 1, packet: ClientPacket::Eject }, now);
        game.handle_event(Event::Message { conn: 1, packet: ClientPacket::Split }, now);

        let border = game.world.border;
        assert_eq!(game.world.pellets.len(), 1);
        assert!(border.contains(game.world.pellets[0].position));
        let player = game.world.player(1).unwrap();
        assert_eq!(player.cells.len(), 2);
        assert!(player.cells.iter().all(|c| border.contains(c.position)));
    }

    #[test]
    fn test_admin_auth_and_kick() {
        let now = Instant::now();
        let mut game = game();
        let mut admin = join(&mut game, 1, "boss", now);
        let mut target = join(&mut game, 2, "pest", now);
        admin.drain();

        // Wrong password: logged, no state change, no kick.
        game.handle_event(
            Event::Message {
                conn: 1,
                packet: ClientPacket::AdminAuth { password: "guess".into() },
            },
            now,
        );
        assert!(!game.session(1).unwrap().admin);
        assert!(matches!(admin.drain().as_slice(), [ServerPacket::ServerMessage { .. }]));

        // Not an admin yet.
        let kick = ClientPacket::AdminKick {
            name: "pest".into(),
            reason: "spam".into(),
        };
        game.handle_event(Event::Message { conn: 1, packet: kick.clone() }, now);
        assert!(game.world.player(2).is_some());

        game.handle_event(
            Event::Message {
                conn: 1,
                packet: ClientPacket::AdminAuth { password: "secret".into() },
            },
            now,
        );
        assert!(game.session(1).unwrap().admin);
        assert!(game.world.player(1).unwrap().admin);
        admin.drain();

        game.handle_event(Event::Message { conn: 1, packet: kick }, now);
        assert_eq!(kick_reason(&target.drain()), Some("Kicked by an admin: spam"));
        assert!(target.is_closed());
        assert!(game.world.player(2).is_none());
        assert!(admin.drain().contains(&ServerPacket::ServerMessage {
            message: "User pest was kicked by boss".into()
        }));
    }

    #[test]
    fn test_leaderboard_only_on_change() {
        let now = Instant::now();
        let mut game = game();
        let mut client = join(&mut game, 1, "a", now);
        let _other = join(&mut game, 2, "b", now);
        place(&mut game, 1, Vec2::new(1000.0, 1000.0), 50.0);
        place(&mut game, 2, Vec2::new(4000.0, 4000.0), 80.0);

        let leaderboards = |client: &mut Client| {
            client
                .drain()
                .into_iter()
                .filter_map(|p| match p {
                    ServerPacket::Leaderboard(update) => Some(update),
                    _ => None,
                })
                .collect::<Vec<_>>()
        };

        game.slow_tick();
        game.broadcast_tick();
        let updates = leaderboards(&mut client);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].leaderboard[0].name, "b");

        game.broadcast_tick();
        game.slow_tick();
        game.broadcast_tick();
        assert!(leaderboards(&mut client).is_empty());

        place(&mut game, 1, Vec2::new(1000.0, 1000.0), 500.0);
        game.slow_tick();
        game.broadcast_tick();
        let updates = leaderboards(&mut client);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].leaderboard[0].name, "a");
    }

    #[test]
    fn test_snapshots_follow_phase() {
        let now = Instant::now();
        let mut game = game();
        let mut player = join(&mut game, 1, "blob", now);
        let mut pending = connect(&mut game, 2, ConnectionKind::Player);
        let mut spectator = connect(&mut game, 3, ConnectionKind::Spectator);
        pending.drain();
        assert!(matches!(spectator.drain().as_slice(), [ServerPacket::Welcome { .. }]));

        game.broadcast_tick();
        match player.drain().as_slice() {
            [ServerPacket::Snapshot(snapshot)] => {
                assert_eq!(snapshot.player.id, 1);
                assert_eq!(snapshot.player.cells.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(pending.drain().is_empty());
        match spectator.drain().as_slice() {
            [ServerPacket::Snapshot(snapshot)] => {
                assert_eq!(snapshot.player.mass_total, 0.0);
                assert_eq!(snapshot.players.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_spectator_bare_gotit() {
        let now = Instant::now();
        let mut game = game();
        let mut watcher = join(&mut game, 1, "watcher", now);
        let mut spectator = connect(&mut game, 2, ConnectionKind::Spectator);
        spectator.drain();

        let packet = ClientPacket::parse(r#"{"type":"gotit"}"#).unwrap();
        game.handle_event(Event::Message { conn: 2, packet }, now);
        assert_eq!(game.session(2).unwrap().phase, ConnectionPhase::Active);
        assert_eq!(kick_reason(&spectator.drain()), None);
        assert_eq!(watcher.drain(), vec![ServerPacket::PlayerJoin { name: String::new() }]);
    }

    #[test]
    fn test_death_and_respawn() {
        let now = Instant::now();
        let mut game = game();
        let mut hunter = join(&mut game, 1, "hunter", now);
        let mut prey = join(&mut game, 2, "prey", now);
        hunter.drain();
        place(&mut game, 1, Vec2::new(2000.0, 2000.0), 200.0);
        place(&mut game, 2, Vec2::new(2000.0, 2000.0), 50.0);

        game.physics_tick(now);
        assert!(game.world.player(2).is_none());
        assert_eq!(game.world.player(1).unwrap().mass_total(), 250.0);
        assert_eq!(prey.drain(), vec![ServerPacket::Rip]);
        assert_eq!(hunter.drain(), vec![ServerPacket::PlayerDied { name: "prey".into() }]);
        assert_eq!(game.session(2).unwrap().phase, ConnectionPhase::Dying);

        // Dead players cannot steer, and a stray gotit is not a duplicate.
        let beat = ClientPacket::Heartbeat(Target { x: 1.0, y: 1.0 });
        game.handle_event(Event::Message { conn: 2, packet: beat }, now);
        game.handle_event(Event::Message { conn: 2, packet: gotit("prey") }, now);
        assert!(game.session(2).is_some());
        assert!(game.world.player(2).is_none());

        game.handle_event(Event::Message { conn: 2, packet: ClientPacket::Respawn }, now);
        assert!(matches!(prey.drain().as_slice(), [ServerPacket::Welcome { .. }]));
        game.handle_event(Event::Message { conn: 2, packet: gotit("prey") }, now);
        assert!(game.world.player(2).is_some());
        assert_eq!(game.session(2).unwrap().phase, ConnectionPhase::Active);
    }

    #[test]
    fn test_disconnect_notifies_others() {
        let now = Instant::now();
        let mut game = game();
        let mut stays = join(&mut game, 1, "stays", now);
        let _leaves = join(&mut game, 2, "leaves", now);
        stays.drain();

        game.handle_event(Event::Disconnect { conn: 2 }, now);
        assert!(game.world.player(2).is_none());
        assert_eq!(
            stays.drain(),
            vec![ServerPacket::PlayerDisconnect { name: "leaves".into() }]
        );
        // A late disconnect for a kicked or unknown connection is harmless.
        game.handle_event(Event::Disconnect { conn: 2 }, now);
        assert_eq!(game.connection_count(), 1);
    }

    #[test]
    fn test_chat_ping_and_resize() {
        let now = Instant::now();
        let mut game = game();
        let mut speaker = join(&mut game, 1, "talker", now);
        let mut listener = join(&mut game, 2, "listener", now);
        speaker.drain();

        game.handle_event(
            Event::Message {
                conn: 1,
                packet: ClientPacket::Chat {
                    sender: "someone_else".into(),
                    message: "<b>hello</b> everyone, this line is far too long to keep".into(),
                },
            },
            now,
        );
        match listener.drain().as_slice() {
            [ServerPacket::Chat { sender, message }] => {
                assert_eq!(sender, "talker");
                assert_eq!(message.chars().count(), naming::MAX_CHAT_LENGTH);
                assert!(message.starts_with("hello everyone"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(speaker.drain().is_empty());

        game.handle_event(Event::Message { conn: 1, packet: ClientPacket::PingCheck }, now);
        assert_eq!(speaker.drain(), vec![ServerPacket::PongCheck]);

        let resize = ClientPacket::WindowResized(ScreenSize {
            screen_width: 640.0,
            screen_height: 480.0,
        });
        game.handle_event(Event::Message { conn: 1, packet: resize }, now);
        assert_eq!(game.world.player(1).unwrap().screen, Vec2::new(640.0, 480.0));
    }

    #[test]
    fn test_player_summaries() {
        let now = Instant::now();
        let mut game = game();
        let _client = connect(&mut game, 4, ConnectionKind::Player);
        game.handle_event(
            Event::Message {
                conn: 4,
                packet: ClientPacket::Handshake(Some(Handshake {
                    name: "wallet".into(),
                    wallet_address: Some("5Grw".into()),
                    ..Default::default()
                })),
            },
            now,
        );
        let summaries = game.player_summaries();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].wallet_address.as_deref(), Some("5Grw"));
        assert_eq!(summaries[0].cells_count, 1);
    }
}

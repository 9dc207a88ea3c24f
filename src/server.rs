//! Session manager: accepts connections, runs one task per socket, and
//! applies every decoded command on a single event loop so all game-state
//! mutation is serialized. Individual connection failures never take the
//! server down.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use anyhow::Result;
use log::{debug, info, warn};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{interval, timeout};

use crate::command::{self, JoinRequest};
use crate::common::GameRuleError;
use crate::config::ServerConfig;
use crate::frame::{read_frame, Frame, FrameKind, ProtocolError};
use crate::game::{GameSession, Phase};
use crate::registry::{ConnectionId, Registry, Role};
use crate::relay::Relay;

/// What a connection task reports back to the session loop.
enum ConnEvent {
    Frame(ConnectionId, Frame),
    /// A frame that failed to decode; its bytes were already consumed.
    Fault(ConnectionId, ProtocolError),
    Closed(ConnectionId),
}

enum MatchEnd {
    Victory,
    Forfeit,
}

/// Run the server on `listener` until the listener itself fails.
pub async fn run(listener: TcpListener, config: ServerConfig) -> Result<()> {
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let mut session = Session {
        registry: Registry::new(&config),
        game: GameSession::new(),
        relay: Relay::new(),
        config,
        events_tx,
    };
    let mut sweep = interval(session.config.sweep_period);
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                session.handle_accept(stream, peer);
            }
            Some(event) = events_rx.recv() => {
                session.handle_event(event);
            }
            _ = sweep.tick() => {
                session.handle_tick(Instant::now());
            }
        }
    }
}

/// The single writer of all shared state. Everything here is synchronous;
/// I/O happens in the per-connection tasks.
struct Session {
    registry: Registry,
    game: GameSession,
    relay: Relay,
    config: ServerConfig,
    events_tx: mpsc::UnboundedSender<ConnEvent>,
}

impl Session {
    fn handle_accept(&mut self, stream: TcpStream, peer: SocketAddr) {
        let id = self.registry.accept(Instant::now());
        let outbound = self.relay.register(id);
        spawn_connection(
            id,
            stream,
            self.events_tx.clone(),
            outbound,
            self.config.send_timeout,
        );
        info!("connection {} accepted from {}", id, peer);
        self.relay.send_text(
            id,
            FrameKind::Chat,
            "Welcome to Battleship! Join with a name to play.",
        );
    }

    fn handle_event(&mut self, event: ConnEvent) {
        match event {
            ConnEvent::Frame(id, frame) => self.handle_frame(id, frame),
            ConnEvent::Fault(id, fault) => self.handle_fault(id, fault),
            ConnEvent::Closed(id) => self.handle_closed(id),
        }
    }

    fn handle_frame(&mut self, id: ConnectionId, frame: Frame) {
        if !self.registry.contains(id) {
            return;
        }
        self.registry.touch(id, Instant::now());
        if let Err(fault) = self.registry.note_seq(id, frame.seq) {
            self.handle_fault(id, fault);
            return;
        }
        let payload = frame.payload_text();
        match frame.kind {
            FrameKind::Join => self.handle_join(id, &payload),
            FrameKind::Place => self.handle_place(id, &payload),
            FrameKind::Fire => self.handle_fire(id, &payload),
            FrameKind::Chat => self.handle_chat(id, &payload),
            FrameKind::StateSync => self.send_snapshot(id),
            FrameKind::Ping => self.relay.send_text(id, FrameKind::Pong, ""),
            FrameKind::Pong => {}
            FrameKind::Quit => self.handle_quit(id),
            FrameKind::Error => debug!("connection {} reported: {}", id, payload),
        }
    }

    /// Protocol faults are reported back and counted; past the threshold
    /// the connection is done, though a seated player keeps the normal
    /// reconnect grace.
    fn handle_fault(&mut self, id: ConnectionId, fault: ProtocolError) {
        if !self.registry.contains(id) {
            return;
        }
        warn!("connection {}: protocol fault: {}", id, fault);
        self.relay
            .send_text(id, FrameKind::Error, &fault.to_string());
        if self.registry.record_fault(id) {
            self.relay.send_text(
                id,
                FrameKind::Error,
                "Too many protocol faults. Closing connection.",
            );
            self.drop_with_grace(id);
        }
    }

    fn handle_closed(&mut self, id: ConnectionId) {
        if !self.registry.contains(id) {
            return;
        }
        debug!("connection {} closed by peer", id);
        self.drop_with_grace(id);
    }

    fn handle_join(&mut self, id: ConnectionId, payload: &str) {
        match command::parse_join(command::strip_verb(payload, "join")) {
            JoinRequest::Resume { token } => self.handle_resume(id, &token),
            JoinRequest::Fresh { name } => {
                if self.registry.is_joined(id) {
                    return self.reject(id, GameRuleError::AlreadyJoined);
                }
                self.registry.set_name(id, &name);
                // Token first, so the client holds it before anything can
                // go wrong with the connection.
                if let Some(token) = self.registry.token(id).map(str::to_string) {
                    self.relay.send_text(id, FrameKind::Join, &token);
                }
                match self.game.seat_player(&name) {
                    Some(seat) => {
                        self.registry.promote(id, Role::Player(seat));
                        info!("connection {} seated as player {} ({})", id, seat, name);
                        self.relay.send_text(
                            id,
                            FrameKind::Chat,
                            &format!("You are Player {} ({}).", seat + 1, name),
                        );
                        self.announce_others(
                            id,
                            &format!("{} joined as Player {}.", name, seat + 1),
                        );
                        if self.game.phase() == Phase::Placement {
                            self.announce_all("Both players joined. Place your ships.");
                        }
                    }
                    None => {
                        self.registry.promote(id, Role::Spectator);
                        info!("connection {} spectating ({})", id, name);
                        self.relay.send_text(
                            id,
                            FrameKind::Chat,
                            "The match is full. You are spectating.",
                        );
                        self.announce_others(id, &format!("{} is spectating.", name));
                        self.send_snapshot(id);
                    }
                }
            }
        }
    }

    fn handle_resume(&mut self, id: ConnectionId, token: &str) {
        if self.registry.is_joined(id) {
            return self.reject(id, GameRuleError::AlreadyJoined);
        }
        match self.registry.reconnect(token, id, Instant::now()) {
            Ok((seat, name)) => {
                self.relay.send_text(id, FrameKind::Join, token);
                self.relay.send_text(
                    id,
                    FrameKind::Chat,
                    &format!("Welcome back, {}. You are Player {}.", name, seat + 1),
                );
                self.announce_others(id, &format!("{} reconnected.", name));
                // Full resync; the client's old view is not trusted.
                self.send_snapshot(id);
            }
            Err(err) => {
                self.relay.send_text(id, FrameKind::Error, &err.to_string());
            }
        }
    }

    fn handle_place(&mut self, id: ConnectionId, payload: &str) {
        let seat = match self.player_seat(id) {
            Ok(seat) => seat,
            Err(err) => return self.reject(id, err),
        };
        let parsed = command::parse_place(command::strip_verb(payload, "place"));
        let (class, origin, orientation) = match parsed {
            Ok(parts) => parts,
            Err(err) => return self.reject(id, err),
        };
        match self.game.place(seat, class, origin, orientation) {
            Ok(report) => {
                self.relay.send_text(
                    id,
                    FrameKind::Place,
                    &format!("Placed {} at {}.", report.ship, report.origin),
                );
                if report.fleet_complete {
                    let name = self.seat_display_name(seat);
                    self.announce_others(id, &format!("{} has placed all ships.", name));
                }
                if report.battle_started {
                    let first = self.seat_display_name(0);
                    self.announce_all(&format!("All ships placed. {} fires first.", first));
                }
            }
            Err(err) => self.reject(id, err),
        }
    }

    fn handle_fire(&mut self, id: ConnectionId, payload: &str) {
        let seat = match self.player_seat(id) {
            Ok(seat) => seat,
            Err(err) => return self.reject(id, err),
        };
        let coord = match command::parse_fire(command::strip_verb(payload, "fire")) {
            Ok(coord) => coord,
            Err(err) => return self.reject(id, err),
        };
        match self.game.fire(seat, coord) {
            Ok(report) => {
                let name = self.seat_display_name(seat);
                let others: Vec<ConnectionId> = self
                    .registry
                    .ids()
                    .into_iter()
                    .filter(|&other| other != id)
                    .collect();
                self.relay
                    .broadcast_shot(Some(id), &others, &name, report.coord, &report.outcome);
                if let Some(winner) = report.winner {
                    self.finish_match(winner, MatchEnd::Victory);
                }
            }
            Err(err) => self.reject(id, err),
        }
    }

    fn handle_chat(&mut self, id: ConnectionId, payload: &str) {
        let Some(name) = self.registry.name(id).map(str::to_string) else {
            return self.reject(id, GameRuleError::NotJoined);
        };
        let ids = self.registry.ids();
        self.relay
            .relay_chat(&ids, &name, command::strip_verb(payload, "chat"));
    }

    fn handle_quit(&mut self, id: ConnectionId) {
        self.relay.send_text(id, FrameKind::Quit, "Goodbye.");
        let role = self.registry.role(id);
        let name = self.registry.name(id).map(str::to_string);
        self.drop_connection(id);
        match role {
            Some(Role::Player(seat)) => {
                let name = self.seat_display_name(seat);
                if let Some(winner) = self.game.forfeit(seat) {
                    info!("player {} quit, seat {} forfeits", name, seat);
                    self.announce_all(&format!("{} quit the match.", name));
                    self.finish_match(winner, MatchEnd::Forfeit);
                } else {
                    self.game.vacate(seat);
                    self.announce_all(&format!("{} left the lobby.", name));
                }
            }
            _ => {
                if let Some(name) = name {
                    self.announce_all(&format!("{} left.", name));
                }
            }
        }
    }

    fn handle_tick(&mut self, now: Instant) {
        for id in self.registry.sweep(now) {
            info!("connection {} idle past timeout", id);
            self.relay
                .send_text(id, FrameKind::Error, "Disconnected for inactivity.");
            self.drop_with_grace(id);
        }
        for ticket in self.registry.expire(now) {
            info!(
                "reconnect window expired for {} (seat {})",
                ticket.name, ticket.seat
            );
            if let Some(winner) = self.game.forfeit(ticket.seat) {
                self.announce_all(&format!("{} failed to reconnect in time.", ticket.name));
                self.finish_match(winner, MatchEnd::Forfeit);
            } else {
                self.game.vacate(ticket.seat);
            }
        }
    }

    /// Take a connection down. A player in a live match keeps their seat
    /// parked until the grace deadline; everyone else is simply removed.
    fn drop_with_grace(&mut self, id: ConnectionId) {
        self.relay.unregister(id);
        match self.registry.role(id) {
            Some(Role::Player(seat)) if self.game.phase().is_active() => {
                if let Some(ticket) = self.registry.disconnect(id, Instant::now()) {
                    self.announce_all(&format!(
                        "{} disconnected. Holding their seat for {}s.",
                        ticket.name,
                        self.config.reconnect_grace.as_secs()
                    ));
                } else {
                    self.game.vacate(seat);
                }
            }
            Some(Role::Player(seat)) => {
                let name = self.seat_display_name(seat);
                self.registry.remove(id);
                self.game.vacate(seat);
                self.announce_all(&format!("{} left the lobby.", name));
            }
            Some(_) => {
                let name = self.registry.name(id).map(str::to_string);
                self.registry.remove(id);
                if let Some(name) = name {
                    self.announce_all(&format!("{} left.", name));
                }
            }
            None => {}
        }
    }

    /// Remove a connection with no grace (quit, post-match teardown).
    fn drop_connection(&mut self, id: ConnectionId) {
        self.relay.unregister(id);
        self.registry.remove(id);
    }

    /// Final announcements, then teardown and spectator promotion.
    fn finish_match(&mut self, winner: u8, end: MatchEnd) {
        let loser = 1 - winner;
        let winner_name = self.seat_display_name(winner);
        if let Some(wid) = self.registry.id_for_seat(winner) {
            self.relay.send_text(wid, FrameKind::Chat, "WIN");
        }
        if let Some(lid) = self.registry.id_for_seat(loser) {
            let text = match end {
                MatchEnd::Victory => "LOSE",
                MatchEnd::Forfeit => "FORFEIT",
            };
            self.relay.send_text(lid, FrameKind::Chat, text);
        }
        let announcement = match end {
            MatchEnd::Victory => format!("{} wins!", winner_name),
            MatchEnd::Forfeit => format!("{} wins by forfeit!", winner_name),
        };
        for spectator in self.registry.spectators() {
            self.relay
                .send_text(spectator, FrameKind::Chat, &announcement);
        }
        info!("match finished: {}", announcement);
        self.end_match();
    }

    /// Vacate both seats, reset the session, and promote waiting spectators
    /// in join order.
    fn end_match(&mut self) {
        for seat in 0..2 {
            if let Some(id) = self.registry.id_for_seat(seat) {
                self.drop_connection(id);
            }
        }
        self.registry.clear_parked();
        self.game.reset();
        for id in self.registry.spectators().into_iter().take(2) {
            let name = self
                .registry
                .name(id)
                .unwrap_or("Anonymous")
                .to_string();
            if let Some(seat) = self.game.seat_player(&name) {
                self.registry.promote(id, Role::Player(seat));
                info!("spectator {} promoted to seat {}", id, seat);
                self.relay.send_text(
                    id,
                    FrameKind::Chat,
                    &format!("You are Player {} ({}).", seat + 1, name),
                );
            }
        }
        if self.game.phase() == Phase::Placement {
            self.announce_all("A new match is starting. Place your ships.");
        }
    }

    fn send_snapshot(&mut self, id: ConnectionId) {
        let viewer = self.registry.seat_of(id);
        let snapshot = self.game.snapshot(viewer);
        match bincode::serialize(&snapshot) {
            Ok(bytes) => self.relay.send(id, FrameKind::StateSync, bytes),
            Err(err) => warn!("snapshot serialization failed: {}", err),
        }
    }

    /// Invalid input is reported to the offender only; nothing shared moves.
    fn reject(&mut self, id: ConnectionId, err: GameRuleError) {
        debug!("connection {} rejected: {}", id, err);
        self.relay.send_text(id, FrameKind::Error, &err.to_string());
    }

    fn player_seat(&self, id: ConnectionId) -> Result<u8, GameRuleError> {
        match self.registry.role(id) {
            Some(Role::Player(seat)) => Ok(seat),
            Some(Role::Spectator) => Err(GameRuleError::RoleNotPermitted),
            _ => Err(GameRuleError::NotJoined),
        }
    }

    fn seat_display_name(&self, seat: u8) -> String {
        self.game
            .seat_name(seat)
            .unwrap_or("Anonymous")
            .to_string()
    }

    fn announce_all(&mut self, text: &str) {
        let ids = self.registry.ids();
        self.relay.broadcast_text(&ids, FrameKind::Chat, text);
    }

    fn announce_others(&mut self, except: ConnectionId, text: &str) {
        let ids: Vec<ConnectionId> = self
            .registry
            .ids()
            .into_iter()
            .filter(|&id| id != except)
            .collect();
        self.relay.broadcast_text(&ids, FrameKind::Chat, text);
    }
}

/// One reader and one writer task per socket. The reader forwards decoded
/// events to the session loop; the writer drains the relay queue so a slow
/// peer never blocks anyone else. Dropping the queue's sender ends the
/// writer, which shuts the socket down and unblocks the reader.
fn spawn_connection(
    id: ConnectionId,
    stream: TcpStream,
    events: mpsc::UnboundedSender<ConnEvent>,
    mut outbound: mpsc::UnboundedReceiver<Frame>,
    send_timeout: Duration,
) {
    let (mut reader, mut writer) = stream.into_split();

    tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            let bytes = match frame.encode() {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!("connection {}: unencodable frame: {}", id, err);
                    continue;
                }
            };
            match timeout(send_timeout, writer.write_all(&bytes)).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    debug!("connection {}: write failed: {}", id, err);
                    break;
                }
                Err(_) => {
                    debug!("connection {}: send timed out, dropping queue", id);
                    break;
                }
            }
        }
        let _ = writer.shutdown().await;
    });

    tokio::spawn(async move {
        loop {
            match read_frame(&mut reader).await {
                Ok(Ok(frame)) => {
                    if events.send(ConnEvent::Frame(id, frame)).is_err() {
                        return;
                    }
                }
                Ok(Err(fault)) => {
                    if events.send(ConnEvent::Fault(id, fault)).is_err() {
                        return;
                    }
                }
                Err(_) => break,
            }
        }
        let _ = events.send(ConnEvent::Closed(id));
    });
}

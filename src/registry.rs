//! Live connection table: identities, roles, activity tracking, inbound
//! sequence checking, and reconnect tickets for players who drop mid-match.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::{debug, info};
use rand::Rng;

use crate::config::ServerConfig;
use crate::frame::ProtocolError;

pub type ConnectionId = u64;

/// What a connection is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Accepted but not yet identified.
    Pending,
    /// Seated player, by seat index.
    Player(u8),
    Spectator,
}

#[derive(Debug)]
struct Connection {
    token: String,
    name: Option<String>,
    role: Role,
    last_activity: Instant,
    /// Highest inbound sequence number accepted so far. The first frame
    /// sets the floor.
    last_seq: Option<u32>,
    faults: u32,
}

/// A seat held open for a disconnected player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectTicket {
    pub token: String,
    pub seat: u8,
    pub name: String,
    pub deadline: Instant,
}

/// Failures rebinding a dropped player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectError {
    UnknownToken,
    ExpiredToken,
}

impl core::fmt::Display for ReconnectError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ReconnectError::UnknownToken => write!(f, "Unknown reconnect token."),
            ReconnectError::ExpiredToken => write!(f, "Reconnect token has expired."),
        }
    }
}

impl std::error::Error for ReconnectError {}

/// The registry owns the transport-to-identity binding and nothing else:
/// game data belongs to the session, sockets to their tasks.
pub struct Registry {
    next_id: ConnectionId,
    connections: HashMap<ConnectionId, Connection>,
    /// Accept order, which doubles as spectator promotion order.
    join_order: Vec<ConnectionId>,
    parked: Vec<ReconnectTicket>,
    inactivity_timeout: Duration,
    reconnect_grace: Duration,
    fault_threshold: u32,
}

impl Registry {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            next_id: 0,
            connections: HashMap::new(),
            join_order: Vec::new(),
            parked: Vec::new(),
            inactivity_timeout: config.inactivity_timeout,
            reconnect_grace: config.reconnect_grace,
            fault_threshold: config.fault_threshold,
        }
    }

    /// Admit a fresh transport with a PENDING role and a new identity token.
    pub fn accept(&mut self, now: Instant) -> ConnectionId {
        let id = self.next_id;
        self.next_id += 1;
        self.connections.insert(
            id,
            Connection {
                token: fresh_token(),
                name: None,
                role: Role::Pending,
                last_activity: now,
                last_seq: None,
                faults: 0,
            },
        );
        self.join_order.push(id);
        debug!("connection {} admitted", id);
        id
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    pub fn token(&self, id: ConnectionId) -> Option<&str> {
        self.connections.get(&id).map(|c| c.token.as_str())
    }

    pub fn role(&self, id: ConnectionId) -> Option<Role> {
        self.connections.get(&id).map(|c| c.role)
    }

    pub fn promote(&mut self, id: ConnectionId, role: Role) {
        if let Some(conn) = self.connections.get_mut(&id) {
            conn.role = role;
        }
    }

    pub fn name(&self, id: ConnectionId) -> Option<&str> {
        self.connections.get(&id).and_then(|c| c.name.as_deref())
    }

    pub fn set_name(&mut self, id: ConnectionId, name: &str) {
        if let Some(conn) = self.connections.get_mut(&id) {
            conn.name = Some(name.to_string());
        }
    }

    /// Identified connections have sent a JOIN.
    pub fn is_joined(&self, id: ConnectionId) -> bool {
        self.name(id).is_some()
    }

    /// Record activity; called for every inbound frame.
    pub fn touch(&mut self, id: ConnectionId, now: Instant) {
        if let Some(conn) = self.connections.get_mut(&id) {
            conn.last_activity = now;
        }
    }

    /// Enforce strictly increasing inbound sequence numbers. A stale frame
    /// is reported, never applied.
    pub fn note_seq(&mut self, id: ConnectionId, seq: u32) -> Result<(), ProtocolError> {
        let Some(conn) = self.connections.get_mut(&id) else {
            return Ok(());
        };
        match conn.last_seq {
            Some(last) if seq <= last => Err(ProtocolError::StaleSequence { last, got: seq }),
            _ => {
                conn.last_seq = Some(seq);
                Ok(())
            }
        }
    }

    /// Count one protocol fault; true once the connection has used up its
    /// tolerance and must be dropped.
    pub fn record_fault(&mut self, id: ConnectionId) -> bool {
        match self.connections.get_mut(&id) {
            Some(conn) => {
                conn.faults += 1;
                conn.faults >= self.fault_threshold
            }
            None => false,
        }
    }

    pub fn seat_of(&self, id: ConnectionId) -> Option<u8> {
        match self.role(id) {
            Some(Role::Player(seat)) => Some(seat),
            _ => None,
        }
    }

    /// Connection currently bound to `seat`, if the player is online.
    pub fn id_for_seat(&self, seat: u8) -> Option<ConnectionId> {
        self.join_order
            .iter()
            .copied()
            .find(|id| self.seat_of(*id) == Some(seat))
    }

    /// All live connections in accept order.
    pub fn ids(&self) -> Vec<ConnectionId> {
        self.join_order.clone()
    }

    /// Spectators in accept order, the promotion queue for the next match.
    pub fn spectators(&self) -> Vec<ConnectionId> {
        self.join_order
            .iter()
            .copied()
            .filter(|id| self.role(*id) == Some(Role::Spectator))
            .collect()
    }

    /// Connections idle past the inactivity timeout. The caller decides how
    /// to take them down; sweeping itself mutates nothing.
    pub fn sweep(&self, now: Instant) -> Vec<ConnectionId> {
        self.join_order
            .iter()
            .copied()
            .filter(|id| {
                self.connections
                    .get(id)
                    .is_some_and(|c| now.duration_since(c.last_activity) > self.inactivity_timeout)
            })
            .collect()
    }

    /// Drop a connection outright. Quit and post-match teardown; no seat is
    /// held open.
    pub fn remove(&mut self, id: ConnectionId) {
        self.connections.remove(&id);
        self.join_order.retain(|other| *other != id);
    }

    /// Detach a connection, holding a seated player's place open until the
    /// grace deadline. The ticket's token is the one the client was issued
    /// at JOIN.
    pub fn disconnect(&mut self, id: ConnectionId, now: Instant) -> Option<ReconnectTicket> {
        let conn = self.connections.remove(&id)?;
        self.join_order.retain(|other| *other != id);
        let Role::Player(seat) = conn.role else {
            return None;
        };
        let ticket = ReconnectTicket {
            token: conn.token,
            seat,
            name: conn.name.unwrap_or_else(|| "Anonymous".to_string()),
            deadline: now + self.reconnect_grace,
        };
        info!(
            "seat {} parked for reconnection ({}s grace)",
            seat,
            self.reconnect_grace.as_secs()
        );
        self.parked.push(ticket.clone());
        Some(ticket)
    }

    /// Rebind a fresh connection to a parked seat. The caller must follow
    /// up with a full STATE_SYNC; no partial diff is trusted across a
    /// reconnect.
    pub fn reconnect(
        &mut self,
        token: &str,
        id: ConnectionId,
        now: Instant,
    ) -> Result<(u8, String), ReconnectError> {
        let at = self
            .parked
            .iter()
            .position(|t| t.token == token)
            .ok_or(ReconnectError::UnknownToken)?;
        if now >= self.parked[at].deadline {
            // Left parked; the expiry tick turns it into a forfeit.
            return Err(ReconnectError::ExpiredToken);
        }
        let ticket = self.parked.remove(at);
        if let Some(conn) = self.connections.get_mut(&id) {
            conn.token = ticket.token;
            conn.name = Some(ticket.name.clone());
            conn.role = Role::Player(ticket.seat);
        }
        info!("seat {} rebound to connection {}", ticket.seat, id);
        Ok((ticket.seat, ticket.name))
    }

    /// Tickets whose grace deadline has passed. Each one forfeits.
    pub fn expire(&mut self, now: Instant) -> Vec<ReconnectTicket> {
        let (expired, kept) = self
            .parked
            .drain(..)
            .partition(|ticket| now >= ticket.deadline);
        self.parked = kept;
        expired
    }

    /// Void any outstanding tickets, done when a match ends.
    pub fn clear_parked(&mut self) {
        self.parked.clear();
    }

    pub fn parked_seat(&self, seat: u8) -> bool {
        self.parked.iter().any(|t| t.seat == seat)
    }
}

/// 128 random bits, hex-encoded. Opaque to clients.
fn fresh_token() -> String {
    format!("{:032x}", rand::rng().random::<u128>())
}

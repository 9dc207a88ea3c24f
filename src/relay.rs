//! Outbound fan-out: one frame queue per connection, server-side sequence
//! stamping, and the shot/chat/announcement broadcast helpers.
//!
//! Delivery is best-effort. Each recipient sees frames in FIFO order
//! relative to every other broadcast, but nothing is linearized across
//! recipients; a slow peer only ever stalls its own queue.

use std::collections::HashMap;

use log::debug;
use tokio::sync::mpsc;

use crate::common::{Coord, ShotOutcome};
use crate::frame::{Frame, FrameKind};
use crate::registry::ConnectionId;

struct Outbound {
    tx: mpsc::UnboundedSender<Frame>,
    seq: u32,
}

/// Owns every per-connection outbound queue. Dropping a queue's sender is
/// how the session tells that connection's writer task to finish and close
/// the socket.
#[derive(Default)]
pub struct Relay {
    queues: HashMap<ConnectionId, Outbound>,
}

impl Relay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a queue for a fresh connection; the receiver goes to its writer
    /// task.
    pub fn register(&mut self, id: ConnectionId) -> mpsc::UnboundedReceiver<Frame> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.queues.insert(id, Outbound { tx, seq: 0 });
        rx
    }

    /// Drop the queue. Frames already queued still flush; the writer task
    /// then shuts the socket down.
    pub fn unregister(&mut self, id: ConnectionId) {
        self.queues.remove(&id);
    }

    /// Queue one frame, stamping the server's per-connection sequence
    /// number. Sends to an unknown or dead connection are dropped.
    pub fn send(&mut self, id: ConnectionId, kind: FrameKind, payload: Vec<u8>) {
        let Some(outbound) = self.queues.get_mut(&id) else {
            return;
        };
        outbound.seq += 1;
        let frame = Frame::new(outbound.seq, kind, payload);
        if outbound.tx.send(frame).is_err() {
            debug!("connection {}: writer gone, dropping queue", id);
            self.queues.remove(&id);
        }
    }

    pub fn send_text(&mut self, id: ConnectionId, kind: FrameKind, text: &str) {
        self.send(id, kind, text.as_bytes().to_vec());
    }

    pub fn broadcast_text(&mut self, ids: &[ConnectionId], kind: FrameKind, text: &str) {
        for &id in ids {
            self.send_text(id, kind, text);
        }
    }

    /// Chat is global to the match, sender included: `[name] message`.
    pub fn relay_chat(&mut self, ids: &[ConnectionId], name: &str, message: &str) {
        let line = format!("[{}] {}", name, message);
        self.broadcast_text(ids, FrameKind::Chat, &line);
    }

    /// Fan out one resolved shot: the shooter gets the direct result, every
    /// other connection the public announcement. Neither says more than
    /// miss/hit/sunk reveals.
    pub fn broadcast_shot(
        &mut self,
        shooter: Option<ConnectionId>,
        others: &[ConnectionId],
        name: &str,
        coord: Coord,
        outcome: &ShotOutcome,
    ) {
        if let Some(id) = shooter {
            self.send_text(id, FrameKind::Fire, &shot_text(outcome));
        }
        let announcement = format!("{} fired at {}: {}", name, coord, public_shot_text(outcome));
        self.broadcast_text(others, FrameKind::Fire, &announcement);
    }
}

/// Direct response text for the shooter.
pub fn shot_text(outcome: &ShotOutcome) -> String {
    match outcome {
        ShotOutcome::Miss => "MISS".to_string(),
        ShotOutcome::Hit => "HIT".to_string(),
        ShotOutcome::Sunk(name) => format!("HIT! You sank the {}!", name),
    }
}

fn public_shot_text(outcome: &ShotOutcome) -> String {
    match outcome {
        ShotOutcome::Miss => "MISS".to_string(),
        ShotOutcome::Hit => "HIT".to_string(),
        ShotOutcome::Sunk(name) => format!("HIT! The {} was sunk!", name),
    }
}

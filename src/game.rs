//! The authoritative game state machine: lobby, placement, turn-based
//! firing, and completion. Pure in-memory logic; mutators return typed
//! reports the session manager turns into frames.

use serde::{Deserialize, Serialize};

use crate::board::{Board, CellState};
use crate::common::{Coord, GameRuleError, ShotOutcome};
use crate::config::BOARD_SIZE;
use crate::ship::{Orientation, ShipClass};

/// Lifecycle of one match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Fewer than two seated players.
    Lobby,
    /// Both seats filled; each player places ships independently.
    Placement,
    /// Turn-based firing, strict alternation.
    InProgress,
    /// One fleet destroyed, or a forfeit.
    Finished,
}

impl Phase {
    /// A match is underway: a departing player forfeits rather than vacates.
    pub fn is_active(&self) -> bool {
        matches!(self, Phase::Placement | Phase::InProgress)
    }
}

/// One resolved shot, in resolution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotRecord {
    pub seat: u8,
    pub coord: Coord,
    pub outcome: ShotOutcome,
}

/// Role-filtered view of one board. Hits, misses, and sunk-ship names are
/// public; intact ship cells show only to the board's owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardView {
    pub grid: Vec<Vec<CellState>>,
    pub ships_remaining: u8,
    pub sunk: Vec<String>,
}

impl BoardView {
    fn from_board(board: &Board, reveal: bool) -> Self {
        Self {
            grid: board.view(reveal),
            ships_remaining: board.ships_remaining() as u8,
            sunk: board.sunk_ships().iter().map(|s| s.to_string()).collect(),
        }
    }

    fn empty() -> Self {
        let size = BOARD_SIZE as usize;
        Self {
            grid: vec![vec![CellState::Empty; size]; size],
            ships_remaining: 0,
            sunk: Vec::new(),
        }
    }
}

/// Role-filtered image of the whole session: the STATE_SYNC payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub phase: Phase,
    /// Active seat while a battle is in progress.
    pub turn: Option<u8>,
    /// The recipient's seat; `None` for spectators.
    pub you: Option<u8>,
    pub winner: Option<u8>,
    pub names: [Option<String>; 2],
    /// Indexed by seat.
    pub boards: [BoardView; 2],
    /// Every resolved shot, in order.
    pub shots: Vec<ShotRecord>,
}

/// What a placement changed, for the session manager to announce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementReport {
    pub ship: &'static str,
    pub origin: Coord,
    /// The placing player now has all five ships down.
    pub fleet_complete: bool,
    /// Both fleets are complete; the battle has started.
    pub battle_started: bool,
}

/// What a resolved shot did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShotReport {
    pub seat: u8,
    pub coord: Coord,
    pub outcome: ShotOutcome,
    /// Set when this shot destroyed the last ship.
    pub winner: Option<u8>,
}

struct Seat {
    name: String,
    board: Board,
}

/// One match: two seats, a phase, a turn, and the shot log. Seat data
/// survives a player's disconnection; the connection registry tracks which
/// transport, if any, is currently bound to each seat.
pub struct GameSession {
    phase: Phase,
    seats: [Option<Seat>; 2],
    turn: u8,
    shots: Vec<ShotRecord>,
    winner: Option<u8>,
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new()
    }
}

impl GameSession {
    pub fn new() -> Self {
        Self {
            phase: Phase::Lobby,
            seats: [None, None],
            turn: 0,
            shots: Vec::new(),
            winner: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Active seat, only while a battle is running.
    pub fn turn(&self) -> Option<u8> {
        (self.phase == Phase::InProgress).then_some(self.turn)
    }

    pub fn winner(&self) -> Option<u8> {
        self.winner
    }

    pub fn seat_name(&self, seat: u8) -> Option<&str> {
        self.seats
            .get(seat as usize)
            .and_then(|s| s.as_ref())
            .map(|s| s.name.as_str())
    }

    pub fn shots(&self) -> &[ShotRecord] {
        &self.shots
    }

    /// Fill the first free seat during the lobby. Returns the seat index, or
    /// `None` when the match is full or already underway (the caller makes
    /// the sender a spectator). Filling the second seat opens placement.
    pub fn seat_player(&mut self, name: &str) -> Option<u8> {
        if self.phase != Phase::Lobby {
            return None;
        }
        let seat = self.seats.iter().position(|s| s.is_none())?;
        self.seats[seat] = Some(Seat {
            name: name.to_string(),
            board: Board::new(),
        });
        if self.seats.iter().all(Option::is_some) {
            self.phase = Phase::Placement;
        }
        Some(seat as u8)
    }

    /// Empty a seat without a forfeit (lobby departure, post-match cleanup).
    pub fn vacate(&mut self, seat: u8) {
        if let Some(slot) = self.seats.get_mut(seat as usize) {
            *slot = None;
        }
    }

    /// Place one ship for `seat`. Rejections leave the board untouched; the
    /// battle starts the moment both fleets are complete, seat 0 to fire
    /// first.
    pub fn place(
        &mut self,
        seat: u8,
        class: ShipClass,
        origin: Coord,
        orientation: Orientation,
    ) -> Result<PlacementReport, GameRuleError> {
        if self.phase != Phase::Placement {
            return Err(GameRuleError::PlacementClosed);
        }
        let slot = self
            .seats
            .get_mut(seat as usize)
            .and_then(Option::as_mut)
            .ok_or(GameRuleError::RoleNotPermitted)?;
        slot.board.place(class, origin, orientation)?;
        let fleet_complete = slot.board.fleet_complete();
        let battle_started = self
            .seats
            .iter()
            .all(|s| s.as_ref().is_some_and(|s| s.board.fleet_complete()));
        if battle_started {
            self.phase = Phase::InProgress;
            self.turn = 0;
        }
        Ok(PlacementReport {
            ship: class.name(),
            origin,
            fleet_complete,
            battle_started,
        })
    }

    /// Resolve a shot from `seat` against the opposing board. The turn
    /// passes on every resolved shot regardless of outcome; rejected shots
    /// consume nothing.
    pub fn fire(&mut self, seat: u8, coord: Coord) -> Result<ShotReport, GameRuleError> {
        if self.phase != Phase::InProgress {
            return Err(GameRuleError::NotInBattle);
        }
        if seat != self.turn {
            return Err(GameRuleError::NotYourTurn);
        }
        let target = 1 - seat;
        let opponent = self
            .seats
            .get_mut(target as usize)
            .and_then(Option::as_mut)
            .ok_or(GameRuleError::NotInBattle)?;
        let outcome = opponent.board.fire(coord)?;
        let destroyed = opponent.board.is_fleet_destroyed();
        self.shots.push(ShotRecord {
            seat,
            coord,
            outcome: outcome.clone(),
        });
        let winner = if destroyed {
            self.phase = Phase::Finished;
            self.winner = Some(seat);
            Some(seat)
        } else {
            self.turn = target;
            None
        };
        Ok(ShotReport {
            seat,
            coord,
            outcome,
            winner,
        })
    }

    /// End a live match in the opponent's favor (quit, expired reconnect
    /// window). Returns the winning seat, or `None` when no match was
    /// underway.
    pub fn forfeit(&mut self, seat: u8) -> Option<u8> {
        if !self.phase.is_active() {
            return None;
        }
        let winner = 1 - seat;
        self.phase = Phase::Finished;
        self.winner = Some(winner);
        Some(winner)
    }

    /// Back to an empty lobby for the next match.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Build the snapshot `viewer` is allowed to see. A player sees their
    /// own intact ships; every other board is redacted to hits and misses.
    pub fn snapshot(&self, viewer: Option<u8>) -> StateSnapshot {
        let board_for = |seat: u8| match self.seats[seat as usize].as_ref() {
            Some(slot) => BoardView::from_board(&slot.board, viewer == Some(seat)),
            None => BoardView::empty(),
        };
        StateSnapshot {
            phase: self.phase,
            turn: self.turn(),
            you: viewer,
            winner: self.winner,
            names: [
                self.seat_name(0).map(str::to_string),
                self.seat_name(1).map(str::to_string),
            ],
            boards: [board_for(0), board_for(1)],
            shots: self.shots.clone(),
        }
    }
}

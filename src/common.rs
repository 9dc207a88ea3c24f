//! Shared leaf types: grid coordinates, shot outcomes, and rule errors.

use serde::{Deserialize, Serialize};

use crate::config::BOARD_SIZE;

/// A cell on the grid. Zero-based internally; the wire form is column letter
/// plus row number ("E6" is column E, row 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub row: u8,
    pub col: u8,
}

impl Coord {
    pub fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    pub fn in_bounds(&self) -> bool {
        self.row < BOARD_SIZE && self.col < BOARD_SIZE
    }
}

impl core::fmt::Display for Coord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}{}", (b'A' + self.col) as char, self.row + 1)
    }
}

/// Result of a resolved shot. Part of the STATE_SYNC snapshot, so the sunk
/// ship's name is carried owned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShotOutcome {
    /// No ship at the target cell.
    Miss,
    /// Hit an undamaged ship segment.
    Hit,
    /// Hit the last intact segment of a ship, carrying its name.
    Sunk(String),
}

/// Rule violations. Rejected with a message; game state is never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameRuleError {
    /// Ship would extend past the edge of the grid.
    OutOfBounds,
    /// Ship would cross a cell another ship occupies.
    Overlap,
    /// This ship of the fleet is already on the board.
    DuplicateShip(&'static str),
    /// Name does not match any ship in the fleet.
    UnknownShip(String),
    /// Coordinate text did not parse.
    BadCoordinate(String),
    /// Orientation was neither H nor V.
    BadOrientation(String),
    /// Command was missing a required argument.
    MissingArgument(&'static str),
    /// Cell was fired at earlier.
    AlreadyTargeted,
    /// Command arrived from the seat not holding the turn.
    NotYourTurn,
    /// Placement attempted outside the placement phase.
    PlacementClosed,
    /// Shot attempted while no battle is running.
    NotInBattle,
    /// Command requires a seat the sender does not hold.
    RoleNotPermitted,
    /// Sender has not identified itself yet.
    NotJoined,
    /// Sender already identified itself.
    AlreadyJoined,
}

impl core::fmt::Display for GameRuleError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            GameRuleError::OutOfBounds => {
                write!(f, "Cannot place ship there: out of bounds.")
            }
            GameRuleError::Overlap => {
                write!(f, "Cannot place ship there: overlaps another ship.")
            }
            GameRuleError::DuplicateShip(name) => {
                write!(f, "{} is already placed.", name)
            }
            GameRuleError::UnknownShip(name) => write!(f, "Unknown ship: {}.", name),
            GameRuleError::BadCoordinate(s) => write!(f, "Invalid coordinate: {}.", s),
            GameRuleError::BadOrientation(s) => {
                write!(f, "Invalid orientation: {} (use H or V).", s)
            }
            GameRuleError::MissingArgument(what) => write!(f, "Missing {}.", what),
            GameRuleError::AlreadyTargeted => {
                write!(f, "You've already fired at that location.")
            }
            GameRuleError::NotYourTurn => write!(f, "Not your turn."),
            GameRuleError::PlacementClosed => write!(f, "Placement is not open."),
            GameRuleError::NotInBattle => write!(f, "There is no battle in progress."),
            GameRuleError::RoleNotPermitted => {
                write!(f, "Only seated players can do that.")
            }
            GameRuleError::NotJoined => write!(f, "Join with a name first."),
            GameRuleError::AlreadyJoined => write!(f, "You have already joined."),
        }
    }
}

//! Ship classes and placed ships.

use serde::{Deserialize, Serialize};

use crate::common::{Coord, GameRuleError};
use crate::config::{BOARD_SIZE, FLEET};

/// Orientation of a ship on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    /// Parse the single-letter wire form, case-insensitively.
    pub fn parse(s: &str) -> Result<Self, GameRuleError> {
        match s {
            "H" | "h" => Ok(Orientation::Horizontal),
            "V" | "v" => Ok(Orientation::Vertical),
            other => Err(GameRuleError::BadOrientation(other.to_string())),
        }
    }
}

/// Class of ship: name and length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShipClass {
    name: &'static str,
    length: usize,
}

impl ShipClass {
    pub const fn new(name: &'static str, length: usize) -> Self {
        Self { name, length }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Look up a fleet ship class by name, case-insensitively.
    pub fn by_name(name: &str) -> Option<ShipClass> {
        FLEET
            .iter()
            .copied()
            .find(|class| class.name.eq_ignore_ascii_case(name))
    }
}

/// A ship placed on the grid, with its occupied cells in placement order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ship {
    class: ShipClass,
    cells: Vec<Coord>,
    hits: usize,
}

impl Ship {
    /// Lay out a ship from `origin` in `orientation`, validating bounds.
    pub fn new(
        class: ShipClass,
        origin: Coord,
        orientation: Orientation,
    ) -> Result<Self, GameRuleError> {
        if !origin.in_bounds() {
            return Err(GameRuleError::OutOfBounds);
        }
        let len = class.length() as u8;
        let fits = match orientation {
            Orientation::Horizontal => origin.col + len <= BOARD_SIZE,
            Orientation::Vertical => origin.row + len <= BOARD_SIZE,
        };
        if !fits {
            return Err(GameRuleError::OutOfBounds);
        }
        let cells = (0..len)
            .map(|i| match orientation {
                Orientation::Horizontal => Coord::new(origin.row, origin.col + i),
                Orientation::Vertical => Coord::new(origin.row + i, origin.col),
            })
            .collect();
        Ok(Ship {
            class,
            cells,
            hits: 0,
        })
    }

    pub fn class(&self) -> ShipClass {
        self.class
    }

    pub fn name(&self) -> &'static str {
        self.class.name()
    }

    pub fn cells(&self) -> &[Coord] {
        &self.cells
    }

    pub fn occupies(&self, coord: Coord) -> bool {
        self.cells.contains(&coord)
    }

    /// Record one hit. The board rejects repeat shots, so every call lands on
    /// a fresh segment.
    pub fn register_hit(&mut self) {
        if self.hits < self.class.length() {
            self.hits += 1;
        }
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    /// All segments hit.
    pub fn is_sunk(&self) -> bool {
        self.hits == self.class.length()
    }
}

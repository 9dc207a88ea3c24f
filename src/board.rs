//! Per-player grid and fleet bookkeeping.

use serde::{Deserialize, Serialize};

use crate::common::{Coord, GameRuleError, ShotOutcome};
use crate::config::{BOARD_SIZE, NUM_SHIPS};
use crate::ship::{Orientation, Ship, ShipClass};

const SIZE: usize = BOARD_SIZE as usize;

/// One grid cell as the owning player sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellState {
    Empty,
    Ship,
    Hit,
    Miss,
}

/// A 10x10 grid plus the fleet placed on it.
#[derive(Debug, Clone)]
pub struct Board {
    grid: [[CellState; SIZE]; SIZE],
    ships: Vec<Ship>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        Self {
            grid: [[CellState::Empty; SIZE]; SIZE],
            ships: Vec::with_capacity(NUM_SHIPS),
        }
    }

    /// Place one ship. A rejected placement leaves the board untouched.
    pub fn place(
        &mut self,
        class: ShipClass,
        origin: Coord,
        orientation: Orientation,
    ) -> Result<(), GameRuleError> {
        if self.ships.iter().any(|s| s.name() == class.name()) {
            return Err(GameRuleError::DuplicateShip(class.name()));
        }
        let ship = Ship::new(class, origin, orientation)?;
        if ship
            .cells()
            .iter()
            .any(|&c| self.cell(c) != CellState::Empty)
        {
            return Err(GameRuleError::Overlap);
        }
        for &c in ship.cells() {
            self.grid[c.row as usize][c.col as usize] = CellState::Ship;
        }
        self.ships.push(ship);
        Ok(())
    }

    /// Resolve an incoming shot. A previously targeted cell is rejected and
    /// nothing is mutated.
    pub fn fire(&mut self, coord: Coord) -> Result<ShotOutcome, GameRuleError> {
        if !coord.in_bounds() {
            return Err(GameRuleError::BadCoordinate(coord.to_string()));
        }
        match self.cell(coord) {
            CellState::Hit | CellState::Miss => Err(GameRuleError::AlreadyTargeted),
            CellState::Empty => {
                self.grid[coord.row as usize][coord.col as usize] = CellState::Miss;
                Ok(ShotOutcome::Miss)
            }
            CellState::Ship => {
                self.grid[coord.row as usize][coord.col as usize] = CellState::Hit;
                for ship in &mut self.ships {
                    if ship.occupies(coord) {
                        ship.register_hit();
                        if ship.is_sunk() {
                            return Ok(ShotOutcome::Sunk(ship.name().to_string()));
                        }
                        break;
                    }
                }
                Ok(ShotOutcome::Hit)
            }
        }
    }

    /// Authoritative win check: the whole fleet is placed and every ship sunk.
    pub fn is_fleet_destroyed(&self) -> bool {
        self.fleet_complete() && self.ships.iter().all(Ship::is_sunk)
    }

    pub fn fleet_complete(&self) -> bool {
        self.ships.len() == NUM_SHIPS
    }

    pub fn cell(&self, coord: Coord) -> CellState {
        self.grid[coord.row as usize][coord.col as usize]
    }

    pub fn ships(&self) -> &[Ship] {
        &self.ships
    }

    pub fn ships_remaining(&self) -> usize {
        self.ships.iter().filter(|s| !s.is_sunk()).count()
    }

    pub fn sunk_ships(&self) -> Vec<&'static str> {
        self.ships
            .iter()
            .filter(|s| s.is_sunk())
            .map(Ship::name)
            .collect()
    }

    /// Copy of the grid for a snapshot. With `reveal` false, intact ship
    /// cells are reported as empty; hits and misses always show.
    pub fn view(&self, reveal: bool) -> Vec<Vec<CellState>> {
        self.grid
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&cell| match cell {
                        CellState::Ship if !reveal => CellState::Empty,
                        other => other,
                    })
                    .collect()
            })
            .collect()
    }
}

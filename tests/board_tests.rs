use battleship_server::{
    Board, CellState, Coord, GameRuleError, Orientation, ShipClass, ShotOutcome, BOARD_SIZE,
    FLEET, FLEET_CELLS, NUM_SHIPS,
};
use proptest::prelude::*;
use rand::{rngs::SmallRng, Rng, SeedableRng};

fn coord(text: &str) -> Coord {
    battleship_server::parse_coordinate(text).unwrap()
}

/// The fixed row-per-ship layout: each ship horizontal at column A.
fn place_fleet(board: &mut Board) {
    for (row, class) in FLEET.iter().enumerate() {
        board
            .place(*class, Coord::new(row as u8, 0), Orientation::Horizontal)
            .unwrap();
    }
}

fn ship_cell_count(board: &Board) -> usize {
    board
        .view(true)
        .iter()
        .flatten()
        .filter(|cell| matches!(cell, CellState::Ship | CellState::Hit))
        .count()
}

#[test]
fn full_fleet_occupies_seventeen_cells() {
    let mut board = Board::new();
    place_fleet(&mut board);
    assert!(board.fleet_complete());
    assert_eq!(board.ships().len(), NUM_SHIPS);
    assert_eq!(ship_cell_count(&board), FLEET_CELLS);
}

#[test]
fn duplicate_ship_is_rejected() {
    let mut board = Board::new();
    board
        .place(FLEET[0], coord("A1"), Orientation::Horizontal)
        .unwrap();
    assert_eq!(
        board.place(FLEET[0], coord("A7"), Orientation::Horizontal),
        Err(GameRuleError::DuplicateShip("Carrier"))
    );
    assert_eq!(board.ships().len(), 1);
}

#[test]
fn overlap_is_rejected_and_leaves_board_unchanged() {
    let mut board = Board::new();
    board
        .place(FLEET[0], coord("A1"), Orientation::Horizontal)
        .unwrap();
    assert_eq!(
        board.place(FLEET[4], coord("C1"), Orientation::Vertical),
        Err(GameRuleError::Overlap)
    );
    assert_eq!(ship_cell_count(&board), FLEET[0].length());
}

#[test]
fn out_of_bounds_placements_are_rejected() {
    let mut board = Board::new();
    // Carrier is five long: G1 horizontal runs off the J column.
    assert_eq!(
        board.place(FLEET[0], coord("G1"), Orientation::Horizontal),
        Err(GameRuleError::OutOfBounds)
    );
    assert_eq!(
        board.place(FLEET[0], coord("A7"), Orientation::Vertical),
        Err(GameRuleError::OutOfBounds)
    );
    // F1 is the last horizontal origin that fits.
    assert!(board
        .place(FLEET[0], coord("F1"), Orientation::Horizontal)
        .is_ok());
}

#[test]
fn fire_reports_miss_hit_and_sunk() {
    let mut board = Board::new();
    place_fleet(&mut board);
    assert_eq!(board.fire(coord("J10")).unwrap(), ShotOutcome::Miss);
    assert_eq!(board.fire(coord("A5")).unwrap(), ShotOutcome::Hit);
    assert_eq!(
        board.fire(coord("B5")).unwrap(),
        ShotOutcome::Sunk("Destroyer".to_string())
    );
    assert_eq!(board.ships_remaining(), NUM_SHIPS - 1);
    assert_eq!(board.sunk_ships(), vec!["Destroyer"]);
}

#[test]
fn retargeting_is_rejected_without_mutation() {
    let mut board = Board::new();
    place_fleet(&mut board);
    board.fire(coord("A5")).unwrap();
    board.fire(coord("J10")).unwrap();
    // Both a hit cell and a miss cell refuse a second shot.
    assert_eq!(board.fire(coord("A5")), Err(GameRuleError::AlreadyTargeted));
    assert_eq!(
        board.fire(coord("J10")),
        Err(GameRuleError::AlreadyTargeted)
    );
    // The Destroyer still has exactly one hit: the next fresh cell sinks it.
    assert_eq!(
        board.fire(coord("B5")).unwrap(),
        ShotOutcome::Sunk("Destroyer".to_string())
    );
}

#[test]
fn fleet_destroyed_only_when_complete_and_all_sunk() {
    let mut board = Board::new();
    board
        .place(FLEET[4], coord("A1"), Orientation::Horizontal)
        .unwrap();
    board.fire(coord("A1")).unwrap();
    board.fire(coord("B1")).unwrap();
    // One sunk ship is not a destroyed fleet while four are unplaced.
    assert!(!board.is_fleet_destroyed());

    let mut board = Board::new();
    place_fleet(&mut board);
    for row in 0..NUM_SHIPS as u8 {
        for col in 0..FLEET[row as usize].length() as u8 {
            board.fire(Coord::new(row, col)).unwrap();
        }
        assert_eq!(board.is_fleet_destroyed(), row == NUM_SHIPS as u8 - 1);
    }
}

#[test]
fn ship_class_lookup_is_case_insensitive() {
    assert_eq!(ShipClass::by_name("carrier").unwrap().length(), 5);
    assert_eq!(ShipClass::by_name("SUBMARINE").unwrap().length(), 3);
    assert!(ShipClass::by_name("Dinghy").is_none());
}

/// Place the whole fleet at random, retrying rejected positions.
fn random_fleet(seed: u64) -> Board {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut board = Board::new();
    for class in FLEET {
        loop {
            let origin = Coord::new(
                rng.random_range(0..BOARD_SIZE),
                rng.random_range(0..BOARD_SIZE),
            );
            let orientation = if rng.random_bool(0.5) {
                Orientation::Horizontal
            } else {
                Orientation::Vertical
            };
            if board.place(class, origin, orientation).is_ok() {
                break;
            }
        }
    }
    board
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_valid_fleet_covers_seventeen_cells(seed in any::<u64>()) {
        let board = random_fleet(seed);
        prop_assert_eq!(board.ships().len(), NUM_SHIPS);
        prop_assert_eq!(ship_cell_count(&board), FLEET_CELLS);
        // No double occupancy: per-ship cells sum to the grid count.
        let placed: usize = board.ships().iter().map(|s| s.cells().len()).sum();
        prop_assert_eq!(placed, FLEET_CELLS);
    }

    #[test]
    fn second_shot_at_a_cell_never_mutates(
        seed in any::<u64>(),
        row in 0..BOARD_SIZE,
        col in 0..BOARD_SIZE,
    ) {
        let mut board = random_fleet(seed);
        let target = Coord::new(row, col);
        board.fire(target).unwrap();
        let remaining = board.ships_remaining();
        let hits: Vec<usize> = board.ships().iter().map(|s| s.hits()).collect();
        prop_assert_eq!(board.fire(target), Err(GameRuleError::AlreadyTargeted));
        prop_assert_eq!(board.ships_remaining(), remaining);
        let hits_after: Vec<usize> = board.ships().iter().map(|s| s.hits()).collect();
        prop_assert_eq!(hits_after, hits);
    }
}

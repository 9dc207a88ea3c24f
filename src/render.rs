//! Text rendering of snapshot grids. The engine only supplies snapshots;
//! this is the human-facing collaborator used by the demo client.

use crate::board::CellState;
use crate::config::BOARD_SIZE;

/// Render one snapshot grid with column letters across the top and row
/// numbers down the side.
pub fn render_grid(grid: &[Vec<CellState>]) -> String {
    let mut out = String::new();
    out.push_str("   ");
    for col in 0..BOARD_SIZE {
        out.push((b'A' + col) as char);
        out.push(' ');
    }
    out.push('\n');
    for (row, cells) in grid.iter().enumerate() {
        out.push_str(&format!("{:>2} ", row + 1));
        for cell in cells {
            out.push(match cell {
                CellState::Empty => '.',
                CellState::Ship => 'S',
                CellState::Hit => 'X',
                CellState::Miss => 'o',
            });
            out.push(' ');
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::common::Coord;
    use crate::config::FLEET;
    use crate::ship::Orientation;

    #[test]
    fn renders_headers_and_cell_glyphs() {
        let mut board = Board::new();
        board
            .place(FLEET[4], Coord::new(0, 0), Orientation::Horizontal)
            .unwrap();
        board.fire(Coord::new(0, 0)).unwrap();
        board.fire(Coord::new(5, 5)).unwrap();

        let text = render_grid(&board.view(true));
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), "   A B C D E F G H I J ");
        let first = lines.next().unwrap();
        // Destroyer at A1/B1: one hit, one intact segment.
        assert!(first.starts_with(" 1 X S ."));
        let sixth = text.lines().nth(6).unwrap();
        assert!(sixth.contains('o'));
        assert_eq!(text.lines().count(), 11);
    }

    #[test]
    fn redacted_view_hides_intact_ships() {
        let mut board = Board::new();
        board
            .place(FLEET[0], Coord::new(2, 0), Orientation::Horizontal)
            .unwrap();
        let text = render_grid(&board.view(false));
        assert!(!text.contains('S'));
    }
}

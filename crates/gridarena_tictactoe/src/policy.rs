//! Scripted opponent for offline matches.

use crate::types::{Board, Mark, SIZE};
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

const CORNERS: [(usize, usize); 4] = [(0, 0), (0, 2), (2, 0), (2, 2)];

/// Picks the next move for the automated player holding `mark`.
///
/// Priority order, each step scanning the whole board:
///
/// 1. a cell that wins immediately,
/// 2. a cell that blocks the opponent's immediate win,
/// 3. the center,
/// 4. a uniformly random empty corner,
/// 5. the first remaining empty cell in row-major order.
///
/// Returns `None` on a full board. The ladder is the contract, not an
/// optimal-play guarantee; it is beatable by a fork.
pub fn next_move<R: Rng + ?Sized>(board: &Board, mark: Mark, rng: &mut R) -> Option<(usize, usize)> {
    if let Some(cell) = winning_cell(board, mark) {
        debug!(x = cell.0, y = cell.1, "Taking winning cell");
        return Some(cell);
    }

    if let Some(cell) = winning_cell(board, mark.opponent()) {
        debug!(x = cell.0, y = cell.1, "Blocking opponent win");
        return Some(cell);
    }

    if board.is_empty(1, 1) {
        return Some((1, 1));
    }

    let open_corners: Vec<(usize, usize)> = CORNERS
        .iter()
        .copied()
        .filter(|&(x, y)| board.is_empty(x, y))
        .collect();
    if let Some(&corner) = open_corners.choose(rng) {
        return Some(corner);
    }

    board.first_empty()
}

/// Finds an empty cell where placing `mark` wins on the spot.
fn winning_cell(board: &Board, mark: Mark) -> Option<(usize, usize)> {
    for x in 0..SIZE {
        for y in 0..SIZE {
            if !board.is_empty(x, y) {
                continue;
            }
            let mut probe = board.clone();
            if probe.place(x, y, mark).is_ok() && probe.winner() == Some(mark) {
                return Some((x, y));
            }
        }
    }
    None
}

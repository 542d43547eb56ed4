//! Per-match mutable state.

use gridarena_tictactoe::{Board, Mark};
use serde::{Deserialize, Serialize};

/// Unique identifier for a match, assigned monotonically by the coordinator.
pub type MatchId = i64;

/// Unique identifier for a player.
pub type PlayerId = i64;

/// Lifecycle status of a match. The transition is one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    /// Moves are accepted.
    Active,
    /// Terminal; the board is frozen.
    Finished,
}

impl MatchStatus {
    /// Wire and storage encoding of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            MatchStatus::Active => "active",
            MatchStatus::Finished => "finished",
        }
    }
}

/// One game's state: participants, board, turn, status, winner.
///
/// Seat A always holds [`Mark::X`] and moves first; seat B holds
/// [`Mark::O`] and is absent in offline matches, where the scripted
/// opponent plays O instead.
#[derive(Debug, Clone)]
pub struct MatchState {
    id: MatchId,
    seat_a: PlayerId,
    seat_b: Option<PlayerId>,
    board: Board,
    turn: Mark,
    status: MatchStatus,
    winner: Option<PlayerId>,
}

impl MatchState {
    /// Creates a new active two-player match.
    pub fn new(id: MatchId, seat_a: PlayerId, seat_b: PlayerId) -> Self {
        Self {
            id,
            seat_a,
            seat_b: Some(seat_b),
            board: Board::new(),
            turn: Mark::X,
            status: MatchStatus::Active,
            winner: None,
        }
    }

    /// Creates a new active offline match with seat B absent.
    pub fn offline(id: MatchId, player: PlayerId) -> Self {
        Self {
            id,
            seat_a: player,
            seat_b: None,
            board: Board::new(),
            turn: Mark::X,
            status: MatchStatus::Active,
            winner: None,
        }
    }

    /// Returns the match id.
    pub fn id(&self) -> MatchId {
        self.id
    }

    /// Returns the seat A occupant.
    pub fn seat_a(&self) -> PlayerId {
        self.seat_a
    }

    /// Returns the seat B occupant, absent for offline matches.
    pub fn seat_b(&self) -> Option<PlayerId> {
        self.seat_b
    }

    /// Returns the board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Returns a mutable reference to the board.
    ///
    /// Callers must go through the coordinator's validation first; the
    /// board must not change once the match is finished.
    pub(crate) fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    /// Returns the mark whose turn it is.
    pub fn turn(&self) -> Mark {
        self.turn
    }

    /// Hands the turn to the given mark.
    pub(crate) fn set_turn(&mut self, mark: Mark) {
        self.turn = mark;
    }

    /// Returns the match status.
    pub fn status(&self) -> MatchStatus {
        self.status
    }

    /// Returns the winning player's id, set on a won terminal match.
    pub fn winner(&self) -> Option<PlayerId> {
        self.winner
    }

    /// Whether seat B is absent.
    pub fn is_offline(&self) -> bool {
        self.seat_b.is_none()
    }

    /// Whether the match has reached its terminal state.
    pub fn is_finished(&self) -> bool {
        self.status == MatchStatus::Finished
    }

    /// Whether the given player occupies a seat in this match.
    pub fn contains(&self, player: PlayerId) -> bool {
        self.seat_a == player || self.seat_b == Some(player)
    }

    /// Returns the mark held by the given player, `None` for outsiders.
    pub fn mark_of(&self, player: PlayerId) -> Option<Mark> {
        if self.seat_a == player {
            Some(Mark::X)
        } else if self.seat_b == Some(player) {
            Some(Mark::O)
        } else {
            None
        }
    }

    /// Returns the player holding the given mark.
    pub fn player_with(&self, mark: Mark) -> Option<PlayerId> {
        match mark {
            Mark::X => Some(self.seat_a),
            Mark::O => self.seat_b,
        }
    }

    /// Returns the other seat's occupant, if present.
    pub fn opponent_of(&self, player: PlayerId) -> Option<PlayerId> {
        if self.seat_a == player {
            self.seat_b
        } else if self.seat_b == Some(player) {
            Some(self.seat_a)
        } else {
            None
        }
    }

    /// All present participants, seat A first.
    pub fn participants(&self) -> impl Iterator<Item = PlayerId> + '_ {
        std::iter::once(self.seat_a).chain(self.seat_b)
    }

    /// Marks the match finished with an optional winner.
    ///
    /// Idempotent: finishing an already-finished match keeps the first
    /// recorded outcome.
    pub(crate) fn finish(&mut self, winner: Option<PlayerId>) {
        if self.status == MatchStatus::Active {
            self.status = MatchStatus::Finished;
            self.winner = winner;
        }
    }

    /// Settles terminal conditions after a move.
    ///
    /// Returns `true` when this call transitioned the match to
    /// [`MatchStatus::Finished`]. A win credits the player holding the
    /// winning mark; a full board with no winner finishes as a draw.
    pub(crate) fn settle(&mut self) -> bool {
        if self.status == MatchStatus::Finished {
            return false;
        }
        if let Some(mark) = self.board.winner() {
            let winner = self.player_with(mark);
            self.finish(winner);
            true
        } else if self.board.is_full() {
            self.finish(None);
            true
        } else {
            false
        }
    }
}

//! Write-behind store worker.
//!
//! The coordinator enqueues commands here and moves on; a blocking
//! worker drains the queue against the repository. Failures are logged
//! and never surface back into match state, which stays authoritative
//! in memory.

use crate::db::{GameOutcome, MatchRepository, MatchUpdate, NewMatch, NewMove, NewPlayer};
use crate::game::{MatchId, MatchState, PlayerId};
use chrono::Utc;
use gridarena_tictactoe::Mark;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A match's persisted fields, captured while the coordinator lock is
/// held and written out after it is released.
#[derive(Debug, Clone)]
pub struct MatchSnapshot {
    /// Match id.
    pub match_id: MatchId,
    /// Seat A occupant.
    pub player_one: PlayerId,
    /// Seat B occupant, absent for offline matches.
    pub player_two: Option<PlayerId>,
    /// Status as stored (`active`/`finished`).
    pub status: String,
    /// Mark to move as stored (`X`/`O`).
    pub turn: String,
    /// Board in its JSON wire encoding.
    pub board: String,
    /// Winning player on a won terminal match.
    pub winner: Option<PlayerId>,
}

impl From<&MatchState> for MatchSnapshot {
    fn from(state: &MatchState) -> Self {
        Self {
            match_id: state.id(),
            player_one: state.seat_a(),
            player_two: state.seat_b(),
            status: state.status().as_str().to_string(),
            turn: state.turn().as_str().to_string(),
            board: serde_json::to_string(state.board()).unwrap_or_else(|_| "[]".to_string()),
            winner: state.winner(),
        }
    }
}

/// One fire-and-forget persistence operation.
#[derive(Debug, Clone)]
pub enum StoreCommand {
    /// Persist a freshly registered player.
    CreatePlayer {
        /// Coordinator-assigned id.
        player: PlayerId,
        /// Generated display name.
        display_name: String,
    },
    /// Persist a freshly created match.
    CreateMatch(MatchSnapshot),
    /// Append a move to the log. `player` is absent for scripted moves.
    RecordMove {
        /// Match the move belongs to.
        match_id: MatchId,
        /// Mover, absent for the scripted opponent.
        player: Option<PlayerId>,
        /// Row coordinate.
        x: i64,
        /// Column coordinate.
        y: i64,
        /// Mark placed.
        mark: Mark,
    },
    /// Re-persist a match after its state changed.
    UpdateMatch(MatchSnapshot),
    /// Bump a player's win/loss/draw tally.
    IncrementStat {
        /// Player whose tally changes.
        player: PlayerId,
        /// Outcome from that player's perspective.
        outcome: GameOutcome,
    },
}

impl StoreCommand {
    fn kind(&self) -> &'static str {
        match self {
            StoreCommand::CreatePlayer { .. } => "create_player",
            StoreCommand::CreateMatch(_) => "create_match",
            StoreCommand::RecordMove { .. } => "record_move",
            StoreCommand::UpdateMatch(_) => "update_match",
            StoreCommand::IncrementStat { .. } => "increment_stat",
        }
    }
}

/// Handle for enqueueing write-behind commands.
#[derive(Debug, Clone)]
pub struct StoreHandle {
    tx: mpsc::UnboundedSender<StoreCommand>,
}

impl StoreHandle {
    /// Spawns the blocking store worker and returns its handle.
    pub fn spawn(repo: MatchRepository) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<StoreCommand>();
        tokio::task::spawn_blocking(move || {
            while let Some(command) = rx.blocking_recv() {
                let kind = command.kind();
                if let Err(e) = apply(&repo, command) {
                    warn!(kind, error = %e, "Write-behind store operation failed");
                }
            }
            debug!("Write-behind store worker stopped");
        });
        Self { tx }
    }

    /// Enqueues a command; dropped with a warning if the worker is gone.
    pub fn record(&self, command: StoreCommand) {
        if self.tx.send(command).is_err() {
            warn!("Write-behind store worker is gone; dropping command");
        }
    }
}

fn apply(repo: &MatchRepository, command: StoreCommand) -> Result<(), crate::db::DbError> {
    match command {
        StoreCommand::CreatePlayer {
            player,
            display_name,
        } => repo.create_player(NewPlayer::new(player, display_name)),
        StoreCommand::CreateMatch(snapshot) => repo.create_match(NewMatch::new(
            snapshot.match_id,
            snapshot.player_one,
            snapshot.player_two,
            snapshot.status,
            snapshot.turn,
            snapshot.board,
            snapshot.winner,
        )),
        StoreCommand::RecordMove {
            match_id,
            player,
            x,
            y,
            mark,
        } => repo.record_move(NewMove::new(
            match_id,
            player,
            x as i32,
            y as i32,
            mark.as_str().to_string(),
        )),
        StoreCommand::UpdateMatch(snapshot) => repo.update_match(
            snapshot.match_id,
            MatchUpdate::new(
                snapshot.status,
                snapshot.turn,
                snapshot.board,
                snapshot.winner,
                Utc::now().naive_utc(),
            ),
        ),
        StoreCommand::IncrementStat { player, outcome } => repo.increment_stat(player, outcome),
    }
}

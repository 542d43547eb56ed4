//! Database models for matches, moves, players, and tallies.

use chrono::NaiveDateTime;
use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;

use crate::db::{DbError, schema};

/// Insertable player row. The id is allocated by the coordinator, not
/// the database.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::players)]
pub struct NewPlayer {
    id: i64,
    display_name: String,
}

/// Match row as stored.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::matches)]
pub struct MatchRow {
    id: i64,
    player_one: i64,
    player_two: Option<i64>,
    status: String,
    turn: String,
    board: String,
    winner_id: Option<i64>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

/// Insertable match row.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::matches)]
pub struct NewMatch {
    id: i64,
    player_one: i64,
    player_two: Option<i64>,
    status: String,
    turn: String,
    board: String,
    winner_id: Option<i64>,
}

/// Changeset applied when a match's state is re-persisted.
#[derive(Debug, Clone, AsChangeset, new)]
#[diesel(table_name = schema::matches)]
pub struct MatchUpdate {
    status: String,
    turn: String,
    board: String,
    winner_id: Option<i64>,
    updated_at: NaiveDateTime,
}

/// Insertable move row. `player_id` is absent for scripted-opponent
/// moves.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::moves)]
pub struct NewMove {
    match_id: i64,
    player_id: Option<i64>,
    x: i32,
    y: i32,
    mark: String,
}

/// Win/loss/draw tally row.
#[derive(Debug, Clone, Queryable, Selectable, Getters)]
#[diesel(table_name = schema::player_stats)]
pub struct PlayerStats {
    player_id: i64,
    wins: i32,
    losses: i32,
    draws: i32,
    updated_at: NaiveDateTime,
}

/// Game outcome from one player's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameOutcome {
    /// The player won.
    Win,
    /// The player lost.
    Loss,
    /// The game ended in a draw.
    Draw,
}

impl GameOutcome {
    /// Converts the outcome to the string stored in the database.
    pub fn to_db_string(self) -> &'static str {
        match self {
            Self::Win => "win",
            Self::Loss => "loss",
            Self::Draw => "draw",
        }
    }

    /// Parses an outcome from its stored string.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] for anything other than a valid outcome value.
    pub fn from_db_string(s: &str) -> Result<Self, DbError> {
        match s {
            "win" => Ok(Self::Win),
            "loss" => Ok(Self::Loss),
            "draw" => Ok(Self::Draw),
            _ => Err(DbError::new(format!("Invalid outcome: '{}'", s))),
        }
    }
}

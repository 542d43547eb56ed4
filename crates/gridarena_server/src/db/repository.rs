//! Database repository for match history and player tallies.

use chrono::Utc;
use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info, instrument};

use crate::db::{DbError, GameOutcome, MatchRow, MatchUpdate, NewMatch, NewMove, NewPlayer, PlayerStats, schema};

/// Embedded schema migrations, applied at startup.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// Database repository for the write-behind match log.
#[derive(Debug, Clone)]
pub struct MatchRepository {
    db_path: String,
}

impl MatchRepository {
    /// Creates a new repository for the database at the given path.
    ///
    /// Use `":memory:"` for an in-memory database (single-connection
    /// tests only: each connection to `":memory:"` is a fresh database).
    pub fn new(db_path: String) -> Self {
        info!(path = %db_path, "Creating MatchRepository");
        Self { db_path }
    }

    /// Establishes a database connection.
    fn connection(&self) -> Result<SqliteConnection, DbError> {
        debug!(path = %self.db_path, "Establishing connection");
        SqliteConnection::establish(&self.db_path)
            .map_err(|e| DbError::new(format!("Failed to connect to '{}': {}", self.db_path, e)))
    }

    /// Applies any pending embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a migration fails to apply.
    #[instrument(skip(self))]
    pub fn run_migrations(&self) -> Result<(), DbError> {
        let mut conn = self.connection()?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| DbError::new(format!("Migration failure: {}", e)))?;
        info!(path = %self.db_path, "Migrations applied");
        Ok(())
    }

    /// Inserts a player row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] on a database error.
    #[instrument(skip(self, player))]
    pub fn create_player(&self, player: NewPlayer) -> Result<(), DbError> {
        let mut conn = self.connection()?;
        diesel::insert_into(schema::players::table)
            .values(&player)
            .execute(&mut conn)?;
        Ok(())
    }

    /// Inserts a new match snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] on a database error.
    #[instrument(skip(self, snapshot))]
    pub fn create_match(&self, snapshot: NewMatch) -> Result<(), DbError> {
        let mut conn = self.connection()?;
        diesel::insert_into(schema::matches::table)
            .values(&snapshot)
            .execute(&mut conn)?;
        Ok(())
    }

    /// Re-persists a match's state.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] on a database error.
    #[instrument(skip(self, update))]
    pub fn update_match(&self, match_id: i64, update: MatchUpdate) -> Result<(), DbError> {
        let mut conn = self.connection()?;
        diesel::update(schema::matches::table.find(match_id))
            .set(&update)
            .execute(&mut conn)?;
        Ok(())
    }

    /// Appends a move to the match log.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] on a database error.
    #[instrument(skip(self, mv))]
    pub fn record_move(&self, mv: NewMove) -> Result<(), DbError> {
        let mut conn = self.connection()?;
        diesel::insert_into(schema::moves::table)
            .values(&mv)
            .execute(&mut conn)?;
        Ok(())
    }

    /// Bumps a player's win/loss/draw tally, creating the row on first
    /// use.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] on a database error.
    #[instrument(skip(self))]
    pub fn increment_stat(&self, player: i64, outcome: GameOutcome) -> Result<(), DbError> {
        use schema::player_stats::dsl;

        let (win, loss, draw) = match outcome {
            GameOutcome::Win => (1, 0, 0),
            GameOutcome::Loss => (0, 1, 0),
            GameOutcome::Draw => (0, 0, 1),
        };
        let now = Utc::now().naive_utc();

        let mut conn = self.connection()?;
        diesel::insert_into(dsl::player_stats)
            .values((
                dsl::player_id.eq(player),
                dsl::wins.eq(win),
                dsl::losses.eq(loss),
                dsl::draws.eq(draw),
                dsl::updated_at.eq(now),
            ))
            .on_conflict(dsl::player_id)
            .do_update()
            .set((
                dsl::wins.eq(dsl::wins + win),
                dsl::losses.eq(dsl::losses + loss),
                dsl::draws.eq(dsl::draws + draw),
                dsl::updated_at.eq(now),
            ))
            .execute(&mut conn)?;

        debug!(player, outcome = outcome.to_db_string(), "Tally updated");
        Ok(())
    }

    /// Total number of matches ever recorded.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] on a database error.
    #[instrument(skip(self))]
    pub fn count_matches(&self) -> Result<i64, DbError> {
        let mut conn = self.connection()?;
        let count = schema::matches::table.count().get_result(&mut conn)?;
        Ok(count)
    }

    /// Reads a player's tally; a missing row reads as `None`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] on a database error.
    #[instrument(skip(self))]
    pub fn player_stats(&self, player: i64) -> Result<Option<PlayerStats>, DbError> {
        let mut conn = self.connection()?;
        let stats = schema::player_stats::table
            .find(player)
            .select(PlayerStats::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(stats)
    }

    /// Loads a match row by id; used by tests and tooling.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] on a database error.
    #[instrument(skip(self))]
    pub fn get_match(&self, match_id: i64) -> Result<Option<MatchRow>, DbError> {
        let mut conn = self.connection()?;
        let row = schema::matches::table
            .find(match_id)
            .select(MatchRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(row)
    }
}

//! Persistence layer: write-behind match log and player tallies.

mod error;
mod models;
mod repository;
mod schema; // Diesel generated schema - internal use only
mod store;

pub use error::DbError;
pub use models::{GameOutcome, MatchRow, MatchUpdate, NewMatch, NewMove, NewPlayer, PlayerStats};
pub use repository::{MIGRATIONS, MatchRepository};
pub use store::{MatchSnapshot, StoreCommand, StoreHandle};

//! Gridarena server - real-time two-player tic-tac-toe coordinator.
//!
//! # Architecture
//!
//! - **Coordinator**: matchmaking queue, live match table, rematch
//!   ballots, disconnect cleanup - the authoritative in-memory core
//! - **Registry**: player identity to live WebSocket outbound channel
//! - **Transport**: axum WebSocket adapter plus HTTP entry endpoints
//! - **Persistence**: write-behind sqlite log of players, matches,
//!   moves, and tallies - never load-bearing for match state
//!
//! # Example
//!
//! ```no_run
//! use gridarena_server::{
//!     AppState, MatchCoordinator, MatchRepository, SessionRegistry, StoreHandle, router,
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let repo = MatchRepository::new("gridarena.db".to_string());
//! repo.run_migrations()?;
//!
//! let store = StoreHandle::spawn(repo.clone());
//! let registry = SessionRegistry::new();
//! let coordinator = Arc::new(MatchCoordinator::new(
//!     registry.clone(),
//!     store,
//!     Duration::from_millis(500),
//! ));
//!
//! let app = router(AppState { coordinator, registry, repo });
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod cli;
mod coordinator;
mod db;
mod game;
mod http;
pub mod names;
mod protocol;
mod registry;
mod ws;

// Crate-level exports - CLI
pub use cli::Cli;

// Crate-level exports - coordinator core
pub use coordinator::{MatchCoordinator, RuleViolation};

// Crate-level exports - match state
pub use game::{MatchId, MatchState, MatchStatus, PlayerId};

// Crate-level exports - session registry
pub use registry::{OutboundSender, SessionRegistry, SessionToken};

// Crate-level exports - wire protocol
pub use protocol::{ClientMessage, ServerMessage};

// Crate-level exports - persistence
pub use db::{
    DbError, GameOutcome, MatchRepository, MatchRow, MatchSnapshot, MatchUpdate, NewMatch, NewMove,
    NewPlayer, PlayerStats, StoreCommand, StoreHandle,
};

// Crate-level exports - HTTP surface
pub use http::{AppState, router};

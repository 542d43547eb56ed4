//! HTTP entry endpoints and router assembly.

use crate::coordinator::MatchCoordinator;
use crate::db::MatchRepository;
use crate::game::{MatchId, PlayerId};
use crate::names;
use crate::registry::SessionRegistry;
use crate::ws;
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// The match coordinator.
    pub coordinator: Arc<MatchCoordinator>,
    /// The session registry, shared with the coordinator.
    pub registry: SessionRegistry,
    /// Read-side repository for the stats endpoints.
    pub repo: MatchRepository,
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/quick-game", post(quick_game))
        .route("/offline-game", post(offline_game))
        .route("/stats", get(stats))
        .route("/offline-stats", get(offline_stats))
        .with_state(state)
}

/// Reply to `POST /quick-game`.
#[derive(Debug, Serialize)]
pub struct QuickGameResponse {
    status: &'static str,
    #[serde(rename = "playerID")]
    player_id: PlayerId,
    nickname: String,
    #[serde(rename = "opponentID", skip_serializing_if = "Option::is_none")]
    opponent_id: Option<PlayerId>,
}

/// `POST /quick-game`: admit an anonymous player and pair or enqueue it.
#[instrument(skip(app))]
pub async fn quick_game(State(app): State<AppState>) -> Json<QuickGameResponse> {
    let nickname = names::generate(&mut rand::thread_rng());
    let player = app.coordinator.register_player(nickname.clone());
    let opponent = app.coordinator.find_opponent(player);
    info!(player, ?opponent, "Quick game requested");

    Json(QuickGameResponse {
        status: if opponent.is_some() { "started" } else { "waiting" },
        player_id: player,
        nickname,
        opponent_id: opponent,
    })
}

/// Reply to `POST /offline-game`.
#[derive(Debug, Serialize)]
pub struct OfflineGameResponse {
    status: &'static str,
    #[serde(rename = "playerID")]
    player_id: PlayerId,
    #[serde(rename = "gameID")]
    game_id: MatchId,
    nickname: String,
}

/// `POST /offline-game`: admit a player into a single-player match.
#[instrument(skip(app))]
pub async fn offline_game(State(app): State<AppState>) -> Json<OfflineGameResponse> {
    let nickname = names::generate(&mut rand::thread_rng());
    let player = app.coordinator.register_player(nickname.clone());
    let game_id = app.coordinator.create_offline_match(player);
    info!(player, game_id, "Offline game requested");

    Json(OfflineGameResponse {
        status: "started",
        player_id: player,
        game_id,
        nickname,
    })
}

/// Reply to `GET /stats`.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    online: usize,
    games: i64,
}

/// `GET /stats`: connected-player and recorded-match counts.
///
/// A store failure degrades the match count to zero; the endpoint never
/// errors.
#[instrument(skip(app))]
pub async fn stats(State(app): State<AppState>) -> Json<StatsResponse> {
    let online = app.registry.online();
    let repo = app.repo.clone();
    let games = match tokio::task::spawn_blocking(move || repo.count_matches()).await {
        Ok(Ok(count)) => count,
        Ok(Err(e)) => {
            warn!(error = %e, "Match count unavailable");
            0
        }
        Err(e) => {
            warn!(error = %e, "Stats task failed");
            0
        }
    };
    Json(StatsResponse { online, games })
}

/// Parameters for `GET /offline-stats`.
#[derive(Debug, Deserialize)]
pub struct OfflineStatsParams {
    /// Player to read the tally for.
    #[serde(rename = "playerID")]
    pub player_id: PlayerId,
}

/// Reply to `GET /offline-stats`.
#[derive(Debug, Default, Serialize)]
pub struct OfflineStatsResponse {
    wins: i32,
    losses: i32,
    draws: i32,
}

/// `GET /offline-stats?playerID=<id>`: a player's win/loss/draw tally.
///
/// Missing rows and store failures both read as zeros.
#[instrument(skip(app))]
pub async fn offline_stats(
    State(app): State<AppState>,
    Query(params): Query<OfflineStatsParams>,
) -> Json<OfflineStatsResponse> {
    let repo = app.repo.clone();
    let player = params.player_id;
    let response = match tokio::task::spawn_blocking(move || repo.player_stats(player)).await {
        Ok(Ok(Some(row))) => OfflineStatsResponse {
            wins: *row.wins(),
            losses: *row.losses(),
            draws: *row.draws(),
        },
        Ok(Ok(None)) => OfflineStatsResponse::default(),
        Ok(Err(e)) => {
            warn!(player, error = %e, "Tally unavailable");
            OfflineStatsResponse::default()
        }
        Err(e) => {
            warn!(player, error = %e, "Tally task failed");
            OfflineStatsResponse::default()
        }
    };
    Json(response)
}

//! Wire messages exchanged with connected clients.
//!
//! JSON objects discriminated by a `type` field. Field names follow the
//! original client protocol (`gameID`, `opponentID`, raw board strings).

use crate::game::{MatchId, MatchStatus, PlayerId};
use gridarena_tictactoe::{Board, Mark};
use serde::{Deserialize, Serialize};

/// Messages a client may send over its WebSocket connection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Place a mark at the given coordinates.
    Move {
        /// Target match.
        #[serde(rename = "gameID")]
        game_id: MatchId,
        /// Row coordinate. Validated by the coordinator, not the codec.
        x: i64,
        /// Column coordinate.
        y: i64,
    },
    /// Advance an offline match by one scripted-opponent move.
    AiMove {
        /// Target match.
        #[serde(rename = "gameID")]
        game_id: MatchId,
    },
    /// Ask the opponent for a rematch after a finished game.
    RematchRequest {
        /// Target match.
        #[serde(rename = "gameID")]
        game_id: MatchId,
    },
    /// Answer a rematch request.
    RematchResponse {
        /// Target match.
        #[serde(rename = "gameID")]
        game_id: MatchId,
        /// Whether the rematch was accepted.
        accepted: bool,
    },
    /// Directly start a fresh match against a known opponent.
    StartRematch {
        /// The other player.
        #[serde(rename = "opponentID")]
        opponent_id: PlayerId,
    },
}

/// Messages the server pushes to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Greeting sent right after the WebSocket is established.
    Connected {
        /// Human-readable greeting.
        message: String,
    },
    /// A paired match has started.
    GameStart {
        /// The new match.
        #[serde(rename = "gameID")]
        game_id: MatchId,
        /// Starting board.
        board: Board,
        /// Mark to move (always X on start).
        turn: Mark,
        /// The recipient's mark.
        role: Mark,
        /// The recipient's opponent.
        #[serde(rename = "opponentID")]
        opponent_id: PlayerId,
        /// The opponent's display name, when known.
        #[serde(rename = "opponentName", skip_serializing_if = "Option::is_none")]
        opponent_name: Option<String>,
    },
    /// A move was applied; the authoritative state after it.
    Move {
        /// The match the move belongs to.
        #[serde(rename = "gameID")]
        game_id: MatchId,
        /// Board after the move.
        board: Board,
        /// Mark to move next.
        turn: Mark,
        /// Match status after the move.
        status: MatchStatus,
        /// Winning player, present only on a won terminal move.
        #[serde(rename = "winnerID", skip_serializing_if = "Option::is_none")]
        winner: Option<PlayerId>,
    },
    /// The scripted opponent moved in an offline match.
    AiMove {
        /// The offline match.
        #[serde(rename = "gameID")]
        game_id: MatchId,
        /// Row played.
        x: i64,
        /// Column played.
        y: i64,
        /// Board after the move.
        board: Board,
        /// Mark to move next.
        turn: Mark,
        /// Match status after the move.
        status: MatchStatus,
    },
    /// The opponent asked for a rematch.
    RematchRequest {
        /// The finished match.
        #[serde(rename = "gameID")]
        game_id: MatchId,
    },
    /// A participant answered the rematch request.
    RematchResponse {
        /// The finished match.
        #[serde(rename = "gameID")]
        game_id: MatchId,
        /// The answer.
        accepted: bool,
    },
    /// A fresh match replaced a finished one.
    StartRematch {
        /// The new match.
        #[serde(rename = "gameID")]
        game_id: MatchId,
        /// Reset board.
        board: Board,
        /// Mark to move (always X).
        turn: Mark,
        /// The recipient's mark.
        role: Mark,
        /// The recipient's opponent.
        #[serde(rename = "opponentID")]
        opponent_id: PlayerId,
        /// The opponent's display name, when known.
        #[serde(rename = "opponentName", skip_serializing_if = "Option::is_none")]
        opponent_name: Option<String>,
    },
    /// The opponent disconnected; the match is over.
    OpponentLeft {
        /// The terminated match.
        #[serde(rename = "gameID")]
        game_id: MatchId,
    },
    /// A request was rejected; the connection stays open.
    Warning {
        /// Stable machine-readable reason code.
        reason: String,
        /// Human-readable description.
        message: String,
    },
}

impl ServerMessage {
    /// Builds a warning reply from a reason code and description.
    pub fn warning(reason: impl Into<String>, message: impl Into<String>) -> Self {
        ServerMessage::Warning {
            reason: reason.into(),
            message: message.into(),
        }
    }
}

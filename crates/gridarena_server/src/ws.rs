//! WebSocket transport adapter.
//!
//! One connection per player identity, identity supplied as a query
//! parameter on the upgrade request. Each connection runs a select loop
//! that forwards queued server messages outward and dispatches inbound
//! JSON into the coordinator. A failing peer only ever ends its own
//! loop; match state changes come solely from the disconnect path.

use crate::game::PlayerId;
use crate::http::AppState;
use crate::protocol::{ClientMessage, ServerMessage};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Connection-establishment parameters.
#[derive(Debug, Deserialize)]
pub struct WsParams {
    /// The connecting player's identity.
    #[serde(rename = "playerID")]
    pub player_id: PlayerId,
}

/// `GET /ws?playerID=<id>`: upgrades to a WebSocket session.
pub async fn ws_handler(
    State(app): State<AppState>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(app, socket, params.player_id))
}

/// Runs one player's connection until the socket closes or the session
/// is evicted by a newer registration.
///
/// The registry holds the only sender for this connection's outbound
/// channel, so an eviction closes the channel and ends the loop here.
/// Direct replies (the greeting, warnings) bypass the registry and go
/// straight to this socket.
async fn handle_socket(app: AppState, mut socket: WebSocket, player: PlayerId) {
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let token = app.registry.register(player, tx);
    info!(player, "WebSocket session established");

    let greeting = ServerMessage::Connected {
        message: "Connected to Tic-Tac-Toe!".to_string(),
    };
    if send_json(&mut socket, &greeting).await.is_err() {
        if app.registry.token(player) == Some(token) {
            app.coordinator.handle_disconnect(player);
        }
        return;
    }

    loop {
        tokio::select! {
            // Outbound: forward queued server messages to the socket.
            outbound = rx.recv() => {
                match outbound {
                    Some(msg) => {
                        if send_json(&mut socket, &msg).await.is_err() {
                            break;
                        }
                    }
                    // Sender gone: a newer session evicted this one.
                    None => break,
                }
            }
            // Inbound: read from the socket.
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = dispatch(&app, player, &text)
                            && send_json(&mut socket, &reply).await.is_err()
                        {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(player, error = %e, "WebSocket read error");
                        break;
                    }
                    Some(Ok(_)) => continue,
                }
            }
        }
    }

    // Only the owner of the current binding tears the player down; an
    // evicted socket must leave its replacement alone.
    if app.registry.token(player) == Some(token) {
        app.coordinator.handle_disconnect(player);
    }
    info!(player, "WebSocket session closed");
}

/// Encodes and writes one message; encoding failures are logged and
/// swallowed, write failures bubble up to end the loop.
async fn send_json(socket: &mut WebSocket, msg: &ServerMessage) -> Result<(), axum::Error> {
    match serde_json::to_string(msg) {
        Ok(json) => socket.send(Message::Text(json.into())).await,
        Err(e) => {
            warn!(error = %e, "Failed to encode outbound message");
            Ok(())
        }
    }
}

/// Decodes and routes a single inbound message.
///
/// Malformed input and rule rejections both produce a `warning` reply
/// for the sender; the connection survives either.
fn dispatch(app: &AppState, player: PlayerId, text: &str) -> Option<ServerMessage> {
    let msg: ClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            debug!(player, error = %e, "Malformed client message");
            return Some(ServerMessage::warning(
                "protocol_error",
                format!("Invalid message: {e}"),
            ));
        }
    };

    debug!(player, ?msg, "Dispatching client message");
    let result = match msg {
        ClientMessage::Move { game_id, x, y } => app.coordinator.apply_move(game_id, player, x, y),
        ClientMessage::AiMove { game_id } => app.coordinator.advance_offline(game_id, player),
        ClientMessage::RematchRequest { game_id } => {
            app.coordinator.handle_rematch_request(game_id, player)
        }
        ClientMessage::RematchResponse { game_id, accepted } => {
            app.coordinator.handle_rematch_response(game_id, player, accepted)
        }
        ClientMessage::StartRematch { opponent_id } => {
            app.coordinator.start_rematch(player, opponent_id);
            Ok(())
        }
    };

    result.err().map(|violation| {
        debug!(player, reason = violation.reason(), "Request rejected");
        ServerMessage::warning(violation.reason(), violation.to_string())
    })
}

//! Session registry: player identity to live outbound channel.

use crate::game::PlayerId;
use crate::protocol::ServerMessage;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// Outbound channel for one connected player.
pub type OutboundSender = mpsc::UnboundedSender<ServerMessage>;

/// Identifies one registration of a player's channel.
///
/// A connection that was evicted by a newer registration compares its
/// token against the registry before tearing anything down, so a
/// superseded socket can never unregister its replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionToken(u64);

#[derive(Debug)]
struct SessionEntry {
    token: SessionToken,
    tx: OutboundSender,
}

/// Maps player identities to their live outbound channels.
///
/// Owns its own mutex; the coordinator never holds its lock while
/// calling in here. Sends are best-effort by contract: an absent or
/// dead peer is informational, never an error.
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<PlayerId, SessionEntry>>>,
    next_token: Arc<AtomicU64>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            next_token: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Binds a player to a new outbound channel.
    ///
    /// Any prior channel for the same identity is evicted first: its
    /// sender is dropped, which closes the old connection's forwarding
    /// loop. Eviction is not an error.
    #[instrument(skip(self, tx))]
    pub fn register(&self, player: PlayerId, tx: OutboundSender) -> SessionToken {
        let token = SessionToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        let evicted = {
            let mut sessions = self.sessions.lock().unwrap();
            sessions.insert(player, SessionEntry { token, tx })
        };
        if evicted.is_some() {
            warn!(player, "Evicted prior session for reconnecting player");
        } else {
            info!(player, "Session registered");
        }
        token
    }

    /// Sends a message to a player, best-effort.
    ///
    /// Returns `true` when the message was handed to a live channel.
    /// Absence or a closed channel returns `false` and must be treated
    /// as informational by callers.
    pub fn send(&self, player: PlayerId, message: ServerMessage) -> bool {
        let tx = {
            let sessions = self.sessions.lock().unwrap();
            sessions.get(&player).map(|entry| entry.tx.clone())
        };
        match tx {
            Some(tx) => {
                let delivered = tx.send(message).is_ok();
                if !delivered {
                    debug!(player, "Dropped message for closed channel");
                }
                delivered
            }
            None => {
                debug!(player, "Dropped message for absent player");
                false
            }
        }
    }

    /// Removes a player's binding; safe when absent.
    #[instrument(skip(self))]
    pub fn unregister(&self, player: PlayerId) {
        let removed = self.sessions.lock().unwrap().remove(&player);
        if removed.is_some() {
            info!(player, "Session unregistered");
        }
    }

    /// Returns the token of the player's current binding, if any.
    pub fn token(&self, player: PlayerId) -> Option<SessionToken> {
        self.sessions
            .lock()
            .unwrap()
            .get(&player)
            .map(|entry| entry.token)
    }

    /// Number of currently connected players.
    pub fn online(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

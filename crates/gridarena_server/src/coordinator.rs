//! Match coordinator: matchmaking queue, live matches, rematch ballots.
//!
//! All coordinator state lives behind a single mutex. Operations
//! compute their state change and collect outbound notifications and
//! store commands while holding the lock, then execute both after it is
//! released; the registry's lock and the coordinator's are never held
//! at the same time.

use crate::db::{GameOutcome, StoreCommand, StoreHandle};
use crate::game::{MatchId, MatchState, PlayerId};
use crate::protocol::ServerMessage;
use crate::registry::SessionRegistry;
use derive_more::{Display, Error};
use gridarena_tictactoe::{Mark, PlaceError, next_move};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// A rejected request, reported to the offending player only.
///
/// Rejections never mutate coordinator state and never reach the
/// opponent; they are not fatal to the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum RuleViolation {
    /// No live match with the given id.
    #[display("Game not found")]
    MatchNotFound,
    /// The caller holds no seat in the match.
    #[display("You are not a participant of this game")]
    NotAParticipant,
    /// The match already reached its terminal state.
    #[display("Game is already over")]
    MatchOver,
    /// It is the other mark's turn.
    #[display("Not your turn")]
    NotYourTurn,
    /// Coordinates outside the board.
    #[display("Coordinates out of range")]
    OutOfRange,
    /// The target cell is taken.
    #[display("Cell is already occupied")]
    CellOccupied,
    /// Rematch negotiation only applies to finished matches.
    #[display("Game is not finished yet")]
    MatchNotFinished,
    /// Rematch negotiation needs a second player.
    #[display("Game has no opponent to rematch with")]
    OfflineMatch,
    /// Scripted moves only apply to offline matches.
    #[display("Not an offline game")]
    NotOffline,
    /// The board is full; nothing left to play.
    #[display("No available moves")]
    NoMovesLeft,
}

impl RuleViolation {
    /// Stable machine-readable reason code for the wire.
    pub fn reason(&self) -> &'static str {
        match self {
            RuleViolation::MatchNotFound => "match_not_found",
            RuleViolation::NotAParticipant => "not_a_participant",
            RuleViolation::MatchOver => "match_over",
            RuleViolation::NotYourTurn => "not_your_turn",
            RuleViolation::OutOfRange => "out_of_range",
            RuleViolation::CellOccupied => "cell_occupied",
            RuleViolation::MatchNotFinished => "match_not_finished",
            RuleViolation::OfflineMatch => "offline_match",
            RuleViolation::NotOffline => "not_offline",
            RuleViolation::NoMovesLeft => "no_moves_left",
        }
    }
}

/// Everything the coordinator owns, guarded by one mutex.
#[derive(Debug)]
struct CoordinatorState {
    matches: HashMap<MatchId, MatchState>,
    waiting: VecDeque<PlayerId>,
    ballots: HashMap<MatchId, HashSet<PlayerId>>,
    roster: HashMap<PlayerId, String>,
    next_match_id: MatchId,
    next_player_id: PlayerId,
}

impl CoordinatorState {
    fn new() -> Self {
        Self {
            matches: HashMap::new(),
            waiting: VecDeque::new(),
            ballots: HashMap::new(),
            roster: HashMap::new(),
            next_match_id: 1,
            next_player_id: 1,
        }
    }

    fn allocate_match_id(&mut self) -> MatchId {
        let id = self.next_match_id;
        self.next_match_id += 1;
        id
    }

    fn allocate_player_id(&mut self) -> PlayerId {
        let id = self.next_player_id;
        self.next_player_id += 1;
        id
    }

    /// Builds the start notifications for a freshly created pair match.
    fn start_messages(
        &self,
        m: &MatchState,
        rematch: bool,
    ) -> Vec<(PlayerId, ServerMessage)> {
        let mut notes = Vec::new();
        for recipient in m.participants() {
            let Some(role) = m.mark_of(recipient) else {
                continue;
            };
            let Some(opponent) = m.opponent_of(recipient) else {
                continue;
            };
            let opponent_name = self.roster.get(&opponent).cloned();
            let msg = if rematch {
                ServerMessage::StartRematch {
                    game_id: m.id(),
                    board: m.board().clone(),
                    turn: m.turn(),
                    role,
                    opponent_id: opponent,
                    opponent_name,
                }
            } else {
                ServerMessage::GameStart {
                    game_id: m.id(),
                    board: m.board().clone(),
                    turn: m.turn(),
                    role,
                    opponent_id: opponent,
                    opponent_name,
                }
            };
            notes.push((recipient, msg));
        }
        notes
    }
}

/// Orchestrates matchmaking, move validation, rematch negotiation, and
/// disconnect cleanup, fanning state changes out through the session
/// registry.
#[derive(Debug)]
pub struct MatchCoordinator {
    state: Mutex<CoordinatorState>,
    registry: SessionRegistry,
    store: StoreHandle,
    pairing_delay: Duration,
    rng: Mutex<StdRng>,
}

impl MatchCoordinator {
    /// Creates a coordinator with an entropy-seeded opponent policy.
    pub fn new(registry: SessionRegistry, store: StoreHandle, pairing_delay: Duration) -> Self {
        Self::with_rng(registry, store, pairing_delay, StdRng::from_entropy())
    }

    /// Creates a coordinator with an explicit random source, for
    /// deterministic scripted-opponent behavior in tests.
    pub fn with_rng(
        registry: SessionRegistry,
        store: StoreHandle,
        pairing_delay: Duration,
        rng: StdRng,
    ) -> Self {
        Self {
            state: Mutex::new(CoordinatorState::new()),
            registry,
            store,
            pairing_delay,
            rng: Mutex::new(rng),
        }
    }

    /// Admits a new anonymous player under the given display name and
    /// returns its identity.
    ///
    /// Ids are allocated in memory; the player row is persisted behind.
    #[instrument(skip(self, display_name))]
    pub fn register_player(&self, display_name: String) -> PlayerId {
        let player = {
            let mut state = self.state.lock().unwrap();
            let player = state.allocate_player_id();
            state.roster.insert(player, display_name.clone());
            player
        };
        self.store.record(StoreCommand::CreatePlayer {
            player,
            display_name,
        });
        info!(player, "Player registered");
        player
    }

    /// Pairs the caller with the longest-waiting player, or enqueues it.
    ///
    /// On a pairing, the queue head takes seat A (X, moves first) and
    /// the caller seat B; both sessions are pushed a start notification
    /// after the pairing delay, which papers over the transport-side
    /// registration race. Returns the paired opponent, or `None` when
    /// the caller was (or stays) queued.
    #[instrument(skip(self))]
    pub fn find_opponent(&self, player: PlayerId) -> Option<PlayerId> {
        let mut commands = Vec::new();
        let mut notes = Vec::new();
        let paired = {
            let mut state = self.state.lock().unwrap();
            match state.waiting.front().copied() {
                Some(opponent) if opponent != player => {
                    state.waiting.pop_front();
                    let id = state.allocate_match_id();
                    let m = MatchState::new(id, opponent, player);
                    commands.push(StoreCommand::CreateMatch((&m).into()));
                    notes = state.start_messages(&m, false);
                    state.matches.insert(id, m);
                    info!(match_id = id, seat_a = opponent, seat_b = player, "Match created");
                    Some(opponent)
                }
                _ => {
                    if !state.waiting.contains(&player) {
                        state.waiting.push_back(player);
                        debug!(player, queued = state.waiting.len(), "Player queued");
                    }
                    None
                }
            }
        };
        for command in commands {
            self.store.record(command);
        }
        if !notes.is_empty() {
            let registry = self.registry.clone();
            let delay = self.pairing_delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                for (recipient, msg) in notes {
                    registry.send(recipient, msg);
                }
            });
        }
        paired
    }

    /// Creates a single-player match against the scripted opponent.
    ///
    /// No start notification: the only session already knows.
    #[instrument(skip(self))]
    pub fn create_offline_match(&self, player: PlayerId) -> MatchId {
        let (id, command) = {
            let mut state = self.state.lock().unwrap();
            let id = state.allocate_match_id();
            let m = MatchState::offline(id, player);
            let command = StoreCommand::CreateMatch((&m).into());
            state.matches.insert(id, m);
            (id, command)
        };
        self.store.record(command);
        info!(match_id = id, player, "Offline match created");
        id
    }

    /// Applies a player's move.
    ///
    /// Rejections are checked in a fixed order and leave no trace: no
    /// mutation, no persistence, no broadcast. On success the board and
    /// turn advance, the move is persisted behind, terminal conditions
    /// are settled, and the authoritative state is broadcast to every
    /// registered participant.
    ///
    /// # Errors
    ///
    /// Returns the first matching [`RuleViolation`].
    #[instrument(skip(self))]
    pub fn apply_move(
        &self,
        match_id: MatchId,
        player: PlayerId,
        x: i64,
        y: i64,
    ) -> Result<(), RuleViolation> {
        let mut commands = Vec::new();
        let mut notes = Vec::new();
        {
            let mut state = self.state.lock().unwrap();
            let m = state
                .matches
                .get_mut(&match_id)
                .ok_or(RuleViolation::MatchNotFound)?;
            let mark = m.mark_of(player).ok_or(RuleViolation::NotAParticipant)?;
            if m.is_finished() {
                return Err(RuleViolation::MatchOver);
            }
            if m.turn() != mark {
                return Err(RuleViolation::NotYourTurn);
            }
            if !(0..3).contains(&x) || !(0..3).contains(&y) {
                return Err(RuleViolation::OutOfRange);
            }
            m.board_mut()
                .place(x as usize, y as usize, mark)
                .map_err(|e| match e {
                    PlaceError::Occupied => RuleViolation::CellOccupied,
                    PlaceError::OutOfRange => RuleViolation::OutOfRange,
                })?;
            m.set_turn(mark.opponent());
            commands.push(StoreCommand::RecordMove {
                match_id,
                player: Some(player),
                x,
                y,
                mark,
            });

            let finished = m.settle();
            commands.push(StoreCommand::UpdateMatch((&*m).into()));
            if finished {
                info!(match_id, winner = ?m.winner(), "Match finished");
                let winner = m.winner();
                for participant in m.participants() {
                    let outcome = match winner {
                        Some(w) if w == participant => GameOutcome::Win,
                        Some(_) => GameOutcome::Loss,
                        None => GameOutcome::Draw,
                    };
                    commands.push(StoreCommand::IncrementStat {
                        player: participant,
                        outcome,
                    });
                }
            }

            let update = ServerMessage::Move {
                game_id: match_id,
                board: m.board().clone(),
                turn: m.turn(),
                status: m.status(),
                winner: m.winner(),
            };
            for participant in m.participants() {
                notes.push((participant, update.clone()));
            }
        }
        for command in commands {
            self.store.record(command);
        }
        self.deliver(notes);
        Ok(())
    }

    /// Advances an offline match by one scripted-opponent move and
    /// reports the result back to the only session.
    ///
    /// # Errors
    ///
    /// Returns the first matching [`RuleViolation`]; a full board
    /// yields [`RuleViolation::NoMovesLeft`].
    #[instrument(skip(self))]
    pub fn advance_offline(
        &self,
        match_id: MatchId,
        player: PlayerId,
    ) -> Result<(), RuleViolation> {
        let mut commands = Vec::new();
        let mut notes = Vec::new();
        {
            let mut state = self.state.lock().unwrap();
            let m = state
                .matches
                .get_mut(&match_id)
                .ok_or(RuleViolation::MatchNotFound)?;
            m.mark_of(player).ok_or(RuleViolation::NotAParticipant)?;
            if !m.is_offline() {
                return Err(RuleViolation::NotOffline);
            }
            if m.is_finished() {
                return Err(RuleViolation::MatchOver);
            }
            if m.turn() != Mark::O {
                return Err(RuleViolation::NotYourTurn);
            }
            let (x, y) = {
                let mut rng = self.rng.lock().unwrap();
                next_move(m.board(), Mark::O, &mut *rng)
            }
            .ok_or(RuleViolation::NoMovesLeft)?;
            m.board_mut()
                .place(x, y, Mark::O)
                .map_err(|_| RuleViolation::CellOccupied)?;
            m.set_turn(Mark::X);
            commands.push(StoreCommand::RecordMove {
                match_id,
                player: None,
                x: x as i64,
                y: y as i64,
                mark: Mark::O,
            });

            let finished = m.settle();
            commands.push(StoreCommand::UpdateMatch((&*m).into()));
            if finished {
                // Tally from the human player's perspective; seat B has
                // no identity to credit.
                let outcome = match m.board().winner() {
                    Some(Mark::X) => GameOutcome::Win,
                    Some(Mark::O) => GameOutcome::Loss,
                    None => GameOutcome::Draw,
                };
                commands.push(StoreCommand::IncrementStat {
                    player,
                    outcome,
                });
                info!(match_id, ?outcome, "Offline match finished");
            }

            notes.push((
                player,
                ServerMessage::AiMove {
                    game_id: match_id,
                    x: x as i64,
                    y: y as i64,
                    board: m.board().clone(),
                    turn: m.turn(),
                    status: m.status(),
                },
            ));
        }
        for command in commands {
            self.store.record(command);
        }
        self.deliver(notes);
        Ok(())
    }

    /// Records a rematch vote on a finished match and pings the
    /// opponent.
    ///
    /// # Errors
    ///
    /// Returns the first matching [`RuleViolation`].
    #[instrument(skip(self))]
    pub fn handle_rematch_request(
        &self,
        match_id: MatchId,
        player: PlayerId,
    ) -> Result<(), RuleViolation> {
        let mut notes = Vec::new();
        {
            let mut state = self.state.lock().unwrap();
            let state = &mut *state;
            let m = state
                .matches
                .get(&match_id)
                .ok_or(RuleViolation::MatchNotFound)?;
            m.mark_of(player).ok_or(RuleViolation::NotAParticipant)?;
            let opponent = m.opponent_of(player).ok_or(RuleViolation::OfflineMatch)?;
            if !m.is_finished() {
                return Err(RuleViolation::MatchNotFinished);
            }
            state.ballots.entry(match_id).or_default().insert(player);
            debug!(match_id, player, "Rematch vote recorded");
            notes.push((opponent, ServerMessage::RematchRequest { game_id: match_id }));
        }
        self.deliver(notes);
        Ok(())
    }

    /// Handles a rematch answer.
    ///
    /// The answer is broadcast to both participants. An acceptance is a
    /// vote; once both participants have voted the finished match is
    /// retired and a fresh one with the same seating replaces it. A
    /// decline clears the ballot.
    ///
    /// # Errors
    ///
    /// Returns the first matching [`RuleViolation`].
    #[instrument(skip(self))]
    pub fn handle_rematch_response(
        &self,
        match_id: MatchId,
        player: PlayerId,
        accepted: bool,
    ) -> Result<(), RuleViolation> {
        let mut commands = Vec::new();
        let mut notes = Vec::new();
        {
            let mut state = self.state.lock().unwrap();
            let state = &mut *state;
            let (seat_a, seat_b) = {
                let m = state
                    .matches
                    .get(&match_id)
                    .ok_or(RuleViolation::MatchNotFound)?;
                m.mark_of(player).ok_or(RuleViolation::NotAParticipant)?;
                let _ = m.opponent_of(player).ok_or(RuleViolation::OfflineMatch)?;
                if !m.is_finished() {
                    return Err(RuleViolation::MatchNotFinished);
                }
                (m.seat_a(), m.seat_b())
            };

            for participant in [Some(seat_a), seat_b].into_iter().flatten() {
                notes.push((
                    participant,
                    ServerMessage::RematchResponse {
                        game_id: match_id,
                        accepted,
                    },
                ));
            }

            if accepted {
                let ballot = state.ballots.entry(match_id).or_default();
                ballot.insert(player);
                let both = ballot.contains(&seat_a)
                    && seat_b.is_some_and(|b| ballot.contains(&b));
                if both && let Some(seat_b) = seat_b {
                    state.matches.remove(&match_id);
                    state.ballots.remove(&match_id);
                    let id = state.allocate_match_id();
                    let fresh = MatchState::new(id, seat_a, seat_b);
                    commands.push(StoreCommand::CreateMatch((&fresh).into()));
                    notes.extend(state.start_messages(&fresh, true));
                    state.matches.insert(id, fresh);
                    info!(retired = match_id, match_id = id, "Rematch started");
                }
            } else {
                state.ballots.remove(&match_id);
                debug!(match_id, player, "Rematch declined; ballot cleared");
            }
        }
        for command in commands {
            self.store.record(command);
        }
        self.deliver(notes);
        Ok(())
    }

    /// Creates and announces a fresh match for a known pair, retiring
    /// any live match the two still share.
    #[instrument(skip(self))]
    pub fn start_rematch(&self, player: PlayerId, opponent: PlayerId) -> MatchId {
        let mut commands = Vec::new();
        let mut notes = Vec::new();
        let id = {
            let mut state = self.state.lock().unwrap();
            let stale: Vec<MatchId> = state
                .matches
                .iter()
                .filter(|(_, m)| m.contains(player) && m.contains(opponent))
                .map(|(&id, _)| id)
                .collect();
            for old in stale {
                state.matches.remove(&old);
                state.ballots.remove(&old);
                debug!(match_id = old, "Match superseded by rematch");
            }
            let id = state.allocate_match_id();
            let fresh = MatchState::new(id, player, opponent);
            commands.push(StoreCommand::CreateMatch((&fresh).into()));
            notes = state.start_messages(&fresh, true);
            state.matches.insert(id, fresh);
            info!(match_id = id, seat_a = player, seat_b = opponent, "Rematch match created");
            id
        };
        for command in commands {
            self.store.record(command);
        }
        self.deliver(notes);
        id
    }

    /// Tears down a departed player's presence.
    ///
    /// Drops the session binding, removes the player from the waiting
    /// queue, and terminates the first live match containing it: the
    /// match is finished (idempotently), the remaining participant is
    /// notified once, and the match and its ballot leave the live set.
    /// Safe to call repeatedly.
    ///
    /// The scan deliberately stops at the first match found; players
    /// hold at most one live match, and relaxing that invariant means
    /// revisiting this loop.
    #[instrument(skip(self))]
    pub fn handle_disconnect(&self, player: PlayerId) {
        self.registry.unregister(player);
        let mut commands = Vec::new();
        let mut notes = Vec::new();
        {
            let mut state = self.state.lock().unwrap();
            state.waiting.retain(|&queued| queued != player);
            let found = state
                .matches
                .iter()
                .find_map(|(&id, m)| m.contains(player).then_some(id));
            if let Some(match_id) = found {
                if let Some(m) = state.matches.get_mut(&match_id) {
                    m.finish(None);
                    commands.push(StoreCommand::UpdateMatch((&*m).into()));
                    if let Some(opponent) = m.opponent_of(player) {
                        notes.push((opponent, ServerMessage::OpponentLeft { game_id: match_id }));
                    }
                }
                state.matches.remove(&match_id);
                state.ballots.remove(&match_id);
                info!(player, match_id, "Match terminated by disconnect");
            }
        }
        for command in commands {
            self.store.record(command);
        }
        self.deliver(notes);
    }

    /// Clones the live state of a match, if it is still in the live set.
    pub fn match_state(&self, match_id: MatchId) -> Option<MatchState> {
        self.state.lock().unwrap().matches.get(&match_id).cloned()
    }

    /// Looks up a player's display name.
    pub fn display_name(&self, player: PlayerId) -> Option<String> {
        self.state.lock().unwrap().roster.get(&player).cloned()
    }

    /// Number of live matches (active and finished-but-addressable).
    pub fn live_matches(&self) -> usize {
        self.state.lock().unwrap().matches.len()
    }

    fn deliver(&self, notes: Vec<(PlayerId, ServerMessage)>) {
        for (recipient, msg) in notes {
            if !self.registry.send(recipient, msg) {
                warn!(recipient, "Notification dropped for unreachable player");
            }
        }
    }
}

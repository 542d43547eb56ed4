//! Tests for matchmaking, move validation, rematch negotiation, and
//! disconnect handling.

use gridarena_server::{
    MatchCoordinator, MatchId, MatchRepository, MatchStatus, PlayerId, RuleViolation,
    ServerMessage, SessionRegistry, StoreHandle,
};
use gridarena_tictactoe::Mark;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc::{self, UnboundedReceiver};

struct Harness {
    coordinator: Arc<MatchCoordinator>,
    registry: SessionRegistry,
    _dir: TempDir,
}

/// Builds a coordinator over a throwaway database with a zero pairing
/// delay, so start notifications arrive as soon as the runtime yields.
fn harness() -> Harness {
    let dir = tempfile::tempdir().expect("temp dir");
    let repo = MatchRepository::new(dir.path().join("test.db").to_string_lossy().into_owned());
    repo.run_migrations().expect("migrations apply");
    let store = StoreHandle::spawn(repo);
    let registry = SessionRegistry::new();
    let coordinator = Arc::new(MatchCoordinator::new(
        registry.clone(),
        store,
        Duration::ZERO,
    ));
    Harness {
        coordinator,
        registry,
        _dir: dir,
    }
}

fn connect(h: &Harness, player: PlayerId) -> UnboundedReceiver<ServerMessage> {
    let (tx, rx) = mpsc::unbounded_channel();
    h.registry.register(player, tx);
    rx
}

/// Collects everything queued for one player after letting spawned
/// notification tasks run.
async fn drain(rx: &mut UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
    tokio::time::sleep(Duration::from_millis(20)).await;
    let mut msgs = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        msgs.push(msg);
    }
    msgs
}

/// Pairs two fresh players and returns their ids, receivers, and the
/// match id, with start notifications already consumed.
async fn paired(
    h: &Harness,
) -> (
    PlayerId,
    PlayerId,
    UnboundedReceiver<ServerMessage>,
    UnboundedReceiver<ServerMessage>,
    MatchId,
) {
    let first = h.coordinator.register_player("First".to_string());
    let second = h.coordinator.register_player("Second".to_string());
    let mut rx_first = connect(h, first);
    let mut rx_second = connect(h, second);

    assert_eq!(h.coordinator.find_opponent(first), None);
    assert_eq!(h.coordinator.find_opponent(second), Some(first));

    let msgs = drain(&mut rx_first).await;
    let game_id = msgs
        .iter()
        .find_map(|m| match m {
            ServerMessage::GameStart { game_id, .. } => Some(*game_id),
            _ => None,
        })
        .expect("Seat A start notification");
    drain(&mut rx_second).await;

    (first, second, rx_first, rx_second, game_id)
}

/// Plays X through the top row for a quick win: X(0,0) O(1,0) X(0,1)
/// O(1,1) X(0,2).
fn play_to_x_win(h: &Harness, game_id: MatchId, x_player: PlayerId, o_player: PlayerId) {
    h.coordinator.apply_move(game_id, x_player, 0, 0).unwrap();
    h.coordinator.apply_move(game_id, o_player, 1, 0).unwrap();
    h.coordinator.apply_move(game_id, x_player, 0, 1).unwrap();
    h.coordinator.apply_move(game_id, o_player, 1, 1).unwrap();
    h.coordinator.apply_move(game_id, x_player, 0, 2).unwrap();
}

#[tokio::test]
async fn test_pairing_scenario() {
    let h = harness();
    let (first, second, mut rx_first, mut rx_second, _) = {
        let first = h.coordinator.register_player("First".to_string());
        let second = h.coordinator.register_player("Second".to_string());
        let rx_first = connect(&h, first);
        let rx_second = connect(&h, second);
        (first, second, rx_first, rx_second, ())
    };

    // First caller waits; second caller is paired with the waiter.
    assert_eq!(h.coordinator.find_opponent(first), None);
    assert_eq!(h.coordinator.find_opponent(second), Some(first));

    // The queue head takes seat A (X, moves first); the caller seat B.
    let first_msgs = drain(&mut rx_first).await;
    let game_id = match first_msgs.as_slice() {
        [
            ServerMessage::GameStart {
                game_id,
                role,
                opponent_id,
                turn,
                ..
            },
        ] => {
            assert_eq!(*role, Mark::X);
            assert_eq!(*opponent_id, second);
            assert_eq!(*turn, Mark::X);
            *game_id
        }
        other => panic!("Expected one start notification, got {other:?}"),
    };
    match drain(&mut rx_second).await.as_slice() {
        [
            ServerMessage::GameStart {
                role, opponent_id, ..
            },
        ] => {
            assert_eq!(*role, Mark::O);
            assert_eq!(*opponent_id, first);
        }
        other => panic!("Expected one start notification, got {other:?}"),
    }

    // Seat A moves at (1,1); the turn flips to O.
    h.coordinator
        .apply_move(game_id, first, 1, 1)
        .expect("Valid opening move");
    match drain(&mut rx_second).await.as_slice() {
        [ServerMessage::Move { turn, status, .. }] => {
            assert_eq!(*turn, Mark::O);
            assert_eq!(*status, MatchStatus::Active);
        }
        other => panic!("Expected one move broadcast, got {other:?}"),
    }

    // Seat B answering on the same cell is rejected as occupied.
    assert_eq!(
        h.coordinator.apply_move(game_id, second, 1, 1),
        Err(RuleViolation::CellOccupied)
    );
    // Rejection reaches nobody through the registry; seat A only holds
    // the echo of its own earlier move.
    assert_eq!(drain(&mut rx_first).await.len(), 1);
    assert!(drain(&mut rx_second).await.is_empty());
}

#[tokio::test]
async fn test_matchmaking_is_fifo_across_rounds() {
    let h = harness();
    let p1 = h.coordinator.register_player("P1".to_string());
    let p2 = h.coordinator.register_player("P2".to_string());
    let p3 = h.coordinator.register_player("P3".to_string());
    let p4 = h.coordinator.register_player("P4".to_string());

    // Earliest waiter is always matched first, preserving arrival order.
    assert_eq!(h.coordinator.find_opponent(p1), None);
    assert_eq!(h.coordinator.find_opponent(p2), Some(p1));
    assert_eq!(h.coordinator.find_opponent(p3), None);
    assert_eq!(h.coordinator.find_opponent(p4), Some(p3));
}

#[tokio::test]
async fn test_queue_holds_a_player_at_most_once() {
    let h = harness();
    let p1 = h.coordinator.register_player("P1".to_string());
    let p2 = h.coordinator.register_player("P2".to_string());
    let p3 = h.coordinator.register_player("P3".to_string());

    // Repeated requests while waiting do not duplicate the entry and
    // never pair a player with itself.
    assert_eq!(h.coordinator.find_opponent(p1), None);
    assert_eq!(h.coordinator.find_opponent(p1), None);
    assert_eq!(h.coordinator.find_opponent(p2), Some(p1));

    // Queue is empty again: p3 waits instead of being paired.
    assert_eq!(h.coordinator.find_opponent(p3), None);
}

#[tokio::test]
async fn test_move_rejected_when_match_not_found() {
    let h = harness();
    let p = h.coordinator.register_player("Solo".to_string());
    assert_eq!(
        h.coordinator.apply_move(999, p, 0, 0),
        Err(RuleViolation::MatchNotFound)
    );
}

#[tokio::test]
async fn test_move_rejected_for_outsider() {
    let h = harness();
    let (_, _, _rx1, _rx2, game_id) = paired(&h).await;
    let outsider = h.coordinator.register_player("Lurker".to_string());
    assert_eq!(
        h.coordinator.apply_move(game_id, outsider, 0, 0),
        Err(RuleViolation::NotAParticipant)
    );
}

#[tokio::test]
async fn test_move_rejected_when_match_over() {
    let h = harness();
    let (first, second, _rx1, _rx2, game_id) = paired(&h).await;
    play_to_x_win(&h, game_id, first, second);

    // The status gate fires before the turn check ever could.
    assert_eq!(
        h.coordinator.apply_move(game_id, second, 2, 2),
        Err(RuleViolation::MatchOver)
    );
}

#[tokio::test]
async fn test_move_rejected_out_of_turn() {
    let h = harness();
    let (first, second, _rx1, _rx2, game_id) = paired(&h).await;

    // O may not open.
    assert_eq!(
        h.coordinator.apply_move(game_id, second, 0, 0),
        Err(RuleViolation::NotYourTurn)
    );
    // X may not move twice in a row.
    h.coordinator.apply_move(game_id, first, 0, 0).unwrap();
    assert_eq!(
        h.coordinator.apply_move(game_id, first, 0, 1),
        Err(RuleViolation::NotYourTurn)
    );
}

#[tokio::test]
async fn test_move_rejected_out_of_range() {
    let h = harness();
    let (first, _, _rx1, _rx2, game_id) = paired(&h).await;

    for (x, y) in [(3, 0), (0, 3), (-1, 0), (0, -1), (7, 7)] {
        assert_eq!(
            h.coordinator.apply_move(game_id, first, x, y),
            Err(RuleViolation::OutOfRange)
        );
    }
    // Nothing was consumed: the same player still holds the turn.
    assert!(h.coordinator.apply_move(game_id, first, 0, 0).is_ok());
}

#[tokio::test]
async fn test_move_rejected_on_occupied_cell() {
    let h = harness();
    let (first, second, _rx1, _rx2, game_id) = paired(&h).await;

    h.coordinator.apply_move(game_id, first, 1, 1).unwrap();
    assert_eq!(
        h.coordinator.apply_move(game_id, second, 1, 1),
        Err(RuleViolation::CellOccupied)
    );
    // The rejection consumed nothing; another cell still works.
    assert!(h.coordinator.apply_move(game_id, second, 0, 1).is_ok());
}

#[tokio::test]
async fn test_turns_alternate() {
    let h = harness();
    let (first, second, mut rx1, _rx2, game_id) = paired(&h).await;

    let moves = [
        (first, 0, 0),
        (second, 1, 0),
        (first, 0, 1),
        (second, 1, 1),
    ];
    for (player, x, y) in moves {
        h.coordinator.apply_move(game_id, player, x, y).unwrap();
        // The mover is immediately rejected if it tries again.
        assert_eq!(
            h.coordinator.apply_move(game_id, player, 2, 2),
            Err(RuleViolation::NotYourTurn)
        );
    }

    let turns: Vec<Mark> = drain(&mut rx1)
        .await
        .into_iter()
        .filter_map(|m| match m {
            ServerMessage::Move { turn, .. } => Some(turn),
            _ => None,
        })
        .collect();
    assert_eq!(turns, vec![Mark::O, Mark::X, Mark::O, Mark::X]);
}

#[tokio::test]
async fn test_win_is_broadcast_with_winner() {
    let h = harness();
    let (first, second, _rx1, mut rx2, game_id) = paired(&h).await;
    play_to_x_win(&h, game_id, first, second);

    let last = drain(&mut rx2).await.pop().expect("Broadcasts arrived");
    match last {
        ServerMessage::Move {
            status, winner, ..
        } => {
            assert_eq!(status, MatchStatus::Finished);
            assert_eq!(winner, Some(first));
        }
        other => panic!("Expected a move broadcast, got {other:?}"),
    }

    let state = h.coordinator.match_state(game_id).expect("Still live");
    assert_eq!(state.status(), MatchStatus::Finished);
    assert_eq!(state.winner(), Some(first));
}

#[tokio::test]
async fn test_rematch_restarts_only_when_both_accept() {
    let h = harness();
    let (first, second, mut rx1, mut rx2, game_id) = paired(&h).await;
    play_to_x_win(&h, game_id, first, second);
    drain(&mut rx1).await;
    drain(&mut rx2).await;

    // The loser asks; only the opponent is pinged.
    h.coordinator
        .handle_rematch_request(game_id, second)
        .expect("Valid rematch request");
    assert_eq!(
        drain(&mut rx1).await,
        vec![ServerMessage::RematchRequest { game_id }]
    );
    assert!(drain(&mut rx2).await.is_empty());

    // A single vote leaves the old match pending.
    assert!(h.coordinator.match_state(game_id).is_some());

    // The winner accepts: response is broadcast and a fresh match
    // replaces the retired one.
    h.coordinator
        .handle_rematch_response(game_id, first, true)
        .expect("Valid rematch response");

    let msgs = drain(&mut rx1).await;
    assert!(msgs.contains(&ServerMessage::RematchResponse {
        game_id,
        accepted: true
    }));
    let new_id = msgs
        .iter()
        .find_map(|m| match m {
            ServerMessage::StartRematch { game_id, role, .. } => {
                assert_eq!(*role, Mark::X);
                Some(*game_id)
            }
            _ => None,
        })
        .expect("Restart notification");
    assert_ne!(new_id, game_id);

    // Old match is gone; the fresh one is active with a reset board.
    assert!(h.coordinator.match_state(game_id).is_none());
    let fresh = h.coordinator.match_state(new_id).expect("Fresh match");
    assert_eq!(fresh.status(), MatchStatus::Active);
    assert_eq!(fresh.turn(), Mark::X);
    assert!(fresh.board().is_empty(0, 0));
    assert_eq!(fresh.seat_a(), first);
    assert_eq!(fresh.seat_b(), Some(second));
}

#[tokio::test]
async fn test_single_acceptance_does_not_restart() {
    let h = harness();
    let (first, second, _rx1, _rx2, game_id) = paired(&h).await;
    play_to_x_win(&h, game_id, first, second);

    // An acceptance with no prior vote from the opponent just records
    // the ballot.
    h.coordinator
        .handle_rematch_response(game_id, first, true)
        .expect("Valid rematch response");
    assert!(h.coordinator.match_state(game_id).is_some());
    assert_eq!(h.coordinator.live_matches(), 1);
}

#[tokio::test]
async fn test_decline_clears_the_ballot() {
    let h = harness();
    let (first, second, _rx1, _rx2, game_id) = paired(&h).await;
    play_to_x_win(&h, game_id, first, second);

    h.coordinator
        .handle_rematch_request(game_id, second)
        .expect("Valid rematch request");
    h.coordinator
        .handle_rematch_response(game_id, first, false)
        .expect("Valid rematch response");
    assert!(h.coordinator.match_state(game_id).is_some());

    // The declined ballot is gone: a lone later acceptance cannot
    // combine with the pre-decline vote.
    h.coordinator
        .handle_rematch_response(game_id, first, true)
        .expect("Valid rematch response");
    assert!(h.coordinator.match_state(game_id).is_some());
    assert_eq!(h.coordinator.live_matches(), 1);
}

#[tokio::test]
async fn test_rematch_rejected_while_active() {
    let h = harness();
    let (first, _, _rx1, _rx2, game_id) = paired(&h).await;
    assert_eq!(
        h.coordinator.handle_rematch_request(game_id, first),
        Err(RuleViolation::MatchNotFinished)
    );
}

#[tokio::test]
async fn test_rematch_rejected_for_outsider() {
    let h = harness();
    let (first, second, _rx1, _rx2, game_id) = paired(&h).await;
    play_to_x_win(&h, game_id, first, second);

    let outsider = h.coordinator.register_player("Lurker".to_string());
    assert_eq!(
        h.coordinator.handle_rematch_request(game_id, outsider),
        Err(RuleViolation::NotAParticipant)
    );
}

#[tokio::test]
async fn test_disconnect_terminates_match_exactly_once() {
    let h = harness();
    let (first, second, _rx1, mut rx2, game_id) = paired(&h).await;
    h.coordinator.apply_move(game_id, first, 0, 0).unwrap();
    drain(&mut rx2).await;

    h.coordinator.handle_disconnect(first);
    assert_eq!(
        drain(&mut rx2).await,
        vec![ServerMessage::OpponentLeft { game_id }]
    );
    assert!(h.coordinator.match_state(game_id).is_none());
    assert_eq!(h.registry.token(first), None);

    // Calling again is a no-op: no second notification, no panic.
    h.coordinator.handle_disconnect(first);
    assert!(drain(&mut rx2).await.is_empty());

    // The reclaimed match no longer accepts anything.
    assert_eq!(
        h.coordinator.apply_move(game_id, second, 1, 1),
        Err(RuleViolation::MatchNotFound)
    );
}

#[tokio::test]
async fn test_disconnect_removes_queued_player() {
    let h = harness();
    let p1 = h.coordinator.register_player("P1".to_string());
    let p2 = h.coordinator.register_player("P2".to_string());

    assert_eq!(h.coordinator.find_opponent(p1), None);
    h.coordinator.handle_disconnect(p1);

    // The departed player is no longer pairable.
    assert_eq!(h.coordinator.find_opponent(p2), None);
}

#[tokio::test]
async fn test_offline_match_flow() {
    let h = harness();
    let player = h.coordinator.register_player("Solo".to_string());
    let mut rx = connect(&h, player);
    let game_id = h.coordinator.create_offline_match(player);

    // The scripted opponent cannot move before the human does.
    assert_eq!(
        h.coordinator.advance_offline(game_id, player),
        Err(RuleViolation::NotYourTurn)
    );

    h.coordinator.apply_move(game_id, player, 0, 0).unwrap();
    h.coordinator
        .advance_offline(game_id, player)
        .expect("Scripted move");

    let msgs = drain(&mut rx).await;
    let ai = msgs
        .iter()
        .find_map(|m| match m {
            ServerMessage::AiMove { x, y, turn, .. } => Some((*x, *y, *turn)),
            _ => None,
        })
        .expect("Scripted move reply");
    // One human mark on the board: the ladder takes the center.
    assert_eq!((ai.0, ai.1), (1, 1));
    assert_eq!(ai.2, Mark::X);

    // Two scripted moves in a row are rejected.
    assert_eq!(
        h.coordinator.advance_offline(game_id, player),
        Err(RuleViolation::NotYourTurn)
    );
}

#[tokio::test]
async fn test_ai_move_rejected_on_two_player_match() {
    let h = harness();
    let (first, _, _rx1, _rx2, game_id) = paired(&h).await;
    assert_eq!(
        h.coordinator.advance_offline(game_id, first),
        Err(RuleViolation::NotOffline)
    );
}

#[tokio::test]
async fn test_start_rematch_supersedes_previous_match() {
    let h = harness();
    let (first, second, mut rx1, mut rx2, game_id) = paired(&h).await;
    play_to_x_win(&h, game_id, first, second);
    drain(&mut rx1).await;
    drain(&mut rx2).await;

    let new_id = h.coordinator.start_rematch(second, first);
    assert_ne!(new_id, game_id);
    assert!(h.coordinator.match_state(game_id).is_none());

    let msgs = drain(&mut rx1).await;
    assert!(
        msgs.iter()
            .any(|m| matches!(m, ServerMessage::StartRematch { game_id, .. } if *game_id == new_id))
    );
    assert!(
        drain(&mut rx2)
            .await
            .iter()
            .any(|m| matches!(m, ServerMessage::StartRematch { game_id, .. } if *game_id == new_id))
    );
}

#[tokio::test]
async fn test_match_ids_are_monotonic() {
    let h = harness();
    let p = h.coordinator.register_player("Solo".to_string());
    let a = h.coordinator.create_offline_match(p);
    let b = h.coordinator.create_offline_match(p);
    assert!(b > a);
}
